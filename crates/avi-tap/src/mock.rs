//! Servicio TAP en memoria con fases programadas y registro de llamadas.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{Result, TapError};
use crate::service::{JobRef, TapService};
use crate::uws::JobPhase;

#[derive(Debug)]
pub struct ScriptedTapService {
    phases: Mutex<VecDeque<JobPhase>>,
    last_phase: Mutex<JobPhase>,
    result: Vec<u8>,
    error_message: String,
    fail_submit: Option<u16>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTapService {
    /// Por defecto el job completa en la primera consulta de fase.
    pub fn new(result: Vec<u8>) -> Self {
        ScriptedTapService { phases: Mutex::new(VecDeque::new()),
                             last_phase: Mutex::new(JobPhase::Completed),
                             result,
                             error_message: String::new(),
                             fail_submit: None,
                             calls: Mutex::new(Vec::new()) }
    }

    /// Fases devueltas en orden; la última se repite indefinidamente.
    pub fn with_phases(self, phases: &[JobPhase]) -> Self {
        if let Some(last) = phases.last() {
            *self.last_phase.lock().unwrap_or_else(|e| e.into_inner()) = *last;
        }
        *self.phases.lock().unwrap_or_else(|e| e.into_inner()) = phases.iter().copied().collect();
        self
    }

    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// La creación del job responde con este status HTTP.
    pub fn failing_submit(mut self, status: u16) -> Self {
        self.fail_submit = Some(status);
        self
    }

    /// Operaciones invocadas hasta ahora, en orden.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(op.to_string());
    }
}

impl TapService for ScriptedTapService {
    fn submit(&self, _query: &str) -> Result<JobRef> {
        self.record("submit");
        if let Some(status) = self.fail_submit {
            return Err(TapError::Status { method: "POST",
                                          status,
                                          url: "mock://tap/async".into() });
        }
        Ok(JobRef::new("mock://tap/async/job-1"))
    }

    fn start(&self, _job: &JobRef) -> Result<()> {
        self.record("start");
        Ok(())
    }

    fn phase(&self, _job: &JobRef) -> Result<JobPhase> {
        self.record("phase");
        let next = self.phases.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        Ok(next.unwrap_or_else(|| *self.last_phase.lock().unwrap_or_else(|e| e.into_inner())))
    }

    fn error(&self, _job: &JobRef) -> Result<String> {
        self.record("error");
        Ok(self.error_message.clone())
    }

    fn result(&self, _job: &JobRef) -> Result<Vec<u8>> {
        self.record("result");
        Ok(self.result.clone())
    }

    fn abort(&self, _job: &JobRef) -> Result<()> {
        self.record("abort");
        Ok(())
    }

    fn delete(&self, _job: &JobRef) -> Result<()> {
        self.record("delete");
        Ok(())
    }
}
