//! Ciclo de vida de un job asíncrono: submit, run, espera con backoff,
//! lectura del resultado y borrado.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, TapError};
use crate::service::{JobRef, TapService};
use crate::uws::JobPhase;

/// La espera duerme en tramos de como mucho este tamaño para atender la cancelación.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Factor multiplicativo aplicado al intervalo tras cada consulta.
    pub backoff: f64,
    pub max_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy { interval: Duration::from_secs(1),
                     backoff: 1.5,
                     max_interval: Duration::from_secs(10),
                     timeout: Duration::from_secs(1800) }
    }
}

impl PollPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        let factor = if self.backoff.is_finite() && self.backoff >= 1.0 { self.backoff } else { 1.0 };
        current.mul_f64(factor).min(self.max_interval)
    }
}

/// Señal compartida para interrumpir una espera en curso.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct AsyncJob {
    service: Arc<dyn TapService>,
    query: String,
    policy: PollPolicy,
    cancel: CancellationToken,
    job: Option<JobRef>,
    phase: Option<JobPhase>,
}

impl AsyncJob {
    /// Falla sin tocar la red si la consulta está vacía.
    pub fn new(service: Arc<dyn TapService>, query: &str) -> Result<Self> {
        if query.trim().is_empty() {
            return Err(TapError::EmptyQuery);
        }
        Ok(AsyncJob { service,
                      query: query.to_string(),
                      policy: PollPolicy::default(),
                      cancel: CancellationToken::new(),
                      job: None,
                      phase: None })
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn job(&self) -> Option<&JobRef> {
        self.job.as_ref()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job.as_ref().map(JobRef::id)
    }

    /// Última fase observada.
    pub fn phase(&self) -> Option<JobPhase> {
        self.phase
    }

    fn job_ref(&self) -> Result<&JobRef> {
        self.job.as_ref().ok_or(TapError::NotSubmitted)
    }

    fn job_label(&self) -> String {
        self.job_id().unwrap_or("<unsubmitted>").to_string()
    }

    pub fn submit(&mut self) -> Result<&JobRef> {
        let job = self.service.submit(&self.query)?;
        info!("submitted ADQL job {}", job.id());
        self.phase = Some(JobPhase::Pending);
        Ok(self.job.insert(job))
    }

    pub fn start(&mut self) -> Result<()> {
        let job = self.job_ref()?.clone();
        self.service.start(&job)?;
        debug!("job {} started", job.id());
        Ok(())
    }

    /// Consulta la fase hasta que sea terminal, el tiempo límite venza o se
    /// cancele la espera. En los dos últimos casos el job se aborta.
    pub fn wait(&mut self) -> Result<JobPhase> {
        let job = self.job_ref()?.clone();
        let started = Instant::now();
        let mut interval = self.policy.interval;
        loop {
            let phase = self.service.phase(&job)?;
            self.phase = Some(phase);
            debug!("job {} phase {}", job.id(), phase);
            if phase.is_terminal() {
                return Ok(phase);
            }
            if started.elapsed() >= self.policy.timeout {
                self.abort_quietly(&job);
                return Err(TapError::Timeout { job_id: job.id().to_string(),
                                               timeout: self.policy.timeout });
            }
            if !self.sleep(interval) {
                self.abort_quietly(&job);
                return Err(TapError::Cancelled { job_id: job.id().to_string() });
            }
            interval = self.policy.next_interval(interval);
        }
    }

    /// Duerme `total` en tramos cortos; `false` si se canceló entretanto.
    fn sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }

    fn abort_quietly(&self, job: &JobRef) {
        if let Err(e) = self.service.abort(job) {
            warn!("could not abort job {}: {e}", job.id());
        }
    }

    /// Convierte una fase final distinta de `COMPLETED` en error.
    pub fn raise_if_error(&self) -> Result<()> {
        match self.phase {
            Some(JobPhase::Completed) => Ok(()),
            Some(JobPhase::Error) => {
                let job = self.job_ref()?;
                let message = self.service.error(job).unwrap_or_else(|e| {
                                                         warn!("could not fetch error document of job {}: {e}", job.id());
                                                         "unknown error".to_string()
                                                     });
                Err(TapError::JobFailed { job_id: job.id().to_string(),
                                          message })
            }
            Some(JobPhase::Aborted) => Err(TapError::JobAborted { job_id: self.job_label() }),
            Some(other) => Err(TapError::NoResult { job_id: self.job_label(),
                                                    phase: other.to_string() }),
            None => Err(TapError::NotSubmitted),
        }
    }

    /// submit + start + wait + raise_if_error.
    pub fn run(&mut self) -> Result<()> {
        self.submit()?;
        self.start()?;
        self.wait()?;
        self.raise_if_error()
    }

    /// Bytes del resultado tal cual los entrega el servicio.
    pub fn open_result(&self) -> Result<Vec<u8>> {
        let job = self.job_ref()?;
        if self.phase != Some(JobPhase::Completed) {
            return Err(TapError::NoResult { job_id: job.id().to_string(),
                                            phase: self.phase.map(|p| p.to_string()).unwrap_or_default() });
        }
        self.service.result(job)
    }

    /// Borra el job en el servicio. Sin job creado no hace nada.
    pub fn delete(&mut self) -> Result<()> {
        if let Some(job) = self.job.take() {
            self.service.delete(&job)?;
            info!("deleted job {}", job.id());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedTapService;

    fn fast() -> PollPolicy {
        PollPolicy { interval: Duration::ZERO,
                     backoff: 2.0,
                     max_interval: Duration::ZERO,
                     timeout: Duration::from_secs(5) }
    }

    #[test]
    fn empty_query_fails_without_calls() {
        let svc = Arc::new(ScriptedTapService::new(b"x".to_vec()));
        assert!(matches!(AsyncJob::new(svc.clone(), "   "), Err(TapError::EmptyQuery)));
        assert!(svc.calls().is_empty());
    }

    #[test]
    fn run_polls_until_completed_then_reads_result() {
        let svc = Arc::new(ScriptedTapService::new(b"<VOTABLE/>".to_vec()).with_phases(&[JobPhase::Queued,
                                                                                      JobPhase::Executing,
                                                                                      JobPhase::Completed]));
        let mut job = AsyncJob::new(svc.clone(), "SELECT 1").unwrap().with_policy(fast());
        job.run().unwrap();
        assert_eq!(job.phase(), Some(JobPhase::Completed));
        assert_eq!(job.open_result().unwrap(), b"<VOTABLE/>");
        job.delete().unwrap();
        assert_eq!(svc.calls(),
                   vec!["submit", "start", "phase", "phase", "phase", "result", "delete"]);
        assert!(job.job().is_none());
    }

    #[test]
    fn error_phase_surfaces_service_message() {
        let svc = Arc::new(ScriptedTapService::new(Vec::new()).with_phases(&[JobPhase::Error])
                                                              .with_error("syntax error near FROM"));
        let mut job = AsyncJob::new(svc.clone(), "SELEC").unwrap().with_policy(fast());
        let err = job.run().unwrap_err();
        assert!(matches!(err, TapError::JobFailed { ref message, .. } if message == "syntax error near FROM"));
        assert!(job.open_result().is_err());
    }

    #[test]
    fn timeout_aborts_the_job() {
        let svc = Arc::new(ScriptedTapService::new(Vec::new()).with_phases(&[JobPhase::Executing]));
        let policy = PollPolicy { timeout: Duration::ZERO,
                                  ..fast() };
        let mut job = AsyncJob::new(svc.clone(), "SELECT 1").unwrap().with_policy(policy);
        assert!(matches!(job.run(), Err(TapError::Timeout { .. })));
        assert_eq!(svc.calls().last().map(String::as_str), Some("abort"));
    }

    #[test]
    fn cancellation_interrupts_wait() {
        let svc = Arc::new(ScriptedTapService::new(Vec::new()).with_phases(&[JobPhase::Queued]));
        let token = CancellationToken::new();
        token.cancel();
        let policy = PollPolicy { interval: Duration::from_secs(60),
                                  max_interval: Duration::from_secs(60),
                                  ..fast() };
        let mut job = AsyncJob::new(svc.clone(), "SELECT 1").unwrap()
                                                            .with_policy(policy)
                                                            .with_cancellation(token);
        assert!(matches!(job.run(), Err(TapError::Cancelled { .. })));
        assert!(svc.calls().contains(&"abort".to_string()));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = PollPolicy { interval: Duration::from_secs(1),
                                  backoff: 3.0,
                                  max_interval: Duration::from_secs(5),
                                  timeout: Duration::from_secs(60) };
        let second = policy.next_interval(policy.interval);
        assert_eq!(second, Duration::from_secs(3));
        assert_eq!(policy.next_interval(second), Duration::from_secs(5));
    }
}
