//! Step de consulta remota: ejecuta la consulta ADQL como job TAP asíncrono
//! y guarda el VOTable resultante byte a byte.

use avi_core::step::{StepKind, StepRunResultTyped, StepSignal, TypedStep};
use avi_tap::{AsyncJob, CancellationToken, TapService};
use log::{info, warn};
use serde_json::json;
use std::sync::Arc;

use super::TaskParams;
use crate::artifacts::{PlaceholderArtifact, VoTableArtifact};
use crate::config::AviConfig;
use crate::error::AviError;
use crate::fsio::{path_string, read, sha256_hex, write_atomic};

pub const SIGNAL_JOB_COMPLETED: &str = "TAP_JOB_COMPLETED";

#[derive(Debug, Clone)]
pub struct DownloadDataStep {
    config: AviConfig,
    params: TaskParams,
    service: Arc<dyn TapService>,
    cancel: CancellationToken,
}

impl DownloadDataStep {
    pub fn new(config: AviConfig, params: TaskParams, service: Arc<dyn TapService>) -> Self {
        Self { config,
               params,
               service,
               cancel: CancellationToken::new() }
    }

    /// Token para interrumpir la espera del job desde otro hilo.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn execute(&self, params: &TaskParams) -> Result<(VoTableArtifact, Option<StepSignal>), AviError> {
        // validación antes de cualquier llamada de red
        let query = params.require_query()?;
        let name = params.require_output_file()?;
        let path = self.config.download_output(name);

        if path.exists() && !self.config.force {
            info!("query result {} already exists, skipping", path.display());
            let bytes = read(&path)?;
            return Ok((VoTableArtifact { path: path_string(&path),
                                         size_bytes: bytes.len() as u64,
                                         sha256: sha256_hex(&bytes),
                                         job_id: None,
                                         schema_version: 1 },
                       None));
        }

        let mut job = AsyncJob::new(self.service.clone(), query)?.with_policy(self.config.poll.clone())
                                                                 .with_cancellation(self.cancel.clone());
        let outcome = job.run()
                         .and_then(|_| job.open_result())
                         .map_err(AviError::from)
                         .and_then(|bytes| write_atomic(&path, &bytes).map(|_| bytes));
        let job_id = job.job_id().map(str::to_string);
        let phase = job.phase().map(|p| p.to_string());

        // el job se borra tanto si hubo éxito como si no
        if let Err(e) = job.delete() {
            warn!("could not delete job {}: {e}", job_id.as_deref().unwrap_or("?"));
        }
        let bytes = outcome?;
        info!("saved {} bytes of query result to {}", bytes.len(), path.display());

        let artifact = VoTableArtifact { path: path_string(&path),
                                         size_bytes: bytes.len() as u64,
                                         sha256: sha256_hex(&bytes),
                                         job_id: job_id.clone(),
                                         schema_version: 1 };
        let signal = StepSignal { signal: SIGNAL_JOB_COMPLETED.into(),
                                  data: json!({
                                      "job_id": job_id,
                                      "phase": phase,
                                      "size_bytes": artifact.size_bytes,
                                  }) };
        Ok((artifact, Some(signal)))
    }
}

impl TypedStep for DownloadDataStep {
    type Params = TaskParams;
    type Input = PlaceholderArtifact;
    type Output = VoTableArtifact;

    fn id(&self) -> &'static str {
        "download_data"
    }

    fn kind(&self) -> StepKind {
        StepKind::Transform
    }

    fn params_default(&self) -> Self::Params {
        self.params.clone()
    }

    fn run_typed(&self, _input: Option<Self::Input>, params: Self::Params) -> StepRunResultTyped<Self::Output> {
        match self.execute(&params) {
            Ok((artifact, Some(signal))) => StepRunResultTyped::SuccessWithSignals { outputs: vec![artifact],
                                                                                    signals: vec![signal] },
            Ok((artifact, None)) => StepRunResultTyped::Success { outputs: vec![artifact] },
            Err(e) => StepRunResultTyped::Failure { error: e.into_core(self.id()) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avi_tap::mock::ScriptedTapService;
    use avi_tap::{JobPhase, PollPolicy};
    use std::time::Duration;

    const VOTABLE: &[u8] = b"<?xml version=\"1.0\"?>\r\n<VOTABLE>\xc3\xa9</VOTABLE>\n";

    fn config(dir: &std::path::Path) -> AviConfig {
        AviConfig { poll: PollPolicy { interval: Duration::ZERO,
                                       backoff: 1.0,
                                       max_interval: Duration::ZERO,
                                       timeout: Duration::from_secs(5) },
                    ..AviConfig::default().with_output_path(dir) }
    }

    #[test]
    fn result_bytes_are_saved_verbatim_and_job_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let svc = Arc::new(ScriptedTapService::new(VOTABLE.to_vec()));
        let step = DownloadDataStep::new(config(dir.path()), TaskParams::new("SELECT 1", "run1"), svc.clone());
        let (artifact, signal) = step.execute(&step.params).unwrap();

        assert_eq!(std::fs::read(dir.path().join("simulatedData_run1.vot")).unwrap(), VOTABLE);
        assert_eq!(artifact.size_bytes, VOTABLE.len() as u64);
        assert_eq!(artifact.job_id.as_deref(), Some("job-1"));
        assert_eq!(signal.unwrap().data["phase"], "COMPLETED");
        assert_eq!(svc.calls().last().map(String::as_str), Some("delete"));
    }

    #[test]
    fn blank_query_fails_before_any_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let svc = Arc::new(ScriptedTapService::new(VOTABLE.to_vec()));
        let step = DownloadDataStep::new(config(dir.path()), TaskParams::new(" \n", "run1"), svc.clone());
        assert!(matches!(step.execute(&step.params), Err(AviError::MissingParameter("query"))));
        assert!(svc.calls().is_empty());
    }

    #[test]
    fn failed_job_is_deleted_and_nothing_written() {
        let dir = tempfile::tempdir().unwrap();
        let svc = Arc::new(ScriptedTapService::new(Vec::new()).with_phases(&[JobPhase::Executing, JobPhase::Error])
                                                              .with_error("table not found"));
        let step = DownloadDataStep::new(config(dir.path()), TaskParams::new("SELECT * FROM nope", "run1"), svc.clone());
        let err = step.execute(&step.params).unwrap_err();
        assert!(err.to_string().contains("table not found"));
        assert!(!dir.path().join("simulatedData_run1.vot").exists());
        assert_eq!(svc.calls(), vec!["submit", "start", "phase", "phase", "error", "delete"]);
    }

    #[test]
    fn existing_result_skips_the_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("simulatedData_run1.vot"), VOTABLE).unwrap();
        let svc = Arc::new(ScriptedTapService::new(Vec::new()));
        let step = DownloadDataStep::new(config(dir.path()), TaskParams::new("SELECT 1", "run1"), svc.clone());
        let (artifact, signal) = step.execute(&step.params).unwrap();
        assert!(signal.is_none());
        assert_eq!(artifact.job_id, None);
        assert_eq!(artifact.sha256, sha256_hex(VOTABLE));
        assert!(svc.calls().is_empty());
    }
}
