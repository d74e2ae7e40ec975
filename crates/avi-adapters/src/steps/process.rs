//! Step final: analiza el VOTable descargado y escribe la figura como JSON.

use avi_core::step::{StepKind, StepRunResultTyped, StepSignal, TypedStep};
use avi_domain::{analyze, VoTable};
use log::{debug, info};
use serde_json::json;
use std::path::Path;

use super::TaskParams;
use crate::artifacts::{AnalysisArtifact, VoTableArtifact};
use crate::config::AviConfig;
use crate::error::AviError;
use crate::fsio::{path_string, write_atomic};

pub const SIGNAL_ANALYSIS_READY: &str = "ANALYSIS_READY";

#[derive(Debug, Clone)]
pub struct ProcessDataStep {
    config: AviConfig,
    params: TaskParams,
}

impl ProcessDataStep {
    pub fn new(config: AviConfig, params: TaskParams) -> Self {
        Self { config, params }
    }

    /// Análisis de un VOTable local; la salida se escribe en `output` sólo si
    /// todo el análisis tuvo éxito.
    pub fn analyze_file(input: &Path, output: &Path) -> Result<(AnalysisArtifact, StepSignal), AviError> {
        info!("input VOTable file: {}", input.display());
        let table = VoTable::from_path(input)?;
        let out = analyze(&table)?;
        debug!("analysis_context {}", serde_json::to_string(&out.context)?);

        let figure = out.figure.to_json()?;
        write_atomic(output, &figure)?;
        info!("wrote figure for {} points to {}", out.n_points, output.display());

        let signal = StepSignal { signal: SIGNAL_ANALYSIS_READY.into(),
                                  data: json!({
                                      "n_points": out.n_points,
                                      "columns": out.columns,
                                      "figure_bytes": figure.len(),
                                  }) };
        let artifact = AnalysisArtifact { path: path_string(output),
                                          n_points: out.n_points,
                                          columns: out.columns,
                                          analysis: out.context,
                                          schema_version: 1 };
        Ok((artifact, signal))
    }

    fn execute(&self, input: Option<VoTableArtifact>, params: &TaskParams) -> Result<(AnalysisArtifact, StepSignal), AviError> {
        let name = params.require_output_file()?;
        let input_path = match input {
            Some(a) => a.path,
            None => path_string(&self.config.download_output(name)),
        };
        Self::analyze_file(Path::new(&input_path), &self.config.process_output(name))
    }
}

impl TypedStep for ProcessDataStep {
    type Params = TaskParams;
    type Input = VoTableArtifact;
    type Output = AnalysisArtifact;

    fn id(&self) -> &'static str {
        "process_data"
    }

    fn kind(&self) -> StepKind {
        StepKind::Sink
    }

    fn params_default(&self) -> Self::Params {
        self.params.clone()
    }

    fn run_typed(&self, input: Option<Self::Input>, params: Self::Params) -> StepRunResultTyped<Self::Output> {
        match self.execute(input, &params) {
            Ok((artifact, signal)) => StepRunResultTyped::SuccessWithSignals { outputs: vec![artifact],
                                                                              signals: vec![signal] },
            Err(e) => StepRunResultTyped::Failure { error: e.into_core(self.id()) },
        }
    }
}
