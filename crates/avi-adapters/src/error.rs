use avi_core::CoreEngineError;
use avi_domain::{AnalysisError, VoTableError};
use avi_tap::TapError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AviError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("invalid value '{value}' for {var}")]
    Config { var: &'static str, value: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("remote query failed: {0}")]
    Tap(#[from] TapError),
    #[error("cannot read table: {0}")]
    Table(#[from] VoTableError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl AviError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        AviError::Io { path: path.into(),
                       source }
    }

    /// Error del engine atribuido a `step_id`. Los parámetros ausentes
    /// conservan su variante propia.
    pub fn into_core(self, step_id: &str) -> CoreEngineError {
        match self {
            AviError::MissingParameter(p) => CoreEngineError::MissingParameter(p.to_string()),
            other => CoreEngineError::step_failed(step_id, other),
        }
    }
}
