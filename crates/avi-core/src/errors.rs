//! Errores específicos del core.
//!
//! `CoreEngineError` viaja dentro de los eventos (`StepFailed`), por eso es
//! `Clone + Serialize` y sólo transporta mensajes en texto.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub enum CoreEngineError {
    #[error("flow already completed")] FlowCompleted,
    #[error("missing required inputs")] MissingInputs,
    #[error("first step must be source kind")] FirstStepMustBeSource,
    #[error("flow has failed previously (stop-on-failure invariant)")] FlowHasFailed,
    #[error("missing required parameter: {0}")] MissingParameter(String),
    #[error("artifact error: {0}")] Artifact(String),
    #[error("step '{step_id}' failed: {message}")] StepFailed { step_id: String, message: String },
    #[error("internal: {0}")] Internal(String),
}

impl CoreEngineError {
    /// Atajo para construir `StepFailed` desde cualquier error mostrable.
    pub fn step_failed(step_id: &str, err: impl std::fmt::Display) -> Self {
        Self::StepFailed { step_id: step_id.to_string(),
                           message: err.to_string() }
    }
}
