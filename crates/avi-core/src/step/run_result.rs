use serde_json::Value;

use crate::{errors::CoreEngineError, model::Artifact};

/// Señal ligera emitida por un step; se registra como evento y no altera el estado.
#[derive(Debug, Clone)]
pub struct StepSignal {
    pub signal: String,
    pub data: Value,
}

/// Resultado abstracto de ejecutar un step.
pub enum StepRunResult {
    Success { outputs: Vec<Artifact> },
    SuccessWithSignals { outputs: Vec<Artifact>, signals: Vec<StepSignal> },
    Failure { error: CoreEngineError },
}
