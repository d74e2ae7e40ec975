//! Tipos de evento del flujo y estructura `FlowEvent`.
//!
//! Cada ejecución del `FlowEngine` emite eventos a un `EventStore`
//! append-only; el `FlowRepository` reconstruye el estado por replay.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreEngineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowEventKind {
    /// Primer evento de un `flow_id`: fija `definition_hash` y cantidad de steps.
    FlowInitialized { definition_hash: String, step_count: usize },
    /// Un step comenzó su ejecución. No implica éxito.
    StepStarted { step_index: usize, step_id: String },
    /// Un step terminó correctamente con sus outputs (hashes) y fingerprint.
    StepFinished {
        step_index: usize,
        step_id: String,
        outputs: Vec<String>,
        fingerprint: String,
    },
    /// Error terminal: el flujo no continúa (stop-on-failure).
    StepFailed {
        step_index: usize,
        step_id: String,
        error: CoreEngineError,
        fingerprint: String,
    },
    /// Hito ligero emitido por un step.
    StepSignal {
        step_index: usize,
        step_id: String,
        signal: String,
        data: serde_json::Value,
    },
    /// Cierre con fingerprint agregado del flow.
    FlowCompleted { flow_fingerprint: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    pub seq: u64,
    pub flow_id: Uuid,
    pub kind: FlowEventKind,
    pub ts: DateTime<Utc>, // metadato (no entra en fingerprint)
}
