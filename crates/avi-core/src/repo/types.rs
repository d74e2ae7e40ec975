//! Tipos de repositorio: estado reconstruido (`FlowInstance`) y definición
//! (`FlowDefinition`).
//!
//! El repositorio aplica un replay lineal: consume eventos en orden y
//! actualiza un `FlowInstance`. Sólo guarda hashes de outputs; los artifacts
//! completos viven en el engine.
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::event::{FlowEvent, FlowEventKind};
use crate::step::{StepDefinition, StepStatus};

pub struct FlowInstance {
    pub id: Uuid,
    pub steps: Vec<StepSlot>,
    pub cursor: usize,
    pub completed: bool,
}

impl FlowInstance {
    /// Hay algún step en estado `Failed`.
    pub fn has_failed(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}

/// Estado de un step en la instancia.
pub struct StepSlot {
    pub step_id: String,
    pub status: StepStatus,
    pub fingerprint: Option<String>,
    pub outputs: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

/// Reconstruye (`replay`) el estado de un flow a partir de eventos.
pub trait FlowRepository {
    fn load(&self, flow_id: Uuid, events: &[FlowEvent], definition: &FlowDefinition) -> FlowInstance;
}

/// Definición inmutable del Flow.
pub struct FlowDefinition {
    pub steps: Vec<Box<dyn StepDefinition>>,
    pub definition_hash: String,
}

impl std::fmt::Debug for FlowDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.steps.iter().map(|s| s.id()).collect();
        f.debug_struct("FlowDefinition")
         .field("steps", &ids)
         .field("definition_hash", &self.definition_hash)
         .finish()
    }
}

impl FlowDefinition {
    pub fn new(steps: Vec<Box<dyn StepDefinition>>, definition_hash: String) -> Self {
        Self { steps, definition_hash }
    }
    pub fn len(&self) -> usize {
        self.steps.len()
    }
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id()).collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryFlowRepository;

impl InMemoryFlowRepository {
    pub fn new() -> Self {
        Self
    }
}

impl FlowRepository for InMemoryFlowRepository {
    fn load(&self, flow_id: Uuid, events: &[FlowEvent], definition: &FlowDefinition) -> FlowInstance {
        let mut steps: Vec<StepSlot> = definition.steps
                                                 .iter()
                                                 .map(|s| StepSlot { step_id: s.id().to_string(),
                                                                     status: StepStatus::Pending,
                                                                     fingerprint: None,
                                                                     outputs: vec![],
                                                                     started_at: None,
                                                                     finished_at: None,
                                                                     attempts: 0 })
                                                 .collect();
        let mut completed = false;
        for ev in events {
            match &ev.kind {
                FlowEventKind::FlowInitialized { .. } | FlowEventKind::StepSignal { .. } => {}
                FlowEventKind::StepStarted { step_index, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Running;
                        slot.started_at = Some(ev.ts);
                        slot.attempts += 1;
                    }
                }
                FlowEventKind::StepFinished { step_index,
                                              fingerprint,
                                              outputs,
                                              .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::FinishedOk;
                        slot.fingerprint = Some(fingerprint.clone());
                        slot.outputs = outputs.clone();
                        slot.finished_at = Some(ev.ts);
                    }
                }
                FlowEventKind::StepFailed { step_index, fingerprint, .. } => {
                    if let Some(slot) = steps.get_mut(*step_index) {
                        slot.status = StepStatus::Failed;
                        slot.fingerprint = Some(fingerprint.clone());
                        slot.finished_at = Some(ev.ts);
                    }
                }
                FlowEventKind::FlowCompleted { .. } => completed = true,
            }
        }
        let cursor = steps.iter()
                          .position(|s| matches!(s.status, StepStatus::Pending))
                          .unwrap_or(steps.len());
        FlowInstance { id: flow_id,
                       steps,
                       cursor,
                       completed }
    }
}

/// Construye la definición a partir de los steps en orden. El hash combina
/// los ids y el `definition_hash` de cada step (que incluye sus params), de
/// modo que cambiar la query o el fichero de salida cambia la definición.
pub fn build_flow_definition(steps: Vec<Box<dyn StepDefinition>>) -> FlowDefinition {
    let parts: Vec<serde_json::Value> = steps.iter()
                                             .map(|s| json!({ "id": s.id(), "hash": s.definition_hash() }))
                                             .collect();
    let definition_hash = crate::hashing::hash_value(&json!(parts));
    FlowDefinition::new(steps, definition_hash)
}
