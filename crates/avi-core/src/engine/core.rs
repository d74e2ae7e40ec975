//! Core FlowEngine implementation

use crate::engine::EngineBuilderInit;
use crate::errors::CoreEngineError;
use crate::event::{EventStore, FlowEvent, FlowEventKind};
use crate::hashing::hash_value;
use crate::model::{Artifact, ExecutionContext};
use crate::repo::{FlowDefinition, FlowRepository};
use crate::step::{StepKind, StepRunResult, StepSignal};
use crate::StepDefinition;
use log::{debug, info, warn};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Motor de ejecución de flujos lineales deterministas.
///
/// Orquesta la ejecución de pasos en orden, encadena el primer output de cada
/// paso como input del siguiente y registra todo en el `EventStore`. Un fallo
/// detiene el flujo (stop-on-failure); no hay reintentos.
#[derive(Debug)]
pub struct FlowEngine<E, R>
    where E: EventStore,
          R: FlowRepository
{
    event_store: E,
    repository: R,
    artifact_store: HashMap<String, Artifact>,
    default_flow_id: Option<Uuid>,
    default_definition: Option<FlowDefinition>,
}

impl<E, R> FlowEngine<E, R>
    where E: EventStore,
          R: FlowRepository
{
    /// Crea un nuevo builder con stores propios
    #[inline]
    pub fn builder(event_store: E, repository: R) -> EngineBuilderInit<E, R> {
        EngineBuilderInit { event_store, repository }
    }

    pub fn new_with_stores(event_store: E, repository: R) -> Self {
        Self { event_store,
               repository,
               artifact_store: HashMap::new(),
               default_flow_id: None,
               default_definition: None }
    }

    pub fn event_store(&self) -> &E {
        &self.event_store
    }

    /// Recupera un artifact por su hash
    pub fn get_artifact(&self, hash: &str) -> Option<&Artifact> {
        self.artifact_store.get(hash)
    }

    pub fn store_artifact(&mut self, artifact: Artifact) {
        self.artifact_store.insert(artifact.hash.clone(), artifact);
    }

    /// Garantiza un `FlowInitialized` y devuelve los eventos actuales del flujo.
    fn load_or_init(&mut self, flow_id: Uuid, definition: &FlowDefinition) -> Vec<FlowEvent> {
        let mut events = self.event_store.list(flow_id);
        let has_init = events.iter().any(|e| matches!(e.kind, FlowEventKind::FlowInitialized { .. }));
        if !has_init {
            debug!("flow {flow_id}: initialized with steps {:?}", definition.step_ids());
            let ev = self.event_store
                         .append_kind(flow_id,
                                      FlowEventKind::FlowInitialized { definition_hash: definition.definition_hash.clone(),
                                                                       step_count: definition.len() });
            events.push(ev);
        }
        events
    }

    /// Define/genera un `flow_id` por defecto si no existe aún y lo retorna.
    pub fn ensure_default_flow_id(&mut self) -> Uuid {
        *self.default_flow_id.get_or_insert_with(Uuid::new_v4)
    }

    pub fn set_default_flow_id(&mut self, flow_id: Uuid) {
        self.default_flow_id = Some(flow_id);
    }

    pub fn default_flow_id(&self) -> Option<Uuid> {
        self.default_flow_id
    }

    pub fn set_default_definition(&mut self, definition: FlowDefinition) {
        self.default_definition = Some(definition);
    }

    pub fn default_definition(&self) -> Option<&FlowDefinition> {
        self.default_definition.as_ref()
    }

    fn hash_and_store_outputs(&mut self, outputs: &mut [Artifact]) -> Vec<String> {
        let mut hashes: Vec<String> = Vec::with_capacity(outputs.len());
        for o in outputs.iter_mut() {
            let h = hash_value(&o.payload);
            o.hash = h.clone();
            self.store_artifact(o.clone());
            hashes.push(h);
        }
        hashes
    }

    /// Ejecuta el flujo por defecto completo y retorna su ID.
    pub fn run(&mut self) -> Result<Uuid, CoreEngineError> {
        self.run_to_completion()
    }

    /// Avanza un paso en el flujo por defecto.
    pub fn step(&mut self) -> Result<(), CoreEngineError> {
        self.next()
    }

    pub fn run_to_completion(&mut self) -> Result<Uuid, CoreEngineError> {
        let flow_id = self.ensure_default_flow_id();
        let def = self.default_definition
                      .take()
                      .ok_or_else(|| CoreEngineError::Internal("no default definition configured".into()))?;

        let result = self.run_flow_to_completion(flow_id, &def);
        self.default_definition = Some(def);
        result
    }

    /// Ejecuta un flujo específico hasta su finalización.
    pub fn run_flow_to_completion(&mut self, flow_id: Uuid, definition: &FlowDefinition) -> Result<Uuid, CoreEngineError> {
        loop {
            match self.next_with(flow_id, definition) {
                Ok(()) => continue,
                Err(CoreEngineError::FlowCompleted) => return Ok(flow_id),
                Err(e) => return Err(e),
            }
        }
    }

    /// Ejecuta el siguiente paso pendiente del flujo.
    pub(crate) fn next_with(&mut self, flow_id: Uuid, definition: &FlowDefinition) -> Result<(), CoreEngineError> {
        let events = self.load_or_init(flow_id, definition);
        let instance = self.repository.load(flow_id, &events, definition);

        if instance.completed {
            return Err(CoreEngineError::FlowCompleted);
        }
        if instance.has_failed() {
            return Err(CoreEngineError::FlowHasFailed);
        }

        let cursor = instance.cursor;
        if cursor >= definition.len() {
            return Err(CoreEngineError::FlowCompleted);
        }

        let step_def = definition.steps[cursor].as_ref();
        if cursor == 0 && step_def.kind() != StepKind::Source {
            return Err(CoreEngineError::FirstStepMustBeSource);
        }

        let input = if cursor == 0 {
            None
        } else {
            let prev = instance.steps
                               .get(cursor - 1)
                               .and_then(|s| s.outputs.first())
                               .and_then(|h| self.artifact_store.get(h).cloned());
            if prev.is_none() {
                return Err(CoreEngineError::MissingInputs);
            }
            prev
        };

        let ctx = ExecutionContext { input,
                                     params: step_def.base_params() };

        info!("flow {flow_id}: running step {} ({}/{})", step_def.id(), cursor + 1, definition.len());
        self.event_store
            .append_kind(flow_id,
                         FlowEventKind::StepStarted { step_index: cursor,
                                                      step_id: step_def.id().to_string() });

        match step_def.run(&ctx) {
            StepRunResult::Success { outputs } => self.handle_step_success(flow_id, cursor, step_def, outputs, vec![], definition),
            StepRunResult::SuccessWithSignals { outputs, signals } => {
                self.handle_step_success(flow_id, cursor, step_def, outputs, signals, definition)
            }
            StepRunResult::Failure { error } => self.handle_step_failure(flow_id, cursor, step_def, error),
        }
    }

    fn handle_step_success(&mut self,
                           flow_id: Uuid,
                           cursor: usize,
                           step_def: &dyn StepDefinition,
                           mut outputs: Vec<Artifact>,
                           signals: Vec<StepSignal>,
                           definition: &FlowDefinition)
                           -> Result<(), CoreEngineError> {
        let output_hashes = self.hash_and_store_outputs(&mut outputs);

        for s in signals {
            debug!("flow {flow_id}: step {} signal {}", step_def.id(), s.signal);
            self.event_store.append_kind(flow_id,
                                         FlowEventKind::StepSignal { step_index: cursor,
                                                                     step_id: step_def.id().to_string(),
                                                                     signal: s.signal,
                                                                     data: s.data });
        }

        let fp = self.calculate_step_fingerprint(cursor, step_def, &output_hashes, definition);
        self.event_store.append_kind(flow_id,
                                     FlowEventKind::StepFinished { step_index: cursor,
                                                                   step_id: step_def.id().to_string(),
                                                                   outputs: output_hashes,
                                                                   fingerprint: fp });

        if cursor + 1 == definition.len() {
            self.complete_flow(flow_id, definition);
        }
        Ok(())
    }

    fn handle_step_failure(&mut self,
                           flow_id: Uuid,
                           cursor: usize,
                           step_def: &dyn StepDefinition,
                           error: CoreEngineError)
                           -> Result<(), CoreEngineError> {
        warn!("flow {flow_id}: step {} failed: {error}", step_def.id());
        let fp = hash_value(&json!({
            "engine_version": crate::constants::ENGINE_VERSION,
            "definition_hash": step_def.definition_hash(),
            "step_index": cursor,
            "params": step_def.base_params()
        }));

        self.event_store.append_kind(flow_id,
                                     FlowEventKind::StepFailed { step_index: cursor,
                                                                 step_id: step_def.id().to_string(),
                                                                 error: error.clone(),
                                                                 fingerprint: fp });
        Err(error)
    }

    fn calculate_step_fingerprint(&self,
                                  cursor: usize,
                                  step_def: &dyn StepDefinition,
                                  output_hashes: &[String],
                                  definition: &FlowDefinition)
                                  -> String {
        hash_value(&json!({
            "engine_version": crate::constants::ENGINE_VERSION,
            "definition_hash": definition.definition_hash,
            "step_index": cursor,
            "output_hashes": output_hashes,
            "params": step_def.base_params()
        }))
    }

    fn complete_flow(&mut self, flow_id: Uuid, definition: &FlowDefinition) {
        let step_fps: Vec<String> = self.event_store
                                        .list(flow_id)
                                        .iter()
                                        .filter_map(|e| match &e.kind {
                                            FlowEventKind::StepFinished { fingerprint, .. } => Some(fingerprint.clone()),
                                            _ => None,
                                        })
                                        .collect();

        let flow_fp = hash_value(&json!({
                                     "engine_version": crate::constants::ENGINE_VERSION,
                                     "definition_hash": definition.definition_hash,
                                     "step_fingerprints": step_fps
                                 }));
        info!("flow {flow_id}: completed ({flow_fp})");
        self.event_store
            .append_kind(flow_id, FlowEventKind::FlowCompleted { flow_fingerprint: flow_fp });
    }

    pub fn next(&mut self) -> Result<(), CoreEngineError> {
        let flow_id = self.ensure_default_flow_id();
        let def = self.default_definition
                      .take()
                      .ok_or_else(|| CoreEngineError::Internal("no default definition configured".into()))?;
        let result = self.next_with(flow_id, &def);
        self.default_definition = Some(def);
        result
    }

    pub fn events_for(&self, flow_id: Uuid) -> Vec<FlowEvent> {
        self.event_store.list(flow_id)
    }

    /// Eventos del flujo por defecto
    pub fn events(&self) -> Option<Vec<FlowEvent>> {
        self.default_flow_id.map(|fid| self.event_store.list(fid))
    }

    /// Variante compacta de eventos para el flujo por defecto
    pub fn event_variants(&self) -> Option<Vec<&'static str>> {
        self.events().map(|events| events.iter().map(|e| event_variant(&e.kind)).collect())
    }

    /// Fingerprint del flujo por defecto si está completado
    pub fn flow_fingerprint(&self) -> Option<String> {
        self.events()?.iter().rev().find_map(|e| match &e.kind {
                                       FlowEventKind::FlowCompleted { flow_fingerprint } => Some(flow_fingerprint.clone()),
                                       _ => None,
                                   })
    }

    /// Primer output del último step terminado de `flow_id`.
    pub fn last_output(&self, flow_id: Uuid) -> Option<&Artifact> {
        self.event_store
            .list(flow_id)
            .iter()
            .rev()
            .find_map(|e| match &e.kind {
                FlowEventKind::StepFinished { outputs, .. } => outputs.first().cloned(),
                _ => None,
            })
            .and_then(|h| self.artifact_store.get(&h))
    }
}

/// Letra de una variante: I S F X G C.
pub fn event_variant(kind: &FlowEventKind) -> &'static str {
    match kind {
        FlowEventKind::FlowInitialized { .. } => "I",
        FlowEventKind::StepStarted { .. } => "S",
        FlowEventKind::StepFinished { .. } => "F",
        FlowEventKind::StepFailed { .. } => "X",
        FlowEventKind::StepSignal { .. } => "G",
        FlowEventKind::FlowCompleted { .. } => "C",
    }
}

impl FlowEngine<crate::event::InMemoryEventStore, crate::repo::InMemoryFlowRepository> {
    /// Crea un nuevo builder con stores en memoria
    #[inline]
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> EngineBuilderInit<crate::event::InMemoryEventStore, crate::repo::InMemoryFlowRepository> {
        EngineBuilderInit { event_store: crate::event::InMemoryEventStore::default(),
                            repository: crate::repo::InMemoryFlowRepository::new() }
    }
}

impl Default for FlowEngine<crate::event::InMemoryEventStore, crate::repo::InMemoryFlowRepository> {
    fn default() -> Self {
        Self::new_with_stores(crate::event::InMemoryEventStore::default(),
                              crate::repo::InMemoryFlowRepository::new())
    }
}
