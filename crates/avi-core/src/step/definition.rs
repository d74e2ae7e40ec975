use serde_json::{json, Value};

use super::run_result::StepRunResult;
use crate::model::ExecutionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind { Source, Transform, Sink, Check }

/// Trait que define un Step. El engine sólo conoce esta interfaz neutral.
pub trait StepDefinition {
    /// Identificador estable y único dentro del Flow.
    fn id(&self) -> &str;

    /// Nombre opcional amigable.
    fn name(&self) -> &str { self.id() }

    /// Parámetros base deterministas.
    fn base_params(&self) -> Value;

    /// Ejecución del step usando únicamente input + params.
    fn run(&self, ctx: &ExecutionContext) -> StepRunResult;

    /// Tipo general del step.
    fn kind(&self) -> StepKind;

    /// Hash de la definición (id, kind y parámetros base).
    fn definition_hash(&self) -> String {
        crate::hashing::hash_value(&json!({
            "id": self.id(),
            "kind": format!("{:?}", self.kind()),
            "base_params": self.base_params(),
        }))
    }
}
