//! Artifact neutral del flujo.
//!
//! Un `Artifact` es la unidad de datos intercambiada entre steps:
//! - `payload` es JSON genérico; el motor no interpreta su semántica.
//! - `hash` lo calcula el engine sobre el JSON canonicalizado (ver
//!   `hashing::to_canonical_json`).
//! - `metadata` permite anotar información auxiliar que no entra al hash.
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tipos neutrales de artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JSON genérico sin semántica.
    GenericJson,
    /// Descriptor de un fichero producido por un step (ruta + resumen del contenido).
    FileReference,
}

/// Artifact neutral producido/consumido por Steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub hash: String,            // asignado por el engine
    pub payload: Value,
    pub metadata: Option<Value>, // no entra al hash
}

impl Artifact {
    /// Constructor interno; preferir `ArtifactSpec::into_artifact`.
    pub(crate) fn new_unhashed(kind: ArtifactKind, payload: Value, metadata: Option<Value>) -> Self {
        Self { kind,
               hash: String::new(),
               payload,
               metadata }
    }
}
