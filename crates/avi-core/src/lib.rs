//! avi-core: motor lineal determinista para pipelines AVI.
//!
//! Un pipeline es una cadena de steps tipados; cada step consume el artifact
//! del anterior y produce el suyo. El engine registra eventos append-only y
//! calcula fingerprints reproducibles sobre JSON canónico.
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod repo;
pub mod step;

pub use engine::FlowEngine;
pub use errors::CoreEngineError;
pub use event::{EventStore, FlowEvent, FlowEventKind, InMemoryEventStore};
pub use model::{Artifact, ArtifactKind, ArtifactSpec};
pub use repo::{build_flow_definition, FlowDefinition, FlowRepository, InMemoryFlowRepository};
pub use step::{Pipe, SameAs, StepDefinition, StepKind, StepRunResult, StepRunResultTyped, StepSignal, StepStatus, TypedStep};
