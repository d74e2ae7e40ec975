//! Modelos neutrales (Artifact, ExecutionContext, artifacts tipados).

pub mod artifact;
pub mod context;
pub mod typed_artifact;

pub use artifact::{Artifact, ArtifactKind};
pub use context::ExecutionContext;
pub use typed_artifact::{ArtifactError, ArtifactSpec, TypedArtifact};
