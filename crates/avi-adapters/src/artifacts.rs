//! Artifacts que fluyen entre los steps del pipeline.
//!
//! Todos referencian un fichero en disco (`ArtifactKind::FileReference`); el
//! payload sólo lleva metadatos deterministas para que el fingerprint del
//! flujo sea reproducible.

use avi_core::model::ArtifactKind;
use avi_core::typed_artifact;
use avi_domain::AnalysisContext;

typed_artifact!(PlaceholderArtifact { path: String, marker: String } kind: ArtifactKind::FileReference);

// job_id es None cuando el fichero ya existía y no se lanzó consulta.
typed_artifact!(VoTableArtifact {
    path: String,
    size_bytes: u64,
    sha256: String,
    job_id: Option<String>,
} kind: ArtifactKind::FileReference);

typed_artifact!(AnalysisArtifact {
    path: String,
    n_points: usize,
    columns: Vec<String>,
    analysis: AnalysisContext,
} kind: ArtifactKind::FileReference);
