//! aviflow: pipeline AVI de ejemplo.
//!
//! Re-exporta los crates del workspace y ofrece `run_pipeline` para ejecutar
//! la cadena placeholder → consulta remota → análisis en una sola llamada.

pub use avi_adapters as adapters;
pub use avi_core as engine;
pub use avi_domain as domain;
pub use avi_tap as tap;

use avi_adapters::artifacts::AnalysisArtifact;
use avi_adapters::{AviConfig, AviPipeline, TaskParams};
use avi_core::{ArtifactSpec, CoreEngineError};
use avi_tap::TapService;
use log::info;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Resumen de una ejecución completa.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub flow_id: Uuid,
    pub flow_fingerprint: String,
    pub event_variants: Vec<&'static str>,
    pub analysis: AnalysisArtifact,
}

pub fn run_pipeline(config: &AviConfig,
                    params: &TaskParams,
                    service: Arc<dyn TapService>)
                    -> Result<PipelineReport, CoreEngineError> {
    let mut engine = AviPipeline::new(config, params, service).into_engine();
    let flow_id = engine.run()?;

    let flow_fingerprint = engine.flow_fingerprint()
                                 .ok_or_else(|| CoreEngineError::Internal("completed flow without fingerprint".into()))?;
    let last = engine.last_output(flow_id)
                     .ok_or_else(|| CoreEngineError::Internal("completed flow without output".into()))?;
    let analysis = AnalysisArtifact::from_artifact(last)?;
    info!("pipeline {flow_id} finished: {} points -> {}", analysis.n_points, analysis.path);

    Ok(PipelineReport { flow_id,
                        flow_fingerprint,
                        event_variants: engine.event_variants().unwrap_or_default(),
                        analysis })
}
