//! Ensamblado del pipeline placeholder → consulta remota → análisis.

use avi_core::event::InMemoryEventStore;
use avi_core::repo::{FlowDefinition, InMemoryFlowRepository};
use avi_core::{FlowEngine, Pipe};
use avi_tap::{CancellationToken, TapService};
use std::sync::Arc;

use crate::config::AviConfig;
use crate::steps::{DownloadDataStep, DummyTaskStep, ProcessDataStep, TaskParams};

pub type AviEngine = FlowEngine<InMemoryEventStore, InMemoryFlowRepository>;

/// Los tres steps, en orden de dependencia.
pub struct AviPipeline {
    pub dummy: DummyTaskStep,
    pub download: DownloadDataStep,
    pub process: ProcessDataStep,
}

impl AviPipeline {
    pub fn new(config: &AviConfig, params: &TaskParams, service: Arc<dyn TapService>) -> Self {
        AviPipeline { dummy: DummyTaskStep::new(config.clone(), params.clone()),
                      download: DownloadDataStep::new(config.clone(), params.clone(), service),
                      process: ProcessDataStep::new(config.clone(), params.clone()) }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.download = self.download.with_cancellation(token);
        self
    }

    /// Engine en memoria listo para `run()`.
    pub fn into_engine(self) -> AviEngine {
        FlowEngine::new().first_step(self.dummy)
                         .add_step(self.download)
                         .add_step(self.process)
                         .build()
    }

    pub fn definition(self) -> FlowDefinition {
        Pipe::new(self.dummy).then(self.download).then(self.process).build()
    }
}
