//! avi-adapters: configuración, artifacts y steps del pipeline AVI sobre
//! `avi-core`.
//!
//! - `DummyTaskStep` (Source): placeholder `dummyData_<name>.vot`.
//! - `DownloadDataStep` (Transform): consulta ADQL asíncrona, guarda
//!   `simulatedData_<name>.vot`.
//! - `ProcessDataStep` (Sink): análisis del VOTable y figura JSON `<name>`.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod fsio;
pub mod pipeline;
pub mod steps;

pub use config::AviConfig;
pub use error::AviError;
pub use pipeline::{AviEngine, AviPipeline};
pub use steps::TaskParams;
