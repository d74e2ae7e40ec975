pub mod download;
pub mod dummy;
pub mod process;

use serde::{Deserialize, Serialize};

use crate::error::AviError;

pub use download::DownloadDataStep;
pub use dummy::DummyTaskStep;
pub use process::ProcessDataStep;

/// Parámetros que identifican una ejecución del pipeline. Los tres steps
/// reciben los mismos; cada uno usa los que necesita.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParams {
    pub query: String,
    pub output_file: String,
}

impl TaskParams {
    pub fn new(query: impl Into<String>, output_file: impl Into<String>) -> Self {
        TaskParams { query: query.into(),
                     output_file: output_file.into() }
    }

    pub(crate) fn require_output_file(&self) -> Result<&str, AviError> {
        let name = self.output_file.trim();
        if name.is_empty() {
            return Err(AviError::MissingParameter("output_file"));
        }
        Ok(name)
    }

    pub(crate) fn require_query(&self) -> Result<&str, AviError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(AviError::MissingParameter("query"));
        }
        Ok(query)
    }
}
