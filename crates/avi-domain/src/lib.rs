//! avi-domain: lectura de VOTable y análisis de conteos por celda de cielo.
pub mod analysis;
pub mod describe;
pub mod error;
pub mod figure;
pub mod frame;
mod html;
pub mod profile;
pub mod votable;

pub use analysis::{analyze, AnalysisContext, AnalysisOutput, REQUIRED_COLUMNS};
pub use describe::{describe, Description};
pub use error::{AnalysisError, VoTableError};
pub use figure::{Figure, ScatterPlot};
pub use frame::DataFrame;
pub use profile::ProfileReport;
pub use votable::{parse_votable, Cell, Field, VoTable};
