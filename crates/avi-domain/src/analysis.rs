//! Análisis de una tabla de conteos por celda de cielo: dataframe, estadística
//! descriptiva, profiling y scatter `ra`/`dec` coloreado por `nb`.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::describe::{describe, TABLE_CLASSES};
use crate::error::AnalysisError;
use crate::figure::{Figure, ScatterPlot};
use crate::frame::DataFrame;
use crate::profile::ProfileReport;
use crate::votable::VoTable;

pub const RA_COLUMN: &str = "ra_floor";
pub const DEC_COLUMN: &str = "dec_floor";
pub const COUNT_COLUMN: &str = "nb";
pub const REQUIRED_COLUMNS: [&str; 3] = [RA_COLUMN, DEC_COLUMN, COUNT_COLUMN];

/// Contexto HTML para la plantilla del front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    pub gacs_dfdescription: String,
    pub pandas_profiling: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub context: AnalysisContext,
    pub figure: Figure,
    pub n_points: usize,
    pub columns: Vec<String>,
}

pub fn analyze(table: &VoTable) -> Result<AnalysisOutput, AnalysisError> {
    let frame = DataFrame::from_votable(table)?;
    debug!("dataframe built: columns={:?} rows={}", frame.names(), frame.n_rows());

    let selected = frame.select(&REQUIRED_COLUMNS)?;
    let report = ProfileReport::new(&selected);
    let context = AnalysisContext { gacs_dfdescription: describe(&selected).to_html(TABLE_CLASSES),
                                    pandas_profiling: report.to_html() };
    for w in &report.warnings {
        debug!("profile warning: {w}");
    }

    let figure = ScatterPlot::sorted_by_color(selected.column(RA_COLUMN)?,
                                              selected.column(DEC_COLUMN)?,
                                              selected.column(COUNT_COLUMN)?).labels("ra", "dec", "Counts")
                                                                             .into_figure();

    Ok(AnalysisOutput { context,
                        figure,
                        n_points: selected.n_rows(),
                        columns: frame.names().into_iter().map(String::from).collect() })
}
