//! Errores del dominio: lectura de VOTable y análisis del dataframe.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoTableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("invalid base64 stream: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("no TABLE element found in VOTable")]
    NoTable,
    #[error("remote query reported an error: {0}")]
    QueryError(String),
    #[error("unsupported VOTable feature: {0}")]
    Unsupported(String),
    #[error("malformed VOTable: {0}")]
    Malformed(String),
    #[error("column '{0}' not found in table")]
    MissingColumn(String),
    #[error("invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue { column: String, row: usize, value: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Table(#[from] VoTableError),
    #[error("table has {found} columns, exactly 3 are expected")]
    ColumnCount { found: usize },
    #[error("column '{0}' not found in dataframe")]
    MissingColumn(String),
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = VoTableError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_message_names_the_column() {
        let err = AnalysisError::from(VoTableError::MissingColumn("nb".into()));
        assert_eq!(err.to_string(), "column 'nb' not found in table");
    }
}
