//! Dataframe numérico mínimo: columnas nombradas de `f64` en orden de inserción.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::votable::VoTable;

/// Ancho fijo de la matriz que se construye a partir de la tabla.
pub const FRAME_COLUMNS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    columns: IndexMap<String, Vec<f64>>,
    n_rows: usize,
}

impl DataFrame {
    /// Construye el dataframe con las columnas de la tabla, conservando sus
    /// nombres originales. La tabla debe tener exactamente `FRAME_COLUMNS`.
    pub fn from_votable(table: &VoTable) -> Result<Self, AnalysisError> {
        if table.fields.len() != FRAME_COLUMNS {
            return Err(AnalysisError::ColumnCount { found: table.fields.len() });
        }
        let mut frame = DataFrame { columns: IndexMap::new(),
                                    n_rows: table.len() };
        for field in &table.fields {
            let values = table.column_f64(&field.name)?;
            frame.columns.insert(field.name.clone(), values);
        }
        Ok(frame)
    }

    /// Dataframe a partir de columnas ya calculadas; todas deben tener la misma longitud.
    pub fn from_columns<I, S>(cols: I) -> Option<Self>
        where I: IntoIterator<Item = (S, Vec<f64>)>,
              S: Into<String>
    {
        let mut columns = IndexMap::new();
        let mut n_rows = None;
        for (name, values) in cols {
            match n_rows {
                Some(n) if n != values.len() => return None,
                _ => n_rows = Some(values.len()),
            }
            columns.insert(name.into(), values);
        }
        Some(DataFrame { columns,
                         n_rows: n_rows.unwrap_or(0) })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn column(&self, name: &str) -> Result<&[f64], AnalysisError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Subconjunto de columnas, en el orden pedido.
    pub fn select(&self, names: &[&str]) -> Result<DataFrame, AnalysisError> {
        let mut columns = IndexMap::with_capacity(names.len());
        for name in names {
            columns.insert((*name).to_string(), self.column(name)?.to_vec());
        }
        Ok(DataFrame { columns,
                       n_rows: self.n_rows })
    }

    pub fn row(&self, idx: usize) -> Vec<f64> {
        self.columns.values().map(|c| c[idx]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::votable::parse_votable;

    fn table(fields: &[&str], rows: &[&[&str]]) -> VoTable {
        let mut doc = String::from("<VOTABLE><RESOURCE><TABLE>");
        for f in fields {
            doc.push_str(&format!(r#"<FIELD name="{f}" datatype="double"/>"#));
        }
        doc.push_str("<DATA><TABLEDATA>");
        for r in rows {
            doc.push_str("<TR>");
            for c in *r {
                doc.push_str(&format!("<TD>{c}</TD>"));
            }
            doc.push_str("</TR>");
        }
        doc.push_str("</TABLEDATA></DATA></TABLE></RESOURCE></VOTABLE>");
        parse_votable(doc.as_bytes()).unwrap()
    }

    #[test]
    fn keeps_the_three_columns_with_original_names() {
        let t = table(&["ra_floor", "dec_floor", "nb"], &[&["1", "2", "3"], &["5", "6", "7"]]);
        let df = DataFrame::from_votable(&t).unwrap();
        assert_eq!(df.names(), vec!["ra_floor", "dec_floor", "nb"]);
        assert_eq!(df.n_rows(), 2);
        assert_eq!(df.column("nb").unwrap(), &[3.0, 7.0]);
        assert_eq!(df.row(1), vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn fewer_than_three_columns_is_an_error() {
        let t = table(&["ra_floor", "dec_floor"], &[&["1", "2"]]);
        assert!(matches!(DataFrame::from_votable(&t), Err(AnalysisError::ColumnCount { found: 2 })));
    }

    #[test]
    fn extra_columns_are_rejected() {
        let t = table(&["ra_floor", "dec_floor", "nb", "extra"], &[&["1", "2", "3", "4"]]);
        let err = DataFrame::from_votable(&t).unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnCount { found: 4 }));
        assert_eq!(err.to_string(), "table has 4 columns, exactly 3 are expected");
    }

    #[test]
    fn select_keeps_requested_order_and_reports_missing() {
        let t = table(&["a", "b", "c"], &[&["1", "2", "3"]]);
        let df = DataFrame::from_votable(&t).unwrap();
        let sel = df.select(&["c", "a"]).unwrap();
        assert_eq!(sel.names(), vec!["c", "a"]);
        assert!(matches!(df.select(&["nb"]), Err(AnalysisError::MissingColumn(c)) if c == "nb"));
    }

    #[test]
    fn from_columns_rejects_ragged_input() {
        assert!(DataFrame::from_columns(vec![("a", vec![1.0]), ("b", vec![1.0, 2.0])]).is_none());
        let df = DataFrame::from_columns(vec![("a", vec![1.0, 2.0])]).unwrap();
        assert_eq!(df.n_rows(), 2);
    }
}
