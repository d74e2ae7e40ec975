//! Estadística descriptiva por columna (count, mean, std, min, cuartiles, max).

use serde::{Deserialize, Serialize};

use crate::frame::DataFrame;
use crate::html;

/// Clases CSS que se añaden a las tablas HTML generadas.
pub const TABLE_CLASSES: &str = "table table-striped table-bordered table-hover";

pub const STAT_LABELS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    /// Los `NaN` no cuentan. Sin valores, todo salvo `count` es `NaN`;
    /// con un único valor `std` es `NaN` (ddof = 1).
    pub fn of(values: &[f64]) -> Self {
        let sorted = sorted_finite(values);
        let count = sorted.len();
        let mean = mean(&sorted);
        ColumnSummary { count,
                        mean,
                        std: std_dev(&sorted, mean),
                        min: sorted.first().copied().unwrap_or(f64::NAN),
                        q25: quantile(&sorted, 0.25),
                        q50: quantile(&sorted, 0.50),
                        q75: quantile(&sorted, 0.75),
                        max: sorted.last().copied().unwrap_or(f64::NAN) }
    }

    pub fn values(&self) -> [f64; 8] {
        [self.count as f64, self.mean, self.std, self.min, self.q25, self.q50, self.q75, self.max]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub columns: Vec<(String, ColumnSummary)>,
}

impl Description {
    pub fn get(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Tabla HTML con una columna por variable y una fila por estadístico.
    pub fn to_html(&self, classes: &str) -> String {
        let names: Vec<&str> = self.columns.iter().map(|(n, _)| n.as_str()).collect();
        let rows: Vec<(String, Vec<String>)> =
            STAT_LABELS.iter()
                       .enumerate()
                       .map(|(i, label)| {
                           let cells = self.columns.iter().map(|(_, s)| html::number(s.values()[i])).collect();
                           (label.to_string(), cells)
                       })
                       .collect();
        let mut out = String::new();
        html::labeled_table(&mut out, classes, &names, &rows);
        out
    }
}

pub fn describe(frame: &DataFrame) -> Description {
    Description { columns: frame.iter()
                                .map(|(name, values)| (name.to_string(), ColumnSummary::of(values)))
                                .collect() }
}

pub(crate) fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    v
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64], mean: f64) -> f64 {
    variance(values, mean).sqrt()
}

pub(crate) fn variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Cuantil con interpolación lineal sobre una muestra ya ordenada.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summary_matches_reference_values() {
        let s = ColumnSummary::of(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.count, 4);
        assert!(approx(s.mean, 2.5));
        assert!(approx(s.std, 1.2909944487358056));
        assert!(approx(s.q25, 1.75));
        assert!(approx(s.q50, 2.5));
        assert!(approx(s.q75, 3.25));
        assert_eq!((s.min, s.max), (1.0, 4.0));
    }

    #[test]
    fn nan_values_are_excluded() {
        let s = ColumnSummary::of(&[f64::NAN, 5.0]);
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, 5.0);
        assert!(s.std.is_nan());
    }

    #[test]
    fn empty_column_is_all_nan() {
        let s = ColumnSummary::of(&[]);
        assert_eq!(s.count, 0);
        assert!(s.mean.is_nan() && s.min.is_nan() && s.q50.is_nan());
    }

    #[test]
    fn html_has_one_row_per_statistic() {
        let df = DataFrame::from_columns(vec![("ra_floor", vec![1.0, 2.0]), ("nb", vec![3.0, 5.0])]).unwrap();
        let html = describe(&df).to_html(TABLE_CLASSES);
        assert!(html.starts_with("<table border=\"1\" class=\"dataframe table table-striped table-bordered table-hover\">"));
        assert!(html.contains("<th>ra_floor</th>"));
        assert!(html.contains("<th>75%</th>"));
        assert!(html.contains("<td>4.000000</td>"));
        assert_eq!(html.matches("<tr>").count(), STAT_LABELS.len());
    }
}
