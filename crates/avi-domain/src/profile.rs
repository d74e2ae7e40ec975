//! Informe de profiling del dataframe: resumen global, estadísticas por
//! variable, correlaciones y avisos, renderizado a HTML autocontenido.
//!
//! Las variables se procesan en paralelo con rayon; el orden del resultado es
//! el de las columnas del dataframe, así que el HTML es determinista.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::describe::{mean, quantile, sorted_finite, variance};
use crate::frame::DataFrame;
use crate::html::{self, escape, number};

pub const HISTOGRAM_BINS: usize = 10;
pub const TOP_VALUES: usize = 5;
pub const HIGH_CORRELATION: f64 = 0.9;
pub const SKEWNESS_LIMIT: f64 = 20.0;
pub const ZEROS_LIMIT_PCT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub n_vars: usize,
    pub n_obs: usize,
    pub missing_cells: usize,
    pub missing_cells_pct: f64,
    pub duplicate_rows: usize,
    pub duplicate_rows_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableProfile {
    pub name: String,
    pub count: usize,
    pub distinct: usize,
    pub distinct_pct: f64,
    pub missing: usize,
    pub missing_pct: f64,
    pub zeros: usize,
    pub zeros_pct: f64,
    pub infinite: usize,
    pub mean: f64,
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub p5: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub p95: f64,
    pub iqr: f64,
    pub cv: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    pub sum: f64,
    pub mad: f64,
    pub monotonic_increasing: bool,
    pub monotonic_decreasing: bool,
    pub histogram: Histogram,
    pub top_values: Vec<(f64, usize)>,
}

impl VariableProfile {
    pub fn is_constant(&self) -> bool {
        self.distinct == 1
    }

    pub fn is_unique(&self) -> bool {
        self.count > 0 && self.distinct == self.count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProfileWarning {
    Constant { variable: String },
    HighCorrelation { variable: String, with: String, rho: f64 },
    Missing { variable: String, count: usize, pct: f64 },
    Zeros { variable: String, count: usize, pct: f64 },
    Unique { variable: String },
    Skewed { variable: String, skewness: f64 },
}

impl std::fmt::Display for ProfileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileWarning::Constant { variable } => write!(f, "{variable} has constant value"),
            ProfileWarning::HighCorrelation { variable, with, rho } => {
                write!(f, "{variable} is highly correlated with {with} (\u{3c1} = {rho:.5})")
            }
            ProfileWarning::Missing { variable, count, pct } => {
                write!(f, "{variable} has {count} / {pct:.1}% missing values")
            }
            ProfileWarning::Zeros { variable, count, pct } => write!(f, "{variable} has {count} / {pct:.1}% zeros"),
            ProfileWarning::Unique { variable } => write!(f, "{variable} has unique values"),
            ProfileWarning::Skewed { variable, skewness } => {
                write!(f, "{variable} is highly skewed (\u{3b3}1 = {skewness:.5})")
            }
        }
    }
}

/// Matriz de correlación cuadrada en el orden de `names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub overview: Overview,
    pub variables: Vec<VariableProfile>,
    pub pearson: CorrelationMatrix,
    pub spearman: CorrelationMatrix,
    pub warnings: Vec<ProfileWarning>,
}

impl ProfileReport {
    pub fn new(frame: &DataFrame) -> Self {
        let columns: Vec<(&str, &[f64])> = frame.iter().collect();
        let variables: Vec<VariableProfile> = columns.par_iter()
                                                     .map(|(name, values)| profile_variable(name, values))
                                                     .collect();
        let pearson = correlation_matrix(&columns, pearson);
        let spearman = correlation_matrix(&columns, spearman);
        let overview = overview(frame, &variables);
        let warnings = warnings(&variables, &pearson);
        ProfileReport { overview,
                        variables,
                        pearson,
                        spearman,
                        warnings }
    }

    pub fn variable(&self, name: &str) -> Option<&VariableProfile> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Documento HTML completo del informe.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        out.push_str("<div class=\"profile-report\">\n");
        self.write_overview(&mut out);
        self.write_warnings(&mut out);
        for v in &self.variables {
            write_variable(&mut out, v);
        }
        write_correlations(&mut out, "Pearson", &self.pearson);
        write_correlations(&mut out, "Spearman", &self.spearman);
        out.push_str("</div>\n");
        out
    }

    fn write_overview(&self, out: &mut String) {
        let o = &self.overview;
        out.push_str("<div class=\"row overview\">\n<h1>Overview</h1>\n");
        out.push_str("<table class=\"stats overview\">\n");
        let rows = [("Number of variables", o.n_vars.to_string()),
                    ("Number of observations", o.n_obs.to_string()),
                    ("Total Missing (%)", format!("{:.1}%", o.missing_cells_pct)),
                    ("Missing cells", o.missing_cells.to_string()),
                    ("Duplicate rows", o.duplicate_rows.to_string()),
                    ("Duplicate rows (%)", format!("{:.1}%", o.duplicate_rows_pct))];
        for (label, value) in rows {
            let _ = writeln!(out, "<tr><th>{label}</th><td>{value}</td></tr>");
        }
        out.push_str("</table>\n</div>\n");
    }

    fn write_warnings(&self, out: &mut String) {
        if self.warnings.is_empty() {
            return;
        }
        out.push_str("<div class=\"row warnings\">\n<h3>Warnings</h3>\n<ul>\n");
        for w in &self.warnings {
            let _ = writeln!(out, "<li>{}</li>", escape(&w.to_string()));
        }
        out.push_str("</ul>\n</div>\n");
    }
}

fn write_variable(out: &mut String, v: &VariableProfile) {
    let _ = writeln!(out, "<div class=\"row variablerow\">\n<h3 class=\"varname\">{}</h3>", escape(&v.name));
    out.push_str("<p class=\"vartype\">Numeric</p>\n<table class=\"stats\">\n");
    let rows = [("Distinct count", v.distinct.to_string()),
                ("Unique (%)", format!("{:.1}%", v.distinct_pct)),
                ("Missing (%)", format!("{:.1}%", v.missing_pct)),
                ("Missing (n)", v.missing.to_string()),
                ("Infinite (n)", v.infinite.to_string()),
                ("Zeros (%)", format!("{:.1}%", v.zeros_pct)),
                ("Mean", number(v.mean)),
                ("Minimum", number(v.min)),
                ("5-th percentile", number(v.p5)),
                ("Q1", number(v.q1)),
                ("Median", number(v.median)),
                ("Q3", number(v.q3)),
                ("95-th percentile", number(v.p95)),
                ("Maximum", number(v.max)),
                ("Range", number(v.range)),
                ("Interquartile range", number(v.iqr)),
                ("Standard deviation", number(v.std)),
                ("Variance", number(v.variance)),
                ("Coef of variation", number(v.cv)),
                ("Kurtosis", number(v.kurtosis)),
                ("Skewness", number(v.skewness)),
                ("Sum", number(v.sum)),
                ("MAD", number(v.mad)),
                ("Monotonic increasing", v.monotonic_increasing.to_string()),
                ("Monotonic decreasing", v.monotonic_decreasing.to_string())];
    for (label, value) in rows {
        let _ = writeln!(out, "<tr><th>{label}</th><td>{value}</td></tr>");
    }
    out.push_str("</table>\n<table class=\"histogram\">\n");
    for (i, c) in v.histogram.counts.iter().enumerate() {
        let _ = writeln!(out,
                         "<tr><th>[{}, {})</th><td>{c}</td></tr>",
                         number(v.histogram.edges[i]),
                         number(v.histogram.edges[i + 1]));
    }
    out.push_str("</table>\n<table class=\"freq\">\n<tr><th>Value</th><th>Count</th></tr>\n");
    for (value, count) in &v.top_values {
        let _ = writeln!(out, "<tr><td>{}</td><td>{count}</td></tr>", number(*value));
    }
    out.push_str("</table>\n</div>\n");
}

fn write_correlations(out: &mut String, title: &str, m: &CorrelationMatrix) {
    let _ = writeln!(out, "<div class=\"row correlations\">\n<h3>{title}</h3>");
    let names: Vec<&str> = m.names.iter().map(String::as_str).collect();
    let rows: Vec<(String, Vec<String>)> = m.names
                                            .iter()
                                            .zip(&m.values)
                                            .map(|(n, row)| (n.clone(), row.iter().map(|v| number(*v)).collect()))
                                            .collect();
    html::labeled_table(out, "correlation", &names, &rows);
    out.push_str("\n</div>\n");
}

fn key(v: f64) -> u64 {
    // -0.0 y 0.0 son el mismo valor
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}

fn profile_variable(name: &str, values: &[f64]) -> VariableProfile {
    let n_obs = values.len();
    let sorted = sorted_finite(values);
    let count = sorted.len();
    let missing = n_obs - count;
    let finite: Vec<f64> = sorted.iter().copied().filter(|v| v.is_finite()).collect();
    let infinite = count - finite.len();
    let zeros = sorted.iter().filter(|v| **v == 0.0).count();

    let mut freq: HashMap<u64, (f64, usize)> = HashMap::new();
    for v in &sorted {
        freq.entry(key(*v)).or_insert((*v, 0)).1 += 1;
    }
    let distinct = freq.len();
    let mut top: Vec<(f64, usize)> = freq.into_values().collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.total_cmp(&b.0)));
    top.truncate(TOP_VALUES);

    let mean_v = mean(&sorted);
    let var = variance(&sorted, mean_v);
    let std = var.sqrt();
    let min = sorted.first().copied().unwrap_or(f64::NAN);
    let max = sorted.last().copied().unwrap_or(f64::NAN);
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();

    VariableProfile { name: name.to_string(),
                      count,
                      distinct,
                      distinct_pct: pct(distinct, count),
                      missing,
                      missing_pct: pct(missing, n_obs),
                      zeros,
                      zeros_pct: pct(zeros, n_obs),
                      infinite,
                      mean: mean_v,
                      std,
                      variance: var,
                      min,
                      max,
                      range: max - min,
                      p5: quantile(&sorted, 0.05),
                      q1,
                      median: quantile(&sorted, 0.5),
                      q3,
                      p95: quantile(&sorted, 0.95),
                      iqr: q3 - q1,
                      cv: std / mean_v,
                      skewness: skewness(&sorted, mean_v),
                      kurtosis: kurtosis(&sorted, mean_v),
                      sum: sorted.iter().sum(),
                      mad: mean_abs_dev(&sorted, mean_v),
                      monotonic_increasing: present.windows(2).all(|w| w[0] <= w[1]),
                      monotonic_decreasing: present.windows(2).all(|w| w[0] >= w[1]),
                      histogram: histogram(&finite),
                      top_values: top }
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Asimetría con corrección de sesgo (G1).
fn skewness(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return f64::NAN;
    }
    let m2 = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|x| (x - mean).powi(3)).sum::<f64>() / n;
    if m2 == 0.0 {
        return 0.0;
    }
    (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
}

/// Curtosis en exceso con corrección de sesgo (G2).
fn kurtosis(values: &[f64], mean: f64) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return f64::NAN;
    }
    let s2 = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    let s4 = values.iter().map(|x| (x - mean).powi(4)).sum::<f64>();
    if s2 == 0.0 {
        return 0.0;
    }
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    n * (n + 1.0) * (n - 1.0) * s4 / ((n - 2.0) * (n - 3.0) * s2 * s2) - adj
}

fn mean_abs_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().map(|x| (x - mean).abs()).sum::<f64>() / values.len() as f64
}

fn histogram(values: &[f64]) -> Histogram {
    let (mut lo, mut hi) = match (values.first(), values.last()) {
        (Some(lo), Some(hi)) => (*lo, *hi),
        _ => (0.0, 1.0),
    };
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / HISTOGRAM_BINS as f64;
    let edges: Vec<f64> = (0..=HISTOGRAM_BINS).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for v in values {
        let bin = (((v - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }
    Histogram { edges, counts }
}

fn overview(frame: &DataFrame, variables: &[VariableProfile]) -> Overview {
    let n_obs = frame.n_rows();
    let n_vars = frame.n_cols();
    let missing_cells: usize = variables.iter().map(|v| v.missing).sum();
    let mut seen = HashSet::with_capacity(n_obs);
    let duplicate_rows = (0..n_obs).filter(|i| !seen.insert(frame.row(*i).into_iter().map(key).collect::<Vec<_>>()))
                                   .count();
    Overview { n_vars,
               n_obs,
               missing_cells,
               missing_cells_pct: pct(missing_cells, n_obs * n_vars),
               duplicate_rows,
               duplicate_rows_pct: pct(duplicate_rows, n_obs) }
}

fn correlation_matrix(columns: &[(&str, &[f64])], f: fn(&[f64], &[f64]) -> f64) -> CorrelationMatrix {
    let values = columns.iter()
                        .map(|(_, a)| columns.iter().map(|(_, b)| f(a, b)).collect())
                        .collect();
    CorrelationMatrix { names: columns.iter().map(|(n, _)| n.to_string()).collect(),
                        values }
}

fn complete_pairs(a: &[f64], b: &[f64]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
     .zip(b)
     .filter(|(x, y)| x.is_finite() && y.is_finite())
     .map(|(x, y)| (*x, *y))
     .unzip()
}

fn pearson_complete(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let (xs, ys) = complete_pairs(a, b);
    pearson_complete(&xs, &ys)
}

/// Rangos promedio (empates comparten el rango medio), base 1.
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|i, j| values[*i].total_cmp(&values[*j]));
    let mut out = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            out[order[k]] = rank;
        }
        i = j + 1;
    }
    out
}

pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    let (xs, ys) = complete_pairs(a, b);
    pearson_complete(&ranks(&xs), &ranks(&ys))
}

fn warnings(variables: &[VariableProfile], pearson: &CorrelationMatrix) -> Vec<ProfileWarning> {
    let mut out = Vec::new();
    for (i, v) in variables.iter().enumerate() {
        if v.is_constant() {
            out.push(ProfileWarning::Constant { variable: v.name.clone() });
        }
        // se marca la variable posterior del par, la anterior queda como referencia
        for j in 0..i {
            let rho = pearson.values[i][j];
            if rho.abs() > HIGH_CORRELATION {
                out.push(ProfileWarning::HighCorrelation { variable: v.name.clone(),
                                                           with: variables[j].name.clone(),
                                                           rho });
                break;
            }
        }
        if v.missing > 0 {
            out.push(ProfileWarning::Missing { variable: v.name.clone(),
                                               count: v.missing,
                                               pct: v.missing_pct });
        }
        if v.zeros_pct > ZEROS_LIMIT_PCT {
            out.push(ProfileWarning::Zeros { variable: v.name.clone(),
                                             count: v.zeros,
                                             pct: v.zeros_pct });
        }
        if v.is_unique() && v.count > 1 {
            out.push(ProfileWarning::Unique { variable: v.name.clone() });
        }
        if v.skewness.abs() > SKEWNESS_LIMIT {
            out.push(ProfileWarning::Skewed { variable: v.name.clone(),
                                              skewness: v.skewness });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn frame() -> DataFrame {
        DataFrame::from_columns(vec![("ra_floor", vec![1.0, 2.0, 3.0, 4.0, 10.0]),
                                     ("dec_floor", vec![2.0, 4.0, 6.0, 8.0, 20.0]),
                                     ("nb", vec![0.0, 0.0, 7.0, 7.0, f64::NAN])]).unwrap()
    }

    #[test]
    fn variable_statistics() {
        let report = ProfileReport::new(&frame());
        let ra = report.variable("ra_floor").unwrap();
        assert_eq!(ra.count, 5);
        assert_eq!(ra.distinct, 5);
        assert!(approx(ra.mean, 4.0));
        assert!(approx(ra.range, 9.0));
        assert!(approx(ra.mad, 2.4));
        assert!(ra.monotonic_increasing);
        assert!(!ra.monotonic_decreasing);
        assert_eq!(ra.histogram.counts.iter().sum::<usize>(), 5);
        assert_eq!(ra.histogram.counts[HISTOGRAM_BINS - 1], 1);

        let nb = report.variable("nb").unwrap();
        assert_eq!(nb.missing, 1);
        assert_eq!(nb.zeros, 2);
        assert_eq!(nb.top_values, vec![(0.0, 2), (7.0, 2)]);
    }

    #[test]
    fn skewness_and_kurtosis_reference() {
        let v = [1.0, 2.0, 3.0, 4.0, 10.0];
        let m = mean(&v);
        assert!((skewness(&v, m) - 1.697056).abs() < 1e-5);
        assert!((kurtosis(&v, m) - 3.152).abs() < 1e-5);
        assert!(skewness(&[1.0, 2.0], 1.5).is_nan());
    }

    #[test]
    fn correlations_and_warnings() {
        let report = ProfileReport::new(&frame());
        assert!(approx(report.pearson.get("ra_floor", "dec_floor").unwrap(), 1.0));
        assert!(approx(report.spearman.get("ra_floor", "dec_floor").unwrap(), 1.0));
        assert!(report.warnings.contains(&ProfileWarning::HighCorrelation { variable: "dec_floor".into(),
                                                                             with: "ra_floor".into(),
                                                                             rho: report.pearson.values[1][0] }));
        assert!(report.warnings.iter().any(|w| matches!(w, ProfileWarning::Missing { variable, count: 1, .. } if variable == "nb")));
        assert!(report.warnings.iter().any(|w| matches!(w, ProfileWarning::Zeros { variable, .. } if variable == "nb")));
    }

    #[test]
    fn overview_counts_duplicates_and_missing() {
        let df = DataFrame::from_columns(vec![("a", vec![1.0, 1.0, 2.0]), ("b", vec![3.0, 3.0, f64::NAN])]).unwrap();
        let report = ProfileReport::new(&df);
        assert_eq!(report.overview.n_obs, 3);
        assert_eq!(report.overview.n_vars, 2);
        assert_eq!(report.overview.duplicate_rows, 1);
        assert_eq!(report.overview.missing_cells, 1);
    }

    #[test]
    fn ranks_average_ties() {
        assert_eq!(ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn html_is_deterministic_and_lists_variables() {
        let a = ProfileReport::new(&frame()).to_html();
        let b = ProfileReport::new(&frame()).to_html();
        assert_eq!(a, b);
        assert!(a.contains("<h3 class=\"varname\">dec_floor</h3>"));
        assert!(a.contains("Number of observations"));
        assert!(a.contains("highly correlated"));
    }
}
