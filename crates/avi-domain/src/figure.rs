//! Scatter plot con barra de color serializado como diccionario de figura
//! mpld3 (`width`, `height`, `axes`, `data`, `id`, `plugins`).
//!
//! La geometría replica la de una figura matplotlib con `plt.colorbar()`:
//! el eje principal cede el 15 % del ancho a la barra de color. Los ids de
//! los elementos se derivan del contenido, de modo que la misma entrada
//! produce exactamente el mismo JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const DPI: f64 = 100.0;
pub const MARKER_AREA: f64 = 50.0;
pub const COLORBAR_STEPS: usize = 64;

const MAIN_BBOX: [f64; 4] = [0.125, 0.11, 0.62, 0.77];
const COLORBAR_BBOX: [f64; 4] = [0.79875, 0.11, 0.01925, 0.77];
const MARGIN: f64 = 0.05;

/// Paleta viridis muestreada en 9 puntos equiespaciados.
const VIRIDIS: [[u8; 3]; 9] = [[0x44, 0x01, 0x54],
                               [0x47, 0x2c, 0x7a],
                               [0x3b, 0x51, 0x8b],
                               [0x2c, 0x71, 0x8e],
                               [0x21, 0x90, 0x8d],
                               [0x27, 0xad, 0x81],
                               [0x5c, 0xc8, 0x63],
                               [0xaa, 0xdc, 0x32],
                               [0xfd, 0xe7, 0x25]];

/// Color hex para `t` en [0, 1] (interpolación lineal entre anclas).
pub fn viridis(t: f64) -> String {
    if t.is_nan() {
        return "none".to_string();
    }
    let t = t.clamp(0.0, 1.0);
    let pos = t * (VIRIDIS.len() - 1) as f64;
    let i = (pos.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = pos - i as f64;
    let mix = |k: usize| {
        let a = f64::from(VIRIDIS[i][k]);
        let b = f64::from(VIRIDIS[i + 1][k]);
        (a + (b - a) * frac).round() as u8
    };
    format!("#{:02x}{:02x}{:02x}", mix(0), mix(1), mix(2))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    #[serde(rename = "gridOn")]
    pub grid_on: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub position: String,
    pub nticks: u32,
    pub tickvalues: Option<Vec<f64>>,
    pub tickformat: Option<Vec<String>>,
    pub scale: String,
    pub fontsize: f64,
    pub grid: Grid,
    pub visible: bool,
}

impl Axis {
    fn linear(position: &str, nticks: u32) -> Self {
        Axis { position: position.to_string(),
               nticks,
               tickvalues: None,
               tickformat: None,
               scale: "linear".into(),
               fontsize: 10.0,
               grid: Grid { grid_on: false },
               visible: true }
    }

    fn hidden(position: &str) -> Self {
        Axis { nticks: 0,
               tickvalues: Some(Vec::new()),
               tickformat: Some(Vec::new()),
               visible: false,
               ..Axis::linear(position, 0) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    pub position: [f64; 2],
    pub coordinates: String,
    pub h_anchor: String,
    pub v_baseline: String,
    pub rotation: f64,
    pub fontsize: f64,
    pub color: String,
    pub alpha: f64,
    pub zorder: i32,
    pub id: String,
}

/// Trazado SVG: vértices y códigos (`M`, `L`, `C`, `Z`).
pub type PathData = (Vec<[f64; 2]>, Vec<String>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub offsets: String,
    pub xindex: usize,
    pub yindex: usize,
    pub paths: Vec<PathData>,
    pub pathtransforms: Vec<[f64; 6]>,
    pub alphas: Vec<Option<f64>>,
    pub edgecolors: Vec<String>,
    pub facecolors: Vec<String>,
    pub edgewidths: Vec<f64>,
    pub offsetcoordinates: String,
    pub pathcoordinates: String,
    pub zorder: i32,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub bbox: [f64; 4],
    pub xlim: [f64; 2],
    pub ylim: [f64; 2],
    pub xdomain: [f64; 2],
    pub ydomain: [f64; 2],
    pub xscale: String,
    pub yscale: String,
    pub axes: Vec<Axis>,
    pub axesbg: String,
    pub axesbgalpha: Option<f64>,
    pub zoomable: bool,
    pub id: String,
    pub lines: Vec<Value>,
    pub paths: Vec<Value>,
    pub markers: Vec<Value>,
    pub texts: Vec<Text>,
    pub collections: Vec<Collection>,
    pub images: Vec<Value>,
    pub sharex: Vec<String>,
    pub sharey: Vec<String>,
}

impl Axes {
    fn new(id: String, bbox: [f64; 4], xlim: [f64; 2], ylim: [f64; 2], axes: Vec<Axis>) -> Self {
        Axes { bbox,
               xlim,
               ylim,
               xdomain: xlim,
               ydomain: ylim,
               xscale: "linear".into(),
               yscale: "linear".into(),
               axes,
               axesbg: "#FFFFFF".into(),
               axesbgalpha: None,
               zoomable: true,
               id,
               lines: Vec::new(),
               paths: Vec::new(),
               markers: Vec::new(),
               texts: Vec::new(),
               collections: Vec::new(),
               images: Vec::new(),
               sharex: Vec::new(),
               sharey: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub width: f64,
    pub height: f64,
    pub axes: Vec<Axes>,
    /// Tablas de datos referenciadas por las colecciones (`data01`, ...).
    /// Los `NaN` se serializan como `null`.
    pub data: BTreeMap<String, Vec<Vec<f64>>>,
    pub id: String,
    pub plugins: Vec<Value>,
}

impl Figure {
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Scatter coloreado por una tercera variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPlot {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: Vec<f64>,
    pub xlabel: String,
    pub ylabel: String,
    pub colorbar_label: String,
    /// Tamaño en pulgadas (ancho, alto).
    pub size: (f64, f64),
}

impl ScatterPlot {
    /// Los puntos se ordenan por `color` ascendente (orden estable, `NaN` al final)
    /// para que los valores altos queden dibujados encima.
    pub fn sorted_by_color(x: &[f64], y: &[f64], color: &[f64]) -> Self {
        let mut idx: Vec<usize> = (0..color.len().min(x.len()).min(y.len())).collect();
        idx.sort_by(|a, b| color[*a].total_cmp(&color[*b]));
        ScatterPlot { x: idx.iter().map(|i| x[*i]).collect(),
                      y: idx.iter().map(|i| y[*i]).collect(),
                      color: idx.iter().map(|i| color[*i]).collect(),
                      xlabel: "x".into(),
                      ylabel: "y".into(),
                      colorbar_label: String::new(),
                      size: (16.0, 8.0) }
    }

    pub fn labels(mut self, xlabel: &str, ylabel: &str, colorbar_label: &str) -> Self {
        self.xlabel = xlabel.to_string();
        self.ylabel = ylabel.to_string();
        self.colorbar_label = colorbar_label.to_string();
        self
    }

    fn color_range(&self) -> (f64, f64) {
        finite_range(&self.color).unwrap_or((0.0, 1.0))
    }

    pub fn into_figure(self) -> Figure {
        let ids = IdGen::new(&self);
        let (cmin, cmax) = self.color_range();
        let norm = |c: f64| if cmax > cmin { (c - cmin) / (cmax - cmin) } else { 0.0 };

        let xlim = padded_limits(&self.x);
        let ylim = padded_limits(&self.y);
        let mut main = Axes::new(ids.next("axes"),
                                 MAIN_BBOX,
                                 xlim,
                                 ylim,
                                 vec![Axis::linear("bottom", 9), Axis::linear("left", 9)]);
        main.texts.push(label_text(&self.xlabel, [0.5, -0.06], "middle", "hanging", 0.0, ids.next("xlabel")));
        main.texts.push(label_text(&self.ylabel, [-0.04, 0.5], "middle", "auto", -90.0, ids.next("ylabel")));
        let marker_scale = MARKER_AREA.sqrt() * DPI / 72.0;
        main.collections.push(Collection { offsets: "data01".into(),
                                           xindex: 0,
                                           yindex: 1,
                                           paths: vec![unit_circle(0.5)],
                                           pathtransforms: vec![[marker_scale, 0.0, 0.0, marker_scale, 0.0, 0.0]],
                                           alphas: vec![None],
                                           edgecolors: Vec::new(),
                                           facecolors: self.color.iter().map(|c| viridis(norm(*c))).collect(),
                                           edgewidths: vec![1.0],
                                           offsetcoordinates: "data".into(),
                                           pathcoordinates: "display".into(),
                                           zorder: 1,
                                           id: ids.next("scatter") });

        let mut bar = Axes::new(ids.next("colorbar"),
                                COLORBAR_BBOX,
                                [0.0, 1.0],
                                [cmin, cmax],
                                vec![Axis::hidden("bottom"), Axis::linear("right", 7)]);
        bar.zoomable = false;
        let step = (cmax - cmin) / COLORBAR_STEPS as f64;
        let mut rects = Vec::with_capacity(COLORBAR_STEPS);
        let mut colors = Vec::with_capacity(COLORBAR_STEPS);
        for i in 0..COLORBAR_STEPS {
            let y0 = cmin + step * i as f64;
            rects.push(rectangle(y0, y0 + step));
            colors.push(viridis((i as f64 + 0.5) / COLORBAR_STEPS as f64));
        }
        bar.collections.push(Collection { offsets: "data02".into(),
                                          xindex: 0,
                                          yindex: 1,
                                          pathtransforms: Vec::new(),
                                          alphas: vec![None],
                                          edgecolors: vec!["none".into()],
                                          facecolors: colors,
                                          edgewidths: vec![0.0],
                                          offsetcoordinates: "display".into(),
                                          pathcoordinates: "data".into(),
                                          zorder: 1,
                                          id: ids.next("colorbar-mesh"),
                                          paths: rects });
        bar.texts.push(label_text(&self.colorbar_label, [4.5, 0.5], "middle", "auto", -90.0, ids.next("clabel")));

        let mut data = BTreeMap::new();
        data.insert("data01".to_string(),
                    self.x
                        .iter()
                        .zip(&self.y)
                        .zip(&self.color)
                        .map(|((x, y), c)| vec![*x, *y, *c])
                        .collect());
        data.insert("data02".to_string(), vec![vec![0.0, 0.0]]);

        Figure { width: self.size.0 * DPI,
                 height: self.size.1 * DPI,
                 axes: vec![main, bar],
                 data,
                 id: ids.next("figure"),
                 plugins: vec![serde_json::json!({"type": "reset"}),
                               serde_json::json!({"type": "zoom", "button": true, "enabled": false}),
                               serde_json::json!({"type": "boxzoom", "button": true, "enabled": false})] }
    }
}

fn label_text(text: &str, position: [f64; 2], h_anchor: &str, v_baseline: &str, rotation: f64, id: String) -> Text {
    Text { text: text.to_string(),
           position,
           coordinates: "axes".into(),
           h_anchor: h_anchor.into(),
           v_baseline: v_baseline.into(),
           rotation,
           fontsize: 10.0,
           color: "#000000".into(),
           alpha: 1.0,
           zorder: 3,
           id }
}

/// Ids `el<u64>` derivados de un digest del contenido de la figura.
struct IdGen {
    seed: Vec<u8>,
}

impl IdGen {
    fn new(plot: &ScatterPlot) -> Self {
        let mut h = Sha256::new();
        for v in plot.x.iter().chain(&plot.y).chain(&plot.color) {
            h.update(v.to_be_bytes());
        }
        h.update(plot.xlabel.as_bytes());
        h.update(plot.ylabel.as_bytes());
        h.update(plot.colorbar_label.as_bytes());
        IdGen { seed: h.finalize().to_vec() }
    }

    fn next(&self, role: &str) -> String {
        let mut h = Sha256::new();
        h.update(&self.seed);
        h.update(role.as_bytes());
        let digest = h.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        // ids de 15 dígitos, estables entre ejecuciones
        format!("el{}", u64::from_be_bytes(bytes) % 1_000_000_000_000_000)
    }
}

fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values.iter()
          .copied()
          .filter(|v| v.is_finite())
          .fold(None, |acc, v| match acc {
              None => Some((v, v)),
              Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
          })
}

/// Límites de eje con margen del 5 %; un rango degenerado se expande primero.
fn padded_limits(values: &[f64]) -> [f64; 2] {
    let Some((mut lo, mut hi)) = finite_range(values) else {
        return [-MARGIN, MARGIN];
    };
    if hi - lo < f64::EPSILON * hi.abs().max(lo.abs()).max(1.0) {
        if lo == 0.0 {
            lo = -MARGIN;
            hi = MARGIN;
        } else {
            lo -= MARGIN * lo.abs();
            hi += MARGIN * hi.abs();
        }
    }
    let pad = (hi - lo) * MARGIN;
    [lo - pad, hi + pad]
}

fn rectangle(y0: f64, y1: f64) -> PathData {
    (vec![[0.0, y0], [1.0, y0], [1.0, y1], [0.0, y1]], ["M", "L", "L", "L", "Z"].iter().map(|c| c.to_string()).collect())
}

/// Círculo de radio `r` aproximado con 8 curvas de Bézier cúbicas.
fn unit_circle(r: f64) -> PathData {
    const MAGIC: f64 = 0.2652031;
    let s = 0.5f64.sqrt();
    let m45 = s * MAGIC;
    let base = [[0.0, -1.0],
                [MAGIC, -1.0],
                [s - m45, -s - m45],
                [s, -s],
                [s + m45, -s + m45],
                [1.0, -MAGIC],
                [1.0, 0.0],
                [1.0, MAGIC],
                [s + m45, s - m45],
                [s, s],
                [s - m45, s + m45],
                [MAGIC, 1.0],
                [0.0, 1.0],
                [-MAGIC, 1.0],
                [-s + m45, s + m45],
                [-s, s],
                [-s - m45, s - m45],
                [-1.0, MAGIC],
                [-1.0, 0.0],
                [-1.0, -MAGIC],
                [-s - m45, -s + m45],
                [-s, -s],
                [-s + m45, -s - m45],
                [-MAGIC, -1.0],
                [0.0, -1.0]];
    let vertices = base.iter().map(|[x, y]| [x * r, y * r]).collect();
    let mut codes = vec!["M".to_string()];
    codes.extend(std::iter::repeat("C".to_string()).take(8));
    codes.push("Z".to_string());
    (vertices, codes)
}
