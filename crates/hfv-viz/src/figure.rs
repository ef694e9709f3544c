//! Figure artifacts: canvases split into pads holding series, legends and labels.
//!
//! Positions follow ROOT conventions so that values carried over from analysis
//! macros keep their meaning: pad rectangles, legend boxes and labels are in
//! normalized device coordinates (0..1, origin bottom-left), text sizes are
//! fractions of the pad height, reference lines are in data coordinates.

use std::time::{SystemTime, UNIX_EPOCH};

use hfv_core::HistStyle;
use serde::{Deserialize, Serialize};

/// Current figure schema version.
pub const FIGURE_SCHEMA_VERSION: &str = "hfv_figure_v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureMeta {
    pub tool: String,
    pub tool_version: String,
    pub created_unix_ms: u64,
}

/// How pads are arranged on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layout {
    /// One pad covering the canvas.
    Single,
    /// `nx × ny` pads filled row by row (TCanvas::Divide).
    Grid { nx: usize, ny: usize },
    /// Pad 0 above pad 1, sharing the x axis; pad 1 takes `ratio_frac` of the height.
    MainRatio { ratio_frac: f64 },
}

/// A canvas: size in points and its pads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub schema_version: String,
    pub meta: FigureMeta,
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub layout: Layout,
    pub pads: Vec<Pad>,
}

impl Figure {
    /// Single-pad figure.
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self::with_layout(name, width, height, Layout::Single, 1)
    }

    /// `nx × ny` empty pads.
    pub fn grid(name: impl Into<String>, width: f64, height: f64, nx: usize, ny: usize) -> Self {
        let (nx, ny) = (nx.max(1), ny.max(1));
        Self::with_layout(name, width, height, Layout::Grid { nx, ny }, nx * ny)
    }

    /// Main pad plus a ratio pad below it.
    pub fn main_ratio(name: impl Into<String>, width: f64, height: f64, ratio_frac: f64) -> Self {
        let ratio_frac = ratio_frac.clamp(0.1, 0.9);
        Self::with_layout(name, width, height, Layout::MainRatio { ratio_frac }, 2)
    }

    fn with_layout(
        name: impl Into<String>,
        width: f64,
        height: f64,
        layout: Layout,
        n_pads: usize,
    ) -> Self {
        Self {
            schema_version: FIGURE_SCHEMA_VERSION.to_string(),
            meta: FigureMeta {
                tool: "hfv".to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                created_unix_ms: now_unix_ms(),
            },
            name: name.into(),
            width,
            height,
            layout,
            pads: vec![Pad::default(); n_pads],
        }
    }

    pub fn pad(&self, i: usize) -> Option<&Pad> {
        self.pads.get(i)
    }

    pub fn pad_mut(&mut self, i: usize) -> Option<&mut Pad> {
        self.pads.get_mut(i)
    }

    /// `true` when no pad draws anything.
    pub fn is_empty(&self) -> bool {
        self.pads.iter().all(|p| p.series.is_empty() && p.frame.is_none())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a figure, rejecting unknown schema versions.
    pub fn from_json(json: &str) -> hfv_core::Result<Self> {
        let fig: Figure = serde_json::from_str(json)?;
        if fig.schema_version != FIGURE_SCHEMA_VERSION {
            return Err(hfv_core::Error::Validation(format!(
                "unsupported figure schema '{}'",
                fig.schema_version
            )));
        }
        Ok(fig)
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Rectangle in canvas NDC (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PadRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// Pad margins as fractions of the pad size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Axis ranges and titles of a pad (TPad::DrawFrame).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub x_title: String,
    #[serde(default)]
    pub y_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_range: Option<(f64, f64)>,
    /// Labels of x bins, drawn instead of numeric ticks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x_bin_labels: Vec<(f64, String)>,
}

impl Frame {
    /// Frame from limits and a `"title;x title;y title"` string, as DrawFrame takes it.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64, titles: &str) -> Self {
        let mut parts = titles.splitn(3, ';');
        let title = parts.next().unwrap_or_default().to_string();
        let x_title = parts.next().unwrap_or_default().to_string();
        let y_title = parts.next().unwrap_or_default().to_string();
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            title,
            x_title,
            y_title,
            z_range: None,
            x_bin_labels: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_x_title(mut self, title: impl Into<String>) -> Self {
        self.x_title = title.into();
        self
    }

    pub fn with_y_title(mut self, title: impl Into<String>) -> Self {
        self.y_title = title.into();
        self
    }

    pub fn with_y_range(mut self, lo: f64, hi: f64) -> Self {
        self.y_min = lo;
        self.y_max = hi;
        self
    }

    pub fn with_x_range(mut self, lo: f64, hi: f64) -> Self {
        self.x_min = lo;
        self.x_max = hi;
        self
    }

    pub fn with_z_range(mut self, lo: f64, hi: f64) -> Self {
        self.z_range = Some((lo, hi));
        self
    }
}

/// One drawing area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pad {
    /// Explicit position; the figure layout decides when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<PadRect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margins: Option<Margins>,
    /// Axis frame; derived from the series when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    pub series: Vec<Series>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
    pub labels: Vec<Label>,
    pub lines: Vec<RefLine>,
    pub log_x: bool,
    pub log_y: bool,
    pub log_z: bool,
    pub grid: bool,
}

impl Pad {
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn push(&mut self, series: impl Into<Series>) {
        self.series.push(series.into());
    }

    pub fn add_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn add_line(&mut self, line: RefLine) {
        self.lines.push(line);
    }

    /// The explicit frame, or one spanning the data of all series.
    ///
    /// Linear y ranges start at zero for non-negative data and get 5% headroom;
    /// log ranges extend half a decade around the positive data.
    pub fn effective_frame(&self) -> Frame {
        if let Some(f) = &self.frame {
            return f.clone();
        }
        let (mut x_lo, mut x_hi) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_lo, mut y_hi) = (f64::INFINITY, f64::NEG_INFINITY);
        let mut z_hi = f64::NEG_INFINITY;
        let mut z_lo = f64::INFINITY;
        for s in &self.series {
            let (a, b) = s.x_extent();
            x_lo = x_lo.min(a);
            x_hi = x_hi.max(b);
            let (c, d) = s.y_extent(self.log_y);
            y_lo = y_lo.min(c);
            y_hi = y_hi.max(d);
            if let Series::Heatmap(h) = s {
                for &z in &h.z {
                    if z != 0.0 {
                        z_lo = z_lo.min(z);
                        z_hi = z_hi.max(z);
                    }
                }
            }
        }
        if !x_lo.is_finite() || !x_hi.is_finite() || x_hi <= x_lo {
            (x_lo, x_hi) = (0.0, 1.0);
        }
        let has_heatmap = self.series.iter().any(|s| matches!(s, Series::Heatmap(_)));
        if !y_lo.is_finite() || !y_hi.is_finite() {
            (y_lo, y_hi) = if self.log_y { (0.1, 10.0) } else { (0.0, 1.0) };
        } else if has_heatmap {
            // heatmap y extent is the axis itself
        } else if self.log_y {
            y_lo *= 0.5;
            y_hi *= 2.0;
        } else {
            let span = (y_hi - y_lo).max(y_hi.abs() * 1e-3).max(1e-12);
            y_lo = if y_lo >= 0.0 { 0.0 } else { y_lo - 0.05 * span };
            y_hi += 0.05 * span;
        }
        if y_hi <= y_lo {
            y_hi = y_lo + 1.0;
        }
        let mut f = Frame::new(x_lo, y_lo, x_hi, y_hi, "");
        if z_hi.is_finite() {
            let lo = if self.log_z { z_lo } else { z_lo.min(0.0) };
            f.z_range = Some((lo, z_hi));
        }
        f
    }
}

/// Something drawn inside a pad frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Series {
    /// Markers with error bars (ROOT "E" / "P").
    Points(PointSeries),
    /// Step outline over bin edges (ROOT "HIST"), optionally filled.
    Hist(HistSeries),
    /// Smooth function sampled at points (TF1, fit curves).
    Curve(CurveSeries),
    /// 2D color map (ROOT "COLZ").
    Heatmap(HeatmapSeries),
}

impl Series {
    pub fn label(&self) -> &str {
        match self {
            Series::Points(s) => &s.label,
            Series::Hist(s) => &s.label,
            Series::Curve(s) => &s.label,
            Series::Heatmap(s) => &s.label,
        }
    }

    fn x_extent(&self) -> (f64, f64) {
        let fold = |v: &[f64]| {
            v.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), &x| (a.min(x), b.max(x)))
        };
        match self {
            Series::Points(s) => s
                .x
                .iter()
                .zip(&s.xerr)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(a, b), (&x, &e)| {
                    (a.min(x - e), b.max(x + e))
                }),
            Series::Hist(s) => fold(&s.edges),
            Series::Curve(s) => fold(&s.x),
            Series::Heatmap(s) => fold(&s.x_edges),
        }
    }

    fn y_extent(&self, log: bool) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut take = |v: f64| {
            if v.is_finite() && (!log || v > 0.0) {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        };
        match self {
            Series::Points(s) => {
                for (i, &y) in s.y.iter().enumerate() {
                    let e = s.yerr.get(i).copied().unwrap_or(0.0);
                    take(y - e);
                    take(y + e);
                    take(y);
                }
            }
            Series::Hist(s) => s.y.iter().for_each(|&y| take(y)),
            Series::Curve(s) => s.y.iter().for_each(|&y| take(y)),
            Series::Heatmap(s) => s.y_edges.iter().for_each(|&y| take(y)),
        }
        (lo, hi)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSeries {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub xerr: Vec<f64>,
    pub yerr: Vec<f64>,
    pub style: HistStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistSeries {
    pub label: String,
    /// `y.len() + 1` bin edges.
    pub edges: Vec<f64>,
    pub y: Vec<f64>,
    pub style: HistStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSeries {
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub style: HistStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSeries {
    pub label: String,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// Row-major values, `z[iy * nx + ix]`.
    pub z: Vec<f64>,
    #[serde(default)]
    pub z_title: String,
    /// Print each cell value (ROOT "TEXT").
    #[serde(default)]
    pub show_values: bool,
}

impl HeatmapSeries {
    pub fn nx(&self) -> usize {
        self.x_edges.len().saturating_sub(1)
    }

    pub fn ny(&self) -> usize {
        self.y_edges.len().saturating_sub(1)
    }

    pub fn value(&self, ix: usize, iy: usize) -> f64 {
        self.z.get(iy * self.nx() + ix).copied().unwrap_or(0.0)
    }
}

impl From<PointSeries> for Series {
    fn from(s: PointSeries) -> Self {
        Series::Points(s)
    }
}

impl From<HistSeries> for Series {
    fn from(s: HistSeries) -> Self {
        Series::Hist(s)
    }
}

impl From<CurveSeries> for Series {
    fn from(s: CurveSeries) -> Self {
        Series::Curve(s)
    }
}

impl From<HeatmapSeries> for Series {
    fn from(s: HeatmapSeries) -> Self {
        Series::Heatmap(s)
    }
}

/// What a legend entry shows next to its text (TLegend option letters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendDraw {
    /// "p" / "pl" / "lp" / "pe"
    Marker,
    /// "l"
    Line,
    /// "f"
    Fill,
    /// "" : text only
    Text,
}

impl LegendDraw {
    pub fn from_option(opt: &str) -> Self {
        let o = opt.to_ascii_lowercase();
        if o.contains('p') {
            LegendDraw::Marker
        } else if o.contains('f') {
            LegendDraw::Fill
        } else if o.contains('l') {
            LegendDraw::Line
        } else {
            LegendDraw::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub style: HistStyle,
    pub draw: LegendDraw,
}

impl LegendEntry {
    pub fn new(label: impl Into<String>, style: &HistStyle, option: &str) -> Self {
        Self { label: label.into(), style: style.clone(), draw: LegendDraw::from_option(option) }
    }
}

/// Legend box in pad NDC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    pub text_size: f64,
    #[serde(default = "one")]
    pub n_columns: usize,
    #[serde(default)]
    pub border: bool,
    pub entries: Vec<LegendEntry>,
}

fn one() -> usize {
    1
}

impl Legend {
    /// Borderless transparent legend, the analyses' usual setup.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64, text_size: f64) -> Self {
        Self { x0, y0, x1, y1, header: None, text_size, n_columns: 1, border: false, entries: Vec::new() }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_columns(mut self, n: usize) -> Self {
        self.n_columns = n.max(1);
        self
    }

    pub fn add(&mut self, label: impl Into<String>, style: &HistStyle, option: &str) {
        self.entries.push(LegendEntry::new(label, style, option));
    }
}

/// Free text at pad NDC `(x, y)` (TLatex with SetNDC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub x: f64,
    pub y: f64,
    pub text: String,
    /// Fraction of the pad height.
    pub size: f64,
    #[serde(default = "black")]
    pub color: String,
    /// ROOT text alignment `10 * horizontal + vertical` (1 left/bottom, 2 center, 3 right/top).
    #[serde(default = "default_align")]
    pub align: i32,
    #[serde(default)]
    pub angle: f64,
}

fn black() -> String {
    "#000000".to_string()
}

fn default_align() -> i32 {
    11
}

impl Label {
    pub fn new(x: f64, y: f64, text: impl Into<String>, size: f64) -> Self {
        Self { x, y, text: text.into(), size, color: black(), align: default_align(), angle: 0.0 }
    }

    pub fn with_align(mut self, align: i32) -> Self {
        self.align = align;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }
}

/// Straight line in data coordinates (TLine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: String,
    pub width: f64,
    /// ROOT line style (1 solid, 2 dashed, 3 dotted, 9 long dash).
    pub line_style: i32,
}

impl RefLine {
    /// Dashed horizontal line at `y` from `x1` to `x2`.
    pub fn horizontal(x1: f64, x2: f64, y: f64, color: impl Into<String>) -> Self {
        Self { x1, y1: y, x2, y2: y, color: color.into(), width: 1.0, line_style: 2 }
    }

    /// Dashed vertical line at `x` from `y1` to `y2`.
    pub fn vertical(x: f64, y1: f64, y2: f64, color: impl Into<String>) -> Self {
        Self { x1: x, y1, x2: x, y2, color: color.into(), width: 1.0, line_style: 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points(x: &[f64], y: &[f64]) -> PointSeries {
        PointSeries {
            label: "p".into(),
            x: x.to_vec(),
            y: y.to_vec(),
            xerr: vec![0.5; x.len()],
            yerr: vec![0.0; x.len()],
            style: HistStyle::default(),
        }
    }

    #[test]
    fn frame_titles_split_like_drawframe() {
        let f = Frame::new(0.0, 1e-3, 50.0, 2.5, "prompt D^{0};#it{p}_{T} (GeV/#it{c});ratio");
        assert_eq!(f.title, "prompt D^{0}");
        assert_eq!(f.x_title, "#it{p}_{T} (GeV/#it{c})");
        assert_eq!(f.y_title, "ratio");
        let g = Frame::new(0.0, 0.0, 1.0, 1.0, ";x");
        assert_eq!(g.title, "");
        assert_eq!(g.x_title, "x");
        assert_eq!(g.y_title, "");
    }

    #[test]
    fn grid_has_all_pads() {
        let fig = Figure::grid("canv", 1000.0, 1000.0, 2, 2);
        assert_eq!(fig.pads.len(), 4);
        assert_eq!(fig.layout, Layout::Grid { nx: 2, ny: 2 });
        assert!(fig.is_empty());
        let mr = Figure::main_ratio("c", 600.0, 800.0, 0.3);
        assert_eq!(mr.pads.len(), 2);
    }

    #[test]
    fn auto_frame_linear_and_log() {
        let mut pad = Pad::default();
        pad.push(points(&[1.0, 2.0, 3.0], &[10.0, 20.0, 40.0]));
        let f = pad.effective_frame();
        assert_relative_eq!(f.x_min, 0.5);
        assert_relative_eq!(f.x_max, 3.5);
        assert_relative_eq!(f.y_min, 0.0);
        assert_relative_eq!(f.y_max, 40.0 + 0.05 * 30.0);

        pad.log_y = true;
        pad.push(points(&[4.0], &[0.0]));
        let f = pad.effective_frame();
        assert_relative_eq!(f.y_min, 5.0);
        assert_relative_eq!(f.y_max, 80.0);
    }

    #[test]
    fn explicit_frame_wins() {
        let pad = Pad::default().with_frame(Frame::new(0.0, 1.0, 2.0, 3.0, "t;x;y"));
        assert_eq!(pad.effective_frame().title, "t");
    }

    #[test]
    fn legend_options() {
        assert_eq!(LegendDraw::from_option("pl"), LegendDraw::Marker);
        assert_eq!(LegendDraw::from_option("l"), LegendDraw::Line);
        assert_eq!(LegendDraw::from_option("F"), LegendDraw::Fill);
        assert_eq!(LegendDraw::from_option(""), LegendDraw::Text);
    }

    #[test]
    fn json_schema_is_checked() {
        let mut fig = Figure::new("c", 800.0, 600.0);
        fig.pads[0].push(points(&[1.0], &[2.0]));
        fig.pads[0].add_label(Label::new(0.2, 0.85, "full markers: all", 0.03));
        let json = fig.to_json().unwrap();
        let back = Figure::from_json(&json).unwrap();
        assert_eq!(back, fig);

        let bad = json.replace(FIGURE_SCHEMA_VERSION, "hfv_figure_v0");
        assert!(Figure::from_json(&bad).is_err());
    }
}
