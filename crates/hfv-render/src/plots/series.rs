use hfv_viz::{CurveSeries, HeatmapSeries, HistSeries, PointSeries, Series};

use crate::canvas::Canvas;
use crate::color::{Color, bird};
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::primitives::*;
use crate::style::{self, Fill};

/// Data to canvas mapping of one pad frame.
pub struct Mapper<'a> {
    pub area: PlotArea,
    pub x: &'a Axis,
    pub y: &'a Axis,
}

impl Mapper<'_> {
    pub fn px(&self, x: f64) -> f64 {
        self.x.data_to_pixel(x, self.area.left, self.area.right())
    }

    pub fn py(&self, y: f64) -> f64 {
        self.y.data_to_pixel(y, self.area.bottom(), self.area.top)
    }

    /// `y` in canvas points, with non-positive values on log axes moved to the frame bottom.
    fn py_clamped(&self, y: f64) -> f64 {
        if self.y.log && y <= 0.0 { self.area.bottom() } else { self.py(y) }
    }

    fn drawable(&self, x: f64, y: f64) -> bool {
        x.is_finite() && y.is_finite() && !(self.y.log && y <= 0.0) && !(self.x.log && x <= 0.0)
    }
}

/// Z scale of a color map.
#[derive(Debug, Clone, Copy)]
pub struct ZScale {
    pub min: f64,
    pub max: f64,
    pub log: bool,
}

impl ZScale {
    /// Position of `z` on the palette, `None` for values below the range.
    pub fn fraction(&self, z: f64) -> Option<f64> {
        if !z.is_finite() || z < self.min || (self.log && z <= 0.0) {
            return None;
        }
        let t = if self.log {
            let lo = self.min.max(self.max * 1e-9).max(1e-300).ln();
            (z.ln() - lo) / (self.max.ln() - lo)
        } else {
            (z - self.min) / (self.max - self.min)
        };
        Some(if t.is_finite() { t.clamp(0.0, 1.0) } else { 1.0 })
    }
}

/// Draw one series; `marker_scale` converts ROOT marker sizes to this pad.
pub fn draw_series(canvas: &mut Canvas, map: &Mapper<'_>, series: &Series, marker_scale: f64, z: Option<ZScale>) {
    match series {
        Series::Points(s) => draw_points(canvas, map, s, marker_scale),
        Series::Hist(s) => draw_hist(canvas, map, s),
        Series::Curve(s) => draw_curve(canvas, map, s),
        Series::Heatmap(s) => {
            if let Some(z) = z {
                draw_heatmap(canvas, map, s, z);
            }
        }
    }
}

fn draw_points(canvas: &mut Canvas, map: &Mapper<'_>, s: &PointSeries, marker_scale: f64) {
    let ls = style::line(&s.style);
    let marker = style::marker(&s.style, marker_scale);
    // bars stop at the marker edge so open markers stay empty
    let gap = if marker.shape == MarkerShape::Dot { 0.0 } else { marker.size };
    for (i, (&x, &y)) in s.x.iter().zip(&s.y).enumerate() {
        if !map.drawable(x, y) {
            continue;
        }
        let (px, py) = (map.px(x), map.py(y));
        let ey = s.yerr.get(i).copied().unwrap_or(0.0);
        if ey > 0.0 && ey.is_finite() {
            let hi = map.py(y + ey);
            let lo = map.py_clamped(y - ey);
            segment(canvas, (px, hi), (px, py - gap), &ls);
            segment(canvas, (px, py + gap), (px, lo), &ls);
        }
        let ex = s.xerr.get(i).copied().unwrap_or(0.0);
        if ex > 0.0 && ex.is_finite() {
            segment(canvas, (map.px(x - ex), py), (px - gap, py), &ls);
            segment(canvas, (px + gap, py), (map.px(x + ex), py), &ls);
        }
        canvas.marker(px, py, &marker);
    }
}

/// Line from `a` to `b` when `a` lies before `b`.
fn segment(canvas: &mut Canvas, a: (f64, f64), b: (f64, f64), ls: &LineStyle) {
    if a.0 < b.0 - 1e-9 || a.1 < b.1 - 1e-9 {
        canvas.line(a.0, a.1, b.0, b.1, ls);
    }
}

fn draw_hist(canvas: &mut Canvas, map: &Mapper<'_>, s: &HistSeries) {
    if s.edges.len() < 2 || s.y.is_empty() {
        return;
    }
    let mut outline = Vec::with_capacity(2 * s.y.len());
    for (i, &y) in s.y.iter().enumerate() {
        let (Some(&lo), Some(&hi)) = (s.edges.get(i), s.edges.get(i + 1)) else {
            break;
        };
        let py = if y.is_finite() { map.py_clamped(y) } else { map.area.bottom() };
        outline.push((map.px(lo), py));
        outline.push((map.px(hi), py));
    }
    let base = if map.y.log { map.area.bottom() } else { map.py(0.0_f64.max(map.y.min)) };
    let area_pts = || {
        let mut pts = outline.clone();
        if let (Some(first), Some(last)) = (outline.first(), outline.last()) {
            pts.push((last.0, base));
            pts.push((first.0, base));
        }
        pts
    };
    match style::fill(&s.style) {
        Fill::Solid(c) => canvas.polygon(&area_pts(), &Style::filled(c)),
        Fill::Hatch(c, angle) => canvas.hatched_polygon(&area_pts(), c, angle, 5.0),
        Fill::None => {}
    }
    if s.style.line_width > 0.0 {
        canvas.polyline(&outline, &style::line(&s.style));
    }
}

fn draw_curve(canvas: &mut Canvas, map: &Mapper<'_>, s: &CurveSeries) {
    let ls = style::line(&s.style);
    let mut run: Vec<(f64, f64)> = Vec::new();
    for (&x, &y) in s.x.iter().zip(&s.y) {
        if map.drawable(x, y) {
            run.push((map.px(x), map.py(y)));
        } else {
            canvas.polyline(&run, &ls);
            run.clear();
        }
    }
    canvas.polyline(&run, &ls);
}

fn draw_heatmap(canvas: &mut Canvas, map: &Mapper<'_>, s: &HeatmapSeries, z: ZScale) {
    let text_size = (0.5 * map.area.height / s.ny().max(1) as f64).min(0.035 * map.area.height);
    let value_style = TextStyle {
        size: text_size,
        anchor: TextAnchor::Middle,
        baseline: TextBaseline::Central,
        ..Default::default()
    };
    for iy in 0..s.ny() {
        for ix in 0..s.nx() {
            let v = s.value(ix, iy);
            // empty cells stay blank (COLZ)
            if v == 0.0 {
                continue;
            }
            let Some(t) = z.fraction(v) else { continue };
            let (x0, x1) = (map.px(s.x_edges[ix]), map.px(s.x_edges[ix + 1]));
            let (y0, y1) = (map.py(s.y_edges[iy]), map.py(s.y_edges[iy + 1]));
            let (left, top) = (x0.min(x1), y0.min(y1));
            let (w, h) = ((x1 - x0).abs(), (y1 - y0).abs());
            canvas.rect(left, top, w, h, &Style::filled(bird(t)));
            if s.show_values {
                canvas.text(left + w / 2.0, top + h / 2.0, &format_value(v), &value_style);
            }
        }
    }
}

/// Draw the palette axis right of the frame (TPaletteAxis).
pub fn draw_palette(canvas: &mut Canvas, pad: &PlotArea, frame: &PlotArea, z: ZScale, label_size: f64, title: &str) {
    let x0 = frame.right() + 0.01 * pad.width;
    let w = 0.04 * pad.width;
    const STEPS: usize = 50;
    let h = frame.height / STEPS as f64;
    for k in 0..STEPS {
        let t = (k as f64 + 0.5) / STEPS as f64;
        let top = frame.bottom() - (k + 1) as f64 * h;
        canvas.rect(x0, top, w, h + 0.3, &Style::filled(bird(t)));
    }
    let outline = Style::stroked(Color::rgb(0, 0, 0), 0.75);
    canvas.rect(x0, frame.top, w, frame.height, &outline);

    let axis = if z.log { Axis::log(z.min, z.max) } else { Axis::linear(z.min, z.max, 6) };
    let tick = LineStyle::solid(Color::rgb(0, 0, 0), 0.6);
    let label_style = TextStyle { size: label_size, baseline: TextBaseline::Central, ..Default::default() };
    for (i, &v) in axis.tick_positions.iter().enumerate() {
        let py = axis.data_to_pixel(v, frame.bottom(), frame.top);
        canvas.line(x0 + w, py, x0 + 0.7 * w, py, &tick);
        if let Some(label) = axis.tick_labels.get(i) {
            canvas.latex(x0 + w + 0.3 * label_size, py, label, &label_style);
        }
    }
    if !title.is_empty() {
        let title_style = TextStyle { size: label_size, anchor: TextAnchor::End, ..Default::default() };
        canvas.latex_rotated(pad.right() - 0.2 * label_size, frame.top, title, &title_style, -90.0);
    }
}

/// Cell value text with three significant digits.
fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e6 {
        return format!("{}", v as i64);
    }
    let mag = v.abs().log10().floor() as i32;
    let decimals = (2 - mag).max(0) as usize;
    format!("{v:.decimals$}")
}
