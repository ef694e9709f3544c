use hfv_viz::{Legend, LegendDraw};

use crate::canvas::Canvas;
use crate::config::VizConfig;
use crate::layout::margins::PlotArea;
use crate::primitives::*;
use crate::style::{self, Fill};

/// Fraction of a column taken by the entry symbol (TLegend margin).
const SYMBOL_FRAC: f64 = 0.25;

/// Draw a legend box placed in pad NDC.
///
/// Entries fill the columns row by row; rows share the box height evenly
/// and a zero text size is derived from the row height.
pub fn draw_legend(canvas: &mut Canvas, pad: &PlotArea, legend: &Legend, config: &VizConfig) {
    if legend.entries.is_empty() && legend.header.is_none() {
        return;
    }
    let (x0, y_top) = pad.ndc(legend.x0.min(legend.x1), legend.y0.max(legend.y1));
    let (x1, y_bot) = pad.ndc(legend.x0.max(legend.x1), legend.y0.min(legend.y1));
    let (box_w, box_h) = (x1 - x0, y_bot - y_top);

    if legend.border || config.legend.background.is_some() {
        let bg = Style {
            fill: config.legend.background,
            stroke: legend.border.then_some(config.legend.border_color),
            stroke_width: 0.75,
            opacity: 1.0,
        };
        canvas.rect(x0, y_top, box_w, box_h, &bg);
    }

    let n_cols = legend.n_columns.max(1);
    let n_rows = legend.entries.len().div_ceil(n_cols) + usize::from(legend.header.is_some());
    let row_h = box_h / n_rows.max(1) as f64;
    let col_w = box_w / n_cols as f64;
    let text_size = if legend.text_size > 0.0 { pad.text_px(legend.text_size) } else { 0.7 * row_h };
    let text_style = TextStyle { size: text_size, baseline: TextBaseline::Central, ..Default::default() };

    let mut row0 = 0;
    if let Some(header) = &legend.header {
        canvas.latex(x0 + 0.02 * box_w, y_top + row_h / 2.0, header, &text_style);
        row0 = 1;
    }

    for (i, entry) in legend.entries.iter().enumerate() {
        let (row, col) = (row0 + i / n_cols, i % n_cols);
        let cx = x0 + col as f64 * col_w;
        let cy = y_top + (row as f64 + 0.5) * row_h;
        let sym_w = SYMBOL_FRAC * col_w;
        let sym_mid = cx + sym_w / 2.0;

        match entry.draw {
            LegendDraw::Marker => {
                let ls = style::line(&entry.style);
                let half = (0.3 * row_h).min(sym_w / 2.0);
                canvas.line(sym_mid, cy - half, sym_mid, cy + half, &ls);
                canvas.marker(sym_mid, cy, &style::marker(&entry.style, 1.0));
            }
            LegendDraw::Line => {
                canvas.line(cx + 0.15 * sym_w, cy, cx + 0.85 * sym_w, cy, &style::line(&entry.style));
            }
            LegendDraw::Fill => {
                let (rx, ry) = (cx + 0.15 * sym_w, cy - 0.3 * row_h);
                let (rw, rh) = (0.7 * sym_w, 0.6 * row_h);
                let outline = [(rx, ry), (rx + rw, ry), (rx + rw, ry + rh), (rx, ry + rh)];
                match style::fill(&entry.style) {
                    Fill::Solid(c) => canvas.polygon(&outline, &Style::filled(c)),
                    Fill::Hatch(c, angle) => canvas.hatched_polygon(&outline, c, angle, 4.0),
                    Fill::None => {}
                }
                let ls = style::line(&entry.style);
                canvas.polygon(&outline, &Style::stroked(ls.color, ls.width));
            }
            LegendDraw::Text => {}
        }
        canvas.latex(cx + sym_w + 0.02 * col_w, cy, &entry.label, &text_style);
    }
}
