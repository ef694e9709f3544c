//! ROOT drawing attributes of [`HistStyle`] to SVG primitives.

use hfv_core::HistStyle;

use crate::color::Color;
use crate::primitives::{LineStyle, MarkerStyle};

/// Canvas points per ROOT line width unit.
const LINE_WIDTH_PT: f64 = 0.75;

pub fn marker(style: &HistStyle, scale: f64) -> MarkerStyle {
    let color = Color::from_style(&style.marker_color).with_alpha(style.alpha);
    let mut m = MarkerStyle::from_root(style.marker_style, style.marker_size, color);
    m.size *= scale;
    m
}

pub fn line(style: &HistStyle) -> LineStyle {
    let color = Color::from_style(&style.line_color).with_alpha(style.alpha);
    LineStyle::from_root(color, (style.line_width * LINE_WIDTH_PT).max(0.3), style.line_style)
}

/// How a histogram area is filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    None,
    Solid(Color),
    /// Hatch lines at an angle in degrees.
    Hatch(Color, f64),
}

/// Fill from the ROOT fill style: 1001 solid, 3004/3005 hatches at ±45°,
/// 3006/3007 vertical/horizontal lines, other 3xxx patterns as 45° hatches.
pub fn fill(style: &HistStyle) -> Fill {
    let Some(name) = &style.fill_color else {
        return Fill::None;
    };
    let color = Color::from_style(name).with_alpha(style.alpha);
    match style.fill_style {
        0 => Fill::None,
        1001 => Fill::Solid(color),
        3005 => Fill::Hatch(color, -45.0),
        3006 => Fill::Hatch(color, 0.0),
        3007 => Fill::Hatch(color, 90.0),
        s if (3000..4000).contains(&s) => Fill::Hatch(color, 45.0),
        _ => Fill::Solid(color),
    }
}
