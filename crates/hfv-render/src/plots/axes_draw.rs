use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

/// Text sizes of one pad's axes, in points.
#[derive(Debug, Clone, Copy)]
pub struct AxisText {
    pub label: f64,
    pub title: f64,
    /// Tick labels and title of the x axis are drawn.
    pub x_labels: bool,
}

/// Draw the grid lines of a pad (TPad::SetGrid).
pub fn draw_grid(canvas: &mut Canvas, area: &PlotArea, x_axis: &Axis, y_axis: &Axis, config: &VizConfig) {
    let grid_style = LineStyle {
        color: config.grid.color.with_alpha(config.grid.alpha),
        width: 0.5,
        dash: Some("3 3".into()),
    };
    for &val in &x_axis.tick_positions {
        let px = x_axis.data_to_pixel(val, area.left, area.right());
        if inside(px, area.left, area.right()) {
            canvas.line(px, area.top, px, area.bottom(), &grid_style);
        }
    }
    for &val in &y_axis.tick_positions {
        let py = y_axis.data_to_pixel(val, area.bottom(), area.top);
        if inside(py, area.top, area.bottom()) {
            canvas.line(area.left, py, area.right(), py, &grid_style);
        }
    }
}

fn inside(p: f64, lo: f64, hi: f64) -> bool {
    p >= lo - 0.5 && p <= hi + 0.5
}

/// Draw the box frame with ticks, tick labels and axis titles.
///
/// Titles are aligned at the upper end of their axis as ROOT does by default.
pub fn draw_axes(
    canvas: &mut Canvas,
    area: &PlotArea,
    x_axis: &Axis,
    y_axis: &Axis,
    text: AxisText,
    config: &VizConfig,
) {
    let frame_color = Color::rgb(0, 0, 0);
    let lw = config.axes.line_width;
    let frame_style = LineStyle::solid(frame_color, lw);
    let tick_style_line = LineStyle::solid(frame_color, 0.8 * lw);
    let minor_tick_style = LineStyle::solid(frame_color, 0.6 * lw);

    let dir = if config.axes.tick_direction == "in" { 1.0 } else { -1.0 };
    let (x_tl, x_mtl) = (config.axes.tick_length * area.height, config.axes.minor_tick_length * area.height);
    let (y_tl, y_mtl) = (config.axes.tick_length * area.width, config.axes.minor_tick_length * area.width);
    let outward = |tl: f64| if dir < 0.0 { tl } else { 0.0 };

    // Frame rectangle
    canvas.line(area.left, area.top, area.right(), area.top, &frame_style);
    canvas.line(area.left, area.bottom(), area.right(), area.bottom(), &frame_style);
    canvas.line(area.left, area.top, area.left, area.bottom(), &frame_style);
    canvas.line(area.right(), area.top, area.right(), area.bottom(), &frame_style);

    let tick_label_style = TextStyle {
        size: text.label,
        color: frame_color,
        anchor: TextAnchor::Middle,
        baseline: TextBaseline::Hanging,
        ..Default::default()
    };

    // --- X axis ticks ---
    for (i, &val) in x_axis.tick_positions.iter().enumerate() {
        let px = x_axis.data_to_pixel(val, area.left, area.right());
        if !inside(px, area.left, area.right()) {
            continue;
        }
        canvas.line(px, area.bottom(), px, area.bottom() - dir * x_tl, &tick_style_line);
        if config.axes.show_top_ticks {
            canvas.line(px, area.top, px, area.top + dir * x_tl, &tick_style_line);
        }
        if text.x_labels
            && let Some(label) = x_axis.tick_labels.get(i)
        {
            let label_y = area.bottom() + outward(x_tl) + 0.3 * text.label;
            canvas.latex(px, label_y, label, &tick_label_style);
        }
    }

    for &val in &x_axis.minor_ticks {
        let px = x_axis.data_to_pixel(val, area.left, area.right());
        if !inside(px, area.left, area.right()) {
            continue;
        }
        canvas.line(px, area.bottom(), px, area.bottom() - dir * x_mtl, &minor_tick_style);
        if config.axes.show_top_ticks {
            canvas.line(px, area.top, px, area.top + dir * x_mtl, &minor_tick_style);
        }
    }

    // --- Y axis ticks ---
    let y_tick_label_style = TextStyle {
        size: text.label,
        color: frame_color,
        anchor: TextAnchor::End,
        baseline: TextBaseline::Central,
        ..Default::default()
    };

    let mut widest = 0.0_f64;
    for (i, &val) in y_axis.tick_positions.iter().enumerate() {
        let py = y_axis.data_to_pixel(val, area.bottom(), area.top);
        if !inside(py, area.top, area.bottom()) {
            continue;
        }
        canvas.line(area.left, py, area.left + dir * y_tl, py, &tick_style_line);
        if config.axes.show_right_ticks {
            canvas.line(area.right(), py, area.right() - dir * y_tl, py, &tick_style_line);
        }
        if let Some(label) = y_axis.tick_labels.get(i) {
            let label_x = area.left - outward(y_tl) - 0.3 * text.label;
            canvas.latex(label_x, py, label, &y_tick_label_style);
            widest = widest.max(canvas.measure_latex(label, &y_tick_label_style).width);
        }
    }

    for &val in &y_axis.minor_ticks {
        let py = y_axis.data_to_pixel(val, area.bottom(), area.top);
        if !inside(py, area.top, area.bottom()) {
            continue;
        }
        canvas.line(area.left, py, area.left + dir * y_mtl, py, &minor_tick_style);
        if config.axes.show_right_ticks {
            canvas.line(area.right(), py, area.right() - dir * y_mtl, py, &minor_tick_style);
        }
    }

    // --- Axis titles ---
    let title_style = TextStyle {
        size: text.title,
        color: frame_color,
        anchor: TextAnchor::End,
        baseline: TextBaseline::Hanging,
        ..Default::default()
    };

    if text.x_labels && !x_axis.label.is_empty() {
        let label_y = area.bottom() + outward(x_tl) + 1.3 * text.label + 0.3 * text.title * config.pad.x_title_offset;
        canvas.latex(area.right(), label_y, &x_axis.label, &title_style);
    }

    if !y_axis.label.is_empty() {
        let gap = outward(y_tl) + 0.3 * text.label + widest;
        let label_x = (area.left - gap - text.title * (0.6 * config.pad.y_title_offset)).max(0.5 * text.title);
        let y_title_style = TextStyle { baseline: TextBaseline::Alphabetic, ..title_style };
        canvas.latex_rotated(label_x, area.top, &y_axis.label, &y_title_style, -90.0);
    }
}
