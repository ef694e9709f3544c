use hfv_viz::{Frame, Layout, Margins, Pad, Series};

use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::VizConfig;
use crate::layout::axes::Axis;
use crate::layout::legend::draw_legend;
use crate::layout::margins::PlotArea;
use crate::layout::multi_panel::pad_margins;
use crate::plots::axes_draw::{AxisText, draw_axes, draw_grid};
use crate::plots::series::{Mapper, ZScale, draw_palette, draw_series};
use crate::primitives::*;

/// Right margin of pads holding a color map, leaving room for the palette.
const PALETTE_RIGHT_MARGIN: f64 = 0.15;

/// Draw pad `index` of a figure into its box.
pub fn render_pad(
    canvas: &mut Canvas,
    layout: &Layout,
    index: usize,
    pad: &Pad,
    pad_box: &PlotArea,
    config: &VizConfig,
) {
    let has_map = pad.series.iter().any(|s| matches!(s, Series::Heatmap(_)));
    let margins = pad.margins.unwrap_or_else(|| {
        let m = pad_margins(layout, index, &config.pad);
        if has_map { Margins { right: m.right.max(PALETTE_RIGHT_MARGIN), ..m } } else { m }
    });
    let area = pad_box.inset(&margins);
    let frame = pad.effective_frame();

    let x_axis = x_axis_of(&frame, pad.log_x, area.width).with_label(frame.x_title.clone());
    let y_axis = y_axis_of(&frame, pad.log_y, area.height).with_label(frame.y_title.clone());

    if pad.grid {
        draw_grid(canvas, &area, &x_axis, &y_axis, config);
    }

    let z = has_map.then(|| z_scale(&frame, pad.log_z));
    // ROOT marker size 1 on a 600 pt tall pad
    let marker_scale = (pad_box.width.min(pad_box.height) / 600.0).clamp(0.5, 1.5);
    let map = Mapper { area, x: &x_axis, y: &y_axis };

    canvas.push_clip(area.left, area.top, area.width, area.height);
    for series in &pad.series {
        draw_series(canvas, &map, series, marker_scale, z);
    }
    for line in &pad.lines {
        let ls = LineStyle::from_root(Color::from_style(&line.color), 0.75 * line.width, line.line_style);
        canvas.line(map.px(line.x1), map.py(line.y1), map.px(line.x2), map.py(line.y2), &ls);
    }
    canvas.pop_clip();

    let text = AxisText {
        label: pad_box.text_px(config.pad.label_size),
        title: pad_box.text_px(config.pad.title_size),
        x_labels: margins.bottom >= 0.05,
    };
    draw_axes(canvas, &area, &x_axis, &y_axis, text, config);

    if let Some(z) = z {
        let title = pad
            .series
            .iter()
            .find_map(|s| match s {
                Series::Heatmap(h) => Some(h.z_title.as_str()),
                _ => None,
            })
            .unwrap_or_default();
        draw_palette(canvas, pad_box, &area, z, text.label, title);
    }

    for label in &pad.labels {
        let (x, y) = pad_box.ndc(label.x, label.y);
        let style = TextStyle {
            size: pad_box.text_px(label.size),
            color: Color::from_style(&label.color),
            ..TextStyle::default()
        }
        .with_root_align(label.align);
        if label.angle != 0.0 {
            canvas.latex_rotated(x, y, &label.text, &style, -label.angle);
        } else {
            canvas.latex(x, y, &label.text, &style);
        }
    }

    if let Some(legend) = &pad.legend {
        draw_legend(canvas, pad_box, legend, config);
    }

    if config.title.show && !frame.title.is_empty() {
        let style = TextStyle {
            size: pad_box.text_px(config.title.size),
            anchor: TextAnchor::Middle,
            baseline: TextBaseline::Central,
            ..TextStyle::default()
        };
        let y = pad_box.top + (0.5 * margins.top * pad_box.height).max(0.6 * style.size);
        canvas.latex(pad_box.left + pad_box.width / 2.0, y, &frame.title, &style);
    }
}

fn ticks_for(len: f64) -> usize {
    (len / 60.0).round().clamp(3.0, 10.0) as usize
}

fn x_axis_of(frame: &Frame, log: bool, len: f64) -> Axis {
    if !frame.x_bin_labels.is_empty() {
        Axis::labelled(frame.x_min, frame.x_max, &frame.x_bin_labels)
    } else if log {
        Axis::log(frame.x_min, frame.x_max)
    } else {
        Axis::linear(frame.x_min, frame.x_max, ticks_for(len))
    }
}

fn y_axis_of(frame: &Frame, log: bool, len: f64) -> Axis {
    if log {
        Axis::log(frame.y_min, frame.y_max)
    } else {
        Axis::linear(frame.y_min, frame.y_max, ticks_for(len))
    }
}

fn z_scale(frame: &Frame, log: bool) -> ZScale {
    let (lo, hi) = frame.z_range.unwrap_or((0.0, 1.0));
    let hi = if hi > lo { hi } else { lo + 1.0 };
    let lo = if log && lo <= 0.0 { hi * 1e-3 } else { lo };
    ZScale { min: lo, max: hi, log }
}
