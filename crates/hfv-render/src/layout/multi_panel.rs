use hfv_viz::{Figure, Layout, Margins};

use crate::config::PadConfig;
use crate::layout::margins::{PlotArea, default_margins};

/// Gap between divided pads, as a fraction of the canvas (TCanvas::Divide default).
const DIVIDE_MARGIN: f64 = 0.01;

/// Pixel boxes of all pads of a figure.
///
/// Pads with an explicit rectangle use it; the others take the slot the
/// figure layout gives them. Grid slots are numbered row by row from the
/// top-left, like TCanvas::Divide.
pub fn pad_boxes(fig: &Figure) -> crate::Result<Vec<PlotArea>> {
    let (w, h) = (fig.width, fig.height);
    if !(w > 0.0 && h > 0.0) {
        return Err(crate::RenderError::Layout(format!("invalid canvas size {w}x{h}")));
    }
    let slots: Vec<PlotArea> = match fig.layout {
        Layout::Single => vec![PlotArea::manual(0.0, 0.0, w, h)],
        Layout::Grid { nx, ny } => {
            let (nx, ny) = (nx.max(1), ny.max(1));
            let (cw, ch) = (w / nx as f64, h / ny as f64);
            let (mx, my) = (DIVIDE_MARGIN * w, DIVIDE_MARGIN * h);
            (0..ny)
                .flat_map(|iy| {
                    (0..nx).map(move |ix| {
                        PlotArea::manual(ix as f64 * cw + mx, iy as f64 * ch + my, cw - 2.0 * mx, ch - 2.0 * my)
                    })
                })
                .collect()
        }
        Layout::MainRatio { ratio_frac } => {
            let ratio_h = h * ratio_frac.clamp(0.05, 0.95);
            vec![
                PlotArea::manual(0.0, 0.0, w, h - ratio_h),
                PlotArea::manual(0.0, h - ratio_h, w, ratio_h),
            ]
        }
    };

    fig.pads
        .iter()
        .enumerate()
        .map(|(i, pad)| match (&pad.rect, slots.get(i)) {
            (Some(r), _) => Ok(PlotArea::manual(r.x0 * w, (1.0 - r.y1) * h, (r.x1 - r.x0) * w, (r.y1 - r.y0) * h)),
            (None, Some(slot)) => Ok(*slot),
            (None, None) => Err(crate::RenderError::Layout(format!(
                "pad {i} of '{}' has no position in a {} layout",
                fig.name,
                layout_name(&fig.layout)
            ))),
        })
        .collect()
}

/// Margins a pad gets when it sets none.
///
/// In a main/ratio layout the shared edge has almost no margin and the ratio
/// pad gets room for the x axis title.
pub fn pad_margins(layout: &Layout, index: usize, pad: &PadConfig) -> Margins {
    let base = default_margins(pad);
    match layout {
        Layout::MainRatio { ratio_frac } => {
            let frac = ratio_frac.clamp(0.05, 0.95);
            if index == 0 {
                Margins { bottom: 0.02, top: base.top / (1.0 - frac), ..base }
            } else {
                Margins { top: 0.02, bottom: (base.bottom / frac).min(0.45), ..base }
            }
        }
        _ => base,
    }
}

fn layout_name(layout: &Layout) -> &'static str {
    match layout {
        Layout::Single => "single",
        Layout::Grid { .. } => "grid",
        Layout::MainRatio { .. } => "main/ratio",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hfv_viz::{Pad, PadRect};

    #[test]
    fn grid_slots_row_by_row() {
        let fig = Figure::grid("c", 1000.0, 500.0, 2, 2);
        let boxes = pad_boxes(&fig).unwrap();
        assert_eq!(boxes.len(), 4);
        assert_relative_eq!(boxes[0].left, 10.0);
        assert_relative_eq!(boxes[0].top, 5.0);
        assert_relative_eq!(boxes[1].left, 510.0);
        assert_relative_eq!(boxes[2].top, 255.0);
        assert_relative_eq!(boxes[3].width, 480.0);
    }

    #[test]
    fn main_ratio_split() {
        let fig = Figure::main_ratio("c", 600.0, 800.0, 0.25);
        let boxes = pad_boxes(&fig).unwrap();
        assert_relative_eq!(boxes[0].height, 600.0);
        assert_relative_eq!(boxes[1].top, 600.0);
        assert_relative_eq!(boxes[1].height, 200.0);
        let m = pad_margins(&fig.layout, 1, &PadConfig::default());
        assert_relative_eq!(m.bottom, 0.4);
    }

    #[test]
    fn explicit_rect_and_missing_slot() {
        let mut fig = Figure::new("c", 800.0, 600.0);
        fig.pads.push(Pad { rect: Some(PadRect { x0: 0.5, y0: 0.5, x1: 1.0, y1: 1.0 }), ..Pad::default() });
        let boxes = pad_boxes(&fig).unwrap();
        assert_eq!(boxes[1], PlotArea::manual(400.0, 0.0, 400.0, 300.0));

        fig.pads.push(Pad::default());
        assert!(matches!(pad_boxes(&fig), Err(crate::RenderError::Layout(_))));
    }
}
