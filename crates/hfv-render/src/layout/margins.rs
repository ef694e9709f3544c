use hfv_viz::Margins;

use crate::config::PadConfig;

/// Rectangular area within the canvas, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn manual(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Frame area of a pad after removing its margins.
    pub fn inset(&self, m: &Margins) -> Self {
        let left = self.left + m.left * self.width;
        let top = self.top + m.top * self.height;
        let width = (self.width * (1.0 - m.left - m.right)).max(1.0);
        let height = (self.height * (1.0 - m.top - m.bottom)).max(1.0);
        Self { left, top, width, height }
    }

    /// Point for pad NDC `(x, y)`, y measured upwards.
    pub fn ndc(&self, x: f64, y: f64) -> (f64, f64) {
        (self.left + x * self.width, self.top + (1.0 - y) * self.height)
    }

    /// Pixel size of a text size given as a fraction of the pad.
    pub fn text_px(&self, size: f64) -> f64 {
        size * self.width.min(self.height)
    }
}

/// Margins from the gStyle defaults.
pub fn default_margins(pad: &PadConfig) -> Margins {
    Margins {
        left: pad.left_margin,
        right: pad.right_margin,
        top: pad.top_margin,
        bottom: pad.bottom_margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inset_and_ndc() {
        let pad = PlotArea::manual(100.0, 0.0, 400.0, 300.0);
        let m = Margins { left: 0.15, right: 0.035, top: 0.075, bottom: 0.1 };
        let f = pad.inset(&m);
        assert_relative_eq!(f.left, 160.0);
        assert_relative_eq!(f.top, 22.5);
        assert_relative_eq!(f.right(), 486.0);
        assert_relative_eq!(f.bottom(), 270.0);
        let (x, y) = pad.ndc(0.5, 0.9);
        assert_relative_eq!(x, 300.0);
        assert_relative_eq!(y, 30.0, epsilon = 1e-9);
        assert_relative_eq!(pad.text_px(0.05), 15.0);
    }
}
