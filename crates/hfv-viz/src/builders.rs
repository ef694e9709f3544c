//! Conversions from histograms to series and frames.
//!
//! Only bins inside the axis range are converted, matching what ROOT draws.

use hfv_core::{Axis, Hist1D, Hist2D, HistStyle};

use crate::figure::{CurveSeries, Frame, HeatmapSeries, HistSeries, PointSeries};

impl PointSeries {
    /// Markers at bin centers with half-width x errors and bin errors in y.
    pub fn from_h1(h: &Hist1D, label: impl Into<String>) -> Self {
        let bins = h.x.first().max(1)..=h.x.last().min(h.nbins());
        let mut s = Self {
            label: label.into(),
            x: Vec::new(),
            y: Vec::new(),
            xerr: Vec::new(),
            yerr: Vec::new(),
            style: h.style.clone(),
        };
        for b in bins {
            s.x.push(h.x.center(b));
            s.xerr.push(h.x.width(b) / 2.0);
            s.y.push(h.bin_content(b));
            s.yerr.push(h.bin_error(b));
        }
        s
    }

    /// Points without x errors (TGraph-like).
    pub fn from_xy(label: impl Into<String>, x: Vec<f64>, y: Vec<f64>, style: HistStyle) -> Self {
        let n = x.len().min(y.len());
        Self { label: label.into(), xerr: vec![0.0; n], yerr: vec![0.0; n], x, y, style }
    }

    pub fn with_style(mut self, style: HistStyle) -> Self {
        self.style = style;
        self
    }
}

impl HistSeries {
    /// Step outline of the in-range bins.
    pub fn from_h1(h: &Hist1D, label: impl Into<String>) -> Self {
        let (first, last) = (h.x.first().max(1), h.x.last().min(h.nbins()));
        let mut edges = Vec::with_capacity(last.saturating_sub(first) + 2);
        let mut y = Vec::with_capacity(last.saturating_sub(first) + 1);
        for b in first..=last {
            edges.push(h.x.low_edge(b));
            y.push(h.bin_content(b));
        }
        if last >= first {
            edges.push(h.x.up_edge(last));
        }
        Self { label: label.into(), edges, y, style: h.style.clone() }
    }
}

impl CurveSeries {
    pub fn new(label: impl Into<String>, x: Vec<f64>, y: Vec<f64>, style: HistStyle) -> Self {
        Self { label: label.into(), x, y, style }
    }
}

impl HeatmapSeries {
    /// Color map of the in-range bins of `h`.
    pub fn from_h2(h: &Hist2D, label: impl Into<String>) -> Self {
        let (x_edges, xr) = range_edges(&h.x);
        let (y_edges, yr) = range_edges(&h.y);
        let mut z = Vec::with_capacity(x_edges.len() * y_edges.len());
        for iy in yr.clone() {
            for ix in xr.clone() {
                z.push(h.bin_content(ix, iy));
            }
        }
        Self { label: label.into(), x_edges, y_edges, z, z_title: String::new(), show_values: false }
    }

    pub fn with_values(mut self) -> Self {
        self.show_values = true;
        self
    }
}

fn range_edges(axis: &Axis) -> (Vec<f64>, std::ops::RangeInclusive<usize>) {
    let (first, last) = (axis.first().max(1), axis.last().min(axis.nbins()));
    let mut edges: Vec<f64> = (first..=last).map(|b| axis.low_edge(b)).collect();
    if last >= first {
        edges.push(axis.up_edge(last));
    }
    (edges, first..=last)
}

impl Frame {
    /// Frame a histogram is drawn in when it is the first object in a pad.
    ///
    /// The y range is the content range with errors plus 5% headroom (zero
    /// based for non-negative contents); log pads use half/double of the
    /// positive extremes. Bin labels replace numeric x ticks.
    pub fn from_h1(h: &Hist1D, log_y: bool) -> Self {
        let (first, last) = (h.x.first().max(1), h.x.last().min(h.nbins()));
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for b in first..=last {
            let (c, e) = (h.bin_content(b), h.bin_error(b));
            for v in [c - e, c + e] {
                if !log_y || v > 0.0 {
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
        }
        let (y_min, y_max) = if !lo.is_finite() {
            if log_y { (0.1, 10.0) } else { (0.0, 1.0) }
        } else if log_y {
            (lo * 0.5, hi * 2.0)
        } else {
            let span = (hi - lo).max(1e-12);
            let lo = if lo >= 0.0 { 0.0 } else { lo - 0.05 * span };
            (lo, hi + 0.05 * span)
        };
        let mut f = Frame::new(h.x.low_edge(first), y_min, h.x.up_edge(last), y_max.max(y_min + 1e-12), "")
            .with_title(h.title.clone())
            .with_x_title(h.x.title.clone());
        if h.x.has_labels() {
            f.x_bin_labels = (first..=last)
                .filter_map(|b| h.x.bin_label(b).map(|l| (h.x.center(b), l.to_string())))
                .collect();
        }
        f
    }

    /// Frame spanning the in-range bins of a 2D histogram.
    pub fn from_h2(h: &Hist2D) -> Self {
        let (xe, _) = range_edges(&h.x);
        let (ye, _) = range_edges(&h.y);
        let (x0, x1) = (xe.first().copied().unwrap_or(0.0), xe.last().copied().unwrap_or(1.0));
        let (y0, y1) = (ye.first().copied().unwrap_or(0.0), ye.last().copied().unwrap_or(1.0));
        let mut f = Frame::new(x0, y0, x1, y1, "")
            .with_title(h.title.clone())
            .with_x_title(h.x.title.clone())
            .with_y_title(h.y.title.clone());
        if h.x.has_labels() {
            f.x_bin_labels = (1..=h.x.nbins())
                .filter_map(|b| h.x.bin_label(b).map(|l| (h.x.center(b), l.to_string())))
                .collect();
        }
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn h1() -> Hist1D {
        let mut h = Hist1D::from_contents(
            "h",
            Axis::variable(vec![0.0, 1.0, 3.0, 5.0]).unwrap().with_title("#it{p}_{T}"),
            &[4.0, 9.0, 16.0],
        )
        .unwrap();
        h.title = "prompt".into();
        h
    }

    #[test]
    fn points_use_centers_and_half_widths() {
        let s = PointSeries::from_h1(&h1(), "all");
        assert_eq!(s.x, vec![0.5, 2.0, 4.0]);
        assert_eq!(s.xerr, vec![0.5, 1.0, 1.0]);
        assert_eq!(s.y, vec![4.0, 9.0, 16.0]);
        assert_relative_eq!(s.yerr[1], 3.0);
    }

    #[test]
    fn axis_range_limits_bins() {
        let mut h = h1();
        h.x.set_range(2, 3);
        let s = PointSeries::from_h1(&h, "");
        assert_eq!(s.x, vec![2.0, 4.0]);
        let hs = HistSeries::from_h1(&h, "");
        assert_eq!(hs.edges, vec![1.0, 3.0, 5.0]);
        assert_eq!(hs.y, vec![9.0, 16.0]);
    }

    #[test]
    fn frame_from_hist() {
        let f = Frame::from_h1(&h1(), false);
        assert_eq!(f.title, "prompt");
        assert_eq!(f.x_title, "#it{p}_{T}");
        assert_relative_eq!(f.x_min, 0.0);
        assert_relative_eq!(f.x_max, 5.0);
        assert_relative_eq!(f.y_min, 0.0);
        // max content + error = 20, min content - error = 2
        assert_relative_eq!(f.y_max, 20.0 + 0.05 * 18.0);

        let g = Frame::from_h1(&h1(), true);
        assert_relative_eq!(g.y_min, 1.0);
        assert_relative_eq!(g.y_max, 40.0);
    }

    #[test]
    fn heatmap_layout_is_row_major() {
        let mut h = Hist2D::new(
            "h2",
            "",
            Axis::uniform(2, 0.0, 2.0).unwrap(),
            Axis::uniform(3, 0.0, 3.0).unwrap(),
        );
        h.fill(1.5, 0.5, 1.0);
        h.fill(0.5, 2.5, 2.0);
        let m = HeatmapSeries::from_h2(&h, "");
        assert_eq!(m.nx(), 2);
        assert_eq!(m.ny(), 3);
        assert_eq!(m.value(1, 0), 1.0);
        assert_eq!(m.value(0, 2), 2.0);
        assert_eq!(m.z.iter().sum::<f64>(), 3.0);
    }
}
