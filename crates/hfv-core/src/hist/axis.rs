//! Binned axis with ROOT-style bin numbering and user ranges.
//!
//! Bins are numbered `1..=nbins`; bin `0` is the underflow and `nbins + 1`
//! the overflow. A range restricts projections and integrals to
//! `first..=last` (flow bins included when the range reaches them).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A binned axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// Axis title (ROOT TLatex markup allowed).
    #[serde(default)]
    pub title: String,
    edges: Vec<f64>,
    /// Per-bin labels, index `bin - 1`. Empty when the axis is unlabelled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<(usize, usize)>,
}

impl Axis {
    /// `n` equal-width bins on `[lo, hi)`.
    pub fn uniform(n: usize, lo: f64, hi: f64) -> Result<Self> {
        if n == 0 || !(hi > lo) {
            return Err(Error::Binning(format!("invalid uniform axis: n={n}, [{lo}, {hi})")));
        }
        let w = (hi - lo) / n as f64;
        let mut edges: Vec<f64> = (0..=n).map(|i| lo + w * i as f64).collect();
        edges[n] = hi;
        Ok(Self { title: String::new(), edges, labels: Vec::new(), range: None })
    }

    /// Variable-width bins from strictly increasing edges.
    pub fn variable(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(Error::Binning(format!("need at least 2 edges, got {}", edges.len())));
        }
        if edges.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::Binning("bin edges must be strictly increasing".into()));
        }
        Ok(Self { title: String::new(), edges, labels: Vec::new(), range: None })
    }

    /// Builder-style title setter.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Number of in-range bins.
    pub fn nbins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Number of cells including both flow bins.
    pub fn ncells(&self) -> usize {
        self.edges.len() + 1
    }

    /// Bin edges (length `nbins + 1`).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower axis limit.
    pub fn xmin(&self) -> f64 {
        self.edges[0]
    }

    /// Upper axis limit.
    pub fn xmax(&self) -> f64 {
        self.edges[self.nbins()]
    }

    /// Lower edge of `bin`. Underflow maps to `-inf`, overflow to the upper limit.
    pub fn low_edge(&self, bin: usize) -> f64 {
        match bin {
            0 => f64::NEG_INFINITY,
            b if b > self.nbins() => self.xmax(),
            b => self.edges[b - 1],
        }
    }

    /// Upper edge of `bin`. Underflow maps to the lower limit, overflow to `+inf`.
    pub fn up_edge(&self, bin: usize) -> f64 {
        match bin {
            0 => self.xmin(),
            b if b > self.nbins() => f64::INFINITY,
            b => self.edges[b],
        }
    }

    /// Bin center (only meaningful for `1..=nbins`).
    pub fn center(&self, bin: usize) -> f64 {
        let b = bin.clamp(1, self.nbins());
        0.5 * (self.edges[b - 1] + self.edges[b])
    }

    /// Bin width (only meaningful for `1..=nbins`).
    pub fn width(&self, bin: usize) -> f64 {
        let b = bin.clamp(1, self.nbins());
        self.edges[b] - self.edges[b - 1]
    }

    /// Bin containing `x`; upper edges are exclusive.
    pub fn find_bin(&self, x: f64) -> usize {
        if x.is_nan() || x < self.xmin() {
            return 0;
        }
        if x >= self.xmax() {
            return self.nbins() + 1;
        }
        // first edge strictly greater than x
        self.edges.partition_point(|&e| e <= x)
    }

    /// Restrict to bins `first..=last`.
    ///
    /// Follows TAxis::SetRange: `last < first`, both negative or both beyond
    /// the overflow reset the range; otherwise limits are clamped to the cells.
    pub fn set_range(&mut self, first: i64, last: i64) {
        let n_cells = self.nbins() as i64 + 1;
        if last < first
            || (first < 0 && last < 0)
            || (first > n_cells && last > n_cells)
            || (first == 0 && last == 0)
        {
            self.range = None;
        } else {
            self.range = Some((first.max(0) as usize, last.min(n_cells) as usize));
        }
    }

    /// Restrict to the bins covering `[lo, hi]` in axis units.
    pub fn set_range_user(&mut self, lo: f64, hi: f64) {
        let mut first = self.find_bin(lo) as i64;
        let mut last = self.find_bin(hi) as i64;
        if self.up_edge(first as usize) <= lo {
            first += 1;
        }
        if self.low_edge(last as usize) >= hi {
            last -= 1;
        }
        self.set_range(first, last);
    }

    /// Drop any range restriction.
    pub fn reset_range(&mut self) {
        self.range = None;
    }

    /// `true` when a range restriction is active.
    pub fn has_range(&self) -> bool {
        self.range.is_some()
    }

    /// Active range as `(first, last)`, if any.
    pub fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    /// Bins used when integrating over this axis: the active range, or every
    /// cell including flows.
    pub fn integration_bins(&self) -> std::ops::RangeInclusive<usize> {
        match self.range {
            Some((first, last)) => first..=last,
            None => 0..=self.nbins() + 1,
        }
    }

    /// First in-range bin (ROOT GetFirst).
    pub fn first(&self) -> usize {
        self.range.map(|(f, _)| f).unwrap_or(1)
    }

    /// Last in-range bin (ROOT GetLast).
    pub fn last(&self) -> usize {
        self.range.map(|(_, l)| l).unwrap_or(self.nbins())
    }

    /// Attach a label to `bin` (1-based).
    pub fn set_bin_label(&mut self, bin: usize, label: impl Into<String>) {
        if bin == 0 || bin > self.nbins() {
            return;
        }
        if self.labels.is_empty() {
            self.labels = vec![String::new(); self.nbins()];
        }
        self.labels[bin - 1] = label.into();
    }

    /// Label of `bin`, if set.
    pub fn bin_label(&self, bin: usize) -> Option<&str> {
        if bin == 0 {
            return None;
        }
        self.labels.get(bin - 1).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// `true` when any bin carries a label.
    pub fn has_labels(&self) -> bool {
        self.labels.iter().any(|l| !l.is_empty())
    }

    /// Same binning as `other` (titles, labels and ranges ignored).
    pub fn same_binning(&self, other: &Axis) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(&other.edges)
                .all(|(a, b)| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0))
    }

    /// Copy of this axis without range restriction.
    pub fn without_range(&self) -> Self {
        let mut a = self.clone();
        a.range = None;
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn find_bin_edges_and_flows() {
        let ax = Axis::uniform(10, 0.0, 10.0).unwrap();
        assert_eq!(ax.find_bin(-0.1), 0);
        assert_eq!(ax.find_bin(0.0), 1);
        assert_eq!(ax.find_bin(0.999), 1);
        assert_eq!(ax.find_bin(1.0), 2);
        assert_eq!(ax.find_bin(9.999), 10);
        assert_eq!(ax.find_bin(10.0), 11);
        assert_eq!(ax.find_bin(f64::NAN), 0);
    }

    #[test]
    fn variable_edges() {
        let ax = Axis::variable(vec![0.0, 1.0, 3.0, 5.0, 8.0]).unwrap();
        assert_eq!(ax.nbins(), 4);
        assert_eq!(ax.find_bin(2.5), 2);
        assert_relative_eq!(ax.center(3), 4.0);
        assert_relative_eq!(ax.width(4), 3.0);
        assert!(Axis::variable(vec![0.0, 1.0, 1.0]).is_err());
        assert!(Axis::variable(vec![0.0]).is_err());
    }

    #[test]
    fn set_range_user_integer_centered_bins() {
        // origin axis: bins centered on 0, 1, 2
        let mut ax = Axis::uniform(3, -0.5, 2.5).unwrap();
        ax.set_range_user(1.0, 1.0);
        assert_eq!(ax.range(), Some((2, 2)));
        ax.set_range_user(2.0, 2.0);
        assert_eq!(ax.range(), Some((3, 3)));
    }

    #[test]
    fn set_range_user_upper_edge_is_exclusive() {
        let mut ax = Axis::uniform(10, 0.0, 10.0).unwrap();
        ax.set_range_user(2.0, 5.0);
        assert_eq!(ax.range(), Some((3, 5)));
    }

    #[test]
    fn set_range_user_beyond_axis_includes_overflow() {
        let mut ax = Axis::uniform(10, 0.0, 50.0).unwrap();
        ax.set_range_user(0.0, 999.0);
        assert_eq!(ax.range(), Some((1, 11)));
    }

    #[test]
    fn set_range_negative_resets() {
        let mut ax = Axis::uniform(4, 0.0, 4.0).unwrap();
        ax.set_range(2, 3);
        assert!(ax.has_range());
        ax.set_range(-1, -1);
        assert!(!ax.has_range());
        assert_eq!(ax.integration_bins(), 0..=5);
    }

    #[test]
    fn labels() {
        let mut ax = Axis::uniform(3, 0.0, 3.0).unwrap();
        assert!(!ax.has_labels());
        ax.set_bin_label(2, "D^{0}");
        assert_eq!(ax.bin_label(2), Some("D^{0}"));
        assert_eq!(ax.bin_label(1), None);
        ax.set_bin_label(7, "ignored");
        assert!(ax.has_labels());
    }
}
