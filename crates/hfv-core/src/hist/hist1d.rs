use serde::{Deserialize, Serialize};

use super::axis::Axis;
use super::cells::{Cells, DivideMode};
use crate::style::HistStyle;
use crate::{Error, Result};

/// One-dimensional histogram with under/overflow cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist1D {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub x: Axis,
    cells: Cells,
    #[serde(default)]
    pub entries: f64,
    #[serde(default)]
    pub style: HistStyle,
}

impl Hist1D {
    /// Empty histogram over `x`.
    pub fn new(name: impl Into<String>, title: impl Into<String>, x: Axis) -> Self {
        let n = x.ncells();
        Self {
            name: name.into(),
            title: title.into(),
            x,
            cells: Cells::zeros(n),
            entries: 0.0,
            style: HistStyle::default(),
        }
    }

    /// Histogram with the given in-range bin contents (flows zero).
    pub fn from_contents(name: impl Into<String>, x: Axis, contents: &[f64]) -> Result<Self> {
        if contents.len() != x.nbins() {
            return Err(Error::Binning(format!(
                "{} contents for {} bins",
                contents.len(),
                x.nbins()
            )));
        }
        let mut h = Self::new(name, "", x);
        for (i, &c) in contents.iter().enumerate() {
            h.cells.set_content(i + 1, c);
        }
        h.entries = contents.iter().sum();
        Ok(h)
    }

    pub(crate) fn from_parts(
        name: impl Into<String>,
        title: impl Into<String>,
        x: Axis,
        cells: Cells,
        entries: f64,
    ) -> Self {
        Self { name: name.into(), title: title.into(), x, cells, entries, style: HistStyle::default() }
    }

    /// Build from raw cell arrays including flows (`nbins + 2` values).
    pub fn from_raw(
        name: impl Into<String>,
        title: impl Into<String>,
        x: Axis,
        sumw: Vec<f64>,
        sumw2: Option<Vec<f64>>,
        entries: f64,
    ) -> Result<Self> {
        let cells = Cells::from_raw(x.ncells(), sumw, sumw2)?;
        Ok(Self::from_parts(name, title, x, cells, entries))
    }

    /// Number of in-range bins.
    pub fn nbins(&self) -> usize {
        self.x.nbins()
    }

    /// Increment the bin containing `x` by `w`.
    pub fn fill(&mut self, x: f64, w: f64) {
        let bin = self.x.find_bin(x);
        self.cells.fill(bin, w);
        self.entries += 1.0;
    }

    pub fn bin_content(&self, bin: usize) -> f64 {
        self.cells.content(bin)
    }

    pub fn bin_error(&self, bin: usize) -> f64 {
        self.cells.error(bin)
    }

    pub fn set_bin_content(&mut self, bin: usize, v: f64) {
        self.cells.set_content(bin, v);
    }

    pub fn set_bin_error(&mut self, bin: usize, e: f64) {
        self.cells.set_error(bin, e);
    }

    /// Raw contents including flow cells.
    pub fn raw_contents(&self) -> &[f64] {
        self.cells.contents()
    }

    /// In-range bin contents.
    pub fn contents(&self) -> Vec<f64> {
        (1..=self.nbins()).map(|b| self.bin_content(b)).collect()
    }

    /// In-range bin errors.
    pub fn errors(&self) -> Vec<f64> {
        (1..=self.nbins()).map(|b| self.bin_error(b)).collect()
    }

    /// Sum of contents over the axis range (all in-range bins when unset).
    pub fn integral(&self) -> f64 {
        (self.x.first()..=self.x.last()).map(|b| self.bin_content(b)).sum()
    }

    /// Sum of contents over bins `first..=last`.
    pub fn integral_bins(&self, first: usize, last: usize) -> f64 {
        (first..=last.min(self.nbins() + 1)).map(|b| self.bin_content(b)).sum()
    }

    /// Largest in-range bin content.
    pub fn maximum(&self) -> f64 {
        (1..=self.nbins()).map(|b| self.bin_content(b)).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest in-range bin content.
    pub fn minimum(&self) -> f64 {
        (1..=self.nbins()).map(|b| self.bin_content(b)).fold(f64::INFINITY, f64::min)
    }

    /// Enable per-bin squared weights.
    pub fn sumw2(&mut self) {
        self.cells.enable_sumw2();
    }

    pub fn has_sumw2(&self) -> bool {
        self.cells.has_sumw2()
    }

    pub fn scale(&mut self, c: f64) {
        self.cells.scale(c);
    }

    /// `self += c * other`.
    pub fn add(&mut self, other: &Hist1D, c: f64) -> Result<()> {
        self.check_compatible(other)?;
        self.cells.add(&other.cells, c)?;
        self.entries += c * other.entries;
        Ok(())
    }

    /// `num / den` bin by bin; zero denominators give empty bins.
    pub fn divide(
        name: impl Into<String>,
        num: &Hist1D,
        den: &Hist1D,
        mode: DivideMode,
    ) -> Result<Hist1D> {
        num.check_compatible(den)?;
        let cells = Cells::divide(&num.cells, &den.cells, mode)?;
        let mut out =
            Self::from_parts(name, num.title.clone(), num.x.clone(), cells, num.entries);
        out.style = num.style.clone();
        Ok(out)
    }

    /// Zero all cells and entries.
    pub fn reset(&mut self) {
        self.cells.reset();
        self.entries = 0.0;
    }

    /// Copy under a new name.
    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        let mut h = self.clone();
        h.name = name.into();
        h
    }

    /// Merge bins into the given edges, which must coincide with existing edges.
    ///
    /// Bins outside the new edges are accumulated into the flow cells.
    pub fn rebin(&self, name: impl Into<String>, edges: &[f64]) -> Result<Hist1D> {
        let old = self.x.edges();
        for &e in edges {
            let tol = 1e-9 * e.abs().max(1.0);
            if !old.iter().any(|&o| (o - e).abs() <= tol) {
                return Err(Error::Binning(format!(
                    "rebin edge {e} of '{}' does not match an existing edge",
                    self.name
                )));
            }
        }
        let mut axis = Axis::variable(edges.to_vec())?.with_title(self.x.title.clone());
        axis.reset_range();
        let mut cells = Cells::zeros(axis.ncells());
        if self.has_sumw2() {
            cells.enable_sumw2();
        }
        for bin in 0..=self.nbins() + 1 {
            let target = match bin {
                0 => 0,
                b if b > self.nbins() => axis.nbins() + 1,
                b => axis.find_bin(self.x.center(b)),
            };
            cells.accumulate(target, self.cells.content(bin), self.cells.sumw2_at(bin));
        }
        let mut out = Self::from_parts(name, self.title.clone(), axis, cells, self.entries);
        out.style = self.style.clone();
        Ok(out)
    }

    fn check_compatible(&self, other: &Hist1D) -> Result<()> {
        if !self.x.same_binning(&other.x) {
            return Err(Error::Binning(format!(
                "'{}' and '{}' have different binning",
                self.name, other.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn h(contents: &[f64]) -> Hist1D {
        let ax = Axis::uniform(contents.len(), 0.0, contents.len() as f64).unwrap();
        Hist1D::from_contents("h", ax, contents).unwrap()
    }

    #[test]
    fn fill_counts_flows() {
        let mut hist = Hist1D::new("h", "", Axis::uniform(4, 0.0, 4.0).unwrap());
        hist.fill(-1.0, 1.0);
        hist.fill(0.5, 1.0);
        hist.fill(0.7, 1.0);
        hist.fill(9.0, 1.0);
        assert_eq!(hist.bin_content(0), 1.0);
        assert_eq!(hist.bin_content(1), 2.0);
        assert_eq!(hist.bin_content(5), 1.0);
        assert_eq!(hist.entries, 4.0);
        assert_eq!(hist.integral(), 2.0);
        assert_relative_eq!(hist.bin_error(1), 2.0_f64.sqrt());
    }

    #[test]
    fn rebin_variable_edges() {
        let mut hist = Hist1D::new("pt", "", Axis::uniform(10, 0.0, 10.0).unwrap());
        for i in 0..10 {
            hist.fill(i as f64 + 0.5, 1.0);
        }
        hist.fill(12.0, 1.0);
        let r = hist.rebin("pt_rebin", &[0.0, 1.0, 3.0, 5.0, 8.0]).unwrap();
        assert_eq!(r.nbins(), 4);
        assert_eq!(r.contents(), vec![1.0, 2.0, 2.0, 3.0]);
        // bins 8-10 plus the original overflow
        assert_eq!(r.bin_content(5), 3.0);
        assert_eq!(r.entries, 11.0);
    }

    #[test]
    fn rebin_rejects_misaligned_edges() {
        let hist = h(&[1.0, 2.0, 3.0]);
        assert!(hist.rebin("bad", &[0.0, 1.5, 3.0]).is_err());
    }

    #[test]
    fn subtract_histograms() {
        let mut a = h(&[10.0, 20.0]);
        let b = h(&[1.0, 5.0]);
        a.add(&b, -1.0).unwrap();
        assert_eq!(a.contents(), vec![9.0, 15.0]);
        assert_relative_eq!(a.bin_error(2), 25.0_f64.sqrt());
    }

    #[test]
    fn divide_binomial_zero_denominator() {
        let num = h(&[2.0, 0.0, 5.0]);
        let den = h(&[4.0, 0.0, 5.0]);
        let eff = Hist1D::divide("eff", &num, &den, DivideMode::Binomial).unwrap();
        assert_eq!(eff.contents(), vec![0.5, 0.0, 1.0]);
        assert_eq!(eff.bin_error(2), 0.0);
        assert_relative_eq!(eff.bin_error(1), (0.25_f64 / 4.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn divide_incompatible_binning_fails() {
        let num = h(&[1.0, 2.0]);
        let den = h(&[1.0, 2.0, 3.0]);
        assert!(Hist1D::divide("r", &num, &den, DivideMode::Plain).is_err());
    }

    #[test]
    fn scale_enables_sumw2() {
        let mut a = h(&[4.0]);
        a.scale(0.5);
        assert!(a.has_sumw2());
        assert_relative_eq!(a.bin_content(1), 2.0);
        assert_relative_eq!(a.bin_error(1), 1.0);
    }

    #[test]
    fn integral_respects_range() {
        let mut a = h(&[1.0, 2.0, 3.0, 4.0]);
        a.x.set_range(2, 3);
        assert_eq!(a.integral(), 5.0);
        a.x.reset_range();
        assert_eq!(a.integral(), 10.0);
    }
}
