use serde::{Deserialize, Serialize};

use super::axis::Axis;
use super::cells::{Cells, DivideMode};
use super::hist1d::Hist1D;
use crate::style::HistStyle;
use crate::{Error, Result};

/// Two-dimensional histogram; cell index `x + (nx + 2) * y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist2D {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    cells: Cells,
    #[serde(default)]
    pub entries: f64,
    #[serde(default)]
    pub style: HistStyle,
}

impl Hist2D {
    pub fn new(name: impl Into<String>, title: impl Into<String>, x: Axis, y: Axis) -> Self {
        let n = x.ncells() * y.ncells();
        Self {
            name: name.into(),
            title: title.into(),
            x,
            y,
            cells: Cells::zeros(n),
            entries: 0.0,
            style: HistStyle::default(),
        }
    }

    /// Build from raw cell arrays including flows.
    pub fn from_raw(
        name: impl Into<String>,
        title: impl Into<String>,
        x: Axis,
        y: Axis,
        sumw: Vec<f64>,
        sumw2: Option<Vec<f64>>,
        entries: f64,
    ) -> Result<Self> {
        let cells = Cells::from_raw(x.ncells() * y.ncells(), sumw, sumw2)?;
        Ok(Self {
            name: name.into(),
            title: title.into(),
            x,
            y,
            cells,
            entries,
            style: HistStyle::default(),
        })
    }

    /// Global cell index of `(ix, iy)`.
    pub fn bin(&self, ix: usize, iy: usize) -> usize {
        ix + self.x.ncells() * iy
    }

    pub fn fill(&mut self, x: f64, y: f64, w: f64) {
        let bin = self.bin(self.x.find_bin(x), self.y.find_bin(y));
        self.cells.fill(bin, w);
        self.entries += 1.0;
    }

    pub fn bin_content(&self, ix: usize, iy: usize) -> f64 {
        self.cells.content(self.bin(ix, iy))
    }

    pub fn bin_error(&self, ix: usize, iy: usize) -> f64 {
        self.cells.error(self.bin(ix, iy))
    }

    pub fn set_bin_content(&mut self, ix: usize, iy: usize, v: f64) {
        let b = self.bin(ix, iy);
        self.cells.set_content(b, v);
    }

    pub(crate) fn accumulate(&mut self, ix: usize, iy: usize, w: f64, w2: f64) {
        let b = self.bin(ix, iy);
        self.cells.accumulate(b, w, w2);
    }

    pub(crate) fn enable_sumw2(&mut self) {
        self.cells.enable_sumw2();
    }

    /// Sum over in-range bins of both axes.
    pub fn integral(&self) -> f64 {
        let mut s = 0.0;
        for iy in self.y.first()..=self.y.last() {
            for ix in self.x.first()..=self.x.last() {
                s += self.bin_content(ix, iy);
            }
        }
        s
    }

    pub fn scale(&mut self, c: f64) {
        self.cells.scale(c);
    }

    pub fn add(&mut self, other: &Hist2D, c: f64) -> Result<()> {
        self.check_compatible(other)?;
        self.cells.add(&other.cells, c)?;
        self.entries += c * other.entries;
        Ok(())
    }

    pub fn divide(
        name: impl Into<String>,
        num: &Hist2D,
        den: &Hist2D,
        mode: DivideMode,
    ) -> Result<Hist2D> {
        num.check_compatible(den)?;
        let cells = Cells::divide(&num.cells, &den.cells, mode)?;
        Ok(Hist2D {
            name: name.into(),
            title: num.title.clone(),
            x: num.x.clone(),
            y: num.y.clone(),
            cells,
            entries: num.entries,
            style: num.style.clone(),
        })
    }

    pub fn reset(&mut self) {
        self.cells.reset();
        self.entries = 0.0;
    }

    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        let mut h = self.clone();
        h.name = name.into();
        h
    }

    /// Project onto X summing Y bins `ybins` (inclusive). `None` uses the Y
    /// axis range, or every Y cell including flows when no range is set.
    pub fn projection_x(&self, name: impl Into<String>, ybins: Option<(usize, usize)>) -> Hist1D {
        let (ylo, yhi, full) = integration_window(&self.y, ybins);
        let mut cells = Cells::zeros(self.x.ncells());
        if self.cells.has_sumw2() {
            cells.enable_sumw2();
        }
        for iy in ylo..=yhi {
            for ix in 0..self.x.ncells() {
                let b = self.bin(ix, iy);
                cells.accumulate(ix, self.cells.content(b), self.cells.sumw2_at(b));
            }
        }
        let entries = if full { self.entries } else { in_range_sum(&cells, &self.x) };
        Hist1D::from_parts(name, self.title.clone(), self.x.without_range(), cells, entries)
    }

    /// Project onto Y summing X bins `xbins` (inclusive).
    pub fn projection_y(&self, name: impl Into<String>, xbins: Option<(usize, usize)>) -> Hist1D {
        let (xlo, xhi, full) = integration_window(&self.x, xbins);
        let mut cells = Cells::zeros(self.y.ncells());
        if self.cells.has_sumw2() {
            cells.enable_sumw2();
        }
        for iy in 0..self.y.ncells() {
            for ix in xlo..=xhi {
                let b = self.bin(ix, iy);
                cells.accumulate(iy, self.cells.content(b), self.cells.sumw2_at(b));
            }
        }
        let entries = if full { self.entries } else { in_range_sum(&cells, &self.y) };
        Hist1D::from_parts(name, self.title.clone(), self.y.without_range(), cells, entries)
    }

    fn check_compatible(&self, other: &Hist2D) -> Result<()> {
        if !self.x.same_binning(&other.x) || !self.y.same_binning(&other.y) {
            return Err(Error::Binning(format!(
                "'{}' and '{}' have different binning",
                self.name, other.name
            )));
        }
        Ok(())
    }
}

/// Resolve the summed bin window of an integrated axis. The flag is `true`
/// when the window spans every cell.
pub(crate) fn integration_window(axis: &Axis, bins: Option<(usize, usize)>) -> (usize, usize, bool) {
    let max = axis.nbins() + 1;
    let (lo, hi) = match bins {
        Some((lo, hi)) => (lo.min(max), hi.min(max)),
        None => {
            let r = axis.integration_bins();
            (*r.start(), *r.end())
        }
    };
    (lo, hi, lo == 0 && hi == max)
}

pub(crate) fn in_range_sum(cells: &Cells, axis: &Axis) -> f64 {
    (1..=axis.nbins()).map(|b| cells.content(b)).sum()
}
