use serde::{Deserialize, Serialize};

use super::axis::Axis;
use super::cells::Cells;
use super::hist1d::Hist1D;
use super::hist2d::{Hist2D, in_range_sum, integration_window};
use crate::style::HistStyle;
use crate::{Error, Result};

/// Three-dimensional histogram; cell index `x + (nx + 2) * (y + (ny + 2) * z)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hist3D {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    pub z: Axis,
    cells: Cells,
    #[serde(default)]
    pub entries: f64,
    #[serde(default)]
    pub style: HistStyle,
}

impl Hist3D {
    pub fn new(name: impl Into<String>, title: impl Into<String>, x: Axis, y: Axis, z: Axis) -> Self {
        let n = x.ncells() * y.ncells() * z.ncells();
        Self {
            name: name.into(),
            title: title.into(),
            x,
            y,
            z,
            cells: Cells::zeros(n),
            entries: 0.0,
            style: HistStyle::default(),
        }
    }

    /// Build from raw cell arrays including flows.
    #[allow(clippy::too_many_arguments)]
    pub fn from_raw(
        name: impl Into<String>,
        title: impl Into<String>,
        x: Axis,
        y: Axis,
        z: Axis,
        sumw: Vec<f64>,
        sumw2: Option<Vec<f64>>,
        entries: f64,
    ) -> Result<Self> {
        let cells = Cells::from_raw(x.ncells() * y.ncells() * z.ncells(), sumw, sumw2)?;
        Ok(Self {
            name: name.into(),
            title: title.into(),
            x,
            y,
            z,
            cells,
            entries,
            style: HistStyle::default(),
        })
    }

    pub fn bin(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + self.x.ncells() * (iy + self.y.ncells() * iz)
    }

    pub fn fill(&mut self, x: f64, y: f64, z: f64, w: f64) {
        let b = self.bin(self.x.find_bin(x), self.y.find_bin(y), self.z.find_bin(z));
        self.cells.fill(b, w);
        self.entries += 1.0;
    }

    pub fn bin_content(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        self.cells.content(self.bin(ix, iy, iz))
    }

    pub fn bin_error(&self, ix: usize, iy: usize, iz: usize) -> f64 {
        self.cells.error(self.bin(ix, iy, iz))
    }

    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        let mut h = self.clone();
        h.name = name.into();
        h
    }

    /// In-range `num / den`, written bin by bin into an emptied copy of
    /// `num`: flow cells stay 0 and cells with an empty denominator are 0.
    /// A numerator with sumw2 leaves the ratio with zero errors, one without
    /// gets Poisson errors of the ratio values. Entries count the cells set.
    pub fn ratio(name: impl Into<String>, num: &Hist3D, den: &Hist3D) -> Result<Hist3D> {
        if !num.x.same_binning(&den.x) || !num.y.same_binning(&den.y) || !num.z.same_binning(&den.z)
        {
            return Err(Error::Binning(format!(
                "'{}' and '{}' have different binning",
                num.name, den.name
            )));
        }
        let mut out = num.clone_named(name);
        out.cells.reset();
        out.entries = 0.0;
        for iz in 1..=num.z.nbins() {
            for iy in 1..=num.y.nbins() {
                for ix in 1..=num.x.nbins() {
                    let b = num.bin(ix, iy, iz);
                    let d = den.cells.content(b);
                    let r = if d != 0.0 { num.cells.content(b) / d } else { 0.0 };
                    out.cells.set_content(b, r);
                    out.entries += 1.0;
                }
            }
        }
        Ok(out)
    }

    /// Project onto Z summing X bins `xbins` and Y bins `ybins` (inclusive).
    pub fn projection_z(
        &self,
        name: impl Into<String>,
        xbins: Option<(usize, usize)>,
        ybins: Option<(usize, usize)>,
    ) -> Hist1D {
        let (xlo, xhi, xfull) = integration_window(&self.x, xbins);
        let (ylo, yhi, yfull) = integration_window(&self.y, ybins);
        let mut cells = Cells::zeros(self.z.ncells());
        if self.cells.has_sumw2() {
            cells.enable_sumw2();
        }
        for iz in 0..self.z.ncells() {
            for iy in ylo..=yhi {
                for ix in xlo..=xhi {
                    let b = self.bin(ix, iy, iz);
                    cells.accumulate(iz, self.cells.content(b), self.cells.sumw2_at(b));
                }
            }
        }
        let entries = if xfull && yfull { self.entries } else { in_range_sum(&cells, &self.z) };
        Hist1D::from_parts(name, self.title.clone(), self.z.without_range(), cells, entries)
    }

    /// Two-dimensional "zy" projection: Y on the horizontal axis, Z on the
    /// vertical one, X integrated over its range (all cells when unset).
    pub fn project_zy(&self, name: impl Into<String>) -> Hist2D {
        let (xlo, xhi, full) = integration_window(&self.x, None);
        let mut out =
            Hist2D::new(name, self.title.clone(), self.y.without_range(), self.z.without_range());
        if self.cells.has_sumw2() {
            out.enable_sumw2();
        }
        let mut total = 0.0;
        for iz in 0..self.z.ncells() {
            for iy in 0..self.y.ncells() {
                for ix in xlo..=xhi {
                    let b = self.bin(ix, iy, iz);
                    let w = self.cells.content(b);
                    out.accumulate(iy, iz, w, self.cells.sumw2_at(b));
                    if (1..=self.y.nbins()).contains(&iy) && (1..=self.z.nbins()).contains(&iz) {
                        total += w;
                    }
                }
            }
        }
        out.entries = if full { self.entries } else { total };
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube() -> Hist3D {
        let ax = || Axis::uniform(2, 0.0, 2.0).unwrap();
        Hist3D::new("h3", "", ax(), ax(), ax())
    }

    #[test]
    fn ratio_zero_where_denominator_empty() {
        let mut num = cube();
        let mut den = cube();
        num.fill(0.5, 0.5, 0.5, 1.0);
        den.fill(0.5, 0.5, 0.5, 1.0);
        den.fill(0.5, 0.5, 0.5, 1.0);
        num.fill(1.5, 1.5, 1.5, 1.0);
        let r = Hist3D::ratio("r", &num, &den).unwrap();
        assert_relative_eq!(r.bin_content(1, 1, 1), 0.5);
        assert_eq!(r.bin_content(2, 2, 2), 0.0);
    }

    #[test]
    fn ratio_leaves_flow_cells_empty() {
        let mut num = cube();
        let mut den = cube();
        num.fill(5.0, 0.5, 0.5, 3.0);
        den.fill(5.0, 0.5, 0.5, 3.0);
        num.fill(0.5, 0.5, 0.5, 1.0);
        den.fill(0.5, 0.5, 0.5, 2.0);
        let r = Hist3D::ratio("r", &num, &den).unwrap();
        assert_eq!(r.bin_content(3, 1, 1), 0.0);
        assert_relative_eq!(r.bin_content(1, 1, 1), 0.5);
        // Weighted numerator: sumw2 emptied with the contents.
        assert_eq!(r.bin_error(1, 1, 1), 0.0);
        assert_eq!(r.entries, 8.0);

        let zy = r.project_zy("zy");
        assert_relative_eq!(zy.bin_content(1, 1), 0.5);
    }

    #[test]
    fn ratio_of_unweighted_numerator_has_poisson_errors() {
        let mut num = cube();
        let mut den = cube();
        num.fill(1.5, 0.5, 0.5, 1.0);
        num.fill(1.5, 0.5, 0.5, 1.0);
        den.fill(1.5, 0.5, 0.5, 1.0);
        let r = Hist3D::ratio("r", &num, &den).unwrap();
        assert_relative_eq!(r.bin_content(2, 1, 1), 2.0);
        assert_relative_eq!(r.bin_error(2, 1, 1), 2.0_f64.sqrt());
    }

    #[test]
    fn projection_z_window() {
        let mut h = cube();
        h.fill(0.5, 0.5, 0.5, 1.0);
        h.fill(0.5, 1.5, 1.5, 1.0);
        h.fill(1.5, 1.5, 1.5, 1.0);
        let pz = h.projection_z("pz", Some((1, 1)), Some((1, 2)));
        assert_eq!(pz.contents(), vec![1.0, 1.0]);
        assert_eq!(pz.entries, 2.0);
        let all = h.projection_z("all", None, None);
        assert_eq!(all.contents(), vec![1.0, 2.0]);
        assert_eq!(all.entries, 3.0);
    }

    #[test]
    fn project_zy_honors_x_range() {
        let mut h = cube();
        h.fill(0.5, 0.5, 1.5, 1.0);
        h.fill(1.5, 0.5, 1.5, 1.0);
        h.x.set_range(2, 2);
        let zy = h.project_zy("zy");
        assert_eq!(zy.bin_content(1, 2), 1.0);
        assert_eq!(zy.entries, 1.0);
    }
}
