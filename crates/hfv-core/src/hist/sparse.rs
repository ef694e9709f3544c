//! Sparse N-dimensional histograms (THnSparse) and per-step containers (StepTHn).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::axis::Axis;
use super::cells::Cells;
use super::hist1d::Hist1D;
use super::hist2d::Hist2D;
use crate::{Error, Result};

/// Weight and squared weight of one filled cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseCell {
    pub sumw: f64,
    pub sumw2: f64,
}

/// Sparse histogram keyed by per-axis bin coordinates (flows included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseHist {
    pub name: String,
    #[serde(default)]
    pub title: String,
    axes: Vec<Axis>,
    #[serde(with = "cell_list")]
    cells: BTreeMap<Vec<u32>, SparseCell>,
    #[serde(default)]
    pub entries: f64,
}

impl SparseHist {
    pub fn new(name: impl Into<String>, title: impl Into<String>, axes: Vec<Axis>) -> Self {
        Self { name: name.into(), title: title.into(), axes, cells: BTreeMap::new(), entries: 0.0 }
    }

    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Axis `dim`.
    pub fn axis(&self, dim: usize) -> Result<&Axis> {
        self.axes
            .get(dim)
            .ok_or_else(|| Error::Validation(format!("'{}' has no axis {dim}", self.name)))
    }

    /// Mutable axis `dim`, used to set ranges before projecting.
    pub fn axis_mut(&mut self, dim: usize) -> Result<&mut Axis> {
        let name = &self.name;
        self.axes
            .get_mut(dim)
            .ok_or_else(|| Error::Validation(format!("'{name}' has no axis {dim}")))
    }

    /// Drop every axis range.
    pub fn reset_ranges(&mut self) {
        self.axes.iter_mut().for_each(Axis::reset_range);
    }

    /// Number of filled cells.
    pub fn n_filled(&self) -> usize {
        self.cells.len()
    }

    /// Iterate filled cells.
    pub fn iter(&self) -> impl Iterator<Item = (&[u32], &SparseCell)> {
        self.cells.iter().map(|(k, v)| (k.as_slice(), v))
    }

    /// Increment the cell at axis values `x` by `w`.
    pub fn fill(&mut self, x: &[f64], w: f64) -> Result<()> {
        self.check_ndim(x.len())?;
        let coords: Vec<u32> =
            self.axes.iter().zip(x).map(|(a, &v)| a.find_bin(v) as u32).collect();
        self.add_to_bin(coords, w, w * w);
        self.entries += 1.0;
        Ok(())
    }

    /// Add raw `(sumw, sumw2)` to the cell at bin coordinates `coords`.
    pub fn add_to_bin(&mut self, coords: Vec<u32>, w: f64, w2: f64) {
        let cell = self.cells.entry(coords).or_default();
        cell.sumw += w;
        cell.sumw2 += w2;
    }

    /// Content at bin coordinates.
    pub fn bin_content(&self, coords: &[u32]) -> f64 {
        self.cells.get(coords).map(|c| c.sumw).unwrap_or(0.0)
    }

    /// Total weight of all filled cells.
    pub fn total_weight(&self) -> f64 {
        self.cells.values().map(|c| c.sumw).sum()
    }

    /// Merge `other` into `self`.
    pub fn add(&mut self, other: &SparseHist) -> Result<()> {
        self.check_ndim(other.ndim())?;
        for (a, b) in self.axes.iter().zip(&other.axes) {
            if !a.same_binning(b) {
                return Err(Error::Binning(format!(
                    "'{}' and '{}' have different binning",
                    self.name, other.name
                )));
            }
        }
        for (k, c) in &other.cells {
            self.add_to_bin(k.clone(), c.sumw, c.sumw2);
        }
        self.entries += other.entries;
        Ok(())
    }

    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        let mut h = self.clone();
        h.name = name.into();
        h
    }

    /// One-dimensional projection onto `dim` honoring all axis ranges.
    pub fn projection_1d(&self, dim: usize) -> Result<Hist1D> {
        let axis = self.axis(dim)?.without_range();
        let mut cells = Cells::zeros(axis.ncells());
        cells.enable_sumw2();
        let mut total = 0.0;
        for (k, c) in self.selected() {
            let b = k[dim] as usize;
            cells.accumulate(b, c.sumw, c.sumw2);
            total += c.sumw;
        }
        let entries = if self.any_range() { total } else { self.entries };
        let name = format!("{}_proj_{dim}", self.name);
        Ok(Hist1D::from_parts(name, self.title.clone(), axis, cells, entries))
    }

    /// Two-dimensional projection with `ydim` on the vertical and `xdim` on
    /// the horizontal axis (argument order of THnBase::Projection).
    pub fn projection_2d(&self, ydim: usize, xdim: usize) -> Result<Hist2D> {
        let xa = self.axis(xdim)?.without_range();
        let ya = self.axis(ydim)?.without_range();
        let name = format!("{}_proj_{ydim}_{xdim}", self.name);
        let mut h = Hist2D::new(name, self.title.clone(), xa, ya);
        h.enable_sumw2();
        let mut total = 0.0;
        for (k, c) in self.selected() {
            h.accumulate(k[xdim] as usize, k[ydim] as usize, c.sumw, c.sumw2);
            total += c.sumw;
        }
        h.entries = if self.any_range() { total } else { self.entries };
        Ok(h)
    }

    fn any_range(&self) -> bool {
        self.axes.iter().any(Axis::has_range)
    }

    fn selected(&self) -> impl Iterator<Item = (&Vec<u32>, &SparseCell)> {
        self.cells.iter().filter(|(k, _)| {
            self.axes.iter().zip(k.iter()).all(|(a, &b)| match a.range() {
                Some((lo, hi)) => (lo..=hi).contains(&(b as usize)),
                None => true,
            })
        })
    }

    fn check_ndim(&self, n: usize) -> Result<()> {
        if n != self.ndim() {
            return Err(Error::Validation(format!(
                "'{}' has {} dimensions, got {n}",
                self.name,
                self.ndim()
            )));
        }
        Ok(())
    }
}

/// Per-step sparse histograms sharing one set of axes (StepTHn).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepHist {
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub steps: Vec<Option<SparseHist>>,
}

impl StepHist {
    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }

    /// Histogram of `step`; `None` when the step was never filled.
    pub fn step(&self, step: usize) -> Option<&SparseHist> {
        self.steps.get(step).and_then(Option::as_ref)
    }
}

mod cell_list {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::SparseCell;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        bin: Vec<u32>,
        w: f64,
        w2: f64,
    }

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<Vec<u32>, SparseCell>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        let v: Vec<Entry> = cells
            .iter()
            .map(|(k, c)| Entry { bin: k.clone(), w: c.sumw, w2: c.sumw2 })
            .collect();
        v.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<Vec<u32>, SparseCell>, D::Error> {
        let v = Vec::<Entry>::deserialize(d)?;
        Ok(v.into_iter().map(|e| (e.bin, SparseCell { sumw: e.w, sumw2: e.w2 })).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// mass, pt, origin
    fn sample() -> SparseHist {
        let axes = vec![
            Axis::uniform(4, 1.7, 2.1).unwrap(),
            Axis::uniform(5, 0.0, 10.0).unwrap(),
            Axis::uniform(3, -0.5, 2.5).unwrap(),
        ];
        let mut h = SparseHist::new("hs", "", axes);
        h.fill(&[1.86, 1.0, 1.0], 1.0).unwrap();
        h.fill(&[1.86, 3.0, 2.0], 1.0).unwrap();
        h.fill(&[1.95, 3.0, 1.0], 2.0).unwrap();
        h.fill(&[1.75, 15.0, 1.0], 1.0).unwrap();
        h
    }

    #[test]
    fn projection_without_ranges_keeps_entries() {
        let h = sample();
        let p = h.projection_1d(1).unwrap();
        assert_eq!(p.contents(), vec![1.0, 3.0, 0.0, 0.0, 0.0]);
        assert_eq!(p.bin_content(6), 1.0);
        assert_eq!(p.entries, 4.0);
    }

    #[test]
    fn projection_respects_ranges() {
        let mut h = sample();
        h.axis_mut(2).unwrap().set_range_user(1.0, 1.0);
        let p = h.projection_1d(0).unwrap();
        assert_eq!(p.contents(), vec![1.0, 1.0, 2.0, 0.0]);
        assert_relative_eq!(p.entries, 4.0);
        assert_relative_eq!(p.bin_error(3), 2.0);
    }

    #[test]
    fn projection_2d_axis_order() {
        let h = sample();
        let p = h.projection_2d(0, 1).unwrap();
        assert_eq!(p.x.nbins(), 5);
        assert_eq!(p.y.nbins(), 4);
        assert_eq!(p.bin_content(1, 2), 1.0);
    }

    #[test]
    fn add_merges_cells() {
        let mut a = sample();
        let b = sample();
        a.add(&b).unwrap();
        assert_eq!(a.entries, 8.0);
        assert_eq!(a.total_weight(), 10.0);
    }

    #[test]
    fn fill_dimension_mismatch() {
        let mut h = sample();
        assert!(h.fill(&[1.0], 1.0).is_err());
    }

    #[test]
    fn cells_serialize_as_list() {
        let h = sample();
        let v = serde_json::to_value(&h).unwrap();
        let cells = v["cells"].as_array().unwrap();
        assert_eq!(cells.len(), h.n_filled());
        assert_eq!(cells[0]["bin"], serde_json::json!([1, 6, 2]));
        let back: SparseHist = serde_json::from_value(v).unwrap();
        assert_eq!(back.bin_content(&[3, 2, 2]), 2.0);
    }
}
