//! Uniform read access to histogram containers.

use crate::hist::{AnyHist, Hist1D, Hist2D, Hist3D, SparseHist, StepHist};
use crate::{Error, Result};

/// A container of named histograms (a ROOT file or a JSON bundle).
///
/// Paths use `/` between directory levels, e.g. `efficiencies/h_pt_eff_prompt_step8`.
pub trait HistSource {
    /// Read the object at `path`.
    fn get_any(&self, path: &str) -> Result<AnyHist>;

    /// `true` when an object exists at `path`.
    fn contains(&self, path: &str) -> bool {
        self.get_any(path).is_ok()
    }

    fn get_h1(&self, path: &str) -> Result<Hist1D> {
        match self.get_any(path)? {
            AnyHist::H1(h) => Ok(h),
            other => Err(mismatch(path, "TH1", &other)),
        }
    }

    fn get_h2(&self, path: &str) -> Result<Hist2D> {
        match self.get_any(path)? {
            AnyHist::H2(h) => Ok(h),
            other => Err(mismatch(path, "TH2", &other)),
        }
    }

    fn get_h3(&self, path: &str) -> Result<Hist3D> {
        match self.get_any(path)? {
            AnyHist::H3(h) => Ok(h),
            other => Err(mismatch(path, "TH3", &other)),
        }
    }

    fn get_sparse(&self, path: &str) -> Result<SparseHist> {
        match self.get_any(path)? {
            AnyHist::Sparse(h) => Ok(h),
            other => Err(mismatch(path, "THnSparse", &other)),
        }
    }

    fn get_steps(&self, path: &str) -> Result<StepHist> {
        match self.get_any(path)? {
            AnyHist::Steps(h) => Ok(h),
            other => Err(mismatch(path, "StepTHn", &other)),
        }
    }
}

fn mismatch(path: &str, expected: &'static str, found: &AnyHist) -> Error {
    Error::TypeMismatch { path: path.to_string(), expected, found: found.kind() }
}
