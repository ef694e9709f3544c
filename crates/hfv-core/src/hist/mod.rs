//! Histogram types and algebra.

mod axis;
mod cells;
mod hist1d;
mod hist2d;
mod hist3d;
mod sparse;

pub use axis::Axis;
pub use cells::DivideMode;
pub use hist1d::Hist1D;
pub use hist2d::Hist2D;
pub use hist3d::Hist3D;
pub use sparse::{SparseCell, SparseHist, StepHist};

use serde::{Deserialize, Serialize};

/// Any histogram object that can be read from or written to a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyHist {
    H1(Hist1D),
    H2(Hist2D),
    H3(Hist3D),
    Sparse(SparseHist),
    Steps(StepHist),
}

impl AnyHist {
    /// Short kind name used in listings and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AnyHist::H1(_) => "TH1",
            AnyHist::H2(_) => "TH2",
            AnyHist::H3(_) => "TH3",
            AnyHist::Sparse(_) => "THnSparse",
            AnyHist::Steps(_) => "StepTHn",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnyHist::H1(h) => &h.name,
            AnyHist::H2(h) => &h.name,
            AnyHist::H3(h) => &h.name,
            AnyHist::Sparse(h) => &h.name,
            AnyHist::Steps(h) => &h.name,
        }
    }

    /// Entries (sum over steps for step containers).
    pub fn entries(&self) -> f64 {
        match self {
            AnyHist::H1(h) => h.entries,
            AnyHist::H2(h) => h.entries,
            AnyHist::H3(h) => h.entries,
            AnyHist::Sparse(h) => h.entries,
            AnyHist::Steps(h) => h.steps.iter().flatten().map(|s| s.entries).sum(),
        }
    }
}

impl From<Hist1D> for AnyHist {
    fn from(h: Hist1D) -> Self {
        AnyHist::H1(h)
    }
}

impl From<Hist2D> for AnyHist {
    fn from(h: Hist2D) -> Self {
        AnyHist::H2(h)
    }
}

impl From<Hist3D> for AnyHist {
    fn from(h: Hist3D) -> Self {
        AnyHist::H3(h)
    }
}

impl From<SparseHist> for AnyHist {
    fn from(h: SparseHist) -> Self {
        AnyHist::Sparse(h)
    }
}

impl From<StepHist> for AnyHist {
    fn from(h: StepHist) -> Self {
        AnyHist::Steps(h)
    }
}
