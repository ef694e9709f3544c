//! # hfv-core
//!
//! Histogram model shared by the hfv crates: binned axes with ROOT-style
//! flow bins and ranges, 1D/2D/3D histograms with sum-of-weights-squared
//! errors, sparse N-dimensional histograms, drawing styles and JSON
//! output bundles.

#![warn(clippy::all)]

pub mod bundle;
pub mod error;
pub mod hist;
pub mod source;
pub mod style;

pub use bundle::HistBundle;
pub use error::{Error, Result};
pub use hist::{AnyHist, Axis, DivideMode, Hist1D, Hist2D, Hist3D, SparseHist, StepHist};
pub use source::HistSource;
pub use style::HistStyle;
