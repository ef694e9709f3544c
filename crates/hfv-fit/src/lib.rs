//! # hfv-fit
//!
//! Invariant-mass fits for charm-hadron candidates: a Gaussian signal on an
//! exponential background, both normalized on the fit range, fitted to binned
//! spectra by bounded L-BFGS. Signal and background yields, S/B and
//! significance are extracted in a `μ ± 3σ` window with propagated errors.

#![warn(clippy::all)]

pub mod error;
pub mod hessian;
pub mod mass_fit;
pub mod model;
pub mod optimizer;

pub use error::{FitError, Result};
pub use mass_fit::{FitCurves, MassFitConfig, MassFitResult, MassFitter, Measurement};
pub use model::{MassModel, ParamSpec};
pub use optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizerConfig};
