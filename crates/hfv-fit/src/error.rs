//! Fit errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FitError {
    /// No counts inside the fit range
    #[error("histogram '{0}' has no entries in the fit range")]
    EmptyHistogram(String),

    /// Bad configuration (bounds, range)
    #[error("invalid fit configuration: {0}")]
    Config(String),

    /// Minimizer failure
    #[error("optimizer failed: {0}")]
    Optimizer(String),

    #[error(transparent)]
    Hist(#[from] hfv_core::Error),
}

pub type Result<T> = std::result::Result<T, FitError>;
