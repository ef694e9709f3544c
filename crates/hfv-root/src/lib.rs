//! # hfv-root
//!
//! Native reader for the histogram objects stored in ROOT files: TH1/TH2/TH3,
//! THnSparse and StepTHn, addressed by `/`-separated paths through nested
//! TDirectories.
//!
//! Decoded objects are returned as [`hfv_core::AnyHist`], and [`RootFile`]
//! implements [`hfv_core::HistSource`] so analysis code can read from ROOT
//! files and JSON bundles alike.

#![warn(clippy::all)]

mod datasource;
pub mod decompress;
pub mod directory;
pub mod error;
pub mod file;
pub mod key;
pub mod objects;
pub mod rbuffer;

pub use error::{Result, RootError};
pub use file::{Entry, RootFile};
pub use key::KeyInfo;
