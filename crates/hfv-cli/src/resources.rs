//! Grid resource estimate for a production.

use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::Ctx;
use crate::config::ResourcesConfig;
use crate::io::write_text;

const DAYS_PER_SECOND: f64 = 0.000_011_574_07;

/// Measured cost of a test production.
#[derive(Debug, Clone, Copy)]
pub struct TestProduction {
    /// Global runtime in seconds.
    pub runtime: f64,
    pub n_produced: f64,
    /// Output size in MB.
    pub size: f64,
}

impl Default for TestProduction {
    fn default() -> Self {
        Self { runtime: 1488.735, n_produced: 500.0, size: 23.34 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub days: f64,
    pub size_mb: f64,
}

impl Estimate {
    pub fn size_tb(&self) -> f64 {
        self.size_mb / 1e6
    }
}

/// Scale a test production to `cfg.n_target_events`.
pub fn estimate(cfg: &ResourcesConfig, test: &TestProduction) -> Result<Estimate> {
    if test.n_produced <= 0.0 || cfg.grid_cpus <= 0.0 {
        bail!("produced events and grid CPUs must be positive");
    }
    let n = cfg.n_target_events;
    let days = n * test.runtime * cfg.workers * DAYS_PER_SECOND / (test.n_produced * cfg.grid_cpus);
    let size_mb = n * test.size / test.n_produced;
    Ok(Estimate { days, size_mb })
}

pub fn report(cfg: &ResourcesConfig, test: &TestProduction, est: &Estimate) -> String {
    format!(
        "Input size: {} MB\nGlobal runtime: {} s\n------------------------------------\n\
         Expected running time: {} days @ {}kCPU\nExpected size: {} TB",
        test.size,
        test.runtime,
        est.days,
        cfg.grid_cpus / 1000.0,
        est.size_tb()
    )
}

pub fn cmd_resources(
    ctx: &Ctx,
    test: &TestProduction,
    n_target: Option<f64>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut cfg = ctx.config.resources;
    if let Some(n) = n_target {
        cfg.n_target_events = n;
    }
    let est = estimate(&cfg, test)?;
    tracing::info!(days = est.days, size_mb = est.size_mb, "resource estimate");
    write_text(output, &report(&cfg, test, &est))
}
