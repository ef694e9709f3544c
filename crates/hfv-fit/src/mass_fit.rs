//! Binned maximum-likelihood fit of invariant-mass spectra and yield extraction.

use hfv_core::Hist1D;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::hessian::{compute_hessian, invert_hessian};
use crate::model::{MEAN, MassModel, N_PARAMS, PARAM_NAMES, ParamSpec, SIG_FRAC, SIGMA, SLOPE};
use crate::optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizerConfig};

/// Fit range, parameter starts/bounds and minimizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MassFitConfig {
    pub range: (f64, f64),
    pub mean: ParamSpec,
    pub sigma: ParamSpec,
    pub slope: ParamSpec,
    pub sig_frac: ParamSpec,
    /// Half width of the yield window in units of σ.
    pub n_sigma_window: f64,
    pub optimizer: OptimizerConfig,
}

impl Default for MassFitConfig {
    fn default() -> Self {
        Self {
            range: (1.72, 2.04),
            mean: ParamSpec::new(1.87, 1.85, 1.89),
            sigma: ParamSpec::new(0.01, 0.005, 0.05),
            slope: ParamSpec::new(-1.0, -10.0, 0.0),
            sig_frac: ParamSpec::new(0.5, 0.0, 1.0),
            n_sigma_window: 3.0,
            optimizer: OptimizerConfig { max_iter: 500, tol: 1e-5, m: 10 },
        }
    }
}

impl MassFitConfig {
    fn specs(&self) -> [ParamSpec; N_PARAMS] {
        [self.mean, self.sigma, self.slope, self.sig_frac]
    }

    fn validate(&self) -> Result<()> {
        if !(self.range.0 < self.range.1) {
            return Err(FitError::Config(format!("empty fit range {:?}", self.range)));
        }
        for (name, s) in PARAM_NAMES.iter().zip(self.specs()) {
            if !(s.min < s.max) || s.init < s.min || s.init > s.max {
                return Err(FitError::Config(format!(
                    "{name}: init {} outside [{}, {}]",
                    s.init, s.min, s.max
                )));
            }
        }
        Ok(())
    }
}

/// A value with its uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub error: f64,
}

impl Measurement {
    pub fn new(value: f64, error: f64) -> Self {
        Self { value, error }
    }
}

/// Fit outcome and derived yields in the `μ ± nσ` window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassFitResult {
    pub hist_name: String,
    pub range: (f64, f64),
    pub mean: Measurement,
    pub sigma: Measurement,
    pub slope: Measurement,
    pub sig_frac: Measurement,
    pub signal: Measurement,
    pub background: Measurement,
    pub s_over_b: Measurement,
    pub significance: Measurement,
    /// Counts in the fitted bins.
    pub n_total: f64,
    /// Mean width of the fitted bins (curve scaling).
    pub bin_width: f64,
    pub nll: f64,
    pub converged: bool,
    /// Row-major covariance in parameter order mean, sigma, slope, sig_frac.
    pub covariance: Option<Vec<f64>>,
}

/// Model curves sampled for plotting, in counts per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitCurves {
    pub x: Vec<f64>,
    pub total: Vec<f64>,
    pub signal: Vec<f64>,
    pub background: Vec<f64>,
}

impl MassFitResult {
    fn params(&self) -> [f64; N_PARAMS] {
        [self.mean.value, self.sigma.value, self.slope.value, self.sig_frac.value]
    }

    /// Sample the model at `n` points across the fit range.
    pub fn curves(&self, n: usize) -> FitCurves {
        let model = MassModel::new(self.range.0, self.range.1);
        let p = self.params();
        let scale = self.n_total * self.bin_width;
        let f = p[SIG_FRAC];
        let n = n.max(2);
        let step = (self.range.1 - self.range.0) / (n - 1) as f64;
        let x: Vec<f64> = (0..n).map(|i| self.range.0 + i as f64 * step).collect();
        let signal: Vec<f64> =
            x.iter().map(|&m| scale * f * model.signal_pdf(m, p[MEAN], p[SIGMA])).collect();
        let background: Vec<f64> =
            x.iter().map(|&m| scale * (1.0 - f) * model.background_pdf(m, p[SLOPE])).collect();
        let total = signal.iter().zip(&background).map(|(s, b)| s + b).collect();
        FitCurves { x, total, signal, background }
    }
}

/// Binned Poisson deviance of the mass model; parameters live in the unit box
/// `u = (p − min) / (max − min)` so that all directions have comparable scale.
struct MassNll {
    model: MassModel,
    centers: Vec<f64>,
    widths: Vec<f64>,
    counts: Vec<f64>,
    n_total: f64,
    lower: [f64; N_PARAMS],
    span: [f64; N_PARAMS],
}

impl MassNll {
    fn to_physical(&self, u: &[f64]) -> [f64; N_PARAMS] {
        let mut p = [0.0; N_PARAMS];
        for i in 0..N_PARAMS {
            p[i] = self.lower[i] + u[i] * self.span[i];
        }
        p
    }

    fn to_unit(&self, p: &[f64]) -> Vec<f64> {
        (0..N_PARAMS).map(|i| (p[i] - self.lower[i]) / self.span[i]).collect()
    }
}

impl ObjectiveFunction for MassNll {
    fn eval(&self, u: &[f64]) -> Result<f64> {
        let p = self.to_physical(u);
        let mut nll = 0.0;
        for ((&m, &w), &n) in self.centers.iter().zip(&self.widths).zip(&self.counts) {
            let nu = (self.n_total * self.model.pdf(m, &p) * w).max(1e-300);
            nll += nu - n;
            if n > 0.0 {
                nll += n * (n / nu).ln();
            }
        }
        Ok(nll)
    }
}

/// Fits mass histograms with a shared configuration.
#[derive(Debug, Clone, Default)]
pub struct MassFitter {
    config: MassFitConfig,
}

impl MassFitter {
    pub fn new(config: MassFitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MassFitConfig {
        &self.config
    }

    /// Fit one histogram. Bins whose centers lie inside the range enter the fit.
    pub fn fit(&self, hist: &Hist1D) -> Result<MassFitResult> {
        self.config.validate()?;
        let (lo, hi) = self.config.range;

        let bins: Vec<usize> =
            (1..=hist.nbins()).filter(|&b| (lo..=hi).contains(&hist.x.center(b))).collect();
        let counts: Vec<f64> = bins.iter().map(|&b| hist.bin_content(b).max(0.0)).collect();
        let n_total: f64 = counts.iter().sum();
        if bins.is_empty() || n_total <= 0.0 {
            return Err(FitError::EmptyHistogram(hist.name.clone()));
        }

        let specs = self.config.specs();
        let nll = MassNll {
            model: MassModel::new(lo, hi),
            centers: bins.iter().map(|&b| hist.x.center(b)).collect(),
            widths: bins.iter().map(|&b| hist.x.width(b)).collect(),
            counts,
            n_total,
            lower: specs.map(|s| s.min),
            span: specs.map(|s| s.max - s.min),
        };
        let bin_width = nll.widths.iter().sum::<f64>() / nll.widths.len() as f64;

        let init = nll.to_unit(&specs.map(|s| s.init));
        let bounds = vec![(0.0, 1.0); N_PARAMS];
        let opt = LbfgsbOptimizer::new(self.config.optimizer.clone()).minimize(&nll, &init, &bounds)?;
        if !opt.converged {
            log::warn!("{}: mass fit did not converge ({})", hist.name, opt.message);
        }
        log::debug!("{}: {}", hist.name, opt);
        let p = nll.to_physical(&opt.parameters);

        let covariance = invert_hessian(&compute_hessian(&nll, &opt.parameters, &bounds)?).map(|cov_u| {
            let d = DMatrix::from_diagonal(&nalgebra::DVector::from_row_slice(&nll.span));
            &d * cov_u * &d
        });
        if covariance.is_none() {
            log::warn!("{}: Hessian not invertible, parameter errors set to 0", hist.name);
        }
        let err = |i: usize| covariance.as_ref().map(|c| c[(i, i)].max(0.0).sqrt()).unwrap_or(0.0);

        let mut result = MassFitResult {
            hist_name: hist.name.clone(),
            range: (lo, hi),
            mean: Measurement::new(p[MEAN], err(MEAN)),
            sigma: Measurement::new(p[SIGMA], err(SIGMA)),
            slope: Measurement::new(p[SLOPE], err(SLOPE)),
            sig_frac: Measurement::new(p[SIG_FRAC], err(SIG_FRAC)),
            signal: Measurement::default(),
            background: Measurement::default(),
            s_over_b: Measurement::default(),
            significance: Measurement::default(),
            n_total,
            bin_width,
            nll: opt.fval,
            converged: opt.converged,
            covariance: covariance.map(|c| c.transpose().as_slice().to_vec()),
        };
        self.fill_yields(&mut result);
        Ok(result)
    }

    /// Fit several histograms in parallel; results keep the input order.
    pub fn fit_batch(&self, hists: &[Hist1D]) -> Vec<Result<MassFitResult>> {
        hists.par_iter().map(|h| self.fit(h)).collect()
    }

    fn fill_yields(&self, r: &mut MassFitResult) {
        let model = MassModel::new(r.range.0, r.range.1);
        let (mean, sigma) = (r.mean.value, r.sigma.value);
        let half = self.config.n_sigma_window * sigma;
        let i_sig = model.signal_integral(mean - half, mean + half, mean, sigma);
        let i_bkg = model.background_integral(mean - half, mean + half, r.slope.value);

        let (f, f_err) = (r.sig_frac.value, r.sig_frac.error);
        let s = f * r.n_total * i_sig;
        let b = (1.0 - f) * r.n_total * i_bkg;
        let s_err = if f != 0.0 { s * f_err / f } else { 0.0 };
        let b_err = if f != 1.0 { b * f_err / (1.0 - f) } else { 0.0 };
        r.signal = Measurement::new(s, s_err);
        r.background = Measurement::new(b, b_err);

        if b > 0.0 {
            let sb = s / b;
            let signif = s / (s + b).sqrt();
            let rel_s = if s != 0.0 { s_err / s } else { 0.0 };
            r.s_over_b = Measurement::new(sb, sb * (rel_s.powi(2) + (b_err / b).powi(2)).sqrt());
            r.significance = Measurement::new(
                signif,
                signif * (rel_s.powi(2) + ((s_err + b_err) / (s + b)).powi(2)).sqrt(),
            );
        } else {
            r.s_over_b = Measurement::new(f64::INFINITY, 0.0);
            r.significance = Measurement::new(f64::INFINITY, 0.0);
        }
    }
}
