//! Gaussian + exponential mass model, normalized on the fit range.

use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;

/// Parameter order in every parameter vector.
pub const MEAN: usize = 0;
pub const SIGMA: usize = 1;
pub const SLOPE: usize = 2;
pub const SIG_FRAC: usize = 3;
pub const N_PARAMS: usize = 4;

pub const PARAM_NAMES: [&str; N_PARAMS] = ["mean", "sigma", "slope", "sig_frac"];

/// Start value and bounds of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub init: f64,
    pub min: f64,
    pub max: f64,
}

impl ParamSpec {
    pub const fn new(init: f64, min: f64, max: f64) -> Self {
        Self { init, min, max }
    }
}

/// `f·Gauss(m; μ, σ) + (1−f)·Exp(m; λ)` on `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassModel {
    pub lo: f64,
    pub hi: f64,
}

impl MassModel {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// Normalized signal density.
    pub fn signal_pdf(&self, m: f64, mean: f64, sigma: f64) -> f64 {
        let norm = gauss_cdf_diff(self.lo, self.hi, mean, sigma);
        if norm <= 0.0 {
            return 0.0;
        }
        let z = (m - mean) / sigma;
        (-0.5 * z * z).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt()) / norm
    }

    /// Normalized background density.
    pub fn background_pdf(&self, m: f64, slope: f64) -> f64 {
        let norm = exp_primitive_diff(self.lo, self.hi, slope);
        if norm <= 0.0 {
            return 0.0;
        }
        (slope * m).exp() / norm
    }

    /// Total density for parameters in [`PARAM_NAMES`] order.
    pub fn pdf(&self, m: f64, p: &[f64]) -> f64 {
        let f = p[SIG_FRAC];
        f * self.signal_pdf(m, p[MEAN], p[SIGMA]) + (1.0 - f) * self.background_pdf(m, p[SLOPE])
    }

    /// Fraction of the normalized signal inside `[a, b]` (clipped to the range).
    pub fn signal_integral(&self, a: f64, b: f64, mean: f64, sigma: f64) -> f64 {
        let (a, b) = (a.max(self.lo), b.min(self.hi));
        let norm = gauss_cdf_diff(self.lo, self.hi, mean, sigma);
        if b <= a || norm <= 0.0 {
            return 0.0;
        }
        gauss_cdf_diff(a, b, mean, sigma) / norm
    }

    /// Fraction of the normalized background inside `[a, b]` (clipped to the range).
    pub fn background_integral(&self, a: f64, b: f64, slope: f64) -> f64 {
        let (a, b) = (a.max(self.lo), b.min(self.hi));
        let norm = exp_primitive_diff(self.lo, self.hi, slope);
        if b <= a || norm <= 0.0 {
            return 0.0;
        }
        exp_primitive_diff(a, b, slope) / norm
    }
}

/// `Φ(b) − Φ(a)` for a Gaussian of `mean`, `sigma`.
fn gauss_cdf_diff(a: f64, b: f64, mean: f64, sigma: f64) -> f64 {
    let s = sigma * std::f64::consts::SQRT_2;
    0.5 * (erf((b - mean) / s) - erf((a - mean) / s))
}

/// `∫_a^b exp(λ m) dm`.
fn exp_primitive_diff(a: f64, b: f64, slope: f64) -> f64 {
    if slope.abs() < 1e-12 {
        b - a
    } else {
        ((slope * b).exp() - (slope * a).exp()) / slope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn integrate(f: impl Fn(f64) -> f64, a: f64, b: f64) -> f64 {
        let n = 20_000;
        let h = (b - a) / n as f64;
        (0..n).map(|i| f(a + (i as f64 + 0.5) * h)).sum::<f64>() * h
    }

    #[test]
    fn densities_are_normalized_on_range() {
        let m = MassModel::new(1.72, 2.04);
        let p = [1.87, 0.012, -2.5, 0.3];
        assert_relative_eq!(integrate(|x| m.signal_pdf(x, p[0], p[1]), 1.72, 2.04), 1.0, epsilon = 1e-6);
        assert_relative_eq!(integrate(|x| m.background_pdf(x, p[2]), 1.72, 2.04), 1.0, epsilon = 1e-6);
        assert_relative_eq!(integrate(|x| m.pdf(x, &p), 1.72, 2.04), 1.0, epsilon = 1e-6);
        assert_relative_eq!(integrate(|x| m.background_pdf(x, 0.0), 1.72, 2.04), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn window_integrals() {
        let m = MassModel::new(1.72, 2.04);
        // ±3σ of a Gaussian well inside the range
        assert_relative_eq!(m.signal_integral(1.87 - 0.03, 1.87 + 0.03, 1.87, 0.01), 0.9973, epsilon = 1e-4);
        assert_relative_eq!(m.background_integral(1.72, 2.04, -3.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.background_integral(1.80, 1.88, 0.0), 0.25, epsilon = 1e-12);
        assert_eq!(m.signal_integral(2.1, 2.2, 1.87, 0.01), 0.0);
    }
}
