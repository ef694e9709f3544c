use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Error propagation used by [`divide`](super::Hist1D::divide).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DivideMode {
    /// Uncorrelated numerator and denominator.
    #[default]
    Plain,
    /// Numerator is a subset of the denominator (ROOT option "B").
    Binomial,
}

/// Flat sum-of-weights storage shared by the 1D/2D/3D histograms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Cells {
    sumw: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sumw2: Option<Vec<f64>>,
}

impl Cells {
    pub(crate) fn zeros(n: usize) -> Self {
        Self { sumw: vec![0.0; n], sumw2: None }
    }

    pub(crate) fn from_raw(n: usize, sumw: Vec<f64>, sumw2: Option<Vec<f64>>) -> Result<Self> {
        if sumw.len() != n || sumw2.as_ref().is_some_and(|w2| w2.len() != n) {
            return Err(Error::Binning(format!(
                "expected {n} cells, got {} (sumw2: {:?})",
                sumw.len(),
                sumw2.as_ref().map(Vec::len)
            )));
        }
        Ok(Self { sumw, sumw2 })
    }

    pub(crate) fn len(&self) -> usize {
        self.sumw.len()
    }

    pub(crate) fn has_sumw2(&self) -> bool {
        self.sumw2.is_some()
    }

    pub(crate) fn enable_sumw2(&mut self) {
        if self.sumw2.is_none() {
            self.sumw2 = Some(self.sumw.iter().map(|w| w.abs()).collect());
        }
    }

    pub(crate) fn content(&self, i: usize) -> f64 {
        self.sumw.get(i).copied().unwrap_or(0.0)
    }

    pub(crate) fn contents(&self) -> &[f64] {
        &self.sumw
    }

    pub(crate) fn sumw2_at(&self, i: usize) -> f64 {
        match &self.sumw2 {
            Some(w2) => w2.get(i).copied().unwrap_or(0.0),
            None => self.content(i).abs(),
        }
    }

    pub(crate) fn error(&self, i: usize) -> f64 {
        self.sumw2_at(i).sqrt()
    }

    pub(crate) fn set_content(&mut self, i: usize, v: f64) {
        if let Some(c) = self.sumw.get_mut(i) {
            *c = v;
        }
    }

    pub(crate) fn set_error(&mut self, i: usize, e: f64) {
        self.enable_sumw2();
        if let Some(w2) = self.sumw2.as_mut().and_then(|w2| w2.get_mut(i)) {
            *w2 = e * e;
        }
    }

    pub(crate) fn fill(&mut self, i: usize, w: f64) {
        if w != 1.0 {
            self.enable_sumw2();
        }
        self.accumulate(i, w, w * w);
    }

    /// Add raw `(sumw, sumw2)` to cell `i`.
    pub(crate) fn accumulate(&mut self, i: usize, w: f64, w2: f64) {
        if let Some(c) = self.sumw.get_mut(i) {
            *c += w;
        }
        if let Some(s) = self.sumw2.as_mut().and_then(|s| s.get_mut(i)) {
            *s += w2;
        }
    }

    pub(crate) fn scale(&mut self, c: f64) {
        self.enable_sumw2();
        for w in &mut self.sumw {
            *w *= c;
        }
        if let Some(w2) = self.sumw2.as_mut() {
            for v in w2 {
                *v *= c * c;
            }
        }
    }

    pub(crate) fn add(&mut self, other: &Cells, c: f64) -> Result<()> {
        self.check_len(other)?;
        if other.has_sumw2() || c != 1.0 {
            self.enable_sumw2();
        }
        for i in 0..self.sumw.len() {
            let w2 = other.sumw2_at(i);
            self.sumw[i] += c * other.sumw[i];
            if let Some(s) = self.sumw2.as_mut() {
                s[i] += c * c * w2;
            }
        }
        Ok(())
    }

    pub(crate) fn divide(num: &Cells, den: &Cells, mode: DivideMode) -> Result<Cells> {
        num.check_len(den)?;
        let n = num.len();
        let mut sumw = vec![0.0; n];
        let mut sumw2 = vec![0.0; n];
        for i in 0..n {
            let b1 = num.sumw[i];
            let b2 = den.sumw[i];
            if b2 == 0.0 {
                continue;
            }
            let e1 = num.sumw2_at(i);
            let e2 = den.sumw2_at(i);
            let w = b1 / b2;
            sumw[i] = w;
            sumw2[i] = match mode {
                DivideMode::Plain => (e1 * b2 * b2 + e2 * b1 * b1) / (b2 * b2 * b2 * b2),
                DivideMode::Binomial if b1 == b2 => 0.0,
                DivideMode::Binomial => {
                    (((1.0 - 2.0 * w) * e1 + w * w * e2) / (b2 * b2)).abs()
                }
            };
        }
        Ok(Cells { sumw, sumw2: Some(sumw2) })
    }

    pub(crate) fn reset(&mut self) {
        self.sumw.iter_mut().for_each(|w| *w = 0.0);
        if let Some(w2) = self.sumw2.as_mut() {
            w2.iter_mut().for_each(|w| *w = 0.0);
        }
    }

    fn check_len(&self, other: &Cells) -> Result<()> {
        if self.len() != other.len() {
            return Err(Error::Binning(format!(
                "cell count mismatch: {} vs {}",
                self.len(),
                other.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cells(v: &[f64]) -> Cells {
        Cells { sumw: v.to_vec(), sumw2: None }
    }

    #[test]
    fn binomial_error_unweighted() {
        let num = cells(&[0.0, 30.0, 0.0]);
        let den = cells(&[0.0, 100.0, 0.0]);
        let r = Cells::divide(&num, &den, DivideMode::Binomial).unwrap();
        assert_relative_eq!(r.content(1), 0.3);
        // sqrt(eff (1 - eff) / N)
        assert_relative_eq!(r.error(1), (0.3_f64 * 0.7 / 100.0).sqrt(), epsilon = 1e-12);
        assert_eq!(r.content(0), 0.0);
        assert_eq!(r.error(0), 0.0);
    }

    #[test]
    fn binomial_full_efficiency_has_zero_error() {
        let num = cells(&[0.0, 10.0, 0.0]);
        let den = cells(&[0.0, 10.0, 0.0]);
        let r = Cells::divide(&num, &den, DivideMode::Binomial).unwrap();
        assert_relative_eq!(r.content(1), 1.0);
        assert_eq!(r.error(1), 0.0);
    }

    #[test]
    fn plain_error_propagation() {
        let num = cells(&[4.0]);
        let den = cells(&[16.0]);
        let r = Cells::divide(&num, &den, DivideMode::Plain).unwrap();
        assert_relative_eq!(r.content(0), 0.25);
        // (4 * 256 + 16 * 16) / 16^4
        let expected = ((4.0 * 256.0 + 16.0 * 16.0) / 65536.0_f64).sqrt();
        assert_relative_eq!(r.error(0), expected, epsilon = 1e-12);
    }

    #[test]
    fn add_with_negative_coefficient_tracks_sumw2() {
        let mut a = cells(&[10.0]);
        let b = cells(&[4.0]);
        a.add(&b, -1.0).unwrap();
        assert_relative_eq!(a.content(0), 6.0);
        assert_relative_eq!(a.sumw2_at(0), 14.0);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let mut a = cells(&[1.0, 2.0]);
        assert!(a.add(&cells(&[1.0]), 1.0).is_err());
    }
}
