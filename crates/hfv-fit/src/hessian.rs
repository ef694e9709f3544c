//! Finite-difference Hessian and covariance at a minimum.

use nalgebra::DMatrix;

use crate::error::Result;
use crate::optimizer::ObjectiveFunction;

/// Hessian from second differences of the objective, with every evaluation
/// kept inside `bounds`.
///
/// A parameter with room on both sides gets central differences. One sitting
/// at (or within a step of) a bound is stepped away from it, so a minimum on
/// the edge of the box still yields finite curvature.
pub fn compute_hessian(objective: &dyn ObjectiveFunction, best: &[f64], bounds: &[(f64, f64)]) -> Result<DMatrix<f64>> {
    let n = best.len();
    let f0 = objective.eval(best)?;
    let eval_at = |moves: &[(usize, f64)]| -> Result<f64> {
        let mut p = best.to_vec();
        for &(k, d) in moves {
            p[k] += d;
        }
        objective.eval(&p)
    };

    // (step, central)
    let steps: Vec<(f64, bool)> = (0..n)
        .map(|j| {
            let (lo, hi) = bounds.get(j).copied().unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
            let mut eps = 1e-4 * best[j].abs().max(1.0);
            if hi - lo < 4.0 * eps {
                eps = 0.25 * (hi - lo);
            }
            let up = best[j] + eps <= hi;
            let down = best[j] - eps >= lo;
            match (up, down) {
                (true, true) => (eps, true),
                (true, false) => (eps, false),
                _ => (-eps, false),
            }
        })
        .collect();

    let mut hessian = DMatrix::zeros(n, n);
    for j in 0..n {
        let (d, central) = steps[j];
        hessian[(j, j)] = if central {
            (eval_at(&[(j, d)])? - 2.0 * f0 + eval_at(&[(j, -d)])?) / (d * d)
        } else {
            (eval_at(&[(j, 2.0 * d)])? - 2.0 * eval_at(&[(j, d)])? + f0) / (d * d)
        };
    }
    for j in 0..n {
        for i in 0..j {
            let ((di, ci), (dj, cj)) = (steps[i], steps[j]);
            let h = if ci && cj {
                (eval_at(&[(i, di), (j, dj)])? - eval_at(&[(i, di), (j, -dj)])? - eval_at(&[(i, -di), (j, dj)])?
                    + eval_at(&[(i, -di), (j, -dj)])?)
                    / (4.0 * di * dj)
            } else {
                (eval_at(&[(i, di), (j, dj)])? - eval_at(&[(i, di)])? - eval_at(&[(j, dj)])? + f0) / (di * dj)
            };
            hessian[(i, j)] = h;
            hessian[(j, i)] = h;
        }
    }
    Ok(hessian)
}

/// Covariance as the inverse Hessian.
///
/// Tries Cholesky with geometrically growing diagonal damping, then LU.
/// Returns `None` when no inverse with positive finite variances exists.
pub fn invert_hessian(hessian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = hessian.nrows();
    let identity = DMatrix::identity(n, n);
    let diag_scale = (0..n).map(|i| hessian[(i, i)].abs()).fold(0.0_f64, f64::max).max(1.0);

    let mut damped = hessian.clone();
    let mut damping = 0.0_f64;
    const MAX_ATTEMPTS: usize = 10;

    for attempt in 0..MAX_ATTEMPTS {
        if let Some(chol) = nalgebra::linalg::Cholesky::new(damped.clone()) {
            if damping > 0.0 {
                log::debug!("Hessian made positive definite with damping {damping:.3e}");
            }
            return Some(chol.solve(&identity));
        }
        if attempt + 1 == MAX_ATTEMPTS {
            break;
        }
        let next = if damping == 0.0 { diag_scale * 1e-9 } else { damping * 10.0 };
        for i in 0..n {
            damped[(i, i)] += next - damping;
        }
        damping = next;
    }

    let cov = damped.lu().try_inverse()?;
    (0..n).all(|i| cov[(i, i)].is_finite() && cov[(i, i)] > 0.0).then_some(cov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // f = 2x^2 + xy + y^2: H = [[4, 1], [1, 2]]
    struct Bowl;

    impl ObjectiveFunction for Bowl {
        fn eval(&self, p: &[f64]) -> Result<f64> {
            Ok(2.0 * p[0] * p[0] + p[0] * p[1] + p[1] * p[1])
        }

        fn gradient(&self, p: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![4.0 * p[0] + p[1], p[0] + 2.0 * p[1]])
        }
    }

    #[test]
    fn hessian_and_inverse() {
        let bounds = [(-1.0, 1.0); 2];
        let h = compute_hessian(&Bowl, &[0.3, -0.2], &bounds).unwrap();
        assert_relative_eq!(h[(0, 0)], 4.0, epsilon = 1e-6);
        assert_relative_eq!(h[(0, 1)], 1.0, epsilon = 1e-6);
        assert_relative_eq!(h[(1, 1)], 2.0, epsilon = 1e-6);

        let cov = invert_hessian(&h).unwrap();
        // inverse of [[4,1],[1,2]] = [[2,-1],[-1,4]] / 7
        assert_relative_eq!(cov[(0, 0)], 2.0 / 7.0, epsilon = 1e-6);
        assert_relative_eq!(cov[(0, 1)], -1.0 / 7.0, epsilon = 1e-6);
        assert_relative_eq!(cov[(1, 1)], 4.0 / 7.0, epsilon = 1e-6);
    }

    // Defined only on [0, 1]^2; evaluating outside is an error.
    struct Boxed;

    impl ObjectiveFunction for Boxed {
        fn eval(&self, p: &[f64]) -> Result<f64> {
            if p.iter().any(|&x| !(0.0..=1.0).contains(&x)) {
                return Err(crate::error::FitError::Optimizer(format!("evaluated outside the box at {p:?}")));
            }
            Bowl.eval(p)
        }
    }

    #[test]
    fn steps_stay_inside_bounds() {
        let bounds = [(0.0, 1.0); 2];
        for best in [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.5, 0.99995]] {
            let h = compute_hessian(&Boxed, &best, &bounds).unwrap();
            assert_relative_eq!(h[(0, 0)], 4.0, epsilon = 1e-5);
            assert_relative_eq!(h[(0, 1)], 1.0, epsilon = 1e-5);
            assert_relative_eq!(h[(1, 1)], 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn negative_definite_is_rejected() {
        let h = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 0.0, -2.0]);
        assert!(invert_hessian(&h).is_none());
    }
}
