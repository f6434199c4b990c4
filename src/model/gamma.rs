//! Special-function primitives for the series estimator.
//!
//! Both functions delegate to `statrs`; this module only pins down the
//! boundary cases and turns invalid input into [`EstimationError`] instead
//! of panics or NaN.

use statrs::distribution::{Discrete, Poisson};
use statrs::function::gamma::checked_gamma_ur;

use crate::error::{ensure_finite, EstimationError};

/// Regularized upper incomplete gamma ratio Q(a, b) = Γ(a, b) / Γ(a).
///
/// `statrs` chooses between the series and the continued-fraction expansion
/// from the relative size of `a` and `b`.
///
/// # Arguments
/// * `a` - Shape parameter (a > 0)
/// * `b` - Argument (b >= 0)
///
/// # Returns
/// * `Ok(q)` with `q` in [0, 1]
/// * `Err(EstimationError::InvalidArgument)` for a <= 0, b < 0, or NaN input
pub fn upper_gamma_ratio(a: f64, b: f64) -> Result<f64, EstimationError> {
    if a.is_nan() || b.is_nan() {
        return Err(EstimationError::invalid(format!(
            "incomplete gamma ratio of NaN (a = {}, b = {})",
            a, b
        )));
    }
    if a <= 0.0 || a.is_infinite() {
        return Err(EstimationError::invalid(format!(
            "incomplete gamma shape must be positive and finite, got {}",
            a
        )));
    }
    if b < 0.0 {
        return Err(EstimationError::invalid(format!(
            "incomplete gamma argument must be non-negative, got {}",
            b
        )));
    }

    // statrs rejects the closed endpoints, whose values are exact
    if b == 0.0 {
        return Ok(1.0);
    }
    if b.is_infinite() {
        return Ok(0.0);
    }

    let q = checked_gamma_ur(a, b)
        .map_err(|e| EstimationError::invalid(format!("Q({}, {}): {}", a, b, e)))?;
    Ok(ensure_finite("incomplete gamma ratio", q)?.clamp(0.0, 1.0))
}

/// Poisson probability mass with a fixed mean
#[derive(Debug, Clone)]
pub struct PoissonMass {
    mean: f64,
    dist: Poisson,
}

impl PoissonMass {
    pub fn new(mean: f64) -> Result<Self, EstimationError> {
        if !(mean.is_finite() && mean > 0.0) {
            return Err(EstimationError::invalid(format!(
                "Poisson mean must be positive and finite, got {}",
                mean
            )));
        }
        let dist = Poisson::new(mean)
            .map_err(|e| EstimationError::invalid(format!("Poisson({}): {}", mean, e)))?;
        Ok(Self { mean, dist })
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// P(X = k)
    pub fn pmf(&self, k: u64) -> f64 {
        self.dist.pmf(k)
    }
}

/// Poisson probability mass P(X = k) for X ~ Poisson(mean)
pub fn poisson_pmf(k: u64, mean: f64) -> Result<f64, EstimationError> {
    Ok(PoissonMass::new(mean)?.pmf(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
    }

    #[test]
    fn test_exponential_case() {
        // Q(1, b) = e^(-b)
        for b in [0.1, 0.5, 1.0, 3.0, 10.0] {
            let q = upper_gamma_ratio(1.0, b).unwrap();
            assert!(approx_eq(q, (-b as f64).exp(), 1e-9), "Q(1, {}) = {}", b, q);
        }
    }

    #[test]
    fn test_integer_shape_matches_poisson_tail() {
        // Q(n, b) = Σ_{k<n} e^(-b) b^k / k!
        let b: f64 = 2.5;
        let expected = (-b).exp() * (1.0 + b + b * b / 2.0);
        let q = upper_gamma_ratio(3.0, b).unwrap();
        assert!(approx_eq(q, expected, 1e-9), "Q(3, 2.5) = {}, expected {}", q, expected);
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(upper_gamma_ratio(2.0, 0.0).unwrap(), 1.0);
        assert_eq!(upper_gamma_ratio(2.0, f64::INFINITY).unwrap(), 0.0);
    }

    #[test]
    fn test_large_shape_small_argument() {
        let q = upper_gamma_ratio(3500.0, 0.288).unwrap();
        assert!(approx_eq(q, 1.0, 1e-12));
    }

    #[test]
    fn test_invalid_arguments() {
        assert!(matches!(upper_gamma_ratio(0.0, 1.0), Err(EstimationError::InvalidArgument(_))));
        assert!(matches!(upper_gamma_ratio(-2.0, 1.0), Err(EstimationError::InvalidArgument(_))));
        assert!(matches!(upper_gamma_ratio(2.0, -1.0), Err(EstimationError::InvalidArgument(_))));
        assert!(matches!(
            upper_gamma_ratio(f64::NAN, 1.0),
            Err(EstimationError::InvalidArgument(_))
        ));
        assert!(matches!(
            upper_gamma_ratio(2.0, f64::NAN),
            Err(EstimationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_poisson_pmf() {
        let p0 = poisson_pmf(0, 2.0).unwrap();
        assert!(approx_eq(p0, (-2.0f64).exp(), 1e-12));
        let p3 = poisson_pmf(3, 2.0).unwrap();
        assert!(approx_eq(p3, (-2.0f64).exp() * 8.0 / 6.0, 1e-12));
        assert!(poisson_pmf(1, 0.0).is_err());
        assert!(poisson_pmf(1, f64::NAN).is_err());
    }

    #[test]
    fn test_poisson_mass_sums_to_one() {
        let mass = PoissonMass::new(48.0).unwrap();
        let total: f64 = (0..500).map(|k| mass.pmf(k)).sum();
        assert!(approx_eq(total, 1.0, 1e-12));
    }
}
