//! Truncated-series estimate of the expected off-time.
//!
//! Packets arrive as a Poisson process with rate λ. A wake-up collects a
//! burst whose size is Poisson with mean C/Ex; the idle period that follows
//! is Gamma-distributed in the number of arrivals. Summing the Poisson mass
//! against the Gamma excess terms over a truncated index range gives the
//! expected off-time, and the same sum with the off-time-limit threshold
//! gives the probability that the limit cuts the idle period short.

use crate::error::{ensure_finite, EstimationError};

use super::gamma::{upper_gamma_ratio, PoissonMass};
use super::types::{EstimationResult, SeriesConfig, TrafficParameters};

/// Gamma thresholds derived from the traffic parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// λ·ts
    pub wake: f64,
    /// λ·Tto + λ·(max(0, 1/λ − ts) + ts)
    pub limit: f64,
    /// Part of the mean inter-arrival gap left after waking, max(0, 1/λ − ts)
    pub residual_latency: f64,
}

impl Thresholds {
    pub fn new(params: &TrafficParameters, wake_latency: f64) -> Self {
        let rate = params.arrival_rate;
        let residual_latency = (1.0 / rate - wake_latency).max(0.0);
        Self {
            wake: rate * wake_latency,
            limit: rate * params.off_time_limit + rate * (residual_latency + wake_latency),
            residual_latency,
        }
    }
}

/// Expected excess of a Gamma(x+1) arrival aggregate over `level`, in seconds.
///
/// `((x+1)·Q(x+2, L) − L·Q(x+1, L)) / λ`
pub fn gamma_excess(x: u64, level: f64, rate: f64) -> Result<f64, EstimationError> {
    let shape = x as f64 + 1.0;
    let upper = upper_gamma_ratio(shape + 1.0, level)?;
    let lower = upper_gamma_ratio(shape, level)?;
    Ok((shape * upper - level * lower) / rate)
}

/// Series estimator with explicit configuration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SeriesEstimator {
    config: SeriesConfig,
}

impl SeriesEstimator {
    pub fn new(config: SeriesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeriesConfig {
        &self.config
    }

    /// Compute the expected off-time and exceedance probability.
    ///
    /// `rez` sums indices `[1, bound)`, `Pto` sums `[0, bound)`. The final
    /// expectation blends the two: `(1 − Pto)·rez + Pto·(Tto + residual − ts)`.
    pub fn estimate(
        &self,
        params: &TrafficParameters,
    ) -> Result<EstimationResult, EstimationError> {
        let ts = self.config.wake_latency;
        if !(ts.is_finite() && ts >= 0.0) {
            return Err(EstimationError::invalid(format!(
                "wake latency must be non-negative and finite, got {}",
                ts
            )));
        }

        let rate = params.arrival_rate;
        let thresholds = Thresholds::new(params, ts);
        let mass = PoissonMass::new(params.burst_mean())?;

        let mut rez = 0.0;
        let mut rez1 = 0.0;
        let mut rez2 = 0.0;
        let mut pto = 0.0;

        for x in 0..u64::from(self.config.truncation_bound) {
            let p = mass.pmf(x);
            // Past the mode the mass only shrinks; once it underflows every
            // remaining term is exactly zero.
            if p == 0.0 && x as f64 > mass.mean() {
                break;
            }

            pto += p * upper_gamma_ratio(x as f64 + 1.0, thresholds.limit)?;
            if x == 0 {
                continue;
            }

            let at_wake = gamma_excess(x, thresholds.wake, rate)?;
            let at_limit = gamma_excess(x, thresholds.limit, rate)?;
            rez += p * (at_wake - at_limit);
            rez1 += p * at_wake;
            rez2 += p * at_limit;
        }

        let rez = ensure_finite("series expectation", rez)?;
        let pto = ensure_finite("exceedance probability", pto)?.clamp(0.0, 1.0);
        let capped = params.off_time_limit + thresholds.residual_latency - ts;
        let expected_off_time = ensure_finite(
            "expected off-time",
            (1.0 - pto) * rez + pto * capped,
        )?;

        Ok(EstimationResult {
            expected_off_time,
            exceedance_probability: pto,
            rez,
            rez1: ensure_finite("wake-threshold sum", rez1)?,
            rez2: ensure_finite("limit-threshold sum", rez2)?,
        })
    }

    /// Probability Pto alone, without the off-time sums
    pub fn exceedance_probability(
        &self,
        params: &TrafficParameters,
    ) -> Result<f64, EstimationError> {
        let thresholds = Thresholds::new(params, self.config.wake_latency);
        let mass = PoissonMass::new(params.burst_mean())?;

        let mut pto = 0.0;
        for x in 0..u64::from(self.config.truncation_bound) {
            let p = mass.pmf(x);
            if p == 0.0 && x as f64 > mass.mean() {
                break;
            }
            pto += p * upper_gamma_ratio(x as f64 + 1.0, thresholds.limit)?;
        }

        Ok(ensure_finite("exceedance probability", pto)?.clamp(0.0, 1.0))
    }
}
