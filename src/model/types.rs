//! Value types shared by the estimators.
//!
//! Everything here is plain data: constructed from input parameters,
//! consumed by one computation, and dropped.

use serde::{Deserialize, Serialize};

use crate::error::EstimationError;

/// Wake-up latency of the link hardware in seconds
pub const DEFAULT_WAKE_LATENCY: f64 = 2.88e-6;

/// Upper bound (exclusive) of the Poisson-weighted series
pub const DEFAULT_TRUNCATION_BOUND: u32 = 3500;

/// Traffic and link parameters for a single theoretical estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficParameters {
    /// Packet arrival rate λ in packets per second
    pub arrival_rate: f64,
    /// Mean packet size Ex in bytes
    pub mean_packet_size: f64,
    /// Link-speed-dependent capacity parameter C
    pub capacity: u32,
    /// Configured off-time limit Tto in seconds
    pub off_time_limit: f64,
}

impl TrafficParameters {
    /// Build validated parameters.
    ///
    /// Rate, packet size, capacity, and off-time limit must all be strictly
    /// positive and finite.
    pub fn new(
        arrival_rate: f64,
        mean_packet_size: f64,
        capacity: u32,
        off_time_limit: f64,
    ) -> Result<Self, EstimationError> {
        if !(arrival_rate.is_finite() && arrival_rate > 0.0) {
            return Err(EstimationError::invalid(format!(
                "arrival rate must be positive and finite, got {}",
                arrival_rate
            )));
        }
        if !(mean_packet_size.is_finite() && mean_packet_size > 0.0) {
            return Err(EstimationError::invalid(format!(
                "mean packet size must be positive and finite, got {}",
                mean_packet_size
            )));
        }
        if capacity == 0 {
            return Err(EstimationError::invalid("capacity parameter must be positive"));
        }
        if !(off_time_limit.is_finite() && off_time_limit > 0.0) {
            return Err(EstimationError::invalid(format!(
                "off-time limit must be positive and finite, got {}",
                off_time_limit
            )));
        }

        Ok(Self {
            arrival_rate,
            mean_packet_size,
            capacity,
            off_time_limit,
        })
    }

    /// Mean of the Poisson burst-size distribution, C / Ex
    pub fn burst_mean(&self) -> f64 {
        self.capacity as f64 / self.mean_packet_size
    }
}

/// Tuning of the truncated series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesConfig {
    /// Hardware wake-up latency ts in seconds
    #[serde(default = "default_wake_latency")]
    pub wake_latency: f64,
    /// Series terms are summed for indices below this bound
    #[serde(default = "default_truncation_bound")]
    pub truncation_bound: u32,
}

fn default_wake_latency() -> f64 {
    DEFAULT_WAKE_LATENCY
}

fn default_truncation_bound() -> u32 {
    DEFAULT_TRUNCATION_BOUND
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            wake_latency: DEFAULT_WAKE_LATENCY,
            truncation_bound: DEFAULT_TRUNCATION_BOUND,
        }
    }
}

/// Constants of the energy-ratio formula
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyConstants {
    /// Fraction of full power still drawn while off (phioff)
    pub off_state_overhead: f64,
    /// Sleep transition time Ts in seconds
    pub sleep_transition: f64,
    /// Wake transition time Tw in seconds
    pub wake_transition: f64,
}

impl EnergyConstants {
    /// Constants used for the theoretical prediction
    pub fn theoretical() -> Self {
        Self {
            off_state_overhead: 0.1,
            sleep_transition: 2.88e-6,
            wake_transition: 4.48e-6,
        }
    }

    /// Constants applied to simulated off-times.
    ///
    /// The simulator reports transitions on a nanosecond scale, three orders
    /// of magnitude below the theoretical model.
    pub fn simulated() -> Self {
        Self {
            off_state_overhead: 0.1,
            sleep_transition: 2.88e-9,
            wake_transition: 4.48e-9,
        }
    }
}

impl Default for EnergyConstants {
    fn default() -> Self {
        Self::theoretical()
    }
}

/// Output of the series estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Expected off-time in seconds, corrected for the off-time limit
    pub expected_off_time: f64,
    /// Probability Pto that the natural idle period exceeds the limit
    pub exceedance_probability: f64,
    /// Raw series expectation before the limit correction
    pub rez: f64,
    /// Partial sum at the wake-latency threshold
    pub rez1: f64,
    /// Partial sum at the off-time-limit threshold
    pub rez2: f64,
}
