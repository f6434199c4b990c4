//! Energy-saving ratio of a low-power-idle link.

use crate::error::{ensure_finite, EstimationError};

use super::types::EnergyConstants;

/// Fraction of full-power time the link effectively spends.
///
/// `1 − (1 − phioff)·(1 − ρ)·rez / (rez + Ts + Tw)`
///
/// `rez` is an expected off-time (series or external), `ro` the utilization
/// λ/μ. The same formula serves both theoretical pipelines and the simulated
/// measurements, so their results are directly comparable.
pub fn energy_ratio(
    rez: f64,
    ro: f64,
    constants: &EnergyConstants,
) -> Result<f64, EstimationError> {
    let rez = ensure_finite("expected off-time", rez)?;
    let ro = ensure_finite("utilization", ro)?;

    let cycle = rez + constants.sleep_transition + constants.wake_transition;
    if cycle == 0.0 {
        return Err(EstimationError::domain(
            "off-time plus transition times is zero",
        ));
    }

    let saving = (1.0 - constants.off_state_overhead) * (1.0 - ro) * rez / cycle;
    ensure_finite("energy ratio", 1.0 - saving)
}

/// Energy-ratio calculator bound to one set of constants
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyRatioCalculator {
    constants: EnergyConstants,
}

impl EnergyRatioCalculator {
    pub fn new(constants: EnergyConstants) -> Self {
        Self { constants }
    }

    pub fn constants(&self) -> &EnergyConstants {
        &self.constants
    }

    pub fn ratio(&self, rez: f64, ro: f64) -> Result<f64, EstimationError> {
        energy_ratio(rez, ro, &self.constants)
    }
}
