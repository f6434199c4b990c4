//! Theoretical estimation engine.
//!
//! Pure functions of their inputs: the incomplete-gamma and Poisson
//! primitives, the truncated-series off-time estimator, the interval-sum
//! sources, and the energy-ratio formula.

pub mod types;
pub mod gamma;
pub mod series;
pub mod external;
pub mod energy;

pub use types::*;
pub use gamma::{poisson_pmf, upper_gamma_ratio, PoissonMass};
pub use series::{gamma_excess, SeriesEstimator, Thresholds};
pub use external::{
    parse_solver_output, sum_estimator_for, ExternalSolver, SeriesSum, SolverConfig, SumEstimator,
    SumSource,
};
pub use energy::{energy_ratio, EnergyRatioCalculator};
