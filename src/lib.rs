//! # lpi-energy - Energy analysis for low-power-idle network links
//!
//! This library computes theoretical and simulated energy-saving metrics for
//! links that sleep between transmission bursts (in the manner of
//! Energy-Efficient Ethernet), and compares the two per device/port.
//!
//! ## Overview
//!
//! A switch port that goes idle drops into a low-power state and wakes when
//! traffic returns or when an off-time limit expires. Under Poisson arrivals
//! the expected off-time has a closed form as a Poisson-weighted series of
//! regularized incomplete gamma terms; this crate evaluates that series,
//! turns it into an energy ratio, and checks it against simulator output.
//!
//! ## Architecture
//!
//! - `model`: the estimation engine (gamma primitives, series estimator,
//!   interval-sum sources, energy ratio)
//! - `analysis`: measurement parsing, per-record estimation, statistics,
//!   aggregation, and reports
//! - `config` / `config_loader`: YAML configuration with defaults and validation
//! - `orchestrator`: one end-to-end analysis run
//! - `error`: the error taxonomy shared by the estimation pipeline
//!
//! ## Example Usage
//!
//! ```rust
//! use lpi_energy::model::{energy_ratio, EnergyConstants, SeriesEstimator, TrafficParameters};
//!
//! let params = TrafficParameters::new(1e5, 500.0, 24000, 0.0008)?;
//! let result = SeriesEstimator::default().estimate(&params)?;
//! assert!(result.exceedance_probability <= 1.0);
//!
//! let ratio = energy_ratio(result.expected_off_time, 0.04, &EnergyConstants::theoretical())?;
//! assert!(ratio > 0.0 && ratio < 1.0);
//! # Ok::<(), lpi_energy::error::EstimationError>(())
//! ```
//!
//! ## Measurement Format
//!
//! Each simulator output file holds one line per switch port:
//!
//! ```text
//! nodeId portId idleTimeNs intervalCount packetCount packetBytes meanInterArrival linkSpeed
//! ```
//!
//! ## Error Handling
//!
//! The estimation core returns typed [`error::EstimationError`] values so a
//! failing record can be reported and skipped. File handling and the CLI use
//! `color_eyre` for error reports with context.

pub mod error;
pub mod model;
pub mod analysis;
pub mod config;
pub mod config_loader;
pub mod orchestrator;
