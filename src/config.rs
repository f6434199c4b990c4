use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model::{EnergyConstants, SeriesConfig, SolverConfig, SumSource};

/// Top-level analysis configuration that mirrors the YAML file.
///
/// Every section has defaults, so an empty document is a valid config that
/// reproduces the reference analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub series: SeriesConfig,
    /// Constants of the theoretical energy ratio
    #[serde(default = "EnergyConstants::theoretical")]
    pub energy: EnergyConstants,
    /// Constants applied to simulated off-times
    #[serde(default = "EnergyConstants::simulated")]
    pub simulation: EnergyConstants,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default = "default_links")]
    pub links: Vec<LinkProfile>,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            output: OutputConfig::default(),
            series: SeriesConfig::default(),
            energy: EnergyConstants::theoretical(),
            simulation: EnergyConstants::simulated(),
            statistics: StatisticsConfig::default(),
            links: default_links(),
            solver: SolverConfig::default(),
        }
    }
}

/// Measurement file set: `<base_path><index>.txt` for each index in range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_first_index")]
    pub first_index: u32,
    #[serde(default = "default_last_index")]
    pub last_index: u32,
}

fn default_base_path() -> String {
    "simulations/data".to_string()
}

fn default_first_index() -> u32 {
    1
}

fn default_last_index() -> u32 {
    100
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            first_index: default_first_index(),
            last_index: default_last_index(),
        }
    }
}

impl InputConfig {
    /// Path of the measurement file with the given index
    pub fn file_path(&self, index: u32) -> PathBuf {
        PathBuf::from(format!("{}{}.txt", self.base_path, index))
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<u32> {
        self.first_index..=self.last_index
    }
}

/// Report destinations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_results")]
    pub results: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<PathBuf>,
}

fn default_results() -> PathBuf {
    PathBuf::from("results.txt")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results: default_results(),
            json: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticsConfig {
    /// Normal quantile of the confidence level (2.33 ≈ 98%)
    #[serde(default = "default_z_score")]
    pub z_score: f64,
}

fn default_z_score() -> f64 {
    2.33
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            z_score: default_z_score(),
        }
    }
}

/// Link-speed-dependent constants of the theoretical model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LinkProfile {
    /// Link speed in bits per second
    pub speed_bps: f64,
    /// Capacity parameter C
    pub capacity: u32,
    /// Off-time limit Tto in seconds
    pub off_time_limit: f64,
}

/// Speeds closer than this are the same link class
const SPEED_MATCH_TOLERANCE_BPS: f64 = 0.5;

fn default_links() -> Vec<LinkProfile> {
    vec![
        LinkProfile {
            speed_bps: 10e9,
            capacity: 24000,
            off_time_limit: 0.0008,
        },
        LinkProfile {
            speed_bps: 5e9,
            capacity: 15000,
            off_time_limit: 0.0008,
        },
    ]
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.input.base_path.is_empty() {
            return Err(ValidationError::InvalidInput(
                "base_path cannot be empty".to_string(),
            ));
        }
        if self.input.first_index > self.input.last_index {
            return Err(ValidationError::InvalidInput(format!(
                "first_index {} is after last_index {}",
                self.input.first_index, self.input.last_index
            )));
        }

        if !(self.series.wake_latency.is_finite() && self.series.wake_latency >= 0.0) {
            return Err(ValidationError::InvalidSeries(format!(
                "wake_latency must be non-negative, got {}",
                self.series.wake_latency
            )));
        }
        if self.series.truncation_bound == 0 {
            return Err(ValidationError::InvalidSeries(
                "truncation_bound must be at least 1".to_string(),
            ));
        }

        Self::validate_energy("energy", &self.energy)?;
        Self::validate_energy("simulation", &self.simulation)?;

        let z = self.statistics.z_score;
        if !(z.is_finite() && z > 0.0) {
            return Err(ValidationError::InvalidStatistics(format!(
                "z_score must be positive, got {}",
                z
            )));
        }

        for (i, link) in self.links.iter().enumerate() {
            if !(link.speed_bps.is_finite() && link.speed_bps > 0.0) {
                return Err(ValidationError::InvalidLink(format!(
                    "links[{}]: speed_bps must be positive",
                    i
                )));
            }
            if link.capacity == 0 {
                return Err(ValidationError::InvalidLink(format!(
                    "links[{}]: capacity must be positive",
                    i
                )));
            }
            if !(link.off_time_limit.is_finite() && link.off_time_limit > 0.0) {
                return Err(ValidationError::InvalidLink(format!(
                    "links[{}]: off_time_limit must be positive",
                    i
                )));
            }
            if self.links[..i]
                .iter()
                .any(|other| (other.speed_bps - link.speed_bps).abs() < SPEED_MATCH_TOLERANCE_BPS)
            {
                return Err(ValidationError::InvalidLink(format!(
                    "links[{}]: duplicate speed {} bps",
                    i, link.speed_bps
                )));
            }
        }

        if self.solver.source == SumSource::External {
            if self.solver.program.is_empty() {
                return Err(ValidationError::InvalidSolver(
                    "program cannot be empty".to_string(),
                ));
            }
            if !self.solver.expression.contains("{rate}") {
                return Err(ValidationError::InvalidSolver(format!(
                    "expression '{}' has no {{rate}} placeholder",
                    self.solver.expression
                )));
            }
            if self.solver.timeout.is_zero() {
                return Err(ValidationError::InvalidSolver(
                    "timeout must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn validate_energy(section: &str, constants: &EnergyConstants) -> Result<(), ValidationError> {
        let phioff = constants.off_state_overhead;
        if !(0.0..=1.0).contains(&phioff) {
            return Err(ValidationError::InvalidEnergy(format!(
                "{}: off_state_overhead must be in [0, 1], got {}",
                section, phioff
            )));
        }
        for (name, value) in [
            ("sleep_transition", constants.sleep_transition),
            ("wake_transition", constants.wake_transition),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ValidationError::InvalidEnergy(format!(
                    "{}: {} must be non-negative, got {}",
                    section, name, value
                )));
            }
        }
        Ok(())
    }

    /// Link profile matching a measured speed, if the model supports it
    pub fn link_for(&self, speed_bps: f64) -> Option<&LinkProfile> {
        self.links
            .iter()
            .find(|link| (link.speed_bps - speed_bps).abs() < SPEED_MATCH_TOLERANCE_BPS)
    }

    /// Apply command-line overrides on top of the file settings
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ValidationError> {
        if let Some(base) = &overrides.input_base {
            self.input.base_path = base.to_string_lossy().into_owned();
        }
        if let Some(results) = &overrides.results {
            self.output.results = results.clone();
        }
        if let Some(json) = &overrides.json {
            self.output.json = Some(json.clone());
        }
        if let Some(source) = overrides.source {
            self.solver.source = source;
        }
        self.validate()
    }
}

/// Command-line values that replace configuration entries
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_base: Option<PathBuf>,
    pub results: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub source: Option<SumSource>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.input_base.is_none()
            && self.results.is_none()
            && self.json.is_none()
            && self.source.is_none()
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid input configuration: {0}")]
    InvalidInput(String),
    #[error("Invalid series configuration: {0}")]
    InvalidSeries(String),
    #[error("Invalid energy configuration: {0}")]
    InvalidEnergy(String),
    #[error("Invalid statistics configuration: {0}")]
    InvalidStatistics(String),
    #[error("Invalid link configuration: {0}")]
    InvalidLink(String),
    #[error("Invalid solver configuration: {0}")]
    InvalidSolver(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.series.truncation_bound, 3500);
        assert_eq!(config.statistics.z_score, 2.33);
        assert_eq!(config.simulation.sleep_transition, 2.88e-9);
        assert_eq!(config.energy.wake_transition, 4.48e-6);
    }

    #[test]
    fn test_partial_sections() {
        let yaml = r#"
input:
  base_path: "runs/eee"
  last_index: 10
series:
  truncation_bound: 5000
links:
  - speed_bps: 1000000000.0
    capacity: 4000
    off_time_limit: 0.001
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.input.first_index, 1);
        assert_eq!(config.input.file_path(7), PathBuf::from("runs/eee7.txt"));
        assert_eq!(config.series.wake_latency, 2.88e-6);
        assert_eq!(config.links.len(), 1);
        assert!(config.link_for(1e9).is_some());
        assert!(config.link_for(10e9).is_none());
    }

    #[test]
    fn test_link_lookup() {
        let config = Config::default();
        assert_eq!(config.link_for(10_000_000_000.0).unwrap().capacity, 24000);
        assert_eq!(config.link_for(5_000_000_000.0).unwrap().capacity, 15000);
        assert!(config.link_for(1_000_000_000.0).is_none());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.input.first_index = 5;
        config.input.last_index = 4;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidInput(_))));

        let mut config = Config::default();
        config.series.truncation_bound = 0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidSeries(_))));

        let mut config = Config::default();
        config.energy.off_state_overhead = 1.5;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidEnergy(_))));

        let mut config = Config::default();
        config.statistics.z_score = 0.0;
        assert!(matches!(config.validate(), Err(ValidationError::InvalidStatistics(_))));

        let mut config = Config::default();
        let first = config.links[0];
        config.links.push(first);
        assert!(matches!(config.validate(), Err(ValidationError::InvalidLink(_))));

        let mut config = Config::default();
        config.solver.source = SumSource::External;
        config.solver.expression = "calcsum(1)".to_string();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidSolver(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let overrides = ConfigOverrides {
            input_base: Some(PathBuf::from("/data/run")),
            results: Some(PathBuf::from("out.txt")),
            json: None,
            source: Some(SumSource::Series),
        };
        assert!(!overrides.is_empty());
        config.apply_overrides(&overrides).unwrap();
        assert_eq!(config.input.file_path(1), PathBuf::from("/data/run1.txt"));
        assert_eq!(config.output.results, PathBuf::from("out.txt"));
    }
}
