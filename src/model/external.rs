//! Sources of the interval sum `rez` fed into the energy ratio.
//!
//! The in-process [`SeriesSum`] reuses the series estimator. The
//! [`ExternalSolver`] keeps compatibility with existing solver scripts: it
//! runs a numeric tool (Octave's `calcsum(λ)` by default), waits for it with
//! a timeout, and reads the scalar from line index 3 of the result file.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::EstimationError;

use super::series::SeriesEstimator;
use super::types::{EstimationResult, TrafficParameters};

/// Line index (0-based) of the scalar in the solver result file
pub const RESULT_LINE: usize = 3;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Anything that can produce the expected interval sum for given traffic
pub trait SumEstimator: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    fn interval_sum(&self, params: &TrafficParameters) -> Result<f64, EstimationError>;

    /// Interval sum when the series estimate for `params` is already known
    fn interval_sum_given(
        &self,
        params: &TrafficParameters,
        _series: &EstimationResult,
    ) -> Result<f64, EstimationError> {
        self.interval_sum(params)
    }
}

/// In-process interval sum: the series expected off-time
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesSum {
    estimator: SeriesEstimator,
}

impl SeriesSum {
    pub fn new(estimator: SeriesEstimator) -> Self {
        Self { estimator }
    }
}

impl SumEstimator for SeriesSum {
    fn name(&self) -> &'static str {
        "series"
    }

    fn interval_sum(&self, params: &TrafficParameters) -> Result<f64, EstimationError> {
        Ok(self.estimator.estimate(params)?.expected_off_time)
    }

    fn interval_sum_given(
        &self,
        _params: &TrafficParameters,
        series: &EstimationResult,
    ) -> Result<f64, EstimationError> {
        Ok(series.expected_off_time)
    }
}

/// Which `rez` source the theoretical energy ratio uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SumSource {
    #[default]
    Series,
    External,
}

/// External solver invocation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub source: SumSource,
    /// Solver executable
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments placed before the expression
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Expression template; `{rate}` is replaced by λ
    #[serde(default = "default_expression")]
    pub expression: String,
    /// Result file, relative to the working directory
    #[serde(default = "default_result_file")]
    pub result_file: PathBuf,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_program() -> String {
    "octave".to_string()
}

fn default_args() -> Vec<String> {
    vec!["--silent".to_string(), "--eval".to_string()]
}

fn default_expression() -> String {
    "calcsum({rate})".to_string()
}

fn default_result_file() -> PathBuf {
    PathBuf::from("calcsum.res")
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            source: SumSource::default(),
            program: default_program(),
            args: default_args(),
            expression: default_expression(),
            result_file: default_result_file(),
            working_dir: None,
            timeout: default_timeout(),
        }
    }
}

/// Parse the solver's fixed-format result text.
///
/// The scalar sits alone on the 4th line, possibly padded with whitespace.
pub fn parse_solver_output(text: &str) -> Result<f64, EstimationError> {
    let line = text.lines().nth(RESULT_LINE).ok_or_else(|| {
        EstimationError::external(format!(
            "result has {} lines, expected the value on line {}",
            text.lines().count(),
            RESULT_LINE + 1
        ))
    })?;

    let trimmed = line.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| EstimationError::external(format!("cannot parse '{}' as a number", trimmed)))?;

    if !value.is_finite() {
        return Err(EstimationError::external(format!(
            "solver returned a non-finite value ({})",
            value
        )));
    }
    Ok(value)
}

/// Process adapter for the external numeric solver
#[derive(Debug)]
pub struct ExternalSolver {
    config: SolverConfig,
    // Every invocation writes the same result file
    lock: Mutex<()>,
}

impl ExternalSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    fn result_path(&self) -> PathBuf {
        match &self.config.working_dir {
            Some(dir) => dir.join(&self.config.result_file),
            None => self.config.result_file.clone(),
        }
    }

    /// Invoke the solver for one arrival rate and read its result
    pub fn solve(&self, arrival_rate: f64) -> Result<f64, EstimationError> {
        if !(arrival_rate.is_finite() && arrival_rate > 0.0) {
            return Err(EstimationError::invalid(format!(
                "arrival rate must be positive and finite, got {}",
                arrival_rate
            )));
        }

        let _guard = self
            .lock
            .lock()
            .map_err(|_| EstimationError::external("solver lock poisoned"))?;

        let result_path = self.result_path();
        match fs::remove_file(&result_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(EstimationError::external(format!(
                    "cannot clear stale result {}: {}",
                    result_path.display(),
                    e
                )))
            }
        }

        let expression = self.config.expression.replace("{rate}", &arrival_rate.to_string());
        debug!("Running {} {:?} {}", self.config.program, self.config.args, expression);

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(&expression)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            EstimationError::external(format!("failed to start {}: {}", self.config.program, e))
        })?;

        let deadline = Instant::now() + self.config.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(EstimationError::external(format!(
                            "{} timed out after {:?}",
                            self.config.program, self.config.timeout
                        )));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(EstimationError::external(format!(
                        "failed to wait for {}: {}",
                        self.config.program, e
                    )))
                }
            }
        };

        if !status.success() {
            return Err(EstimationError::external(format!(
                "{} exited with {}",
                self.config.program, status
            )));
        }

        let text = fs::read_to_string(&result_path).map_err(|e| {
            EstimationError::external(format!("cannot read {}: {}", result_path.display(), e))
        })?;
        parse_solver_output(&text)
    }
}

impl SumEstimator for ExternalSolver {
    fn name(&self) -> &'static str {
        "external"
    }

    fn interval_sum(&self, params: &TrafficParameters) -> Result<f64, EstimationError> {
        self.solve(params.arrival_rate)
    }
}

/// Build the configured interval-sum source
pub fn sum_estimator_for(solver: &SolverConfig, series: SeriesEstimator) -> Box<dyn SumEstimator> {
    match solver.source {
        SumSource::Series => Box::new(SeriesSum::new(series)),
        SumSource::External => Box::new(ExternalSolver::new(solver.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_solver_output() {
        let text = "ans = 1\n\nresult:\n  4.8775e-04  \n";
        assert_eq!(parse_solver_output(text).unwrap(), 4.8775e-4);
    }

    #[test]
    fn test_parse_solver_output_short_file() {
        let err = parse_solver_output("a\nb\n").unwrap_err();
        assert!(matches!(err, EstimationError::ExternalComputation(_)));
    }

    #[test]
    fn test_parse_solver_output_garbage() {
        assert!(parse_solver_output("a\nb\nc\nnot-a-number\n").is_err());
        assert!(parse_solver_output("a\nb\nc\nNaN\n").is_err());
        assert!(parse_solver_output("a\nb\nc\ninf\n").is_err());
    }

    #[test]
    fn test_solver_config_yaml() {
        let config: SolverConfig = serde_yaml::from_str(
            "source: external\ntimeout: 5s\nworking_dir: /tmp/solver\n",
        )
        .unwrap();
        assert_eq!(config.source, SumSource::External);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.program, "octave");
        assert_eq!(config.expression, "calcsum({rate})");
    }

    #[test]
    fn test_series_sum_matches_estimator() {
        let params = TrafficParameters::new(1e5, 500.0, 24000, 0.0008).unwrap();
        let sum = SeriesSum::default().interval_sum(&params).unwrap();
        let direct = SeriesEstimator::default().estimate(&params).unwrap();
        assert_eq!(sum, direct.expected_off_time);
        assert_eq!(
            SeriesSum::default().interval_sum_given(&params, &direct).unwrap(),
            direct.expected_off_time
        );
    }

    #[test]
    fn test_solver_given_estimate_still_runs_solver() {
        let params = TrafficParameters::new(1e5, 500.0, 24000, 0.0008).unwrap();
        let direct = SeriesEstimator::default().estimate(&params).unwrap();
        let solver = ExternalSolver::new(SolverConfig {
            program: "/nonexistent/solver".to_string(),
            ..SolverConfig::default()
        });
        assert!(matches!(
            solver.interval_sum_given(&params, &direct),
            Err(EstimationError::ExternalComputation(_))
        ));
    }

    #[test]
    fn test_solver_rejects_bad_rate() {
        let solver = ExternalSolver::new(SolverConfig::default());
        assert!(matches!(solver.solve(0.0), Err(EstimationError::InvalidArgument(_))));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use tempfile::TempDir;

        fn shell_solver(dir: &TempDir, expression: &str, timeout: Duration) -> ExternalSolver {
            ExternalSolver::new(SolverConfig {
                source: SumSource::External,
                program: "sh".to_string(),
                args: vec!["-c".to_string()],
                expression: expression.to_string(),
                result_file: PathBuf::from("calcsum.res"),
                working_dir: Some(dir.path().to_path_buf()),
                timeout,
            })
        }

        #[test]
        fn test_solver_reads_fourth_line() {
            let dir = TempDir::new().unwrap();
            let solver = shell_solver(
                &dir,
                "printf 'header\\n\\nvalue:\\n{rate}\\n' > calcsum.res",
                Duration::from_secs(10),
            );
            assert_eq!(solver.solve(1500.0).unwrap(), 1500.0);
        }

        #[test]
        fn test_solver_nonzero_exit() {
            let dir = TempDir::new().unwrap();
            let solver = shell_solver(&dir, "exit 3", Duration::from_secs(10));
            let err = solver.solve(1e5).unwrap_err();
            assert!(matches!(err, EstimationError::ExternalComputation(_)));
        }

        #[test]
        fn test_solver_missing_result_file() {
            let dir = TempDir::new().unwrap();
            let solver = shell_solver(&dir, "true {rate}", Duration::from_secs(10));
            assert!(solver.solve(1e5).is_err());
        }

        #[test]
        fn test_solver_timeout() {
            let dir = TempDir::new().unwrap();
            let solver = shell_solver(&dir, "sleep 5", Duration::from_millis(100));
            let start = Instant::now();
            let err = solver.solve(1e5).unwrap_err();
            assert!(err.to_string().contains("timed out"));
            assert!(start.elapsed() < Duration::from_secs(4));
        }
    }
}
