//! Analysis orchestrator.
//!
//! This module coordinates one analysis run: parsing the measurement files,
//! estimating every record, aggregating per device/port, and writing the
//! reports.

use crate::analysis::{
    aggregate, estimate_all, generate_json_report, parse_all_files, write_results,
    AnalysisMetadata, AnalysisReport, RunCounts,
};
use crate::config::Config;
use crate::model::{sum_estimator_for, SeriesEstimator, SumEstimator};
use color_eyre::eyre::{Result, WrapErr};
use log::info;

/// Run the analysis with the configured `rez` source
pub fn run_analysis(config: &Config) -> Result<AnalysisReport> {
    let sum_source = sum_estimator_for(&config.solver, SeriesEstimator::new(config.series));
    run_analysis_with(config, sum_source.as_ref())
}

/// Run the analysis with an explicit `rez` source
pub fn run_analysis_with(config: &Config, sum_source: &dyn SumEstimator) -> Result<AnalysisReport> {
    let measurements = parse_all_files(&config.input);
    let batch = estimate_all(&measurements, config, sum_source);

    let ports = aggregate(&batch.estimates, config.statistics.z_score)
        .wrap_err("Aggregation failed")?;

    let counts = RunCounts {
        files_read: measurements.files_read,
        files_missing: measurements.files_missing,
        records: measurements.records.len(),
        idle_records: batch.idle_records,
        malformed_records: measurements.rejected.len(),
        failed_estimates: batch.failures.len(),
    };
    info!(
        "Analysis complete: {} ports from {} records ({} failed)",
        ports.len(),
        counts.records,
        counts.failed_estimates
    );

    Ok(AnalysisReport {
        metadata: AnalysisMetadata {
            analysis_timestamp: chrono::Utc::now().to_rfc3339(),
            input_pattern: format!(
                "{}{{{}..{}}}.txt",
                config.input.base_path, config.input.first_index, config.input.last_index
            ),
            rez_source: sum_source.name().to_string(),
            z_score: config.statistics.z_score,
            truncation_bound: config.series.truncation_bound,
            counts,
        },
        ports,
        rejected_lines: measurements.rejected.iter().map(|e| e.to_string()).collect(),
        failures: batch.failures,
    })
}

/// Write the configured reports for a finished analysis
pub fn write_reports(report: &AnalysisReport, config: &Config) -> Result<()> {
    if let Some(parent) = config.output.results.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create output directory '{}'", parent.display())
            })?;
        }
    }
    write_results(&report.ports, &config.output.results)?;

    if let Some(json_path) = &config.output.json {
        generate_json_report(report, json_path)?;
    }
    Ok(())
}
