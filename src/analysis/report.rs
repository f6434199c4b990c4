//! Report generation for the energy analysis.
//!
//! The text report keeps the classic one-line-per-port layout consumed by
//! plotting scripts; the JSON report adds metadata and failure details.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{eyre, Context, Result};

use super::types::*;

/// Placeholder for a statistic that could not be computed
pub const ABSENT: &str = "-";

/// Fields per line of the text report
pub const REPORT_FIELDS: usize = 10;

fn push_stat(fields: &mut Vec<String>, stat: Option<&ConfidenceStat>) {
    match stat {
        Some(s) => {
            fields.push(s.mean.to_string());
            fields.push(s.margin_of_error.to_string());
        }
        None => {
            fields.push(ABSENT.to_string());
            fields.push(ABSENT.to_string());
        }
    }
}

/// Format one port as
/// `device port simEtoff ±  thEtoff ±  simEnergy ±  thEnergy ±`
pub fn format_summary_line(summary: &PortSummary) -> String {
    let mut fields = vec![summary.node_id.to_string(), summary.port_id.to_string()];
    push_stat(&mut fields, Some(&summary.sim_off_time));
    push_stat(&mut fields, summary.theoretical_off_time.as_ref());
    push_stat(&mut fields, Some(&summary.sim_energy_ratio));
    push_stat(&mut fields, summary.theoretical_energy_ratio.as_ref());
    fields.join(" ")
}

/// Write the text report, replacing any previous one
pub fn write_results(summaries: &[PortSummary], output_path: &Path) -> Result<()> {
    let mut content = String::new();
    for summary in summaries {
        content.push_str(&format_summary_line(summary));
        content.push('\n');
    }

    fs::write(output_path, content)
        .with_context(|| format!("Failed to write results to {}", output_path.display()))?;

    log::info!("Results for {} ports written to {}", summaries.len(), output_path.display());
    Ok(())
}

/// One line of a text report read back
#[derive(Debug, Clone, PartialEq)]
pub struct ResultLine {
    pub node_id: u32,
    pub port_id: u32,
    /// Mean and margin pairs in report order; `None` where absent
    pub stats: [Option<(f64, f64)>; 4],
}

fn parse_pair(mean: &str, margin: &str) -> Result<Option<(f64, f64)>> {
    if mean == ABSENT && margin == ABSENT {
        return Ok(None);
    }
    let mean: f64 = mean.parse().with_context(|| format!("Invalid mean '{}'", mean))?;
    let margin: f64 = margin
        .parse()
        .with_context(|| format!("Invalid margin of error '{}'", margin))?;
    Ok(Some((mean, margin)))
}

/// Parse one line of a text report
pub fn parse_result_line(line: &str) -> Result<ResultLine> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != REPORT_FIELDS {
        return Err(eyre!(
            "Expected {} fields in result line, found {}",
            REPORT_FIELDS,
            fields.len()
        ));
    }

    let node_id = fields[0]
        .parse()
        .with_context(|| format!("Invalid device id '{}'", fields[0]))?;
    let port_id = fields[1]
        .parse()
        .with_context(|| format!("Invalid port id '{}'", fields[1]))?;

    Ok(ResultLine {
        node_id,
        port_id,
        stats: [
            parse_pair(fields[2], fields[3])?,
            parse_pair(fields[4], fields[5])?,
            parse_pair(fields[6], fields[7])?,
            parse_pair(fields[8], fields[9])?,
        ],
    })
}

/// Read a text report back
pub fn read_results(path: &Path) -> Result<Vec<ResultLine>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read results from {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            parse_result_line(line)
                .with_context(|| format!("{}:{}", path.display(), i + 1))
        })
        .collect()
}

/// Generate JSON report
pub fn generate_json_report(report: &AnalysisReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

fn format_stat(stat: Option<&ConfidenceStat>, scale: f64, unit: &str) -> String {
    match stat {
        Some(s) => format!(
            "{:>10.3} ± {:<8.3}{}",
            s.mean * scale,
            s.margin_of_error * scale,
            unit
        ),
        None => format!("{:>10} {:<10}{}", ABSENT, "", unit),
    }
}

/// Print a summary to stdout
pub fn print_summary(report: &AnalysisReport) {
    let counts = &report.metadata.counts;
    println!("\n=== LOW-POWER IDLE ENERGY ANALYSIS ===\n");
    println!("Input: {}", report.metadata.input_pattern);
    println!(
        "Files: {} read, {} missing",
        counts.files_read, counts.files_missing
    );
    println!(
        "Records: {} ({} without traffic, {} malformed, {} failed)",
        counts.records, counts.idle_records, counts.malformed_records, counts.failed_estimates
    );
    println!(
        "Confidence: z = {}, theoretical rez source: {}",
        report.metadata.z_score, report.metadata.rez_source
    );

    if report.ports.is_empty() {
        println!("\nNo ports with traffic.");
        println!();
        return;
    }

    println!(
        "\n{:>6} {:>5}  {:^28} {:^28} {:^22} {:^22}",
        "device", "port", "sim off-time", "theoretical off-time", "sim energy", "theoretical energy"
    );
    for port in &report.ports {
        println!(
            "{:>6} {:>5}  {} {} {} {}",
            port.node_id,
            port.port_id,
            format_stat(Some(&port.sim_off_time), 1e6, "us"),
            format_stat(port.theoretical_off_time.as_ref(), 1e6, "us"),
            format_stat(Some(&port.sim_energy_ratio), 1.0, ""),
            format_stat(port.theoretical_energy_ratio.as_ref(), 1.0, ""),
        );
    }

    if !report.failures.is_empty() {
        println!("\nFailed estimates:");
        for failure in report.failures.iter().take(10) {
            println!("  {} ({}): {}", failure.source, failure.key, failure.error);
        }
        if report.failures.len() > 10 {
            println!("  ... and {} more", report.failures.len() - 10);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stat(mean: f64, margin: f64) -> ConfidenceStat {
        ConfidenceStat {
            mean,
            margin_of_error: margin,
            samples: 3,
        }
    }

    fn summary() -> PortSummary {
        PortSummary {
            node_id: 7,
            port_id: 2,
            sim_off_time: stat(0.00045, 0.00001),
            theoretical_off_time: Some(stat(0.0004877, 0.0)),
            sim_energy_ratio: stat(0.25, 0.01),
            theoretical_energy_ratio: None,
        }
    }

    #[test]
    fn test_format_summary_line() {
        assert_eq!(
            format_summary_line(&summary()),
            "7 2 0.00045 0.00001 0.0004877 0 0.25 0.01 - -"
        );
    }

    #[test]
    fn test_write_and_read_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.txt");
        fs::write(&path, "stale content\n").unwrap();

        write_results(&[summary()], &path).unwrap();
        let lines = read_results(&path).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].node_id, 7);
        assert_eq!(lines[0].stats[0], Some((0.00045, 0.00001)));
        assert_eq!(lines[0].stats[3], None);
    }

    #[test]
    fn test_parse_result_line_errors() {
        assert!(parse_result_line("1 2 3").is_err());
        assert!(parse_result_line("x 2 0 0 0 0 0 0 0 0").is_err());
        assert!(parse_result_line("1 2 0 - 0 0 0 0 0 0").is_err());
    }
}
