//! Measurement file parsing.
//!
//! Each simulated switch port writes one whitespace-separated line:
//!
//! ```text
//! nodeId portId idleTimeNs intervalCount packetCount packetBytes meanInterArrival linkSpeed
//! ```
//!
//! Files are read in parallel; a bad line is rejected on its own without
//! affecting the rest of its file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;

use crate::config::InputConfig;
use crate::error::EstimationError;

use super::types::{MeasurementRecord, RecordSource};

/// Number of fields the simulator writes per line
pub const RECORD_FIELDS: usize = 8;

/// Some simulator builds append one trailing column, which is ignored
pub const MAX_RECORD_FIELDS: usize = RECORD_FIELDS + 1;

/// Records and rejected lines of one file
#[derive(Debug, Default)]
pub struct ParsedFile {
    pub records: Vec<(RecordSource, MeasurementRecord)>,
    pub rejected: Vec<EstimationError>,
}

/// Records of a whole file set
#[derive(Debug, Default)]
pub struct ParsedMeasurements {
    pub records: Vec<(RecordSource, MeasurementRecord)>,
    pub rejected: Vec<EstimationError>,
    pub files_read: usize,
    pub files_missing: usize,
}

fn parse_field<T: FromStr>(
    fields: &[&str],
    index: usize,
    name: &str,
    source: &RecordSource,
) -> Result<T, EstimationError> {
    fields[index]
        .parse()
        .map_err(|_| EstimationError::MalformedInputRecord {
            file: source.file.clone(),
            line: source.line,
            reason: format!("field {} ({}) is not valid: '{}'", index + 1, name, fields[index]),
        })
}

/// Parse a single measurement line
pub fn parse_record(
    line: &str,
    source: &RecordSource,
) -> Result<MeasurementRecord, EstimationError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < RECORD_FIELDS || fields.len() > MAX_RECORD_FIELDS {
        return Err(EstimationError::MalformedInputRecord {
            file: source.file.clone(),
            line: source.line,
            reason: format!("expected {} fields, found {}", RECORD_FIELDS, fields.len()),
        });
    }

    Ok(MeasurementRecord {
        node_id: parse_field(&fields, 0, "node id", source)?,
        port_id: parse_field(&fields, 1, "port id", source)?,
        idle_time_ns: parse_field(&fields, 2, "idle time", source)?,
        interval_count: parse_field(&fields, 3, "interval count", source)?,
        packet_count: parse_field(&fields, 4, "packet count", source)?,
        packet_bytes: parse_field(&fields, 5, "packet bytes", source)?,
        mean_inter_arrival_s: parse_field(&fields, 6, "mean inter-arrival", source)?,
        link_speed_bps: parse_field(&fields, 7, "link speed", source)?,
    })
}

/// Parse a single measurement file
pub fn parse_measurement_file(path: &Path) -> Result<ParsedFile> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open measurement file: {}", path.display()))?;
    let reader = BufReader::with_capacity(64 * 1024, file);

    let mut parsed = ParsedFile::default();
    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result
            .with_context(|| format!("Failed to read line {} of {}", index + 1, path.display()))?;
        if line.trim().is_empty() {
            continue;
        }

        let source = RecordSource {
            file: path.to_path_buf(),
            line: index + 1,
        };
        match parse_record(&line, &source) {
            Ok(record) => parsed.records.push((source, record)),
            Err(e) => {
                log::warn!("Rejected {}", e);
                parsed.rejected.push(e);
            }
        }
    }

    Ok(parsed)
}

/// Parse every file of the configured set in parallel.
///
/// Missing or unreadable files are logged and skipped. Records come back
/// ordered by file index, then line.
pub fn parse_all_files(input: &InputConfig) -> ParsedMeasurements {
    let paths: Vec<(u32, PathBuf)> = input.indices().map(|i| (i, input.file_path(i))).collect();
    log::info!(
        "Parsing {} measurement files ({}{}..{}.txt) in parallel...",
        paths.len(),
        input.base_path,
        input.first_index,
        input.last_index
    );

    let results: Vec<(u32, Option<ParsedFile>)> = paths
        .par_iter()
        .map(|(index, path)| {
            if !path.exists() {
                log::warn!("Measurement file {} does not exist", path.display());
                return (*index, None);
            }
            match parse_measurement_file(path) {
                Ok(parsed) => {
                    log::debug!(
                        "Parsed {}: {} records, {} rejected",
                        path.display(),
                        parsed.records.len(),
                        parsed.rejected.len()
                    );
                    (*index, Some(parsed))
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {:#}", path.display(), e);
                    (*index, None)
                }
            }
        })
        .collect();

    // par_iter().collect() keeps input order, so records stay sorted by index
    let mut all = ParsedMeasurements::default();
    for (_, parsed) in results {
        match parsed {
            Some(file) => {
                all.files_read += 1;
                all.records.extend(file.records);
                all.rejected.extend(file.rejected);
            }
            None => all.files_missing += 1,
        }
    }

    log::info!(
        "Parsed {} files ({} missing), {} records, {} rejected lines",
        all.files_read,
        all.files_missing,
        all.records.len(),
        all.rejected.len()
    );
    all
}
