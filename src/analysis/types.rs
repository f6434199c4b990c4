//! Core data types for the measurement analysis.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a measurement record came from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordSource {
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One line of a per-node-port measurement file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub node_id: u32,
    pub port_id: u32,
    /// Total time spent in low power, nanoseconds
    pub idle_time_ns: f64,
    /// Number of completed low-power intervals
    pub interval_count: u64,
    pub packet_count: u64,
    pub packet_bytes: u64,
    /// Mean packet inter-arrival time, seconds
    pub mean_inter_arrival_s: f64,
    pub link_speed_bps: f64,
}

impl MeasurementRecord {
    pub fn key(&self) -> PortKey {
        PortKey {
            node_id: self.node_id,
            port_id: self.port_id,
        }
    }
}

/// Device/port identity used for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortKey {
    pub node_id: u32,
    pub port_id: u32,
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.node_id, self.port_id)
    }
}

/// Metrics derived from the simulator's own counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatedMetrics {
    /// Mean off-time per low-power interval, seconds
    pub off_time: f64,
    pub energy_ratio: f64,
}

/// Metrics predicted by the theoretical model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TheoreticalMetrics {
    pub off_time: f64,
    pub exceedance_probability: f64,
    pub energy_ratio: f64,
}

/// Traffic figures derived from one record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficProfile {
    /// λ, packets per second
    pub arrival_rate: f64,
    /// Ex, bytes
    pub mean_packet_size: f64,
    /// μ, packets per second the link can serve
    pub service_rate: f64,
    /// ρ = λ/μ
    pub utilization: f64,
}

/// Everything computed for one measurement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortEstimate {
    pub source: RecordSource,
    pub record: MeasurementRecord,
    pub traffic: TrafficProfile,
    pub simulated: SimulatedMetrics,
    /// Absent when the link speed has no theoretical profile
    pub theoretical: Option<TheoreticalMetrics>,
}

/// A record whose estimation failed; the rest of the batch continues
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateFailure {
    pub source: RecordSource,
    pub key: PortKey,
    pub error: String,
}

/// Mean and margin of error of one quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStat {
    pub mean: f64,
    pub margin_of_error: f64,
    pub samples: usize,
}

/// Aggregated statistics of one device/port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSummary {
    pub node_id: u32,
    pub port_id: u32,
    pub sim_off_time: ConfidenceStat,
    pub theoretical_off_time: Option<ConfidenceStat>,
    pub sim_energy_ratio: ConfidenceStat,
    pub theoretical_energy_ratio: Option<ConfidenceStat>,
}

/// Counters of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunCounts {
    pub files_read: usize,
    pub files_missing: usize,
    pub records: usize,
    /// Records without traffic (packet count 0), never estimated
    pub idle_records: usize,
    pub malformed_records: usize,
    pub failed_estimates: usize,
}

/// Analysis metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_timestamp: String,
    pub input_pattern: String,
    pub rez_source: String,
    pub z_score: f64,
    pub truncation_bound: u32,
    pub counts: RunCounts,
}

/// Complete analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: AnalysisMetadata,
    pub ports: Vec<PortSummary>,
    pub rejected_lines: Vec<String>,
    pub failures: Vec<EstimateFailure>,
}
