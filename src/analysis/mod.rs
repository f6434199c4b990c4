//! Measurement analysis for low-power-idle simulations.
//!
//! This module turns per-port simulator output into simulated and
//! theoretical off-time and energy statistics per device/port.

pub mod types;
pub mod measurement;
pub mod estimate;
pub mod statistics;
pub mod aggregate;
pub mod report;

pub use types::*;
pub use measurement::{parse_all_files, parse_measurement_file, parse_record, ParsedMeasurements};
pub use estimate::{estimate_all, traffic_profile, EstimateBatch, RecordEstimator};
pub use aggregate::{aggregate, group_by_port, summarize_port};
pub use report::{
    format_summary_line, generate_json_report, print_summary, read_results, write_results,
};
