//! Per-record estimation: simulated metrics plus the theoretical prediction.

use rayon::prelude::*;

use crate::config::Config;
use crate::error::EstimationError;
use crate::model::{energy_ratio, SeriesEstimator, SumEstimator, TrafficParameters};

use super::measurement::ParsedMeasurements;
use super::types::*;

/// Simulator idle counters are in nanoseconds
const NS_PER_S: f64 = 1e-9;

/// Derive λ, Ex, μ and ρ from a record with traffic
pub fn traffic_profile(record: &MeasurementRecord) -> Result<TrafficProfile, EstimationError> {
    if record.packet_count == 0 {
        return Err(EstimationError::domain("packet count is zero"));
    }
    if !(record.mean_inter_arrival_s.is_finite() && record.mean_inter_arrival_s > 0.0) {
        return Err(EstimationError::invalid(format!(
            "mean inter-arrival time must be positive and finite, got {}",
            record.mean_inter_arrival_s
        )));
    }
    if !(record.link_speed_bps.is_finite() && record.link_speed_bps > 0.0) {
        return Err(EstimationError::invalid(format!(
            "link speed must be positive and finite, got {}",
            record.link_speed_bps
        )));
    }
    if record.packet_bytes == 0 {
        return Err(EstimationError::invalid("packet bytes is zero"));
    }

    let arrival_rate = 1.0 / record.mean_inter_arrival_s;
    let mean_packet_size = record.packet_bytes as f64 / record.packet_count as f64;
    let service_rate = record.link_speed_bps / 8.0 / mean_packet_size;

    Ok(TrafficProfile {
        arrival_rate,
        mean_packet_size,
        service_rate,
        utilization: arrival_rate / service_rate,
    })
}

/// Turns measurement records into [`PortEstimate`]s
pub struct RecordEstimator<'a> {
    config: &'a Config,
    series: SeriesEstimator,
    sum_source: &'a dyn SumEstimator,
}

impl<'a> RecordEstimator<'a> {
    pub fn new(config: &'a Config, sum_source: &'a dyn SumEstimator) -> Self {
        Self {
            config,
            series: SeriesEstimator::new(config.series),
            sum_source,
        }
    }

    /// Estimate one record.
    ///
    /// Returns `Ok(None)` for a record without traffic: there is nothing to
    /// estimate, and no value is fabricated for it.
    pub fn estimate(
        &self,
        source: &RecordSource,
        record: &MeasurementRecord,
    ) -> Result<Option<PortEstimate>, EstimationError> {
        if record.packet_count == 0 {
            return Ok(None);
        }

        let traffic = traffic_profile(record)?;
        let simulated = self.simulated_metrics(record, &traffic)?;
        let theoretical = self.theoretical_metrics(record, &traffic)?;

        Ok(Some(PortEstimate {
            source: source.clone(),
            record: record.clone(),
            traffic,
            simulated,
            theoretical,
        }))
    }

    fn simulated_metrics(
        &self,
        record: &MeasurementRecord,
        traffic: &TrafficProfile,
    ) -> Result<SimulatedMetrics, EstimationError> {
        if record.interval_count == 0 {
            return Err(EstimationError::domain(
                "no completed low-power intervals to average over",
            ));
        }
        let off_time = NS_PER_S * record.idle_time_ns / record.interval_count as f64;
        let energy_ratio = energy_ratio(off_time, traffic.utilization, &self.config.simulation)?;
        Ok(SimulatedMetrics {
            off_time,
            energy_ratio,
        })
    }

    fn theoretical_metrics(
        &self,
        record: &MeasurementRecord,
        traffic: &TrafficProfile,
    ) -> Result<Option<TheoreticalMetrics>, EstimationError> {
        let Some(link) = self.config.link_for(record.link_speed_bps) else {
            log::debug!(
                "No theoretical profile for {} bps (node {} port {})",
                record.link_speed_bps,
                record.node_id,
                record.port_id
            );
            return Ok(None);
        };

        // The model works on whole-byte packet sizes
        let params = TrafficParameters::new(
            traffic.arrival_rate,
            traffic.mean_packet_size.round(),
            link.capacity,
            link.off_time_limit,
        )?;

        let estimate = self.series.estimate(&params)?;
        let rez = self.sum_source.interval_sum_given(&params, &estimate)?;
        let energy_ratio = energy_ratio(rez, traffic.utilization, &self.config.energy)?;

        Ok(Some(TheoreticalMetrics {
            off_time: estimate.expected_off_time,
            exceedance_probability: estimate.exceedance_probability,
            energy_ratio,
        }))
    }
}

/// Result of estimating a batch of records
#[derive(Debug, Default)]
pub struct EstimateBatch {
    pub estimates: Vec<PortEstimate>,
    pub failures: Vec<EstimateFailure>,
    pub idle_records: usize,
}

/// Estimate all parsed records in parallel.
///
/// A failing record is logged and collected; it never stops the batch.
pub fn estimate_all(
    measurements: &ParsedMeasurements,
    config: &Config,
    sum_source: &dyn SumEstimator,
) -> EstimateBatch {
    let estimator = RecordEstimator::new(config, sum_source);
    log::info!(
        "Estimating {} records (rez source: {})...",
        measurements.records.len(),
        sum_source.name()
    );

    let outcomes: Vec<Result<Option<PortEstimate>, EstimateFailure>> = measurements
        .records
        .par_iter()
        .map(|(source, record)| {
            estimator.estimate(source, record).map_err(|e| {
                log::warn!("Estimation failed for {} ({}): {}", source, record.key(), e);
                EstimateFailure {
                    source: source.clone(),
                    key: record.key(),
                    error: e.to_string(),
                }
            })
        })
        .collect();

    let mut batch = EstimateBatch::default();
    for outcome in outcomes {
        match outcome {
            Ok(Some(estimate)) => batch.estimates.push(estimate),
            Ok(None) => batch.idle_records += 1,
            Err(failure) => batch.failures.push(failure),
        }
    }

    log::info!(
        "Estimated {} records, {} without traffic, {} failed",
        batch.estimates.len(),
        batch.idle_records,
        batch.failures.len()
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeriesSum;
    use std::path::PathBuf;

    /// Interval sum pinned to one value
    struct FixedSum(f64);

    impl SumEstimator for FixedSum {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn interval_sum(&self, _params: &TrafficParameters) -> Result<f64, EstimationError> {
            Ok(self.0)
        }
    }

    /// Interval sum whose solver always fails
    struct FailingSum;

    impl SumEstimator for FailingSum {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn interval_sum(&self, _params: &TrafficParameters) -> Result<f64, EstimationError> {
            Err(EstimationError::ExternalComputation("solver exited with 1".to_string()))
        }
    }

    fn source() -> RecordSource {
        RecordSource {
            file: PathBuf::from("data1.txt"),
            line: 1,
        }
    }

    /// 1e5 pkt/s of 500-byte packets on a 10G link
    fn record() -> MeasurementRecord {
        MeasurementRecord {
            node_id: 4,
            port_id: 1,
            idle_time_ns: 4.5e8,
            interval_count: 1000,
            packet_count: 100_000,
            packet_bytes: 50_000_000,
            mean_inter_arrival_s: 1e-5,
            link_speed_bps: 10e9,
        }
    }

    #[test]
    fn test_traffic_profile() {
        let traffic = traffic_profile(&record()).unwrap();
        assert!((traffic.arrival_rate - 1e5).abs() < 1e-6);
        assert_eq!(traffic.mean_packet_size, 500.0);
        assert_eq!(traffic.service_rate, 2.5e6);
        assert!((traffic.utilization - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_record() {
        let config = Config::default();
        let sum = SeriesSum::new(SeriesEstimator::new(config.series));
        let estimator = RecordEstimator::new(&config, &sum);

        let estimate = estimator.estimate(&source(), &record()).unwrap().unwrap();
        assert!((estimate.simulated.off_time - 4.5e-4).abs() < 1e-15);

        let theoretical = estimate.theoretical.unwrap();
        assert!((theoretical.off_time - 4.8766630990699659e-4).abs() < 1e-10);
        assert!(theoretical.energy_ratio > 0.0 && theoretical.energy_ratio < 1.0);
        assert!(theoretical.exceedance_probability > 0.0);
    }

    #[test]
    fn test_zero_packets_gives_no_estimate() {
        let config = Config::default();
        let sum = SeriesSum::default();
        let estimator = RecordEstimator::new(&config, &sum);

        let mut idle = record();
        idle.packet_count = 0;
        idle.packet_bytes = 0;
        assert_eq!(estimator.estimate(&source(), &idle).unwrap(), None);
    }

    #[test]
    fn test_unsupported_speed_has_no_theoretical() {
        let config = Config::default();
        let sum = SeriesSum::default();
        let estimator = RecordEstimator::new(&config, &sum);

        let mut slow = record();
        slow.link_speed_bps = 1e9;
        let estimate = estimator.estimate(&source(), &slow).unwrap().unwrap();
        assert!(estimate.theoretical.is_none());
        assert!(estimate.simulated.energy_ratio <= 1.0);
    }

    #[test]
    fn test_zero_intervals_is_domain_error() {
        let config = Config::default();
        let sum = SeriesSum::default();
        let estimator = RecordEstimator::new(&config, &sum);

        let mut broken = record();
        broken.interval_count = 0;
        assert!(matches!(
            estimator.estimate(&source(), &broken),
            Err(EstimationError::DomainError(_))
        ));
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let config = Config::default();
        let sum = SeriesSum::default();

        let mut broken = record();
        broken.mean_inter_arrival_s = f64::INFINITY;
        let mut idle = record();
        idle.packet_count = 0;

        let measurements = ParsedMeasurements {
            records: vec![(source(), record()), (source(), broken), (source(), idle)],
            ..ParsedMeasurements::default()
        };
        let batch = estimate_all(&measurements, &config, &sum);
        assert_eq!(batch.estimates.len(), 1);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.idle_records, 1);
    }

    #[test]
    fn test_energy_ratio_uses_sum_source() {
        let config = Config::default();
        let sum = FixedSum(2e-4);
        let estimator = RecordEstimator::new(&config, &sum);

        let estimate = estimator.estimate(&source(), &record()).unwrap().unwrap();
        let theoretical = estimate.theoretical.unwrap();
        let expected = energy_ratio(2e-4, estimate.traffic.utilization, &config.energy).unwrap();
        assert_eq!(theoretical.energy_ratio, expected);
        // The off-time still comes from the series
        assert!((theoretical.off_time - 4.8766630990699659e-4).abs() < 1e-10);
    }

    #[test]
    fn test_sum_source_failure_is_recorded() {
        let config = Config::default();

        let mut slow = record();
        slow.port_id = 2;
        slow.link_speed_bps = 1e9;

        let measurements = ParsedMeasurements {
            records: vec![(source(), record()), (source(), slow)],
            ..ParsedMeasurements::default()
        };
        let batch = estimate_all(&measurements, &config, &FailingSum);

        // Only the 10G record needs the solver
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].key.port_id, 1);
        assert!(batch.failures[0].error.contains("solver exited"));
        assert_eq!(batch.estimates.len(), 1);
        assert!(batch.estimates[0].theoretical.is_none());
    }
}
