//! Per-device/port aggregation of estimates.

use std::collections::BTreeMap;

use crate::error::EstimationError;

use super::types::*;

/// Group estimates by device/port, ordered by (node, port)
pub fn group_by_port(estimates: &[PortEstimate]) -> BTreeMap<PortKey, Vec<&PortEstimate>> {
    let mut groups: BTreeMap<PortKey, Vec<&PortEstimate>> = BTreeMap::new();
    for estimate in estimates {
        groups.entry(estimate.record.key()).or_default().push(estimate);
    }
    groups
}

/// Summarize one group.
///
/// Every member must belong to `key`. Theoretical statistics cover only the
/// records that have a theoretical estimate and are absent when none do.
pub fn summarize_port(
    key: PortKey,
    group: &[&PortEstimate],
    z: f64,
) -> Result<PortSummary, EstimationError> {
    if let Some(stray) = group.iter().find(|e| e.record.key() != key) {
        return Err(EstimationError::MismatchedGrouping {
            node_id: key.node_id,
            port_id: key.port_id,
            found_node: stray.record.node_id,
            found_port: stray.record.port_id,
        });
    }

    let sim_off: Vec<f64> = group.iter().map(|e| e.simulated.off_time).collect();
    let sim_energy: Vec<f64> = group.iter().map(|e| e.simulated.energy_ratio).collect();
    let th_off: Vec<f64> = group
        .iter()
        .filter_map(|e| e.theoretical.map(|t| t.off_time))
        .collect();
    let th_energy: Vec<f64> = group
        .iter()
        .filter_map(|e| e.theoretical.map(|t| t.energy_ratio))
        .collect();

    let empty = || EstimationError::domain(format!("no measurements for {}", key));

    Ok(PortSummary {
        node_id: key.node_id,
        port_id: key.port_id,
        sim_off_time: ConfidenceStat::from_samples(&sim_off, z).ok_or_else(empty)?,
        theoretical_off_time: ConfidenceStat::from_samples(&th_off, z),
        sim_energy_ratio: ConfidenceStat::from_samples(&sim_energy, z).ok_or_else(empty)?,
        theoretical_energy_ratio: ConfidenceStat::from_samples(&th_energy, z),
    })
}

/// Summarize every device/port
pub fn aggregate(estimates: &[PortEstimate], z: f64) -> Result<Vec<PortSummary>, EstimationError> {
    let groups = group_by_port(estimates);
    log::info!("Aggregating {} estimates over {} ports", estimates.len(), groups.len());

    groups
        .into_iter()
        .map(|(key, group)| summarize_port(key, &group, z))
        .collect()
}
