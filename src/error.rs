//! Error taxonomy for estimation, parsing, and aggregation.

use std::path::PathBuf;

/// Errors raised by the estimation core and the measurement pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    /// A rate, size, or shape parameter is non-positive or not finite
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A ratio or sum is undefined (division by zero, NaN, Inf)
    #[error("Domain error: {0}")]
    DomainError(String),

    /// The external numeric solver failed or produced unusable output
    #[error("External computation failed: {0}")]
    ExternalComputation(String),

    /// A measurement line with the wrong field count or a bad field
    #[error("Malformed record at {}:{line}: {reason}", file.display())]
    MalformedInputRecord {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    /// A record placed in a device/port group it does not belong to
    #[error("Record for {found_node}/{found_port} grouped under {node_id}/{port_id}")]
    MismatchedGrouping {
        node_id: u32,
        port_id: u32,
        found_node: u32,
        found_port: u32,
    },
}

impl EstimationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn domain(msg: impl Into<String>) -> Self {
        Self::DomainError(msg.into())
    }

    pub(crate) fn external(msg: impl Into<String>) -> Self {
        Self::ExternalComputation(msg.into())
    }
}

/// Reject NaN and infinite intermediates by name
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<f64, EstimationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EstimationError::domain(format!("{} is not finite ({})", name, value)))
    }
}
