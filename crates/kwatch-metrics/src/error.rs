//! Error types for the kwatch-metrics crate.

use thiserror::Error;

/// Errors that can occur while reading broker metrics.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The metric could not be obtained for the given topic.
    #[error("metrics unavailable for {cluster}/{topic}: {reason}")]
    Unavailable {
        /// Cluster the topic belongs to.
        cluster: String,
        /// Topic name.
        topic: String,
        /// Why the metric is unavailable.
        reason: String,
    },

    /// A metrics snapshot could not be parsed.
    #[error("invalid metrics snapshot: {reason}")]
    InvalidSnapshot {
        /// The reason the snapshot is invalid.
        reason: String,
    },

    /// Reading a snapshot file failed.
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetricsError {
    /// Creates an [`MetricsError::Unavailable`] for a topic.
    pub fn unavailable(
        cluster: impl Into<String>,
        topic: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unavailable {
            cluster: cluster.into(),
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for MetricsError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidSnapshot {
            reason: err.to_string(),
        }
    }
}

/// Result type for metrics operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unavailable() {
        let err = MetricsError::unavailable("prod", "orders", "broker timeout");
        assert_eq!(
            err.to_string(),
            "metrics unavailable for prod/orders: broker timeout"
        );
    }

    #[test]
    fn error_display_invalid_snapshot() {
        let err = MetricsError::InvalidSnapshot {
            reason: "missing field".to_string(),
        };
        assert_eq!(err.to_string(), "invalid metrics snapshot: missing field");
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<u64>("not a number");
        assert!(json_err.is_err());
        let err: MetricsError = json_err.unwrap_err().into();
        assert!(matches!(err, MetricsError::InvalidSnapshot { .. }));
    }
}
