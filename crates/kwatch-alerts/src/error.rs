//! Error types for the kwatch-alerts crate.

use thiserror::Error;

/// Errors that can occur in alarm evaluation and notification.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The metrics source could not provide a value.
    #[error("metrics unavailable: {0}")]
    MetricsUnavailable(#[from] kwatch_metrics::MetricsError),

    /// A target's type-specific configuration is malformed.
    #[error("malformed target spec: {reason}")]
    MalformedTargetSpec {
        /// What is wrong with the spec.
        reason: String,
    },

    /// A reachability probe failed.
    #[error("probe of {endpoint} failed: {reason}")]
    ProbeFailure {
        /// The `host:port` that was probed.
        endpoint: String,
        /// Why the probe failed.
        reason: String,
    },

    /// Delivering a notification failed.
    #[error("dispatch via {channel} failed: {reason}")]
    Dispatch {
        /// The channel the notification was routed to.
        channel: String,
        /// Why delivery failed.
        reason: String,
    },

    /// No channel binding exists for an alarm group.
    #[error("no channel configured for alarm group '{alarm_group}' in cluster '{cluster}'")]
    ChannelNotFound {
        /// Cluster of the target.
        cluster: String,
        /// The alarm group that could not be resolved.
        alarm_group: String,
    },

    /// Reading or writing alarm state failed.
    #[error("persistence failed: {reason}")]
    Persistence {
        /// The reason the store operation failed.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid runner or channel configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// The reason the configuration is invalid.
        reason: String,
    },
}

impl AlertError {
    /// Creates a [`AlertError::Dispatch`] error.
    pub fn dispatch(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Dispatch {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`AlertError::Persistence`] error.
    pub fn persistence(reason: impl Into<String>) -> Self {
        Self::Persistence {
            reason: reason.into(),
        }
    }

    /// Returns true if a run loop should surface this error to its caller
    /// instead of logging it and moving on to the next target.
    #[must_use]
    pub const fn is_fatal_for_pass(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
