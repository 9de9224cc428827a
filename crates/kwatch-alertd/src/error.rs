//! Daemon error types.

use thiserror::Error;

/// Errors raised while configuring or running the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The configuration file is missing, unreadable or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The alarm core failed.
    #[error(transparent)]
    Alerts(#[from] kwatch_alerts::AlertError),

    /// The metrics snapshot could not be loaded.
    #[error(transparent)]
    Metrics(#[from] kwatch_metrics::MetricsError),
}

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = DaemonError::Config("interval_secs must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: interval_secs must be positive"
        );
    }

    #[test]
    fn alert_error_is_transparent() {
        let err: DaemonError = kwatch_alerts::AlertError::persistence("disk full").into();
        assert_eq!(err.to_string(), "persistence failed: disk full");
    }
}
