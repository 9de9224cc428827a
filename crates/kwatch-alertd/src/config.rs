//! Daemon configuration.
//!
//! Loaded from a JSON file. Every field has a default, so a minimal file only
//! names the store and metrics snapshot paths:
//!
//! ```json
//! {
//!   "clusters": ["prod"],
//!   "store_path": "/var/lib/kwatch/alarms.json",
//!   "metrics_snapshot_path": "/var/lib/kwatch/metrics.json"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use kwatch_alerts::{DEFAULT_PRODUCT, DisabledTargetPolicy, RunnerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, Result};

/// Main daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertdConfig {
    /// Clusters to evaluate. Empty evaluates every cluster in the store.
    pub clusters: Vec<String>,
    /// Product name shown in notification titles.
    pub product: String,
    /// Seconds between passes.
    pub interval_secs: u64,
    /// Connect timeout of node probes, in milliseconds.
    pub probe_timeout_ms: u64,
    /// Timeout of webhook and mail relay requests, in milliseconds.
    pub send_timeout_ms: u64,
    /// JSON alarm store holding targets and channel bindings.
    pub store_path: PathBuf,
    /// JSON metrics snapshot refreshed by an external collector.
    pub metrics_snapshot_path: PathBuf,
    /// Handling of disabled targets.
    pub disabled_target_policy: DisabledTargetPolicy,
}

impl Default for AlertdConfig {
    fn default() -> Self {
        Self {
            clusters: Vec::new(),
            product: DEFAULT_PRODUCT.to_string(),
            interval_secs: 60,
            probe_timeout_ms: 3000,
            send_timeout_ms: 5000,
            store_path: PathBuf::from("/var/lib/kwatch/alarms.json"),
            metrics_snapshot_path: PathBuf::from("/var/lib/kwatch/metrics.json"),
            disabled_target_policy: DisabledTargetPolicy::Skip,
        }
    }
}

impl AlertdConfig {
    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DaemonError::Config(format!(
                "failed to read config file '{}': {e}",
                path.as_ref().display()
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| DaemonError::Config(format!("invalid JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(DaemonError::Config(
                "interval_secs must be positive".to_string(),
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(DaemonError::Config(
                "probe_timeout_ms must be positive".to_string(),
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(DaemonError::Config(
                "send_timeout_ms must be positive".to_string(),
            ));
        }
        if self.product.trim().is_empty() {
            return Err(DaemonError::Config("product cannot be empty".to_string()));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(DaemonError::Config("store_path cannot be empty".to_string()));
        }
        if self.clusters.iter().any(|c| c.trim().is_empty()) {
            return Err(DaemonError::Config(
                "cluster names cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the time between passes.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Returns the node probe timeout.
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Returns the notification send timeout.
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Returns the settings handed to the alarm runner.
    #[must_use]
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig::default()
            .with_clusters(self.clusters.clone())
            .with_product(self.product.clone())
            .with_disabled_target_policy(self.disabled_target_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = AlertdConfig::from_json("{}").unwrap();
        assert_eq!(config, AlertdConfig::default());
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.probe_timeout(), Duration::from_millis(3000));
        assert_eq!(config.send_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_parse_full_config() {
        let config = AlertdConfig::from_json(
            r#"{
                "clusters": ["prod", "staging"],
                "product": "Kafka Ops",
                "interval_secs": 30,
                "probe_timeout_ms": 1000,
                "send_timeout_ms": 2000,
                "store_path": "/tmp/alarms.json",
                "metrics_snapshot_path": "/tmp/metrics.json",
                "disabled_target_policy": "stop_pass"
            }"#,
        )
        .unwrap();

        assert_eq!(config.clusters, vec!["prod", "staging"]);
        assert_eq!(config.interval_secs, 30);
        assert_eq!(config.disabled_target_policy, DisabledTargetPolicy::StopPass);

        let runner = config.runner_config();
        assert_eq!(runner.product, "Kafka Ops");
        assert_eq!(runner.clusters, vec!["prod", "staging"]);
        assert_eq!(runner.disabled_target_policy, DisabledTargetPolicy::StopPass);
    }

    #[test]
    fn test_load_from_file() {
        let file = create_temp_config(r#"{ "interval_secs": 15 }"#);
        let config = AlertdConfig::load(file.path()).unwrap();
        assert_eq!(config.interval_secs, 15);
    }

    #[test]
    fn test_file_not_found() {
        let result = AlertdConfig::load("/nonexistent/kwatch/config.json");
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let result = AlertdConfig::from_json("{ interval_secs: ");
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }

    #[test_case(r#"{ "interval_secs": 0 }"# ; "zero interval")]
    #[test_case(r#"{ "probe_timeout_ms": 0 }"# ; "zero probe timeout")]
    #[test_case(r#"{ "send_timeout_ms": 0 }"# ; "zero send timeout")]
    #[test_case(r#"{ "product": " " }"# ; "blank product")]
    #[test_case(r#"{ "store_path": "" }"# ; "empty store path")]
    #[test_case(r#"{ "clusters": ["prod", ""] }"# ; "empty cluster name")]
    fn test_invalid_values_rejected(json: &str) {
        assert!(matches!(
            AlertdConfig::from_json(json),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result = AlertdConfig::from_json(r#"{ "disabled_target_policy": "ignore" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = AlertdConfig {
            clusters: vec!["prod".to_string()],
            interval_secs: 120,
            ..AlertdConfig::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert_eq!(AlertdConfig::from_json(&json).unwrap(), config);
    }
}
