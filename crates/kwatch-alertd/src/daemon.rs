//! Scheduled alarm passes.

use std::future::Future;

use kwatch_alerts::{
    AlarmRunner, Dispatcher, HttpTransport, JsonFileStore, RunReport, TcpProbe,
};
use kwatch_metrics::MetricStore;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::AlertdConfig;
use crate::error::Result;

/// Runner wired to the production collaborators.
pub type Runner = AlarmRunner<JsonFileStore, MetricStore, TcpProbe, HttpTransport>;

/// Runs alarm passes on a fixed interval.
#[derive(Debug)]
pub struct Daemon {
    config: AlertdConfig,
    metrics: MetricStore,
    runner: Runner,
}

impl Daemon {
    /// Builds the daemon from its configuration.
    ///
    /// A missing or unreadable metrics snapshot is not fatal; it is retried
    /// before every pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AlertdConfig) -> Result<Self> {
        let metrics = MetricStore::new();
        let transport = HttpTransport::new(config.send_timeout())?;
        let runner = AlarmRunner::new(
            JsonFileStore::open(&config.store_path),
            metrics.clone(),
            TcpProbe::new(config.probe_timeout()),
            Dispatcher::new(transport),
            config.runner_config(),
        );

        let daemon = Self {
            config,
            metrics,
            runner,
        };
        daemon.refresh_metrics();
        Ok(daemon)
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &AlertdConfig {
        &self.config
    }

    /// Reloads the metrics snapshot, keeping the previous values on failure.
    pub fn refresh_metrics(&self) {
        let path = &self.config.metrics_snapshot_path;
        match self.metrics.reload_from_file(path) {
            Ok(()) => info!(
                path = %path.display(),
                topics = self.metrics.topic_count(),
                "metrics snapshot loaded"
            ),
            Err(e) => warn!(path = %path.display(), error = %e, "keeping previous metrics"),
        }
    }

    /// Refreshes metrics and runs one pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or a transition could not
    /// be persisted.
    pub async fn tick(&self) -> Result<RunReport> {
        self.refresh_metrics();
        Ok(self.runner.run_once().await?)
    }

    /// Runs passes every interval until `shutdown` completes.
    ///
    /// Pass failures are logged and the schedule continues. Ticks missed while
    /// a pass is running are skipped.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            interval_secs = self.config.interval_secs,
            store = %self.config.store_path.display(),
            "alarm daemon started"
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "alarm pass failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwatch_alerts::{
        AlarmChannelConfig, AlarmTarget, ChannelType, StoreDocument, TargetSpec,
    };
    use std::path::Path;
    use tempfile::TempDir;

    fn write_store(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("alarms.json");
        let document = StoreDocument {
            targets: vec![AlarmTarget::new(
                1,
                "prod",
                TargetSpec::Topic {
                    topic: "orders".to_string(),
                    capacity: 1000,
                },
                "ops",
            )],
            channels: vec![AlarmChannelConfig::new(
                "prod",
                "ops",
                ChannelType::DingTalk,
                "http://127.0.0.1:1/hook",
            )],
        };
        JsonFileStore::create(&path, &document).unwrap();
        path
    }

    fn write_metrics(dir: &Path, bytes: u64) -> std::path::PathBuf {
        let path = dir.join("metrics.json");
        let snapshot = serde_json::json!({
            "topics": [
                { "cluster": "prod", "topic": "orders", "storage_bytes": bytes }
            ]
        });
        std::fs::write(&path, snapshot.to_string()).unwrap();
        path
    }

    fn config(dir: &TempDir) -> AlertdConfig {
        AlertdConfig {
            store_path: write_store(dir.path()),
            metrics_snapshot_path: write_metrics(dir.path(), 1500),
            send_timeout_ms: 500,
            ..AlertdConfig::default()
        }
    }

    #[tokio::test]
    async fn tick_persists_transition_even_if_send_fails() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::new(config(&dir)).unwrap();

        let report = daemon.tick().await.unwrap();
        assert_eq!(report.fired_ids, vec![1]);
        assert_eq!(report.notification_failures, 1);

        let store = JsonFileStore::open(&daemon.config().store_path);
        let targets = store.read().unwrap().targets;
        assert_eq!(targets[0].state.alarm_times, 1);
    }

    #[tokio::test]
    async fn tick_picks_up_new_snapshot() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::new(config(&dir)).unwrap();
        daemon.tick().await.unwrap();

        write_metrics(dir.path(), 10);
        let report = daemon.tick().await.unwrap();
        assert_eq!(report.recovered_ids, vec![1]);
    }

    #[tokio::test]
    async fn missing_snapshot_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let config = AlertdConfig {
            store_path: write_store(dir.path()),
            metrics_snapshot_path: dir.path().join("absent.json"),
            ..AlertdConfig::default()
        };

        let daemon = Daemon::new(config).unwrap();
        let report = daemon.tick().await.unwrap();
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn missing_store_fails_the_pass() {
        let dir = TempDir::new().unwrap();
        let config = AlertdConfig {
            store_path: dir.path().join("absent.json"),
            metrics_snapshot_path: write_metrics(dir.path(), 1500),
            ..AlertdConfig::default()
        };

        let daemon = Daemon::new(config).unwrap();
        assert!(daemon.tick().await.is_err());
    }

    #[tokio::test]
    async fn run_until_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let daemon = Daemon::new(config(&dir)).unwrap();

        daemon.run_until(async {}).await;
    }
}
