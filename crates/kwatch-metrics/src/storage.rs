//! In-memory metric storage.
//!
//! This module provides the [`MetricStore`], a thread-safe table of per-topic
//! metrics that external collectors fill in and alarm evaluation reads from.
//! A store can be refreshed wholesale from a JSON [`MetricSnapshot`] file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{MetricsError, Result};
use crate::source::MetricsSource;
use crate::types::{MetricSnapshot, ThroughputSample, TopicKey, TopicMetrics};

/// Thread-safe in-memory storage for topic metrics.
#[derive(Debug, Clone)]
pub struct MetricStore {
    /// Maximum throughput samples kept per topic.
    max_samples: usize,
    data: Arc<RwLock<HashMap<TopicKey, TopicMetrics>>>,
}

impl MetricStore {
    /// Default number of throughput samples retained per topic.
    pub const DEFAULT_MAX_SAMPLES: usize = 1440;

    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_samples(Self::DEFAULT_MAX_SAMPLES)
    }

    /// Creates an empty store retaining at most `max_samples` samples per topic.
    #[must_use]
    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            max_samples: max_samples.max(1),
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Builds a store from a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub fn from_snapshot_file(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new();
        store.reload_from_file(path)?;
        Ok(store)
    }

    /// Replaces the store contents with the snapshot at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    /// The current contents are kept on error.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let snapshot: MetricSnapshot = serde_json::from_str(&content)?;
        self.replace(snapshot);
        debug!(path = %path.as_ref().display(), "reloaded metrics snapshot");
        Ok(())
    }

    /// Replaces the store contents with `snapshot`.
    pub fn replace(&self, snapshot: MetricSnapshot) {
        let mut table = HashMap::with_capacity(snapshot.topics.len());
        for entry in snapshot.topics {
            let mut metrics = entry.metrics;
            metrics.throughput.sort_by_key(|s| s.recorded_at);
            trim_front(&mut metrics.throughput, self.max_samples);
            table.insert(TopicKey::new(entry.cluster, entry.topic), metrics);
        }
        *self.data.write() = table;
    }

    /// Records the current storage usage of a topic.
    pub fn set_storage_usage(&self, key: TopicKey, bytes: u64) {
        let mut data = self.data.write();
        data.entry(key).or_default().storage_bytes = Some(bytes);
    }

    /// Appends a throughput sample for a topic, keeping samples in time order.
    #[allow(clippy::significant_drop_tightening)] // Lock held for the ordered insert
    pub fn push_throughput(&self, key: TopicKey, sample: ThroughputSample) {
        let mut data = self.data.write();
        let samples = &mut data.entry(key).or_default().throughput;

        let pos = samples
            .binary_search_by_key(&sample.recorded_at, |s| s.recorded_at)
            .unwrap_or_else(|pos| pos);
        samples.insert(pos, sample);
        trim_front(samples, self.max_samples);
    }

    /// Returns a copy of the metrics for a topic.
    #[must_use]
    pub fn get(&self, key: &TopicKey) -> Option<TopicMetrics> {
        self.data.read().get(key).cloned()
    }

    /// Returns the number of topics tracked.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.data.read().len()
    }

    /// Removes all data.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_front(samples: &mut Vec<ThroughputSample>, max: usize) {
    if samples.len() > max {
        let excess = samples.len() - max;
        samples.drain(..excess);
    }
}

impl MetricsSource for MetricStore {
    fn topic_storage_usage(&self, cluster: &str, topic: &str) -> Result<u64> {
        let key = TopicKey::new(cluster, topic);
        self.data
            .read()
            .get(&key)
            .and_then(|m| m.storage_bytes)
            .ok_or_else(|| MetricsError::unavailable(cluster, topic, "no storage usage reported"))
    }

    fn recent_throughput_sample(
        &self,
        cluster: &str,
        topic: &str,
        day: NaiveDate,
    ) -> Result<Option<i64>> {
        let key = TopicKey::new(cluster, topic);
        Ok(self
            .data
            .read()
            .get(&key)
            .and_then(|m| m.latest_sample_on(day))
            .map(|s| s.messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::io::Write;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn storage_usage_roundtrip() {
        let store = MetricStore::new();
        store.set_storage_usage(TopicKey::new("prod", "orders"), 1500);

        assert_eq!(store.topic_storage_usage("prod", "orders").unwrap(), 1500);
        assert_eq!(store.topic_count(), 1);
    }

    #[test]
    fn storage_usage_unknown_topic_is_unavailable() {
        let store = MetricStore::new();

        let err = store.topic_storage_usage("prod", "missing").unwrap_err();
        assert!(matches!(err, MetricsError::Unavailable { .. }));
    }

    #[test]
    fn throughput_only_topic_has_no_storage_usage() {
        let store = MetricStore::new();
        store.push_throughput(TopicKey::new("prod", "orders"), ThroughputSample::new(at(9), 3));

        assert!(store.topic_storage_usage("prod", "orders").is_err());
    }

    #[test]
    fn recent_sample_returns_latest() {
        let store = MetricStore::new();
        let key = TopicKey::new("prod", "orders");
        store.push_throughput(key.clone(), ThroughputSample::new(at(11), 30));
        store.push_throughput(key.clone(), ThroughputSample::new(at(9), 10));

        let sample = store.recent_throughput_sample("prod", "orders", today()).unwrap();
        assert_eq!(sample, Some(30));

        let samples = store.get(&key).unwrap().throughput;
        assert!(samples.windows(2).all(|w| w[0].recorded_at <= w[1].recorded_at));
    }

    #[test]
    fn recent_sample_absent_is_none() {
        let store = MetricStore::new();
        let sample = store.recent_throughput_sample("prod", "orders", today()).unwrap();
        assert!(sample.is_none());
    }

    #[test]
    fn retention_drops_oldest_samples() {
        let store = MetricStore::with_max_samples(2);
        let key = TopicKey::new("prod", "orders");
        for hour in 1..=4 {
            store.push_throughput(key.clone(), ThroughputSample::new(at(hour), i64::from(hour)));
        }

        let samples = store.get(&key).unwrap().throughput;
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].messages, 3);
    }

    #[test]
    fn reload_from_snapshot_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"topics":[{{"cluster":"prod","topic":"orders","storage_bytes":900}}]}}"#
        )
        .unwrap();

        let store = MetricStore::from_snapshot_file(file.path()).unwrap();
        assert_eq!(store.topic_storage_usage("prod", "orders").unwrap(), 900);
    }

    #[test]
    fn reload_invalid_snapshot_keeps_contents() {
        let store = MetricStore::new();
        store.set_storage_usage(TopicKey::new("prod", "orders"), 10);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let result = store.reload_from_file(file.path());
        assert!(matches!(result, Err(MetricsError::InvalidSnapshot { .. })));
        assert_eq!(store.topic_storage_usage("prod", "orders").unwrap(), 10);
    }

    #[test]
    fn reload_missing_file_is_io_error() {
        let store = MetricStore::new();
        let result = store.reload_from_file("/nonexistent/kwatch/metrics.json");
        assert!(matches!(result, Err(MetricsError::Io(_))));
    }
}
