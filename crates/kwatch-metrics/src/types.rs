//! Core metric types.
//!
//! - [`TopicKey`]: identifies a topic within a cluster
//! - [`ThroughputSample`]: a producer throughput delta recorded at a point in time
//! - [`TopicMetrics`]: everything known about one topic
//! - [`MetricSnapshot`]: the serialized form exchanged with external collectors

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Identifies a topic within a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TopicKey {
    /// Cluster name.
    pub cluster: String,
    /// Topic name.
    pub topic: String,
}

impl TopicKey {
    /// Creates a new topic key.
    pub fn new(cluster: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
            topic: topic.into(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster, self.topic)
    }
}

/// Number of messages produced to a topic since the previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThroughputSample {
    /// When the sample was recorded (collector local time).
    pub recorded_at: NaiveDateTime,
    /// Message count delta since the previous sample.
    pub messages: i64,
}

impl ThroughputSample {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(recorded_at: NaiveDateTime, messages: i64) -> Self {
        Self {
            recorded_at,
            messages,
        }
    }

    /// Returns the day the sample belongs to.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.recorded_at.date()
    }
}

/// All metrics tracked for a single topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMetrics {
    /// Total log size on disk, in bytes. `None` until the collector reports it.
    #[serde(default)]
    pub storage_bytes: Option<u64>,
    /// Throughput samples, oldest first.
    #[serde(default)]
    pub throughput: Vec<ThroughputSample>,
}

impl TopicMetrics {
    /// Returns the most recent sample recorded on `day`.
    #[must_use]
    pub fn latest_sample_on(&self, day: NaiveDate) -> Option<ThroughputSample> {
        self.throughput
            .iter()
            .filter(|s| s.day() == day)
            .max_by_key(|s| s.recorded_at)
            .copied()
    }
}

/// One entry of a [`MetricSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Cluster name.
    pub cluster: String,
    /// Topic name.
    pub topic: String,
    /// Metrics for this topic.
    #[serde(flatten)]
    pub metrics: TopicMetrics,
}

/// Serialized metrics written by an external collector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Per-topic entries.
    #[serde(default)]
    pub topics: Vec<SnapshotEntry>,
}
