//! Broker metrics consumed by kwatch alarm evaluation.
#![forbid(unsafe_code)]
//!
//! `kwatch-metrics` defines the [`MetricsSource`] query interface the alarm
//! run loop reads current values through, plus an in-memory [`MetricStore`]
//! that external collectors can fill directly or via JSON snapshot files.
//!
//! # Example
//!
//! ```rust
//! use kwatch_metrics::{MetricStore, MetricsSource, TopicKey};
//!
//! let store = MetricStore::new();
//! store.set_storage_usage(TopicKey::new("prod", "orders"), 1500);
//!
//! assert_eq!(store.topic_storage_usage("prod", "orders").unwrap(), 1500);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod source;
pub mod storage;
pub mod types;

pub use error::{MetricsError, Result};
pub use source::MetricsSource;
pub use storage::MetricStore;
pub use types::{MetricSnapshot, SnapshotEntry, ThroughputSample, TopicKey, TopicMetrics};
