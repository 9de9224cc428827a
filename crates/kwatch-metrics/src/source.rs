//! The query interface alarm evaluation reads metrics through.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::Result;

/// A source of current broker metrics.
///
/// Implementations must be cheap to call once per target per evaluation pass.
pub trait MetricsSource: Send + Sync {
    /// Returns the current storage usage of a topic, in bytes.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Unavailable` if the value cannot be obtained.
    fn topic_storage_usage(&self, cluster: &str, topic: &str) -> Result<u64>;

    /// Returns the most recent producer throughput sample for `day`, if any.
    ///
    /// # Errors
    ///
    /// Returns `MetricsError::Unavailable` if the backing data cannot be read.
    /// A day without samples is `Ok(None)`, not an error.
    fn recent_throughput_sample(
        &self,
        cluster: &str,
        topic: &str,
        day: NaiveDate,
    ) -> Result<Option<i64>>;
}

impl<T: MetricsSource + ?Sized> MetricsSource for Arc<T> {
    fn topic_storage_usage(&self, cluster: &str, topic: &str) -> Result<u64> {
        (**self).topic_storage_usage(cluster, topic)
    }

    fn recent_throughput_sample(
        &self,
        cluster: &str,
        topic: &str,
        day: NaiveDate,
    ) -> Result<Option<i64>> {
        (**self).recent_throughput_sample(cluster, topic, day)
    }
}
