//! Alarm target and channel binding storage.
//!
//! The store is authoritative for alarm state: the run loop reloads targets
//! every pass and writes back a target's counters as soon as it transitions.
//!
//! Targets are parsed one entry at a time. An entry that does not describe a
//! valid target is returned as an error in its slot, so the rest of the store
//! stays usable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AlertError, Result};
use crate::types::{AlarmChannelConfig, AlarmTarget};

/// One stored target, or the reason it could not be read.
pub type TargetEntry = Result<AlarmTarget>;

/// Source of alarm targets and channel bindings, and sink for alarm state.
pub trait AlarmStore: Send + Sync {
    /// Loads the targets of `clusters` in stored order. An empty filter
    /// loads every cluster. Disabled targets are included.
    ///
    /// A stored entry that is not a valid target yields
    /// `Err(AlertError::MalformedTargetSpec)` in its position.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Persistence` if the store cannot be read.
    fn load_alarm_targets(&self, clusters: &[String]) -> Result<Vec<TargetEntry>>;

    /// Looks up the channel binding of an alarm group.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Persistence` if the bindings cannot be read.
    fn load_channel_config(
        &self,
        cluster: &str,
        alarm_group: &str,
    ) -> Result<Option<AlarmChannelConfig>>;

    /// Persists `alarm_times` and `is_normal` of `target`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Persistence` if the target is unknown or the
    /// write fails.
    fn save_alarm_target_state(&self, target: &AlarmTarget) -> Result<()>;
}

impl<S: AlarmStore> AlarmStore for Arc<S> {
    fn load_alarm_targets(&self, clusters: &[String]) -> Result<Vec<TargetEntry>> {
        (**self).load_alarm_targets(clusters)
    }

    fn load_channel_config(
        &self,
        cluster: &str,
        alarm_group: &str,
    ) -> Result<Option<AlarmChannelConfig>> {
        (**self).load_channel_config(cluster, alarm_group)
    }

    fn save_alarm_target_state(&self, target: &AlarmTarget) -> Result<()> {
        (**self).save_alarm_target_state(target)
    }
}

fn in_clusters(cluster: &str, clusters: &[String]) -> bool {
    clusters.is_empty() || clusters.iter().any(|c| c == cluster)
}

/// Contents of a store: targets in evaluation order and channel bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDocument {
    /// Alarm targets.
    #[serde(default)]
    pub targets: Vec<AlarmTarget>,
    /// Channel bindings.
    #[serde(default)]
    pub channels: Vec<AlarmChannelConfig>,
}

impl StoreDocument {
    fn targets_in(&self, clusters: &[String]) -> Vec<TargetEntry> {
        self.targets
            .iter()
            .filter(|t| in_clusters(&t.cluster, clusters))
            .cloned()
            .map(Ok)
            .collect()
    }

    fn channel(&self, cluster: &str, alarm_group: &str) -> Option<AlarmChannelConfig> {
        self.channels
            .iter()
            .find(|c| c.cluster == cluster && c.alarm_group == alarm_group)
            .cloned()
    }

    fn write_state(&mut self, target: &AlarmTarget) -> Result<()> {
        let stored = self
            .targets
            .iter_mut()
            .find(|t| t.id == target.id)
            .ok_or_else(|| unknown_target(target.id))?;
        stored.state.alarm_times = target.state.alarm_times;
        stored.state.is_normal = target.state.is_normal;
        Ok(())
    }
}

fn unknown_target(id: u64) -> AlertError {
    AlertError::persistence(format!("unknown alarm target {id}"))
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlarmStore {
    document: Arc<RwLock<StoreDocument>>,
}

impl MemoryAlarmStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `document`.
    #[must_use]
    pub fn from_document(document: StoreDocument) -> Self {
        Self {
            document: Arc::new(RwLock::new(document)),
        }
    }

    /// Appends a target.
    pub fn insert_target(&self, target: AlarmTarget) {
        self.document.write().targets.push(target);
    }

    /// Adds or replaces a channel binding.
    pub fn upsert_channel(&self, config: AlarmChannelConfig) {
        let mut document = self.document.write();
        document
            .channels
            .retain(|c| !(c.cluster == config.cluster && c.alarm_group == config.alarm_group));
        document.channels.push(config);
    }

    /// Returns the stored copy of a target.
    #[must_use]
    pub fn target(&self, id: u64) -> Option<AlarmTarget> {
        self.document.read().targets.iter().find(|t| t.id == id).cloned()
    }

    /// Returns a copy of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> StoreDocument {
        self.document.read().clone()
    }
}

impl AlarmStore for MemoryAlarmStore {
    fn load_alarm_targets(&self, clusters: &[String]) -> Result<Vec<TargetEntry>> {
        Ok(self.document.read().targets_in(clusters))
    }

    fn load_channel_config(
        &self,
        cluster: &str,
        alarm_group: &str,
    ) -> Result<Option<AlarmChannelConfig>> {
        Ok(self.document.read().channel(cluster, alarm_group))
    }

    fn save_alarm_target_state(&self, target: &AlarmTarget) -> Result<()> {
        self.document.write().write_state(target)
    }
}

/// Store file contents with entries left unparsed.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawDocument {
    #[serde(default)]
    targets: Vec<Value>,
    #[serde(default)]
    channels: Vec<Value>,
}

fn entry_id(entry: &Value) -> Option<u64> {
    entry.get("id").and_then(Value::as_u64)
}

fn parse_target(index: usize, entry: &Value) -> TargetEntry {
    serde_json::from_value(entry.clone()).map_err(|e| {
        let reason = match entry_id(entry) {
            Some(id) => format!("alarm target {id}: {e}"),
            None => format!("alarm target at index {index}: {e}"),
        };
        AlertError::MalformedTargetSpec { reason }
    })
}

impl RawDocument {
    fn targets_in(&self, clusters: &[String]) -> Vec<TargetEntry> {
        self.targets
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry
                    .get("cluster")
                    .and_then(Value::as_str)
                    .is_none_or(|cluster| in_clusters(cluster, clusters))
            })
            .map(|(index, entry)| parse_target(index, entry))
            .collect()
    }

    fn channels(&self) -> Vec<AlarmChannelConfig> {
        self.channels
            .iter()
            .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(error = %e, "ignoring malformed channel binding");
                    None
                }
            })
            .collect()
    }

    fn channel(&self, cluster: &str, alarm_group: &str) -> Option<AlarmChannelConfig> {
        self.channels()
            .into_iter()
            .find(|c| c.cluster == cluster && c.alarm_group == alarm_group)
    }

    fn write_state(&mut self, target: &AlarmTarget) -> Result<()> {
        let stored = self
            .targets
            .iter_mut()
            .find(|entry| entry_id(entry) == Some(target.id))
            .and_then(Value::as_object_mut)
            .ok_or_else(|| unknown_target(target.id))?;
        stored.insert("alarm_times".to_string(), target.state.alarm_times.into());
        stored.insert("is_normal".to_string(), target.state.is_normal.into());
        Ok(())
    }
}

/// Store backed by one JSON file holding a [`StoreDocument`].
///
/// The file is re-read on every call so external edits to targets and
/// bindings take effect on the next pass. State writes touch only the
/// counters of the saved entry and replace the file atomically.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens the store at `path`. The file is not read until first use.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Writes `document` to `path`, creating or replacing the store file.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Persistence` if the file cannot be written.
    pub fn create(path: impl Into<PathBuf>, document: &StoreDocument) -> Result<Self> {
        let store = Self::open(path);
        store.write(document)?;
        Ok(store)
    }

    /// Returns the store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the valid targets and bindings. Malformed entries are logged and
    /// left out.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Persistence` if the file cannot be read or is not
    /// a JSON store document.
    pub fn read(&self) -> Result<StoreDocument> {
        let raw = self.read_raw()?;
        let targets = raw
            .targets_in(&[])
            .into_iter()
            .filter_map(|entry| {
                entry
                    .map_err(|e| warn!(error = %e, "ignoring malformed alarm target"))
                    .ok()
            })
            .collect();
        Ok(StoreDocument {
            targets,
            channels: raw.channels(),
        })
    }

    fn read_raw(&self) -> Result<RawDocument> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            AlertError::persistence(format!("reading {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            AlertError::persistence(format!("parsing {}: {e}", self.path.display()))
        })
    }

    fn write<D: Serialize>(&self, document: &D) -> Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");

        std::fs::write(&tmp, json)
            .map_err(|e| AlertError::persistence(format!("writing {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            AlertError::persistence(format!("replacing {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), "alarm store written");
        Ok(())
    }
}

impl AlarmStore for JsonFileStore {
    fn load_alarm_targets(&self, clusters: &[String]) -> Result<Vec<TargetEntry>> {
        Ok(self.read_raw()?.targets_in(clusters))
    }

    fn load_channel_config(
        &self,
        cluster: &str,
        alarm_group: &str,
    ) -> Result<Option<AlarmChannelConfig>> {
        Ok(self.read_raw()?.channel(cluster, alarm_group))
    }

    fn save_alarm_target_state(&self, target: &AlarmTarget) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut document = self.read_raw()?;
        document.write_state(target)?;
        self.write(&document)
    }
}
