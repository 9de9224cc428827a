//! Core types for the alerting system.
//!
//! - [`AlarmTarget`]: one monitored entity with its threshold and alarm state
//! - [`TargetSpec`]: the type-specific configuration of a target
//! - [`SpeedRange`]: the accepted producer throughput interval
//! - [`AlarmChannelConfig`]: the notification channel bound to an alarm group

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::state::AlarmState;

/// The kind of entity a target watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// Storage growth of a topic.
    Topic,
    /// Producer throughput into a topic.
    Producer,
    /// Reachability of a set of broker nodes.
    Node,
}

impl TargetKind {
    /// Returns the kind as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Topic => "Topic",
            Self::Producer => "Producer",
            Self::Node => "Node",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive producer throughput interval, in messages per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SpeedRangeRepr")]
pub struct SpeedRange {
    /// Lowest acceptable throughput.
    pub low: i64,
    /// Highest acceptable throughput.
    pub high: i64,
}

impl SpeedRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    /// Parses the `"low,high"` form.
    ///
    /// Anything other than exactly two integers yields `0,0`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match Self::try_parse(text) {
            Some(range) => range,
            None => {
                warn!(speed = %text, "malformed producer speed range, using 0,0");
                Self::default()
            }
        }
    }

    fn try_parse(text: &str) -> Option<Self> {
        let mut parts = text.split(',').map(str::trim);
        let low = parts.next()?.parse().ok()?;
        let high = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { low, high })
    }

    /// Returns true if `speed` lies outside the range.
    #[must_use]
    pub const fn is_outside(&self, speed: i64) -> bool {
        speed < self.low || speed > self.high
    }

    /// Returns true if `speed` lies inside the range, bounds included.
    #[must_use]
    pub const fn contains(&self, speed: i64) -> bool {
        self.low <= speed && speed <= self.high
    }
}

impl fmt::Display for SpeedRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.low, self.high)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SpeedRangeRepr {
    Text(String),
    Bounds { low: i64, high: i64 },
}

impl From<SpeedRangeRepr> for SpeedRange {
    fn from(repr: SpeedRangeRepr) -> Self {
        match repr {
            SpeedRangeRepr::Text(text) => Self::parse(&text),
            SpeedRangeRepr::Bounds { low, high } => Self { low, high },
        }
    }
}

/// Type-specific configuration of an alarm target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TargetSpec {
    /// Fires when the topic's storage exceeds `capacity` bytes.
    Topic {
        /// Topic name.
        topic: String,
        /// Capacity threshold in bytes.
        capacity: u64,
    },
    /// Fires when producer throughput leaves `speed`.
    Producer {
        /// Topic name.
        topic: String,
        /// Accepted throughput interval.
        speed: SpeedRange,
    },
    /// Fires when any of `servers` refuses a TCP connection.
    Node {
        /// `host:port` endpoints, in configured order.
        #[serde(deserialize_with = "servers_list_or_csv")]
        servers: Vec<String>,
    },
}

impl TargetSpec {
    /// Returns the kind of target this spec configures.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        match self {
            Self::Topic { .. } => TargetKind::Topic,
            Self::Producer { .. } => TargetKind::Producer,
            Self::Node { .. } => TargetKind::Node,
        }
    }
}

/// Accepts either a JSON list of endpoints or a comma separated string.
fn servers_list_or_csv<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Servers {
        List(Vec<String>),
        Csv(String),
    }

    let servers = match Servers::deserialize(deserializer)? {
        Servers::List(list) => list,
        Servers::Csv(text) => text.split(',').map(str::to_string).collect(),
    };

    Ok(servers
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn default_enabled() -> bool {
    true
}

/// One monitored entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmTarget {
    /// Unique identifier.
    pub id: u64,
    /// Cluster the target belongs to.
    pub cluster: String,
    /// Type-specific configuration.
    pub spec: TargetSpec,
    /// Disabled targets are not evaluated.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Name of the channel binding notifications are sent through.
    pub alarm_group: String,
    /// Severity label, passed through to messages untouched.
    #[serde(default)]
    pub alarm_level: String,
    /// Counters and normal flag mutated by the state machine.
    #[serde(flatten)]
    pub state: AlarmState,
}

impl AlarmTarget {
    /// Creates an enabled target in the normal state with an unlimited cap.
    pub fn new(
        id: u64,
        cluster: impl Into<String>,
        spec: TargetSpec,
        alarm_group: impl Into<String>,
    ) -> Self {
        Self {
            id,
            cluster: cluster.into(),
            spec,
            enabled: true,
            alarm_group: alarm_group.into(),
            alarm_level: String::new(),
            state: AlarmState::default(),
        }
    }

    /// Sets the severity label.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.alarm_level = level.into();
        self
    }

    /// Sets the firing cap (`-1` for unlimited).
    #[must_use]
    pub const fn with_max_times(mut self, max: i32) -> Self {
        self.state.alarm_max_times = max;
        self
    }

    /// Sets whether the target is evaluated.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the kind of this target.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.spec.kind()
    }
}

/// The messaging channel a notification is delivered through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Mail relay.
    Email,
    /// Markdown chat webhook.
    #[serde(alias = "dingding")]
    DingTalk,
    /// Markdown chat webhook with colored severity spans.
    #[serde(alias = "wechat")]
    WeCom,
}

impl ChannelType {
    /// Returns the channel type as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::DingTalk => "dingtalk",
            Self::WeCom => "wecom",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification channel binding, keyed by cluster and alarm group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmChannelConfig {
    /// Cluster the binding belongs to.
    pub cluster: String,
    /// Alarm group name targets refer to.
    pub alarm_group: String,
    /// Channel type.
    pub channel_type: ChannelType,
    /// Webhook URL, or mail relay address (plain URL or JSON object).
    pub url: String,
    /// Mail recipients, email only.
    #[serde(default)]
    pub address: Option<String>,
}

impl AlarmChannelConfig {
    /// Creates a new channel binding.
    pub fn new(
        cluster: impl Into<String>,
        alarm_group: impl Into<String>,
        channel_type: ChannelType,
        url: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            alarm_group: alarm_group.into(),
            channel_type,
            url: url.into(),
            address: None,
        }
    }

    /// Sets the mail recipients.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("10,20", SpeedRange::new(10, 20) ; "plain")]
    #[test_case(" 5 , 7 ", SpeedRange::new(5, 7) ; "whitespace")]
    #[test_case("-3,4", SpeedRange::new(-3, 4) ; "negative low")]
    #[test_case("10", SpeedRange::new(0, 0) ; "single number")]
    #[test_case("", SpeedRange::new(0, 0) ; "empty")]
    #[test_case("a,b", SpeedRange::new(0, 0) ; "not numbers")]
    #[test_case("1,2,3", SpeedRange::new(0, 0) ; "too many")]
    fn speed_range_parse(text: &str, expected: SpeedRange) {
        assert_eq!(SpeedRange::parse(text), expected);
    }

    #[test]
    fn speed_range_bounds_are_inclusive() {
        let range = SpeedRange::new(10, 20);
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.is_outside(10));
        assert!(!range.is_outside(20));
        assert!(range.is_outside(9));
        assert!(range.is_outside(21));
    }

    #[test]
    fn speed_range_display() {
        assert_eq!(SpeedRange::new(100, 500).to_string(), "100,500");
    }

    #[test]
    fn target_kind_from_spec() {
        let spec = TargetSpec::Node {
            servers: vec!["h1:9092".to_string()],
        };
        assert_eq!(spec.kind(), TargetKind::Node);
        assert_eq!(spec.kind().to_string(), "Node");
    }

    #[test]
    fn deserialize_topic_target_with_defaults() {
        let json = r#"{
            "id": 1,
            "cluster": "prod",
            "spec": { "type": "topic", "topic": "orders", "capacity": 1000 },
            "alarm_group": "ops"
        }"#;

        let target: AlarmTarget = serde_json::from_str(json).unwrap();
        assert!(target.enabled);
        assert_eq!(target.kind(), TargetKind::Topic);
        assert_eq!(target.state, AlarmState::default());
        assert!(target.state.is_normal);
    }

    #[test]
    fn deserialize_producer_legacy_speed_string() {
        let json = r#"{
            "id": 2,
            "cluster": "prod",
            "spec": { "type": "producer", "topic": "orders", "speed": "100,500" },
            "alarm_group": "ops",
            "alarm_times": 2,
            "alarm_max_times": 5,
            "is_normal": false
        }"#;

        let target: AlarmTarget = serde_json::from_str(json).unwrap();
        match target.spec {
            TargetSpec::Producer { speed, .. } => assert_eq!(speed, SpeedRange::new(100, 500)),
            other => panic!("unexpected spec: {other:?}"),
        }
        assert_eq!(target.state.alarm_times, 2);
        assert_eq!(target.state.alarm_max_times, 5);
        assert!(!target.state.is_normal);
    }

    #[test]
    fn deserialize_producer_malformed_speed_defaults() {
        let json = r#"{ "type": "producer", "topic": "orders", "speed": "fast" }"#;

        let spec: TargetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            spec,
            TargetSpec::Producer {
                topic: "orders".to_string(),
                speed: SpeedRange::new(0, 0),
            }
        );
    }

    #[test]
    fn deserialize_node_servers_csv() {
        let json = r#"{ "type": "node", "servers": "h1:9092, h2:9092," }"#;

        let spec: TargetSpec = serde_json::from_str(json).unwrap();
        assert_eq!(
            spec,
            TargetSpec::Node {
                servers: vec!["h1:9092".to_string(), "h2:9092".to_string()],
            }
        );
    }

    #[test]
    fn target_serialization_roundtrip() {
        let target = AlarmTarget::new(
            3,
            "prod",
            TargetSpec::Producer {
                topic: "orders".to_string(),
                speed: SpeedRange::new(1, 9),
            },
            "ops",
        )
        .with_level("P1")
        .with_max_times(3);

        let json = serde_json::to_string(&target).unwrap();
        let parsed: AlarmTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, target);
    }

    #[test]
    fn channel_type_legacy_aliases() {
        let dingding: ChannelType = serde_json::from_str(r#""dingding""#).unwrap();
        let wechat: ChannelType = serde_json::from_str(r#""wechat""#).unwrap();
        assert_eq!(dingding, ChannelType::DingTalk);
        assert_eq!(wechat, ChannelType::WeCom);
        assert_eq!(ChannelType::Email.to_string(), "email");
    }
}
