//! Channel independent notification messages.
//!
//! [`compose`] renders the facts behind a transition into an [`AlarmMessage`].
//! It knows nothing about the destination channel; markup is applied by the
//! channel formatters in [`crate::channels`].

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::evaluator::Detail;
use crate::state::Transition;
use crate::types::{AlarmTarget, TargetKind};

/// Product name used in titles unless configured otherwise.
pub const DEFAULT_PRODUCT: &str = "EFAK";

/// Format of [`AlarmMessage::date_string`].
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether a message reports a problem or a return to normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlarmStatus {
    /// The target fired.
    Problem,
    /// The target recovered.
    Normal,
}

impl AlarmStatus {
    /// Returns the status as shown in notifications.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Problem => "PROBLEM",
            Self::Normal => "NORMAL",
        }
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification built for one transition of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmMessage {
    /// Target identifier.
    pub target_id: u64,
    /// Cluster of the target.
    pub cluster: String,
    /// Kind of the target.
    pub kind: TargetKind,
    /// Message title.
    pub title: String,
    /// Human readable content line.
    pub content: String,
    /// When the transition was observed (local time).
    pub date: NaiveDateTime,
    /// Severity label of the target.
    pub level: String,
    /// Problem or normal.
    pub status: AlarmStatus,
    /// Firings since last recovery, after the transition.
    pub alarm_times: u32,
    /// Firing cap of the target.
    pub alarm_max_times: i32,
}

impl AlarmMessage {
    /// Renders the counters as `current(<times>), max(<max>)`.
    #[must_use]
    pub fn counters_summary(&self) -> String {
        format!("current({}), max({})", self.alarm_times, self.alarm_max_times)
    }

    /// Renders the date as `YYYY-MM-DD HH:MM:SS`.
    #[must_use]
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Returns the labelled fields shown by every channel, in display order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Alarm ID", self.target_id.to_string()),
            ("Alarm Cluster", self.cluster.clone()),
            ("Alarm Project", self.kind.to_string()),
            ("Alarm Times", self.counters_summary()),
            ("Alarm Level", self.level.clone()),
            ("Alarm Status", self.status.to_string()),
            ("Alarm Date", self.date_string()),
            ("Alarm Content", self.content.clone()),
        ]
    }
}

/// Builds the content line for a transition.
#[must_use]
pub fn content_line(detail: &Detail, status: AlarmStatus) -> String {
    let problem = status == AlarmStatus::Problem;
    match detail {
        Detail::Topic {
            topic,
            capacity,
            real,
        } => format!(
            "topic.capacity.{} [topic({topic}), real.capacity({real}), alarm.capacity({capacity})]",
            if problem { "overflow" } else { "normal" }
        ),
        Detail::Producer { topic, range, real } => format!(
            "producer.speed.{} [topic({topic}), real.speeds({real}), alarm.speeds.range({range})]",
            if problem { "overflow" } else { "normal" }
        ),
        Detail::Node {
            unreachable,
            reachable,
        } => {
            if problem {
                format!("node.shutdown [ {} ]", unreachable.join(", "))
            } else {
                format!("node.alive [ {} ]", reachable.join(", "))
            }
        }
    }
}

/// Composes the message for `transition`, or `None` if nothing is to be sent.
///
/// `target` must already carry its post-transition state.
#[must_use]
pub fn compose(
    target: &AlarmTarget,
    detail: &Detail,
    transition: Transition,
    product: &str,
    date: NaiveDateTime,
) -> Option<AlarmMessage> {
    let (status, title) = match transition {
        Transition::Fired => (AlarmStatus::Problem, format!("{product} - Alert Cluster Error")),
        Transition::Recovered => (AlarmStatus::Normal, format!("{product} - Alert Cluster Notice")),
        Transition::Unchanged => return None,
    };

    Some(AlarmMessage {
        target_id: target.id,
        cluster: target.cluster.clone(),
        kind: target.kind(),
        title,
        content: content_line(detail, status),
        date,
        level: target.alarm_level.clone(),
        status,
        alarm_times: target.state.alarm_times,
        alarm_max_times: target.state.alarm_max_times,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SpeedRange, TargetSpec};
    use chrono::NaiveDate;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(8, 30, 5))
            .unwrap()
    }

    fn topic_target(times: u32, is_normal: bool) -> AlarmTarget {
        let mut target = AlarmTarget::new(
            7,
            "prod",
            TargetSpec::Topic {
                topic: "orders".to_string(),
                capacity: 1000,
            },
            "ops",
        )
        .with_level("P1")
        .with_max_times(3);
        target.state.alarm_times = times;
        target.state.is_normal = is_normal;
        target
    }

    fn topic_detail(real: u64) -> Detail {
        Detail::Topic {
            topic: "orders".to_string(),
            capacity: 1000,
            real,
        }
    }

    #[test]
    fn fired_topic_message() {
        let target = topic_target(1, false);
        let msg = compose(&target, &topic_detail(1500), Transition::Fired, "EFAK", date()).unwrap();

        assert_eq!(msg.title, "EFAK - Alert Cluster Error");
        assert_eq!(
            msg.content,
            "topic.capacity.overflow [topic(orders), real.capacity(1500), alarm.capacity(1000)]"
        );
        assert_eq!(msg.status, AlarmStatus::Problem);
        assert_eq!(msg.counters_summary(), "current(1), max(3)");
        assert_eq!(msg.level, "P1");
        assert_eq!(msg.kind, TargetKind::Topic);
        assert_eq!(msg.date_string(), "2026-10-19 08:30:05");
    }

    #[test]
    fn recovered_topic_message() {
        let target = topic_target(0, true);
        let msg =
            compose(&target, &topic_detail(900), Transition::Recovered, "EFAK", date()).unwrap();

        assert_eq!(msg.title, "EFAK - Alert Cluster Notice");
        assert_eq!(
            msg.content,
            "topic.capacity.normal [topic(orders), real.capacity(900), alarm.capacity(1000)]"
        );
        assert_eq!(msg.status, AlarmStatus::Normal);
        assert_eq!(msg.counters_summary(), "current(0), max(3)");
    }

    #[test]
    fn unchanged_composes_nothing() {
        let target = topic_target(0, true);
        let message = compose(&target, &topic_detail(10), Transition::Unchanged, "EFAK", date());
        assert!(message.is_none());
    }

    #[test]
    fn producer_content_lines() {
        let detail = Detail::Producer {
            topic: "orders".to_string(),
            range: SpeedRange::new(100, 500),
            real: 42,
        };

        assert_eq!(
            content_line(&detail, AlarmStatus::Problem),
            "producer.speed.overflow [topic(orders), real.speeds(42), alarm.speeds.range(100,500)]"
        );
        assert_eq!(
            content_line(&detail, AlarmStatus::Normal),
            "producer.speed.normal [topic(orders), real.speeds(42), alarm.speeds.range(100,500)]"
        );
    }

    #[test]
    fn node_content_lines() {
        let detail = Detail::Node {
            unreachable: vec!["h1:9092".to_string(), "h3:9092".to_string()],
            reachable: vec!["h2:9092".to_string()],
        };

        assert_eq!(
            content_line(&detail, AlarmStatus::Problem),
            "node.shutdown [ h1:9092, h3:9092 ]"
        );
        assert_eq!(content_line(&detail, AlarmStatus::Normal), "node.alive [ h2:9092 ]");
    }

    #[test]
    fn product_name_is_configurable() {
        let target = topic_target(1, false);
        let msg =
            compose(&target, &topic_detail(1500), Transition::Fired, "Kafka Ops", date()).unwrap();
        assert_eq!(msg.title, "Kafka Ops - Alert Cluster Error");
    }

    #[test]
    fn fields_in_display_order() {
        let target = topic_target(2, false);
        let msg = compose(&target, &topic_detail(1500), Transition::Fired, "EFAK", date()).unwrap();

        let labels: Vec<&str> = msg.fields().iter().map(|(label, _)| *label).collect();
        assert_eq!(labels.first(), Some(&"Alarm ID"));
        assert_eq!(labels.last(), Some(&"Alarm Content"));
        assert_eq!(msg.fields()[5].1, "PROBLEM");
    }
}
