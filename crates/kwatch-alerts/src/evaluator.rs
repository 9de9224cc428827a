//! Breach evaluation.
//!
//! [`evaluate`] turns a target spec and the value observed for it into a
//! [`Verdict`]. It is pure: fetching metrics and probing nodes happens before,
//! in the run loop, and yields an [`Observation`].

use serde::{Deserialize, Serialize};

use crate::error::{AlertError, Result};
use crate::probe::EndpointStatus;
use crate::types::{SpeedRange, TargetSpec};

/// What was measured for a target during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Current storage usage of a topic, in bytes.
    StorageUsage(u64),
    /// Latest throughput sample of the day, if one was recorded.
    Throughput(Option<i64>),
    /// Probe result per configured endpoint, in configured order.
    Reachability(Vec<EndpointStatus>),
}

/// Health of a target as judged by its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// The threshold is violated.
    Breached,
    /// The recovery condition holds.
    Healthy,
    /// Neither breached nor recovered, e.g. usage exactly at capacity.
    Indeterminate,
}

/// Facts backing a verdict, used to compose notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Detail {
    /// Topic storage facts.
    Topic {
        /// Topic name.
        topic: String,
        /// Configured capacity in bytes.
        capacity: u64,
        /// Observed usage in bytes.
        real: u64,
    },
    /// Producer throughput facts.
    Producer {
        /// Topic name.
        topic: String,
        /// Configured accepted interval.
        range: SpeedRange,
        /// Observed throughput.
        real: i64,
    },
    /// Node reachability facts.
    Node {
        /// Endpoints that did not accept a connection.
        unreachable: Vec<String>,
        /// Endpoints that accepted a connection.
        reachable: Vec<String>,
    },
}

/// The outcome of evaluating one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Threshold judgement.
    pub health: Health,
    /// Supporting facts.
    pub detail: Detail,
}

impl Verdict {
    /// Returns true if the threshold is violated.
    #[must_use]
    pub fn breached(&self) -> bool {
        self.health == Health::Breached
    }

    /// Returns true if the recovery condition holds.
    #[must_use]
    pub fn recoverable(&self) -> bool {
        self.health == Health::Healthy
    }
}

/// Evaluates a topic capacity threshold.
///
/// Usage exactly at capacity is [`Health::Indeterminate`].
#[must_use]
pub fn evaluate_topic(topic: &str, capacity: u64, real: u64) -> Verdict {
    let health = if real > capacity {
        Health::Breached
    } else if real < capacity {
        Health::Healthy
    } else {
        Health::Indeterminate
    };

    Verdict {
        health,
        detail: Detail::Topic {
            topic: topic.to_string(),
            capacity,
            real,
        },
    }
}

/// Evaluates a producer throughput range. A missing sample counts as zero.
#[must_use]
pub fn evaluate_producer(topic: &str, range: SpeedRange, sample: Option<i64>) -> Verdict {
    let real = sample.unwrap_or(0);
    let health = if range.is_outside(real) {
        Health::Breached
    } else {
        Health::Healthy
    };

    Verdict {
        health,
        detail: Detail::Producer {
            topic: topic.to_string(),
            range,
            real,
        },
    }
}

/// Evaluates node reachability. Any unreachable endpoint is a breach.
#[must_use]
pub fn evaluate_nodes(statuses: &[EndpointStatus]) -> Verdict {
    let (reachable, unreachable): (Vec<_>, Vec<_>) =
        statuses.iter().partition(|status| status.reachable);

    let health = if unreachable.is_empty() {
        Health::Healthy
    } else {
        Health::Breached
    };

    Verdict {
        health,
        detail: Detail::Node {
            unreachable: unreachable.into_iter().map(|s| s.endpoint.clone()).collect(),
            reachable: reachable.into_iter().map(|s| s.endpoint.clone()).collect(),
        },
    }
}

/// Evaluates `spec` against the value observed for it.
///
/// # Errors
///
/// Returns `AlertError::MalformedTargetSpec` if the observation does not
/// belong to the spec's target type.
pub fn evaluate(spec: &TargetSpec, observation: &Observation) -> Result<Verdict> {
    match (spec, observation) {
        (TargetSpec::Topic { topic, capacity }, Observation::StorageUsage(real)) => {
            Ok(evaluate_topic(topic, *capacity, *real))
        }
        (TargetSpec::Producer { topic, speed }, Observation::Throughput(sample)) => {
            Ok(evaluate_producer(topic, *speed, *sample))
        }
        (TargetSpec::Node { .. }, Observation::Reachability(statuses)) => {
            Ok(evaluate_nodes(statuses))
        }
        (spec, observation) => Err(AlertError::MalformedTargetSpec {
            reason: format!(
                "{} target cannot be evaluated against {observation:?}",
                spec.kind()
            ),
        }),
    }
}
