//! Alarm hysteresis state machine.
//!
//! Each target carries an [`AlarmState`]: how many times it has fired since it
//! last recovered, the cap on that count, and whether it was last seen healthy.
//! [`AlarmState::apply`] folds an evaluation [`Health`] into that state and
//! reports the resulting [`Transition`]. Notifications are edge triggered:
//!
//! | last state | health        | cap allows | result                         |
//! |------------|---------------|------------|--------------------------------|
//! | any        | breached      | yes        | times += 1, abnormal, `Fired`  |
//! | any        | breached      | no         | `Unchanged` (suppressed)       |
//! | abnormal   | healthy       | -          | times = 0, normal, `Recovered` |
//! | normal     | healthy       | -          | `Unchanged`                    |
//! | any        | indeterminate | -          | `Unchanged`                    |
//!
//! Once `alarm_times` reaches `alarm_max_times` a target that stays in breach
//! goes silent until it recovers. This caps the notifications a persistently
//! failing target can produce.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::evaluator::{Health, Verdict};
use crate::types::AlarmTarget;

/// `alarm_max_times` value meaning the firing count is never capped.
pub const UNLIMITED: i32 = -1;

/// Mutable alarm state of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmState {
    /// Firings since the last recovery.
    pub alarm_times: u32,
    /// Cap on `alarm_times`; [`UNLIMITED`] disables the cap.
    pub alarm_max_times: i32,
    /// Whether the target was healthy when last evaluated.
    pub is_normal: bool,
}

impl Default for AlarmState {
    fn default() -> Self {
        Self {
            alarm_times: 0,
            alarm_max_times: UNLIMITED,
            is_normal: true,
        }
    }
}

impl AlarmState {
    /// Returns true if another firing is allowed under the cap.
    #[must_use]
    pub fn cap_allows_firing(&self) -> bool {
        self.alarm_max_times == UNLIMITED
            || i64::from(self.alarm_times) < i64::from(self.alarm_max_times)
    }

    /// Applies an evaluation result and returns the transition it caused.
    pub fn apply(&mut self, health: Health) -> Transition {
        match health {
            Health::Breached if self.cap_allows_firing() => {
                self.alarm_times = self.alarm_times.saturating_add(1);
                self.is_normal = false;
                Transition::Fired
            }
            Health::Healthy if !self.is_normal => {
                self.alarm_times = 0;
                self.is_normal = true;
                Transition::Recovered
            }
            Health::Breached | Health::Healthy | Health::Indeterminate => Transition::Unchanged,
        }
    }

    /// Renders the counters as `current(<times>), max(<max>)`.
    #[must_use]
    pub fn counters_summary(&self) -> String {
        format!("current({}), max({})", self.alarm_times, self.alarm_max_times)
    }
}

/// The outcome of applying a verdict to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    /// Nothing to notify.
    Unchanged,
    /// The target entered (or stayed in) breach and an error notice is due.
    Fired,
    /// The target returned to normal and a recovery notice is due.
    Recovered,
}

impl Transition {
    /// Returns true if the transition requires persisting and notifying.
    #[must_use]
    pub const fn is_edge(&self) -> bool {
        matches!(self, Self::Fired | Self::Recovered)
    }

    /// Returns the transition as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Fired => "fired",
            Self::Recovered => "recovered",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies `verdict` to `target`'s state.
pub fn apply(target: &mut AlarmTarget, verdict: &Verdict) -> Transition {
    target.state.apply(verdict.health)
}
