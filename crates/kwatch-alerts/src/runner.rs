//! The alarm pass.
//!
//! [`AlarmRunner`] walks every target of the configured clusters once per
//! call: it observes the target, evaluates the verdict, applies it to the
//! target's alarm state and, on a fired or recovered edge, persists the new
//! state before sending the notification.
//!
//! Per-target failures are logged and the pass moves on. A failed state write
//! withholds that target's notification, and is returned once the pass has
//! finished with every other target.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use kwatch_metrics::MetricsSource;

use crate::composer::{DEFAULT_PRODUCT, compose};
use crate::dispatcher::Dispatcher;
use crate::error::{AlertError, Result};
use crate::evaluator::{Observation, evaluate};
use crate::probe::{Probe, probe_servers};
use crate::state::{self, Transition};
use crate::store::AlarmStore;
use crate::transport::Transport;
use crate::types::{AlarmChannelConfig, AlarmTarget, TargetSpec};

/// What to do when a pass reaches a disabled target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledTargetPolicy {
    /// Skip the disabled target and continue with the next one.
    #[default]
    Skip,
    /// End the pass at the first disabled target.
    StopPass,
}

/// Settings of a runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Clusters to evaluate; empty means all.
    pub clusters: Vec<String>,
    /// Product name used in message titles.
    pub product: String,
    /// Handling of disabled targets.
    pub disabled_target_policy: DisabledTargetPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            clusters: Vec::new(),
            product: DEFAULT_PRODUCT.to_string(),
            disabled_target_policy: DisabledTargetPolicy::default(),
        }
    }
}

impl RunnerConfig {
    /// Restricts the runner to `clusters`.
    #[must_use]
    pub fn with_clusters(mut self, clusters: Vec<String>) -> Self {
        self.clusters = clusters;
        self
    }

    /// Sets the product name.
    #[must_use]
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Sets the disabled target policy.
    #[must_use]
    pub const fn with_disabled_target_policy(mut self, policy: DisabledTargetPolicy) -> Self {
        self.disabled_target_policy = policy;
        self
    }
}

/// Counters describing one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Targets whose verdict was applied.
    pub evaluated: usize,
    /// Targets not evaluated: disabled, no metrics, or malformed.
    pub skipped: usize,
    /// Fired transitions that were persisted.
    pub fired: usize,
    /// Recovered transitions that were persisted.
    pub recovered: usize,
    /// Breaches silenced by the firing cap.
    pub suppressed: usize,
    /// Notifications delivered.
    pub notifications_sent: usize,
    /// Notifications that could not be delivered.
    pub notification_failures: usize,
    /// Transitions whose state could not be persisted.
    pub persistence_failures: usize,
    /// Targets that fired, in pass order.
    pub fired_ids: Vec<u64>,
    /// Targets that recovered, in pass order.
    pub recovered_ids: Vec<u64>,
}

/// The report of a pass together with its first persistence failure.
#[derive(Debug)]
pub struct PassOutcome {
    /// Pass counters.
    pub report: RunReport,
    /// First state write that failed, if any.
    pub persistence_error: Option<AlertError>,
}

impl PassOutcome {
    /// Converts to the report, or the persistence failure if there was one.
    ///
    /// # Errors
    ///
    /// Returns the first `AlertError::Persistence` of the pass.
    pub fn into_result(self) -> Result<RunReport> {
        match self.persistence_error {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }
}

/// Evaluates and notifies alarm targets.
#[derive(Debug)]
pub struct AlarmRunner<S, M, P, T> {
    store: S,
    metrics: M,
    probe: P,
    dispatcher: Dispatcher<T>,
    config: RunnerConfig,
}

impl<S, M, P, T> AlarmRunner<S, M, P, T>
where
    S: AlarmStore,
    M: MetricsSource,
    P: Probe,
    T: Transport,
{
    /// Creates a runner from its collaborators.
    pub const fn new(
        store: S,
        metrics: M,
        probe: P,
        dispatcher: Dispatcher<T>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            store,
            metrics,
            probe,
            dispatcher,
            config,
        }
    }

    /// Returns the runner settings.
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Returns the alarm store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Runs one pass at the current local time.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Persistence` if the targets cannot be loaded or
    /// any transition could not be persisted.
    pub async fn run_once(&self) -> Result<RunReport> {
        self.run_once_at(Local::now().naive_local()).await
    }

    /// Runs one pass as if at `now`.
    ///
    /// # Errors
    ///
    /// Same as [`run_once`](Self::run_once).
    pub async fn run_once_at(&self, now: NaiveDateTime) -> Result<RunReport> {
        self.run_pass_at(now).await?.into_result()
    }

    /// Runs one pass as if at `now`, keeping the report when a state write
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Persistence` only if the targets cannot be loaded.
    pub async fn run_pass_at(&self, now: NaiveDateTime) -> Result<PassOutcome> {
        let entries = self.store.load_alarm_targets(&self.config.clusters)?;
        let mut report = RunReport::default();
        let mut persistence_error = None;

        debug!(targets = entries.len(), "starting alarm pass");

        for entry in entries {
            let mut target = match entry {
                Ok(target) => target,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable target");
                    report.skipped += 1;
                    continue;
                }
            };

            if !target.enabled {
                match self.config.disabled_target_policy {
                    DisabledTargetPolicy::Skip => {
                        debug!(target_id = target.id, "skipping disabled target");
                        report.skipped += 1;
                        continue;
                    }
                    DisabledTargetPolicy::StopPass => {
                        info!(target_id = target.id, "disabled target ends the pass");
                        break;
                    }
                }
            }

            match self.process(&mut target, now, &mut report).await {
                Ok(()) => {}
                Err(e) if e.is_fatal_for_pass() => {
                    error!(target_id = target.id, error = %e, "failed to persist alarm state");
                    report.persistence_failures += 1;
                    persistence_error.get_or_insert(e);
                }
                Err(e) => {
                    warn!(
                        target_id = target.id,
                        kind = %target.kind(),
                        error = %e,
                        "skipping target"
                    );
                    report.skipped += 1;
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            skipped = report.skipped,
            fired = report.fired,
            recovered = report.recovered,
            suppressed = report.suppressed,
            sent = report.notifications_sent,
            failed = report.notification_failures,
            "alarm pass complete"
        );

        Ok(PassOutcome {
            report,
            persistence_error,
        })
    }

    async fn observe(&self, target: &AlarmTarget, now: NaiveDateTime) -> Result<Observation> {
        let observation = match &target.spec {
            TargetSpec::Topic { topic, .. } => {
                Observation::StorageUsage(self.metrics.topic_storage_usage(&target.cluster, topic)?)
            }
            TargetSpec::Producer { topic, .. } => Observation::Throughput(
                self.metrics
                    .recent_throughput_sample(&target.cluster, topic, now.date())?,
            ),
            TargetSpec::Node { servers } => {
                Observation::Reachability(probe_servers(&self.probe, servers).await)
            }
        };
        Ok(observation)
    }

    async fn process(
        &self,
        target: &mut AlarmTarget,
        now: NaiveDateTime,
        report: &mut RunReport,
    ) -> Result<()> {
        let observation = self.observe(target, now).await?;
        let verdict = evaluate(&target.spec, &observation)?;
        report.evaluated += 1;

        let transition = state::apply(target, &verdict);
        if transition == Transition::Unchanged {
            if verdict.breached() {
                debug!(
                    target_id = target.id,
                    counters = %target.state.counters_summary(),
                    "breach suppressed by firing cap"
                );
                report.suppressed += 1;
            }
            return Ok(());
        }

        self.store.save_alarm_target_state(target)?;

        match transition {
            Transition::Fired => {
                report.fired += 1;
                report.fired_ids.push(target.id);
            }
            Transition::Recovered => {
                report.recovered += 1;
                report.recovered_ids.push(target.id);
            }
            Transition::Unchanged => {}
        }
        info!(
            target_id = target.id,
            cluster = %target.cluster,
            kind = %target.kind(),
            %transition,
            counters = %target.state.counters_summary(),
            "alarm state changed"
        );

        let Some(message) = compose(target, &verdict.detail, transition, &self.config.product, now)
        else {
            return Ok(());
        };

        match resolve_binding(&self.store, target) {
            Ok(config) => match self.dispatcher.dispatch(&message, &config).await {
                Ok(()) => report.notifications_sent += 1,
                Err(_) => report.notification_failures += 1,
            },
            Err(e) => {
                warn!(target_id = target.id, error = %e, "notification not sent");
                report.notification_failures += 1;
            }
        }

        Ok(())
    }
}

fn resolve_binding<S: AlarmStore>(store: &S, target: &AlarmTarget) -> Result<AlarmChannelConfig> {
    let binding = store.load_channel_config(&target.cluster, &target.alarm_group)?;
    binding.ok_or_else(|| AlertError::ChannelNotFound {
        cluster: target.cluster.clone(),
        alarm_group: target.alarm_group.clone(),
    })
}
