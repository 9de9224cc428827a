//! Cluster alarm evaluation and notification for kwatch.
//!
//! `kwatch-alerts` watches user-defined alarm targets on message broker
//! clusters and notifies an alarm group when a target enters or leaves
//! breach.
//!
//! # Features
//!
//! - **Targets**: topic storage capacity, producer throughput range, node reachability
//! - **Hysteresis**: edge-triggered notifications with a per-target firing cap
//! - **Channels**: mail relay, DingTalk and WeCom markdown webhooks
//! - **Stores**: in-memory and JSON-file alarm stores with atomic state writes
//!
//! # Example
//!
//! ```rust
//! use kwatch_alerts::{AlarmTarget, Health, TargetSpec, Transition, evaluate_topic, state};
//!
//! let mut target = AlarmTarget::new(
//!     1,
//!     "prod",
//!     TargetSpec::Topic { topic: "orders".to_string(), capacity: 1000 },
//!     "ops",
//! )
//! .with_max_times(3);
//!
//! let verdict = evaluate_topic("orders", 1000, 1500);
//! assert_eq!(verdict.health, Health::Breached);
//! assert_eq!(state::apply(&mut target, &verdict), Transition::Fired);
//! assert_eq!(target.state.alarm_times, 1);
//! ```
//!
//! # Running a pass
//!
//! An [`AlarmRunner`] ties the pieces together. Each call to
//! [`AlarmRunner::run_once`] reloads the targets from the store, so alarm
//! state survives restarts:
//!
//! ```rust,ignore
//! use kwatch_alerts::{
//!     AlarmRunner, Dispatcher, HttpTransport, JsonFileStore, RunnerConfig, TcpProbe,
//! };
//! use kwatch_metrics::MetricStore;
//!
//! let runner = AlarmRunner::new(
//!     JsonFileStore::open("alarms.json"),
//!     MetricStore::from_snapshot_file("metrics.json")?,
//!     TcpProbe::default(),
//!     Dispatcher::new(HttpTransport::new(HttpTransport::DEFAULT_TIMEOUT)?),
//!     RunnerConfig::default(),
//! );
//! let report = runner.run_once().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod composer;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod probe;
pub mod runner;
pub mod state;
pub mod store;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use channels::{
    Channel, DingTalkChannel, EmailChannel, NotificationChannel, Outbound, WeComChannel,
};
pub use composer::{AlarmMessage, AlarmStatus, DEFAULT_PRODUCT, compose};
pub use dispatcher::Dispatcher;
pub use error::{AlertError, Result};
pub use evaluator::{
    Detail, Health, Observation, Verdict, evaluate, evaluate_nodes, evaluate_producer,
    evaluate_topic,
};
pub use probe::{Endpoint, EndpointStatus, Probe, TcpProbe, probe_servers};
pub use runner::{AlarmRunner, DisabledTargetPolicy, PassOutcome, RunReport, RunnerConfig};
pub use state::{AlarmState, Transition, UNLIMITED};
pub use store::{AlarmStore, JsonFileStore, MemoryAlarmStore, StoreDocument, TargetEntry};
pub use transport::{HttpTransport, MailRelay, Transport};
pub use types::{AlarmChannelConfig, AlarmTarget, ChannelType, SpeedRange, TargetKind, TargetSpec};
