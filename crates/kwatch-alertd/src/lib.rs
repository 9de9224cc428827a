//! kwatch alarm daemon.
//!
//! Loads an [`AlertdConfig`](config::AlertdConfig), wires the alarm runner to
//! the JSON alarm store, the metrics snapshot, TCP node probes and HTTP
//! notification delivery, and runs a pass every interval.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod daemon;
pub mod error;

pub use config::AlertdConfig;
pub use daemon::Daemon;
pub use error::{DaemonError, Result};
