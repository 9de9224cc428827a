//! Node reachability probing.
//!
//! A [`Probe`] answers whether a `host:port` accepts TCP connections within a
//! bounded time. [`probe_servers`] runs one probe per configured endpoint,
//! concurrently, and never fails as a whole: malformed entries and failed
//! connects are both reported as unreachable.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::{AlertError, Result};

/// A parsed `host:port` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or address, without IPv6 brackets.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Parses `host:port`, accepting `[v6addr]:port`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::MalformedTargetSpec` if the port is missing or not
    /// a valid number, or the host is empty.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = |reason: &str| AlertError::MalformedTargetSpec {
            reason: format!("endpoint '{text}': {reason}"),
        };

        let (host, port) = text
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| malformed("missing port"))?;

        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(malformed("empty host"));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| malformed("port is not a number"))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

/// Result of probing one configured endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    /// The endpoint as configured.
    pub endpoint: String,
    /// Whether it accepted a connection.
    pub reachable: bool,
}

/// A bounded reachability check.
pub trait Probe: Send + Sync {
    /// Returns true if `host:port` accepted a connection before the timeout.
    fn probe(&self, host: &str, port: u16) -> impl Future<Output = bool> + Send;
}

impl<P: Probe> Probe for Arc<P> {
    fn probe(&self, host: &str, port: u16) -> impl Future<Output = bool> + Send {
        (**self).probe(host, port)
    }
}

/// Probes by opening (and immediately dropping) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    /// Default connect timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    /// Creates a probe with the given connect timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the connect timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attempts a connection.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::ProbeFailure` if the connection is refused, fails,
    /// or does not complete within the timeout.
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let failure = |reason: String| AlertError::ProbeFailure {
            endpoint: format!("{host}:{port}"),
            reason,
        };

        match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(failure(e.to_string())),
            Err(_) => Err(failure(format!("timed out after {:?}", self.timeout))),
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl Probe for TcpProbe {
    async fn probe(&self, host: &str, port: u16) -> bool {
        match self.connect(host, port).await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "probe failed");
                false
            }
        }
    }
}

/// Probes every server concurrently, preserving configured order.
pub async fn probe_servers<P: Probe>(probe: &P, servers: &[String]) -> Vec<EndpointStatus> {
    let checks = servers.iter().map(|server| async move {
        let reachable = match Endpoint::parse(server) {
            Ok(endpoint) => probe.probe(&endpoint.host, endpoint.port).await,
            Err(e) => {
                warn!(error = %e, "counting malformed endpoint as unreachable");
                false
            }
        };
        EndpointStatus {
            endpoint: server.clone(),
            reachable,
        }
    });

    join_all(checks).await
}
