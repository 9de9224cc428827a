//! Outbound delivery of formatted notifications.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{AlertError, Result};

/// Delivers formatted payloads to mail relays and chat webhooks.
pub trait Transport: Send + Sync {
    /// Hands a mail payload to the relay at `endpoint`.
    fn send_email(
        &self,
        payload: &Value,
        endpoint: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// POSTs a payload to a chat webhook.
    fn send_webhook(&self, payload: &Value, url: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send_email(
        &self,
        payload: &Value,
        endpoint: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).send_email(payload, endpoint)
    }

    fn send_webhook(&self, payload: &Value, url: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).send_webhook(payload, url)
    }
}

/// Where and how to reach a mail relay.
///
/// The relay address of an email binding is either a plain URL or a JSON
/// object such as `{"url": "...", "headers": {"X-Token": "..."}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MailRelay {
    /// Relay URL.
    pub url: String,
    /// Extra request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl MailRelay {
    /// Parses a relay address.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the address is a JSON object
    /// without a usable `url`.
    pub fn parse(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim();
        if endpoint.starts_with('{') {
            let relay: Self = serde_json::from_str(endpoint).map_err(|e| AlertError::InvalidConfig {
                reason: format!("mail relay address: {e}"),
            })?;
            if relay.url.trim().is_empty() {
                return Err(AlertError::InvalidConfig {
                    reason: "mail relay address has an empty url".to_string(),
                });
            }
            return Ok(relay);
        }

        Ok(Self {
            url: endpoint.to_string(),
            headers: HashMap::new(),
        })
    }
}

/// HTTP transport backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::InvalidConfig {
                reason: format!("http client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn post(
        &self,
        channel: &str,
        url: &str,
        headers: &HashMap<String, String>,
        payload: &Value,
    ) -> Result<()> {
        let mut request = self.client.post(url).json(payload);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AlertError::dispatch(channel, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AlertError::dispatch(channel, format!("{url} responded {status}")));
        }

        debug!(channel, %status, "notification delivered");
        Ok(())
    }
}

impl Transport for HttpTransport {
    async fn send_email(&self, payload: &Value, endpoint: &str) -> Result<()> {
        let relay = MailRelay::parse(endpoint)
            .map_err(|e| AlertError::dispatch("email", e.to_string()))?;
        self.post("email", &relay.url, &relay.headers, payload).await
    }

    async fn send_webhook(&self, payload: &Value, url: &str) -> Result<()> {
        self.post("webhook", url, &HashMap::new(), payload).await
    }
}
