//! Notification channels for alarm delivery.
//!
//! This module provides the [`NotificationChannel`] trait and one formatter
//! per [`ChannelType`]. Each channel re-derives its display strings from the
//! same [`AlarmMessage`] with its own markup rules and produces an
//! [`Outbound`] request for a [`Transport`](crate::transport::Transport).

use std::fmt;

use serde_json::{Value, json};

use crate::composer::{AlarmMessage, AlarmStatus};
use crate::error::{AlertError, Result};
use crate::types::{AlarmChannelConfig, ChannelType};

/// A formatted notification ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Deliver through a mail relay.
    Email {
        /// Relay address, a URL or a JSON relay description.
        endpoint: String,
        /// Request body.
        payload: Value,
    },
    /// POST to a chat webhook.
    Webhook {
        /// Webhook URL.
        url: String,
        /// Request body.
        payload: Value,
    },
}

impl Outbound {
    /// Returns the request body.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        match self {
            Self::Email { payload, .. } | Self::Webhook { payload, .. } => payload,
        }
    }
}

/// Trait for notification channels.
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the name of this channel.
    fn name(&self) -> &'static str;

    /// Formats a message for delivery through this channel.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Dispatch` if the message cannot be formatted for
    /// the configured endpoint.
    fn format(&self, message: &AlarmMessage) -> Result<Outbound>;
}

/// Delivers through a mail relay.
///
/// The body is structured JSON when the relay address is itself a JSON
/// object, and plain text otherwise.
#[derive(Debug, Clone)]
pub struct EmailChannel {
    endpoint: String,
    address: String,
}

impl EmailChannel {
    /// Creates a new email channel.
    pub fn new(endpoint: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            address: address.into(),
        }
    }

    /// Returns true if the relay address is a JSON object.
    #[must_use]
    pub fn structured_endpoint(&self) -> bool {
        matches!(serde_json::from_str::<Value>(&self.endpoint), Ok(Value::Object(_)))
    }

    /// Renders the plain-text mail body.
    #[must_use]
    pub fn text_body(message: &AlarmMessage) -> String {
        message
            .fields()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Renders the structured mail body.
    #[must_use]
    pub fn json_body(message: &AlarmMessage) -> Value {
        json!({
            "id": message.target_id,
            "cluster": message.cluster,
            "project": message.kind.as_str(),
            "times": message.counters_summary(),
            "level": message.level,
            "status": message.status.as_str(),
            "date": message.date_string(),
            "content": message.content,
        })
    }
}

impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        ChannelType::Email.as_str()
    }

    fn format(&self, message: &AlarmMessage) -> Result<Outbound> {
        let msg = if self.structured_endpoint() {
            Self::json_body(message)
        } else {
            Value::String(Self::text_body(message))
        };

        Ok(Outbound::Email {
            endpoint: self.endpoint.clone(),
            payload: json!({
                "address": self.address,
                "title": message.title,
                "msg": msg,
            }),
        })
    }
}

/// Markdown chat webhook.
#[derive(Debug, Clone)]
pub struct DingTalkChannel {
    url: String,
}

impl DingTalkChannel {
    /// Creates a new channel posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Renders the markdown block.
    #[must_use]
    pub fn markdown(message: &AlarmMessage) -> String {
        let mut text = format!("### {}\n\n", message.title);
        for (label, value) in message.fields() {
            text.push_str(&format!("- **{label}**: {value}\n"));
        }
        text
    }
}

impl NotificationChannel for DingTalkChannel {
    fn name(&self) -> &'static str {
        ChannelType::DingTalk.as_str()
    }

    fn format(&self, message: &AlarmMessage) -> Result<Outbound> {
        Ok(Outbound::Webhook {
            url: self.url.clone(),
            payload: json!({
                "msgtype": "markdown",
                "markdown": {
                    "title": message.title,
                    "text": Self::markdown(message),
                },
                "at": { "isAtAll": true },
            }),
        })
    }
}

/// Markdown chat webhook with severity colored spans.
#[derive(Debug, Clone)]
pub struct WeComChannel {
    url: String,
}

impl WeComChannel {
    /// Font color for problem notices.
    pub const PROBLEM_COLOR: &'static str = "warning";
    /// Font color for recovery notices.
    pub const NORMAL_COLOR: &'static str = "#008000";

    /// Creates a new channel posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    fn colored(status: AlarmStatus, text: &str) -> String {
        let color = match status {
            AlarmStatus::Problem => Self::PROBLEM_COLOR,
            AlarmStatus::Normal => Self::NORMAL_COLOR,
        };
        format!("<font color=\"{color}\">{text}</font>")
    }

    /// Renders the markdown content.
    #[must_use]
    pub fn markdown(message: &AlarmMessage) -> String {
        let mut text = format!("`{}`\n", message.title);
        for (label, value) in message.fields() {
            let value = match label {
                "Alarm Status" | "Alarm Content" => Self::colored(message.status, &value),
                _ => value,
            };
            text.push_str(&format!("> **{label}**: {value}\n"));
        }
        text
    }
}

impl NotificationChannel for WeComChannel {
    fn name(&self) -> &'static str {
        ChannelType::WeCom.as_str()
    }

    fn format(&self, message: &AlarmMessage) -> Result<Outbound> {
        Ok(Outbound::Webhook {
            url: self.url.clone(),
            payload: json!({
                "msgtype": "markdown",
                "markdown": { "content": Self::markdown(message) },
            }),
        })
    }
}

/// A channel selected by [`ChannelType`].
#[derive(Debug, Clone)]
pub enum Channel {
    /// Mail relay.
    Email(EmailChannel),
    /// Markdown chat webhook.
    DingTalk(DingTalkChannel),
    /// Colored markdown chat webhook.
    WeCom(WeComChannel),
}

impl Channel {
    /// Builds the channel for a binding.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Dispatch` if the endpoint is empty, or an email
    /// binding has no recipients.
    pub fn from_config(config: &AlarmChannelConfig) -> Result<Self> {
        let url = config.url.trim();
        if url.is_empty() {
            return Err(AlertError::dispatch(
                config.channel_type.as_str(),
                format!("alarm group '{}' has an empty endpoint", config.alarm_group),
            ));
        }

        Ok(match config.channel_type {
            ChannelType::Email => {
                let address = config
                    .address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| {
                        AlertError::dispatch(
                            ChannelType::Email.as_str(),
                            format!("alarm group '{}' has no recipients", config.alarm_group),
                        )
                    })?;
                Self::Email(EmailChannel::new(url, address))
            }
            ChannelType::DingTalk => Self::DingTalk(DingTalkChannel::new(url)),
            ChannelType::WeCom => Self::WeCom(WeComChannel::new(url)),
        })
    }

    fn inner(&self) -> &dyn NotificationChannel {
        match self {
            Self::Email(c) => c,
            Self::DingTalk(c) => c,
            Self::WeCom(c) => c,
        }
    }
}

impl NotificationChannel for Channel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn format(&self, message: &AlarmMessage) -> Result<Outbound> {
        self.inner().format(message)
    }
}
