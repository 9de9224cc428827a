//! Routes composed messages to their channel and transport.

use tracing::{debug, warn};

use crate::channels::{Channel, NotificationChannel, Outbound};
use crate::composer::AlarmMessage;
use crate::error::Result;
use crate::transport::Transport;
use crate::types::AlarmChannelConfig;

/// Formats a message for its channel binding and hands it to a transport.
#[derive(Debug, Clone)]
pub struct Dispatcher<T> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    /// Creates a dispatcher over `transport`.
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Returns the underlying transport.
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Delivers `message` through the channel described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::Dispatch` if the binding is unusable or delivery
    /// fails.
    pub async fn dispatch(
        &self,
        message: &AlarmMessage,
        config: &AlarmChannelConfig,
    ) -> Result<()> {
        let channel = Channel::from_config(config)?;
        let outbound = channel.format(message)?;

        debug!(
            target_id = message.target_id,
            channel = channel.name(),
            status = %message.status,
            "dispatching notification"
        );

        let result = match &outbound {
            Outbound::Email { endpoint, payload } => {
                self.transport.send_email(payload, endpoint).await
            }
            Outbound::Webhook { url, payload } => self.transport.send_webhook(payload, url).await,
        };

        if let Err(e) = &result {
            warn!(
                target_id = message.target_id,
                channel = channel.name(),
                error = %e,
                "notification delivery failed"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::AlarmStatus;
    use crate::error::AlertError;
    use crate::types::{ChannelType, TargetKind};
    use chrono::NaiveDate;
    use parking_lot::Mutex;
    use serde_json::Value;

    #[derive(Debug, Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(&'static str, String, Value)>>,
        fail: bool,
    }

    impl Transport for RecordingTransport {
        async fn send_email(&self, payload: &Value, endpoint: &str) -> Result<()> {
            self.sent.lock().push(("email", endpoint.to_string(), payload.clone()));
            if self.fail {
                return Err(AlertError::dispatch("email", "relay down"));
            }
            Ok(())
        }

        async fn send_webhook(&self, payload: &Value, url: &str) -> Result<()> {
            self.sent.lock().push(("webhook", url.to_string(), payload.clone()));
            if self.fail {
                return Err(AlertError::dispatch("webhook", "hook down"));
            }
            Ok(())
        }
    }

    fn message() -> AlarmMessage {
        AlarmMessage {
            target_id: 1,
            cluster: "prod".to_string(),
            kind: TargetKind::Node,
            title: "EFAK - Alert Cluster Error".to_string(),
            content: "node.shutdown [ h1:9092 ]".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap(),
            level: "P0".to_string(),
            status: AlarmStatus::Problem,
            alarm_times: 1,
            alarm_max_times: -1,
        }
    }

    #[tokio::test]
    async fn webhook_channels_use_webhook_transport() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let config = AlarmChannelConfig::new("prod", "ops", ChannelType::WeCom, "http://hook");

        dispatcher.dispatch(&message(), &config).await.unwrap();

        let sent = dispatcher.transport().sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "webhook");
        assert_eq!(sent[0].1, "http://hook");
        assert_eq!(sent[0].2["msgtype"], "markdown");
    }

    #[tokio::test]
    async fn email_channel_uses_mail_transport() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let config = AlarmChannelConfig::new("prod", "ops", ChannelType::Email, "http://relay")
            .with_address("ops@example.com");

        dispatcher.dispatch(&message(), &config).await.unwrap();

        let sent = dispatcher.transport().sent.lock();
        assert_eq!(sent[0].0, "email");
        assert_eq!(sent[0].2["address"], "ops@example.com");
    }

    #[tokio::test]
    async fn transport_failure_is_returned() {
        let dispatcher = Dispatcher::new(RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        });
        let config = AlarmChannelConfig::new("prod", "ops", ChannelType::DingTalk, "http://hook");

        let result = dispatcher.dispatch(&message(), &config).await;
        assert!(matches!(result, Err(AlertError::Dispatch { .. })));
    }

    #[tokio::test]
    async fn unusable_binding_sends_nothing() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let config = AlarmChannelConfig::new("prod", "ops", ChannelType::DingTalk, "");

        assert!(dispatcher.dispatch(&message(), &config).await.is_err());
        assert!(dispatcher.transport().sent.lock().is_empty());
    }
}
