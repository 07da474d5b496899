use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::{
    ChannelKind, NotificationChannel, NotifyError, OutboundMessage, CANARY_TEXT,
    validate_incoming_webhook_url,
};
use crate::ledger::NotificationConfig;

/// Where and how incoming-webhook posts are sent
#[derive(Debug, Clone, Default)]
struct Target {
    url: Option<String>,
    channel: Option<String>,
    username: Option<String>,
    icon_emoji: Option<String>,
}

#[derive(Debug, Serialize)]
struct IncomingPayload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
}

/// Fire-and-forget posting to an incoming-webhook URL
pub struct IncomingWebhookChannel {
    client: reqwest::Client,
    prefix: String,
    target: ArcSwap<Target>,
}

impl IncomingWebhookChannel {
    pub fn new(client: reqwest::Client, prefix: String, url: Option<String>) -> Self {
        let target = Target {
            url,
            ..Default::default()
        };
        Self {
            client,
            prefix,
            target: ArcSwap::from_pointee(target),
        }
    }

    async fn send(&self, url: &str, payload: &IncomingPayload<'_>) -> Result<(), NotifyError> {
        validate_incoming_webhook_url(&self.prefix, url)?;

        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "Incoming webhook accepted message");
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for IncomingWebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::IncomingWebhook
    }

    fn supports_threads(&self) -> bool {
        false
    }

    fn channel_label(&self) -> Option<String> {
        self.target.load().channel.clone()
    }

    async fn post(&self, message: &OutboundMessage) -> Result<Option<String>, NotifyError> {
        if message.thread_ts.is_some() {
            return Err(NotifyError::ThreadsUnsupported);
        }

        let target = self.target.load_full();
        let url = target.url.as_deref().ok_or_else(|| {
            NotifyError::ConfigurationMissing("no incoming webhook URL saved".to_string())
        })?;

        let payload = IncomingPayload {
            text: &message.text,
            channel: target.channel.as_deref(),
            username: target.username.as_deref(),
            icon_emoji: target.icon_emoji.as_deref(),
        };
        self.send(url, &payload).await?;

        // Incoming webhooks answer with plain "ok" and no message id
        Ok(None)
    }

    fn apply_config(&self, config: &NotificationConfig) {
        self.target.store(Arc::new(Target {
            url: Some(config.target_url.clone()),
            channel: config.channel.clone(),
            username: config.display_name.clone(),
            icon_emoji: config.icon_token.clone(),
        }));
    }
}

/// Send the canary payload to `target_url` without touching any store
pub async fn test_connection(
    client: &reqwest::Client,
    prefix: &str,
    target_url: &str,
) -> Result<(), NotifyError> {
    let channel = IncomingWebhookChannel::new(
        client.clone(),
        prefix.to_string(),
        Some(target_url.to_string()),
    );
    let payload = IncomingPayload {
        text: CANARY_TEXT,
        channel: None,
        username: None,
        icon_emoji: None,
    };
    channel.send(target_url, &payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::Value;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Local stand-in for the incoming-webhook endpoint, forwarding payloads
    async fn start_mock(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/services/{a}/{b}/{c}",
            post(move |Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(body);
                    (status, "ok")
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/services/"), rx)
    }

    fn sample_config(url: String) -> NotificationConfig {
        NotificationConfig {
            target_url: url,
            channel: Some("#webhook-alerts".to_string()),
            display_name: Some("Relay".to_string()),
            icon_token: Some(":bell:".to_string()),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_post_without_target_is_configuration_missing() {
        let channel = IncomingWebhookChannel::new(
            reqwest::Client::new(),
            "https://hooks.slack.com/services/".to_string(),
            None,
        );
        let message = OutboundMessage::builder().text("hi").build();
        let err = channel.post(&message).await.unwrap_err();
        assert!(matches!(err, NotifyError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn test_post_rejects_thread_reply() {
        let channel = IncomingWebhookChannel::new(
            reqwest::Client::new(),
            "https://hooks.slack.com/services/".to_string(),
            Some("https://hooks.slack.com/services/T/B/X".to_string()),
        );
        let message = OutboundMessage::builder()
            .text("hi")
            .thread_ts("1.2")
            .build();
        let err = channel.post(&message).await.unwrap_err();
        assert!(matches!(err, NotifyError::ThreadsUnsupported));
    }

    #[tokio::test]
    async fn test_post_uses_saved_presentation() {
        let (prefix, mut rx) = start_mock(StatusCode::OK).await;
        let channel = IncomingWebhookChannel::new(reqwest::Client::new(), prefix.clone(), None);
        channel.apply_config(&sample_config(format!("{prefix}T0/B0/secret")));

        let message = OutboundMessage::builder().text("disk full").build();
        let id = channel.post(&message).await.unwrap();
        assert!(id.is_none());

        let body = rx.recv().await.unwrap();
        assert_eq!(body["text"], "disk full");
        assert_eq!(body["channel"], "#webhook-alerts");
        assert_eq!(body["username"], "Relay");
        assert_eq!(body["icon_emoji"], ":bell:");
        assert_eq!(channel.channel_label().as_deref(), Some("#webhook-alerts"));
    }

    #[tokio::test]
    async fn test_post_surfaces_rejection() {
        let (prefix, _rx) = start_mock(StatusCode::FORBIDDEN).await;
        let channel = IncomingWebhookChannel::new(
            reqwest::Client::new(),
            prefix.clone(),
            Some(format!("{prefix}T0/B0/revoked")),
        );

        let message = OutboundMessage::builder().text("x").build();
        let err = channel.post(&message).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_connection_sends_canary() {
        let (prefix, mut rx) = start_mock(StatusCode::OK).await;
        test_connection(&reqwest::Client::new(), &prefix, &format!("{prefix}T0/B0/k"))
            .await
            .unwrap();

        let body = rx.recv().await.unwrap();
        assert_eq!(body["text"], CANARY_TEXT);
        assert!(body.get("channel").is_none());
    }

    #[tokio::test]
    async fn test_connection_validates_before_sending() {
        let err = test_connection(
            &reqwest::Client::new(),
            "https://hooks.slack.com/services/",
            "https://example.com/x",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidTarget(_)));
    }
}
