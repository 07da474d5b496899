use arc_swap::ArcSwap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{ChannelKind, NotificationChannel, NotifyError, OutboundMessage};
use crate::ledger::NotificationConfig;

#[derive(Debug, Clone, Default)]
struct Presentation {
    username: Option<String>,
    icon_emoji: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatPostRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_emoji: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChatPostResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

/// Authenticated chat API client with reply threading
pub struct BotChannel {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    channel_id: String,
    presentation: ArcSwap<Presentation>,
}

impl BotChannel {
    /// Fails fast when either credential is empty
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        token: &str,
        channel_id: &str,
    ) -> Result<Self, NotifyError> {
        if token.is_empty() {
            return Err(NotifyError::ConfigurationMissing(
                "bot token is empty".to_string(),
            ));
        }
        if channel_id.is_empty() {
            return Err(NotifyError::ConfigurationMissing(
                "channel id is empty".to_string(),
            ));
        }

        Ok(Self {
            client,
            endpoint: format!("{}/chat.postMessage", api_base.trim_end_matches('/')),
            token: token.to_string(),
            channel_id: channel_id.to_string(),
            presentation: ArcSwap::from_pointee(Presentation::default()),
        })
    }
}

#[async_trait]
impl NotificationChannel for BotChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Bot
    }

    fn supports_threads(&self) -> bool {
        true
    }

    fn channel_label(&self) -> Option<String> {
        Some(self.channel_id.clone())
    }

    async fn post(&self, message: &OutboundMessage) -> Result<Option<String>, NotifyError> {
        let presentation = self.presentation.load_full();
        let request = ChatPostRequest {
            channel: &self.channel_id,
            text: &message.text,
            thread_ts: message.thread_ts.as_deref(),
            username: presentation.username.as_deref(),
            icon_emoji: presentation.icon_emoji.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatPostResponse = response.json().await?;
        if !reply.ok {
            return Err(NotifyError::Api(
                reply.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let ts = reply
            .ts
            .ok_or_else(|| NotifyError::Api("response carried no message ts".to_string()))?;

        debug!(ts = %ts, threaded = message.thread_ts.is_some(), "Bot message posted");
        Ok(Some(ts))
    }

    fn apply_config(&self, config: &NotificationConfig) {
        self.presentation.store(Arc::new(Presentation {
            username: config.display_name.clone(),
            icon_emoji: config.icon_token.clone(),
        }));
    }
}
