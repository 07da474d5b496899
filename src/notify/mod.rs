//! Notification channel client
//!
//! Two interchangeable strategies sit behind [`NotificationChannel`]:
//!
//! - [`IncomingWebhookChannel`] posts a flat JSON payload to a fixed URL and
//!   never learns the id of the message it created, so it cannot thread.
//! - [`BotChannel`] posts through the authenticated chat API with a bearer
//!   token and returns the message id (`ts`), optionally replying in a thread.
//!
//! The strategy is chosen once at startup by [`select_channel`].

mod bot;
mod incoming;

pub use bot::BotChannel;
pub use incoming::{IncomingWebhookChannel, test_connection};

use async_trait::async_trait;
use bon::Builder;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::NotifierConfig;
use crate::ledger::NotificationConfig;

/// Text posted by [`test_connection`]
pub const CANARY_TEXT: &str = ":white_check_mark: hookrelay connection test";

#[derive(Debug, Error)]
pub enum TargetUrlError {
    #[error("URL must start with '{expected}'")]
    WrongPrefix { expected: String },

    #[error("URL needs at least 3 path segments after the prefix, found {found}")]
    TooFewSegments { found: usize },

    #[error("URL contains an empty path segment")]
    EmptySegment,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel not configured: {0}")]
    ConfigurationMissing(String),

    #[error("invalid target URL: {0}")]
    InvalidTarget(#[from] TargetUrlError),

    #[error("request to notification channel failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification channel returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("notification channel error: {0}")]
    Api(String),

    #[error("threaded replies need the authenticated channel")]
    ThreadsUnsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    IncomingWebhook,
    Bot,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::IncomingWebhook => "incoming_webhook",
            ChannelKind::Bot => "bot",
        }
    }
}

/// One message to post
#[derive(Debug, Clone, Builder)]
pub struct OutboundMessage {
    #[builder(into)]
    pub text: String,
    /// Root message id to reply under
    #[builder(into)]
    pub thread_ts: Option<String>,
}

/// External messaging system used to relay alerts and threads
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Whether posts return a message id usable as a thread anchor
    fn supports_threads(&self) -> bool;

    /// Channel the messages land in, when known locally
    fn channel_label(&self) -> Option<String>;

    /// Post a message and return the id the channel assigned, if any
    async fn post(&self, message: &OutboundMessage) -> Result<Option<String>, NotifyError>;

    /// Pick up a newly saved notification config
    fn apply_config(&self, config: &NotificationConfig);
}

/// Validate an incoming-webhook URL: it must start with `prefix` and have at
/// least three non-empty path segments after it
pub fn validate_incoming_webhook_url(prefix: &str, url: &str) -> Result<(), TargetUrlError> {
    let rest = url
        .strip_prefix(prefix)
        .ok_or_else(|| TargetUrlError::WrongPrefix {
            expected: prefix.to_string(),
        })?;

    let segments: Vec<&str> = rest.split('/').collect();
    if segments.len() < 3 {
        return Err(TargetUrlError::TooFewSegments {
            found: segments.iter().filter(|s| !s.is_empty()).count(),
        });
    }

    if segments.iter().any(|s| s.is_empty()) {
        return Err(TargetUrlError::EmptySegment);
    }

    Ok(())
}

/// Build the shared HTTP client for all outbound channel calls
pub fn build_http_client(config: &NotifierConfig) -> Result<reqwest::Client, NotifyError> {
    let client = reqwest::Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .user_agent(&config.user_agent)
        .build()?;
    Ok(client)
}

/// Choose the channel strategy from the available credentials
///
/// Bot credentials win. Without them the incoming-webhook strategy is used,
/// targeting the configured fallback URL until a config is saved.
pub fn select_channel(
    config: &NotifierConfig,
    http: reqwest::Client,
) -> Result<Arc<dyn NotificationChannel>, NotifyError> {
    if let Some((token, channel_id)) = config.bot_credentials() {
        info!(channel_id, "Using authenticated bot channel");
        let bot = BotChannel::new(http, &config.api_base, token, channel_id)?;
        return Ok(Arc::new(bot));
    }

    info!(
        configured = config.webhook_url.is_some(),
        "Using incoming-webhook channel"
    );
    let incoming = IncomingWebhookChannel::new(
        http,
        config.incoming_webhook_prefix.clone(),
        config.webhook_url.clone(),
    );
    Ok(Arc::new(incoming))
}
