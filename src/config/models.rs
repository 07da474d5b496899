use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_fjall_path")]
    pub fjall_path: PathBuf,
    /// Public base URL supplied by an ingress tunnel, if one is live
    pub public_url: Option<String>,
    /// Largest inbound webhook body accepted for capture
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            fjall_path: default_fjall_path(),
            public_url: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn default_fjall_path() -> PathBuf {
    PathBuf::from("data/ledger")
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Notification channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Required prefix of incoming-webhook target URLs
    #[serde(default = "default_incoming_webhook_prefix")]
    pub incoming_webhook_prefix: String,
    /// Base URL of the authenticated chat API
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Fallback incoming-webhook URL used until a config is saved
    pub webhook_url: Option<String>,
    /// Bot token (loaded from environment, not from config file)
    #[serde(skip)]
    pub bot_token: Option<String>,
    /// Channel id for the bot strategy (loaded from environment)
    #[serde(skip)]
    pub channel_id: Option<String>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl NotifierConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bot credentials, only when both halves are present
    pub fn bot_credentials(&self) -> Option<(&str, &str)> {
        match (self.bot_token.as_deref(), self.channel_id.as_deref()) {
            (Some(token), Some(channel)) if !token.is_empty() && !channel.is_empty() => {
                Some((token, channel))
            }
            _ => None,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            incoming_webhook_prefix: default_incoming_webhook_prefix(),
            api_base: default_api_base(),
            webhook_url: None,
            bot_token: None,
            channel_id: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_incoming_webhook_prefix() -> String {
    "https://hooks.slack.com/services/".to_string()
}

fn default_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!("hookrelay/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Alert pipeline policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertsConfig {
    /// Raise an alert when a capture targets an unknown webhook id
    #[serde(default = "default_alert_on_unknown_webhook")]
    pub alert_on_unknown_webhook: bool,
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,
    #[serde(default = "default_max_list_limit")]
    pub max_list_limit: usize,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            alert_on_unknown_webhook: default_alert_on_unknown_webhook(),
            default_list_limit: default_list_limit(),
            max_list_limit: default_max_list_limit(),
        }
    }
}

fn default_alert_on_unknown_webhook() -> bool {
    true
}

fn default_list_limit() -> usize {
    50
}

fn default_max_list_limit() -> usize {
    500
}
