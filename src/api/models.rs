//! Request and response bodies of the HTTP API
//!
//! Stored records (`Alert`, `Thread`, `DeliveryPage`, `NotificationConfig`,
//! `WebhookEndpoint`) are returned as-is; only the envelopes that exist
//! purely for the wire live here. All fields are camelCase on the wire.
//!
//! ```json
//! POST /webhooks            -> {"id": "9f1c...", "url": "https://.../hooks/9f1c...", "createdAt": "..."}
//! ANY  /hooks/{id}          -> {"message": "Webhook received successfully", "webhookId": "9f1c..."}
//! POST /threads             <- {"text": "deploy started"}
//! POST /notification-config <- {"targetUrl": "https://hooks.slack.com/services/T/B/x", "channel": "#ops"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{AlertLevel, DeliveryStatus, NotificationConfig};
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_message_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub active_webhooks: usize,
    pub store_connected: bool,
    pub is_live: bool,
    pub public_url: Option<String>,
    pub uptime_seconds: u64,
    pub notification_channel: &'static str,
    pub version: &'static str,
    pub counters: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUrlResponse {
    pub public_url: Option<String>,
    pub is_live: bool,
    pub local_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWebhook {
    pub id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureAccepted {
    pub message: &'static str,
    pub webhook_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfigRequest {
    pub target_url: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub icon_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfigView {
    pub config: Option<NotificationConfig>,
    pub strategy: &'static str,
    pub threads_supported: bool,
}

/// Body of `POST /notification-config/test`; falls back to the saved target
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionRequest {
    #[serde(default)]
    pub target_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConnectionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadDeleted {
    pub id: String,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    #[serde(default)]
    pub level: AlertLevel,
    pub message: String,
    #[serde(default, alias = "webhookUrl")]
    pub source_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveriesQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub webhook_id: Option<String>,
    pub status: Option<DeliveryStatus>,
}
