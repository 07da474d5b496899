//! Durable record types persisted in the ledger.
//!
//! All records serialize with camelCase field names, which is also the shape
//! the HTTP API returns them in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Outcome of one capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Success,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// One row of the delivery log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogEntry {
    pub id: String,
    pub webhook_id: String,
    pub method: String,
    pub status: DeliveryStatus,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
    pub external_message_id: Option<String>,
}

impl DeliveryLogEntry {
    pub fn new(
        webhook_id: impl Into<String>,
        method: impl Into<String>,
        status: DeliveryStatus,
        error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            webhook_id: webhook_id.into(),
            method: method.into(),
            status,
            timestamp: Utc::now(),
            error,
            external_message_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    #[default]
    Info,
    Warning,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub message: String,
    pub source_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub external_message_id: Option<String>,
}

impl Alert {
    pub fn new(level: AlertLevel, message: impl Into<String>, source_url: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            level,
            message: message.into(),
            source_url,
            timestamp: Utc::now(),
            external_message_id: None,
        }
    }
}

/// A conversation anchored on the external root message id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub text: String,
    pub channel: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<ThreadReply>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadReply {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Presentation settings for the notification channel. At most one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfig {
    pub target_url: String,
    pub channel: Option<String>,
    pub display_name: Option<String>,
    pub icon_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Filter and paging parameters for the delivery log
#[derive(Debug, Clone)]
pub struct DeliveryQuery {
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
    pub webhook_id: Option<String>,
    pub status: Option<DeliveryStatus>,
}

impl Default for DeliveryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            webhook_id: None,
            status: None,
        }
    }
}

impl DeliveryQuery {
    fn matches(&self, entry: &DeliveryLogEntry) -> bool {
        self.webhook_id
            .as_deref()
            .is_none_or(|id| entry.webhook_id == id)
            && self.status.is_none_or(|status| entry.status == status)
    }

    /// Select the requested page out of newest-first entries
    pub fn paginate<I>(&self, newest_first: I) -> DeliveryPage
    where
        I: IntoIterator<Item = DeliveryLogEntry>,
    {
        let limit = self.limit.max(1);
        let page = self.page.max(1);
        let skip = (page - 1).saturating_mul(limit);

        let mut total = 0;
        let mut logs = Vec::with_capacity(limit);
        for entry in newest_first.into_iter().filter(|e| self.matches(e)) {
            if total >= skip && logs.len() < limit {
                logs.push(entry);
            }
            total += 1;
        }

        DeliveryPage {
            logs,
            total,
            current_page: page,
            total_pages: total.div_ceil(limit).max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPage {
    pub logs: Vec<DeliveryLogEntry>,
    pub total: usize,
    pub current_page: usize,
    pub total_pages: usize,
}
