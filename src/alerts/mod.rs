//! Delivery logging and the alert pipeline
//!
//! Every capture attempt is written to the delivery log. When that write
//! fails, or a capture targets an unknown webhook, an error [`Alert`] is
//! stored and relayed to the notification channel on a background task.
//! The cascade is bounded: one primary write, one alert, one relay attempt.
//! A failure in any later step is logged and nothing further is raised.

use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ledger::{
    Alert, AlertLevel, DeliveryLogEntry, DeliveryPage, DeliveryQuery, DeliveryStatus, Ledger,
    LedgerError,
};
use crate::notify::{NotificationChannel, OutboundMessage};
use crate::observability::Metrics;

/// Error text stored on delivery entries for unknown webhook ids
pub const UNKNOWN_WEBHOOK_ERROR: &str = "webhook not found";

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// An alert handed to the relay
#[derive(Debug)]
pub struct RaisedAlert {
    pub alert: Alert,
    /// False when the alert itself could not be stored; it is still relayed
    pub persisted: bool,
    /// Background relay task. Callers on the request path drop it.
    pub relay: JoinHandle<()>,
}

pub struct AlertPipeline {
    ledger: Arc<dyn Ledger>,
    channel: Arc<dyn NotificationChannel>,
    metrics: Arc<Metrics>,
    alert_on_unknown_webhook: bool,
}

impl AlertPipeline {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        channel: Arc<dyn NotificationChannel>,
        metrics: Arc<Metrics>,
        alert_on_unknown_webhook: bool,
    ) -> Self {
        Self {
            ledger,
            channel,
            metrics,
            alert_on_unknown_webhook,
        }
    }

    /// Log a successful capture. A failed write raises one error alert.
    pub fn record_delivery(
        &self,
        webhook_id: &str,
        method: &str,
        source_url: &str,
    ) -> Option<RaisedAlert> {
        let entry = DeliveryLogEntry::new(webhook_id, method, DeliveryStatus::Success, None);
        match self.ledger.append_delivery(&entry) {
            Ok(()) => {
                debug!(webhook_id, entry_id = %entry.id, "Delivery logged");
                None
            }
            Err(e) => Some(self.raise_store_failure(webhook_id, source_url, &e)),
        }
    }

    /// Log a capture against an unknown id and, when the policy allows,
    /// raise an alert linked to the failed entry
    pub fn record_failed_lookup(
        &self,
        webhook_id: &str,
        method: &str,
        source_url: &str,
    ) -> Option<RaisedAlert> {
        let entry = DeliveryLogEntry::new(
            webhook_id,
            method,
            DeliveryStatus::Failed,
            Some(UNKNOWN_WEBHOOK_ERROR.to_string()),
        );

        if let Err(e) = self.ledger.append_delivery(&entry) {
            return Some(self.raise_store_failure(webhook_id, source_url, &e));
        }

        if !self.alert_on_unknown_webhook {
            debug!(webhook_id, "Unknown webhook logged, alerting disabled");
            return None;
        }

        let alert = Alert::new(
            AlertLevel::Error,
            format!("Webhook not found: {webhook_id}"),
            Some(source_url.to_string()),
        );
        Some(self.raise(alert, Some(entry.id)))
    }

    /// Store and relay a manually created alert
    pub fn create_alert(
        &self,
        level: AlertLevel,
        message: &str,
        source_url: Option<String>,
    ) -> Result<RaisedAlert, AlertError> {
        let alert = Alert::new(level, message, source_url);
        self.ledger.insert_alert(&alert)?;
        self.metrics.alert_raised();
        info!(alert_id = %alert.id, %level, "Alert created");

        let relay = self.spawn_relay(&alert, true, None);
        Ok(RaisedAlert {
            alert,
            persisted: true,
            relay,
        })
    }

    pub fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>, AlertError> {
        Ok(self.ledger.list_alerts(limit)?)
    }

    pub fn list_deliveries(&self, query: &DeliveryQuery) -> Result<DeliveryPage, AlertError> {
        Ok(self.ledger.list_deliveries(query)?)
    }

    fn raise_store_failure(
        &self,
        webhook_id: &str,
        source_url: &str,
        cause: &LedgerError,
    ) -> RaisedAlert {
        self.metrics.store_failure();
        warn!(webhook_id, error = %cause, "Failed to log webhook delivery");

        let alert = Alert::new(
            AlertLevel::Error,
            format!("Failed to log webhook delivery for {webhook_id}: {cause}"),
            Some(source_url.to_string()),
        );
        self.raise(alert, None)
    }

    fn raise(&self, alert: Alert, linked_entry: Option<String>) -> RaisedAlert {
        self.metrics.alert_raised();

        let persisted = match self.ledger.insert_alert(&alert) {
            Ok(()) => true,
            Err(e) => {
                self.metrics.store_failure();
                error!(alert_id = %alert.id, error = %e, "Failed to store alert, relaying only");
                false
            }
        };

        let relay = self.spawn_relay(&alert, persisted, linked_entry);
        RaisedAlert {
            alert,
            persisted,
            relay,
        }
    }

    fn spawn_relay(
        &self,
        alert: &Alert,
        persisted: bool,
        linked_entry: Option<String>,
    ) -> JoinHandle<()> {
        let ledger = Arc::clone(&self.ledger);
        let channel = Arc::clone(&self.channel);
        let metrics = Arc::clone(&self.metrics);
        let alert_id = alert.id.clone();
        let message = OutboundMessage::builder()
            .text(format_alert(alert))
            .build();

        tokio::spawn(async move {
            let message_id = match channel.post(&message).await {
                Ok(id) => {
                    metrics.alert_relayed();
                    id
                }
                Err(e) => {
                    metrics.relay_failed();
                    warn!(alert_id = %alert_id, error = %e, "Failed to relay alert");
                    return;
                }
            };

            let Some(message_id) = message_id else {
                debug!(alert_id = %alert_id, "Alert relayed without a message id");
                return;
            };

            if persisted {
                if let Err(e) = ledger.attach_alert_message_id(&alert_id, &message_id) {
                    warn!(alert_id = %alert_id, error = %e, "Failed to attach message id to alert");
                }
            }

            if let Some(entry_id) = linked_entry {
                if let Err(e) = ledger.attach_delivery_message_id(&entry_id, &message_id) {
                    warn!(entry_id = %entry_id, error = %e, "Failed to attach message id to delivery");
                }
            }

            debug!(alert_id = %alert_id, message_id = %message_id, "Alert relayed");
        })
    }
}

/// Render an alert as channel text: level badge, message, source URL line
pub fn format_alert(alert: &Alert) -> String {
    let badge = match alert.level {
        AlertLevel::Info => ":information_source:",
        AlertLevel::Warning => ":warning:",
        AlertLevel::Error => ":rotating_light:",
    };

    let mut text = format!(
        "{badge} *{}* {}",
        alert.level.to_string().to_uppercase(),
        alert.message
    );
    if let Some(url) = &alert.source_url {
        text.push_str("\nSource: ");
        text.push_str(url);
    }
    text
}
