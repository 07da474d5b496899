use super::error::Result;
use super::records::{Alert, DeliveryLogEntry, DeliveryPage, DeliveryQuery, NotificationConfig, Thread};

/// Durable document store behind the delivery log, alerts, threads and the
/// notification config singleton.
///
/// Writes are synchronous; callers on the capture path must treat every
/// error as a secondary failure and never let it change the HTTP response.
pub trait Ledger: Send + Sync {
    fn append_delivery(&self, entry: &DeliveryLogEntry) -> Result<()>;

    /// Attach the relayed message id to a delivery entry. No-op when one is
    /// already attached.
    fn attach_delivery_message_id(&self, entry_id: &str, message_id: &str) -> Result<()>;

    /// Newest first
    fn list_deliveries(&self, query: &DeliveryQuery) -> Result<DeliveryPage>;

    fn insert_alert(&self, alert: &Alert) -> Result<()>;

    /// Attach the relayed message id to an alert. No-op when one is already
    /// attached.
    fn attach_alert_message_id(&self, alert_id: &str, message_id: &str) -> Result<()>;

    /// Newest first, at most `limit` entries
    fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>>;

    fn put_thread(&self, thread: &Thread) -> Result<()>;

    fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    /// Newest first
    fn list_threads(&self) -> Result<Vec<Thread>>;

    /// Returns false when no such thread existed
    fn delete_thread(&self, thread_id: &str) -> Result<bool>;

    /// Remove every stored config and insert `config` in one atomic batch
    fn replace_notification_config(&self, config: &NotificationConfig) -> Result<()>;

    fn notification_config(&self) -> Result<Option<NotificationConfig>>;

    /// Cheap read used by the health endpoint
    fn ping(&self) -> Result<()>;
}
