//! Test doubles shared by unit tests

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tempfile::TempDir;

use crate::ledger::{
    Alert, DeliveryLogEntry, DeliveryPage, DeliveryQuery, FjallStore, Ledger, LedgerError,
    NotificationConfig, Result, Thread,
};
use crate::notify::{ChannelKind, NotificationChannel, NotifyError, OutboundMessage};

/// Fjall store whose writes can be made to fail per record kind
pub struct FlakyLedger {
    inner: FjallStore,
    pub fail_deliveries: AtomicBool,
    pub fail_alerts: AtomicBool,
    pub fail_threads: AtomicBool,
    _dir: TempDir,
}

impl FlakyLedger {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            inner: FjallStore::open(dir.path().join("ledger")).unwrap(),
            fail_deliveries: AtomicBool::new(false),
            fail_alerts: AtomicBool::new(false),
            fail_threads: AtomicBool::new(false),
            _dir: dir,
        }
    }

    fn check(flag: &AtomicBool) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("disk full".to_string()));
        }
        Ok(())
    }
}

impl Ledger for FlakyLedger {
    fn append_delivery(&self, entry: &DeliveryLogEntry) -> Result<()> {
        Self::check(&self.fail_deliveries)?;
        self.inner.append_delivery(entry)
    }

    fn attach_delivery_message_id(&self, entry_id: &str, message_id: &str) -> Result<()> {
        self.inner.attach_delivery_message_id(entry_id, message_id)
    }

    fn list_deliveries(&self, query: &DeliveryQuery) -> Result<DeliveryPage> {
        self.inner.list_deliveries(query)
    }

    fn insert_alert(&self, alert: &Alert) -> Result<()> {
        Self::check(&self.fail_alerts)?;
        self.inner.insert_alert(alert)
    }

    fn attach_alert_message_id(&self, alert_id: &str, message_id: &str) -> Result<()> {
        self.inner.attach_alert_message_id(alert_id, message_id)
    }

    fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        self.inner.list_alerts(limit)
    }

    fn put_thread(&self, thread: &Thread) -> Result<()> {
        Self::check(&self.fail_threads)?;
        self.inner.put_thread(thread)
    }

    fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        self.inner.get_thread(thread_id)
    }

    fn list_threads(&self) -> Result<Vec<Thread>> {
        self.inner.list_threads()
    }

    fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        self.inner.delete_thread(thread_id)
    }

    fn replace_notification_config(&self, config: &NotificationConfig) -> Result<()> {
        self.inner.replace_notification_config(config)
    }

    fn notification_config(&self) -> Result<Option<NotificationConfig>> {
        self.inner.notification_config()
    }

    fn ping(&self) -> Result<()> {
        self.inner.ping()
    }
}

/// Channel that records every post
///
/// When `threaded` it behaves like the bot strategy and hands out sequential
/// ids; otherwise it behaves like an incoming webhook and returns none.
#[derive(Default)]
pub struct RecordingChannel {
    pub posts: Mutex<Vec<OutboundMessage>>,
    pub threaded: bool,
    pub fail: AtomicBool,
    /// Delay applied to every post, in milliseconds
    pub delay_ms: AtomicU64,
    next_id: AtomicU64,
}

impl RecordingChannel {
    pub fn threaded() -> Self {
        Self {
            threaded: true,
            ..Default::default()
        }
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        if self.threaded {
            ChannelKind::Bot
        } else {
            ChannelKind::IncomingWebhook
        }
    }

    fn supports_threads(&self) -> bool {
        self.threaded
    }

    fn channel_label(&self) -> Option<String> {
        self.threaded.then(|| "C0TEST".to_string())
    }

    async fn post(&self, message: &OutboundMessage) -> std::result::Result<Option<String>, NotifyError> {
        self.posts.lock().unwrap().push(message.clone());
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Api("channel_not_found".to_string()));
        }
        if !self.threaded {
            return Ok(None);
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(format!("1700000000.{n:06}")))
    }

    fn apply_config(&self, _config: &NotificationConfig) {}
}
