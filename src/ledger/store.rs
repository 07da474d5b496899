use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::{LedgerError, Result};
use super::partitions::{
    ALERT_PREFIX, DELIVERY_PREFIX, NOTIFICATION_PREFIX, THREAD_PREFIX, encode_alert_key,
    encode_delivery_key, encode_notification_key, encode_thread_key,
};
use super::records::{
    Alert, DeliveryLogEntry, DeliveryPage, DeliveryQuery, NotificationConfig, Thread,
};
use super::traits::Ledger;

/// Fjall-backed persistent storage for deliveries, alerts, threads and settings
#[derive(Clone)]
pub struct FjallStore {
    keyspace: Keyspace,
    deliveries: PartitionHandle,
    alerts: PartitionHandle,
    threads: PartitionHandle,
    settings: PartitionHandle,
}

impl FjallStore {
    /// Open or create a Fjall store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening Fjall store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;

        let deliveries = keyspace.open_partition("deliveries", PartitionCreateOptions::default())?;
        let alerts = keyspace.open_partition("alerts", PartitionCreateOptions::default())?;
        let threads = keyspace.open_partition("threads", PartitionCreateOptions::default())?;
        let settings = keyspace.open_partition("settings", PartitionCreateOptions::default())?;

        info!("Fjall store opened successfully");
        Ok(Self {
            keyspace,
            deliveries,
            alerts,
            threads,
            settings,
        })
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Record counts per partition (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            delivery_count: count(&self.deliveries, DELIVERY_PREFIX)?,
            alert_count: count(&self.alerts, ALERT_PREFIX)?,
            thread_count: count(&self.threads, THREAD_PREFIX)?,
            notification_config_count: count(&self.settings, NOTIFICATION_PREFIX)?,
        })
    }

    fn put<T: Serialize>(partition: &PartitionHandle, key: Vec<u8>, value: &T) -> Result<()> {
        let value = serde_json::to_vec(value)?;
        partition.insert(key, value)?;
        Ok(())
    }

    fn fetch<T: DeserializeOwned>(partition: &PartitionHandle, key: Vec<u8>) -> Result<Option<T>> {
        match partition.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }
}

fn count(partition: &PartitionHandle, prefix: &str) -> Result<usize> {
    let mut total = 0;
    for item in partition.prefix(prefix) {
        item?;
        total += 1;
    }
    Ok(total)
}

impl Ledger for FjallStore {
    fn append_delivery(&self, entry: &DeliveryLogEntry) -> Result<()> {
        Self::put(&self.deliveries, encode_delivery_key(&entry.id), entry)?;
        debug!(entry_id = %entry.id, webhook_id = %entry.webhook_id, "Appended delivery");
        Ok(())
    }

    fn attach_delivery_message_id(&self, entry_id: &str, message_id: &str) -> Result<()> {
        let key = encode_delivery_key(entry_id);
        let mut entry: DeliveryLogEntry = Self::fetch(&self.deliveries, key.clone())?
            .ok_or_else(|| LedgerError::NotFound(format!("delivery {entry_id}")))?;

        if entry.external_message_id.is_some() {
            debug!(entry_id, "Delivery already carries a message id");
            return Ok(());
        }

        entry.external_message_id = Some(message_id.to_string());
        Self::put(&self.deliveries, key, &entry)
    }

    fn list_deliveries(&self, query: &DeliveryQuery) -> Result<DeliveryPage> {
        let mut entries = Vec::new();
        for item in self.deliveries.prefix(DELIVERY_PREFIX).rev() {
            let (_, value) = item?;
            entries.push(serde_json::from_slice::<DeliveryLogEntry>(&value)?);
        }
        Ok(query.paginate(entries))
    }

    fn insert_alert(&self, alert: &Alert) -> Result<()> {
        Self::put(&self.alerts, encode_alert_key(&alert.id), alert)?;
        debug!(alert_id = %alert.id, level = %alert.level, "Inserted alert");
        Ok(())
    }

    fn attach_alert_message_id(&self, alert_id: &str, message_id: &str) -> Result<()> {
        let key = encode_alert_key(alert_id);
        let mut alert: Alert = Self::fetch(&self.alerts, key.clone())?
            .ok_or_else(|| LedgerError::NotFound(format!("alert {alert_id}")))?;

        if alert.external_message_id.is_some() {
            debug!(alert_id, "Alert already carries a message id");
            return Ok(());
        }

        alert.external_message_id = Some(message_id.to_string());
        Self::put(&self.alerts, key, &alert)
    }

    fn list_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let mut alerts = Vec::with_capacity(limit.min(256));
        for item in self.alerts.prefix(ALERT_PREFIX).rev().take(limit) {
            let (_, value) = item?;
            alerts.push(serde_json::from_slice(&value)?);
        }
        Ok(alerts)
    }

    fn put_thread(&self, thread: &Thread) -> Result<()> {
        Self::put(&self.threads, encode_thread_key(&thread.id), thread)?;
        debug!(thread_id = %thread.id, replies = thread.replies.len(), "Stored thread");
        Ok(())
    }

    fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Self::fetch(&self.threads, encode_thread_key(thread_id))
    }

    fn list_threads(&self) -> Result<Vec<Thread>> {
        let mut threads = Vec::new();
        for item in self.threads.prefix(THREAD_PREFIX) {
            let (_, value) = item?;
            threads.push(serde_json::from_slice::<Thread>(&value)?);
        }
        // Keys are external ids, so order by creation time instead of key
        threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(threads)
    }

    fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let key = encode_thread_key(thread_id);
        if !self.threads.contains_key(&key)? {
            return Ok(false);
        }
        self.threads.remove(key)?;
        debug!(thread_id, "Deleted thread");
        Ok(true)
    }

    fn replace_notification_config(&self, config: &NotificationConfig) -> Result<()> {
        let value = serde_json::to_vec(config)?;
        let mut batch = self.keyspace.batch();

        for item in self.settings.prefix(NOTIFICATION_PREFIX) {
            let (key, _) = item?;
            batch.remove(&self.settings, key);
        }

        let record_id = Uuid::now_v7().to_string();
        batch.insert(&self.settings, encode_notification_key(&record_id), value);
        batch.commit()?;

        debug!(record_id, "Replaced notification config");
        Ok(())
    }

    fn notification_config(&self) -> Result<Option<NotificationConfig>> {
        match self.settings.prefix(NOTIFICATION_PREFIX).next_back() {
            Some(item) => {
                let (_, value) = item?;
                Ok(Some(serde_json::from_slice(&value)?))
            }
            None => Ok(None),
        }
    }

    fn ping(&self) -> Result<()> {
        self.settings.contains_key("ping")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub delivery_count: usize,
    pub alert_count: usize,
    pub thread_count: usize,
    pub notification_config_count: usize,
}
