//! Thread correlation store
//!
//! A thread is keyed by the message id the channel assigns to its root post,
//! so creation is two-phase: post first, then persist. If the post succeeds
//! and the write fails, the message exists remotely with no local record and
//! the caller gets [`ThreadError::Orphaned`] with the remote id. Nothing is
//! retracted automatically.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::ledger::{Ledger, LedgerError, Thread, ThreadReply};
use crate::notify::{NotificationChannel, NotifyError, OutboundMessage};

/// Returned alongside a successful delete
pub const DELETE_NOTICE: &str =
    "Thread deleted locally; messages already posted to the channel were not retracted";

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("thread not found: {0}")]
    NotFound(String),

    #[error("threads need the authenticated bot channel (set SLACK_BOT_TOKEN and SLACK_CHANNEL_ID)")]
    ConfigurationMissing,

    #[error(transparent)]
    Channel(#[from] NotifyError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("message {message_id} was posted but could not be stored: {source}")]
    Orphaned {
        message_id: String,
        source: LedgerError,
    },
}

pub struct ThreadService {
    ledger: Arc<dyn Ledger>,
    channel: Arc<dyn NotificationChannel>,
    /// Held across read-post-write on replies and across deletes, so
    /// concurrent replies are not lost and a reply cannot resurrect a
    /// thread deleted while its post was in flight
    write_lock: Mutex<()>,
}

impl ThreadService {
    pub fn new(ledger: Arc<dyn Ledger>, channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            ledger,
            channel,
            write_lock: Mutex::new(()),
        }
    }

    fn ensure_threads_supported(&self) -> Result<(), ThreadError> {
        if self.channel.supports_threads() {
            Ok(())
        } else {
            Err(ThreadError::ConfigurationMissing)
        }
    }

    async fn post(&self, message: &OutboundMessage) -> Result<String, ThreadError> {
        self.channel.post(message).await?.ok_or_else(|| {
            ThreadError::Channel(NotifyError::Api("no message id returned".to_string()))
        })
    }

    /// Post a root message and record the thread under its message id
    pub async fn create(&self, text: &str) -> Result<Thread, ThreadError> {
        self.ensure_threads_supported()?;

        let message_id = self
            .post(&OutboundMessage::builder().text(text).build())
            .await?;

        let thread = Thread {
            id: message_id.clone(),
            text: text.to_string(),
            channel: self.channel.channel_label(),
            created_at: Utc::now(),
            replies: Vec::new(),
        };

        if let Err(source) = self.ledger.put_thread(&thread) {
            warn!(%message_id, error = %source, "Thread root posted but not stored");
            return Err(ThreadError::Orphaned { message_id, source });
        }

        info!(thread_id = %thread.id, "Thread created");
        Ok(thread)
    }

    /// Post a reply under an existing thread and append it locally
    pub async fn add_reply(&self, thread_id: &str, text: &str) -> Result<Thread, ThreadError> {
        self.ensure_threads_supported()?;
        let _guard = self.write_lock.lock().await;

        let mut thread = self
            .ledger
            .get_thread(thread_id)?
            .ok_or_else(|| ThreadError::NotFound(thread_id.to_string()))?;

        let message = OutboundMessage::builder()
            .text(text)
            .thread_ts(thread_id)
            .build();
        let message_id = self.post(&message).await?;

        thread.replies.push(ThreadReply {
            id: message_id.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
        });

        if let Err(source) = self.ledger.put_thread(&thread) {
            warn!(thread_id, %message_id, error = %source, "Reply posted but not stored");
            return Err(ThreadError::Orphaned { message_id, source });
        }

        info!(thread_id, replies = thread.replies.len(), "Reply added");
        Ok(thread)
    }

    /// Remove the local record only
    pub async fn delete(&self, thread_id: &str) -> Result<(), ThreadError> {
        let _guard = self.write_lock.lock().await;
        if !self.ledger.delete_thread(thread_id)? {
            return Err(ThreadError::NotFound(thread_id.to_string()));
        }
        info!(thread_id, "Thread deleted");
        Ok(())
    }

    pub fn get(&self, thread_id: &str) -> Result<Thread, ThreadError> {
        self.ledger
            .get_thread(thread_id)?
            .ok_or_else(|| ThreadError::NotFound(thread_id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Thread>, ThreadError> {
        Ok(self.ledger.list_threads()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FlakyLedger, RecordingChannel};
    use std::sync::atomic::Ordering;

    fn service(ledger: &Arc<FlakyLedger>, channel: &Arc<RecordingChannel>) -> ThreadService {
        ThreadService::new(ledger.clone(), channel.clone())
    }

    #[tokio::test]
    async fn test_create_then_reply() {
        let ledger = Arc::new(FlakyLedger::new());
        let channel = Arc::new(RecordingChannel::threaded());
        let threads = service(&ledger, &channel);

        let thread = threads.create("hello").await.unwrap();
        assert_eq!(thread.id, "1700000000.000001");
        assert_eq!(thread.channel.as_deref(), Some("C0TEST"));

        let updated = threads.add_reply(&thread.id, "world").await.unwrap();
        assert_eq!(updated.replies.len(), 1);
        assert_eq!(updated.replies[0].text, "world");

        let posts = channel.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].thread_ts.is_none());
        assert_eq!(posts[1].thread_ts.as_deref(), Some("1700000000.000001"));

        let stored = threads.get(&thread.id).unwrap();
        assert_eq!(stored.replies.len(), 1);
    }

    #[tokio::test]
    async fn test_reply_to_unknown_thread_posts_nothing() {
        let ledger = Arc::new(FlakyLedger::new());
        let channel = Arc::new(RecordingChannel::threaded());
        let threads = service(&ledger, &channel);

        let err = threads.add_reply("missing", "world").await.unwrap_err();
        assert!(matches!(err, ThreadError::NotFound(id) if id == "missing"));
        assert_eq!(channel.post_count(), 0);
        assert!(threads.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_failure_persists_nothing() {
        let ledger = Arc::new(FlakyLedger::new());
        let channel = Arc::new(RecordingChannel::threaded());
        channel.fail.store(true, Ordering::SeqCst);
        let threads = service(&ledger, &channel);

        let err = threads.create("hello").await.unwrap_err();
        assert!(matches!(err, ThreadError::Channel(NotifyError::Api(_))));
        assert!(threads.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_after_post_is_orphaned() {
        let ledger = Arc::new(FlakyLedger::new());
        ledger.fail_threads.store(true, Ordering::SeqCst);
        let channel = Arc::new(RecordingChannel::threaded());
        let threads = service(&ledger, &channel);

        let err = threads.create("hello").await.unwrap_err();
        match err {
            ThreadError::Orphaned { message_id, .. } => {
                assert_eq!(message_id, "1700000000.000001")
            }
            other => panic!("expected orphaned, got {other:?}"),
        }
        assert_eq!(channel.post_count(), 1);
    }

    #[tokio::test]
    async fn test_threads_need_bot_channel() {
        let ledger = Arc::new(FlakyLedger::new());
        let channel = Arc::new(RecordingChannel::default());
        let threads = service(&ledger, &channel);

        let err = threads.create("hello").await.unwrap_err();
        assert!(matches!(err, ThreadError::ConfigurationMissing));
        assert_eq!(channel.post_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_hides_thread() {
        let ledger = Arc::new(FlakyLedger::new());
        let channel = Arc::new(RecordingChannel::threaded());
        let threads = service(&ledger, &channel);

        let first = threads.create("one").await.unwrap();
        let second = threads.create("two").await.unwrap();

        threads.delete(&first.id).await.unwrap();

        let remaining = threads.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, second.id);
        assert!(matches!(threads.get(&first.id), Err(ThreadError::NotFound(_))));
        assert!(matches!(
            threads.delete(&first.id).await,
            Err(ThreadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_waits_for_in_flight_reply() {
        let ledger = Arc::new(FlakyLedger::new());
        let channel = Arc::new(RecordingChannel::threaded());
        let threads = Arc::new(service(&ledger, &channel));

        let thread = threads.create("root").await.unwrap();
        channel.delay_ms.store(200, Ordering::SeqCst);

        let reply = {
            let threads = Arc::clone(&threads);
            let id = thread.id.clone();
            tokio::spawn(async move { threads.add_reply(&id, "late").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        threads.delete(&thread.id).await.unwrap();

        let replied = reply.await.unwrap().unwrap();
        assert_eq!(replied.replies.len(), 1);
        assert!(matches!(threads.get(&thread.id), Err(ThreadError::NotFound(_))));
        assert!(threads.list().unwrap().is_empty());
    }
}
