//! Read receipts for an open conversation
//!
//! While a conversation is in the foreground, every unread message that
//! appears in it is marked read right away. While it is paused, such
//! messages are collected and marked read in one batch on resume.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::model::{Message, MessageId};
use crate::store::MessageStore;

/// Live/paused flag plus the unread accumulator
pub struct ReadTracker {
    store: Arc<dyn MessageStore>,
    paused: AtomicBool,
    pending: Arc<Mutex<Vec<Arc<Message>>>>,
}

impl ReadTracker {
    /// Creates a tracker in the live state
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            store,
            paused: AtomicBool::new(false),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Returns to the live state and flushes the accumulator
    ///
    /// Must be called from within a tokio runtime.
    pub fn resume(&self) -> Option<JoinHandle<()>> {
        self.paused.store(false, Ordering::SeqCst);
        self.flush()
    }

    /// Handles a message that just became visible
    ///
    /// Read or outbound messages are ignored. Otherwise the message is
    /// marked read immediately when live, or queued when paused.
    pub fn track(&self, message: Arc<Message>) -> Option<JoinHandle<()>> {
        if !message.is_unread() {
            return None;
        }
        if self.is_paused() {
            lock(&self.pending).push(message);
            return None;
        }
        Some(self.mark_read(vec![message], |_| {}))
    }

    /// Marks every queued message read
    ///
    /// Queued messages are only dropped from the accumulator once the store
    /// confirmed the batch.
    pub fn flush(&self) -> Option<JoinHandle<()>> {
        let batch = lock(&self.pending).clone();
        if batch.is_empty() {
            return None;
        }
        let flushed: Vec<MessageId> = batch.iter().map(|m| m.id).collect();
        let pending = Arc::clone(&self.pending);
        Some(self.mark_read(batch, move |success| {
            if success {
                lock(&pending).retain(|m| !flushed.contains(&m.id));
            }
        }))
    }

    /// Queued messages, oldest first
    pub fn pending(&self) -> Vec<Arc<Message>> {
        lock(&self.pending).clone()
    }

    /// Marks `messages` read on a blocking worker, then calls `on_finished`
    ///
    /// Must be called from within a tokio runtime.
    pub fn mark_read<F>(&self, messages: Vec<Arc<Message>>, on_finished: F) -> JoinHandle<()>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
        tokio::spawn(async move {
            let count = ids.len();
            let result = tokio::task::spawn_blocking(move || store.mark_as_read(&ids)).await;
            let success = match result {
                Ok(Ok(changed)) => {
                    tracing::debug!(requested = count, changed, "Marked messages read");
                    true
                }
                Ok(Err(e)) => {
                    tracing::warn!("Failed to mark messages read: {:#}", e);
                    false
                }
                Err(e) => {
                    tracing::error!("Mark-as-read task failed: {}", e);
                    false
                }
            };
            on_finished(success);
        })
    }
}

fn lock(pending: &Mutex<Vec<Arc<Message>>>) -> std::sync::MutexGuard<'_, Vec<Arc<Message>>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConvoviewError, Result};
    use crate::model::ReceiverId;
    use crate::store::{MemoryMessageStore, MessageFilter};
    use crate::test_utils::{at, message};

    fn store_with(ids: &[MessageId]) -> Arc<MemoryMessageStore> {
        let messages = ids.iter().map(|id| (*message(*id, at(2024, 1, 1, 1))).clone());
        Arc::new(MemoryMessageStore::with_messages(messages).unwrap())
    }

    /// Store whose mark-as-read always fails
    struct FailingStore;

    impl MessageStore for FailingStore {
        fn messages_for_receiver(&self, _: &ReceiverId, _: &MessageFilter) -> Result<Vec<Message>> {
            Ok(Vec::new())
        }
        fn mark_as_read(&self, _: &[MessageId]) -> Result<usize> {
            Err(ConvoviewError::Storage("read-only".into()).into())
        }
        fn insert(&self, _: &Message) -> Result<MessageId> {
            Ok(0)
        }
        fn delete_for_receiver(&self, _: &ReceiverId) -> Result<usize> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_live_message_is_marked_read_immediately() {
        let store = store_with(&[1]);
        let tracker = ReadTracker::new(store.clone());
        let handle = tracker.track(message(1, at(2024, 1, 1, 1))).expect("dispatched");
        handle.await.unwrap();
        assert!(store.get(1).unwrap().read);
        assert!(tracker.pending().is_empty());
    }

    #[tokio::test]
    async fn test_paused_messages_are_queued_until_resume() {
        let store = store_with(&[1, 2]);
        let tracker = ReadTracker::new(store.clone());
        tracker.pause();

        assert!(tracker.track(message(1, at(2024, 1, 1, 1))).is_none());
        assert!(tracker.track(message(2, at(2024, 1, 1, 2))).is_none());
        assert_eq!(tracker.pending().len(), 2);
        assert!(!store.get(1).unwrap().read);

        tracker.resume().expect("flush dispatched").await.unwrap();
        assert!(!tracker.is_paused());
        assert!(tracker.pending().is_empty());
        assert!(store.get(1).unwrap().read);
        assert!(store.get(2).unwrap().read);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_queue() {
        let tracker = ReadTracker::new(Arc::new(FailingStore));
        tracker.pause();
        tracker.track(message(1, at(2024, 1, 1, 1)));
        tracker.resume().expect("flush dispatched").await.unwrap();
        assert_eq!(tracker.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_read_messages_are_ignored() {
        let tracker = ReadTracker::new(store_with(&[]));
        let mut read = (*message(1, at(2024, 1, 1, 1))).clone();
        read.read = true;
        assert!(tracker.track(Arc::new(read)).is_none());
        assert!(tracker.resume().is_none());
    }

    #[tokio::test]
    async fn test_completion_callback_reports_success() {
        let tracker = ReadTracker::new(store_with(&[1]));
        let (tx, rx) = tokio::sync::oneshot::channel();
        tracker
            .mark_read(vec![message(1, at(2024, 1, 1, 1))], move |ok| {
                let _ = tx.send(ok);
            })
            .await
            .unwrap();
        assert!(rx.await.unwrap());
    }
}
