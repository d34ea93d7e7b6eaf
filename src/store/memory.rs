use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{ConvoviewError, Result};
use crate::model::{Message, MessageId, ReceiverId};

use super::{MessageFilter, MessageStore};

#[derive(Debug, Default)]
struct Inner {
    messages: Vec<Message>,
    next_id: MessageId,
}

/// In-memory message store
///
/// Producers (live delivery) and consumers (page loads) may race, so the
/// whole backing list sits behind one lock.
#[derive(Debug, Default)]
pub struct MemoryMessageStore {
    inner: Mutex<Inner>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `messages`
    ///
    /// # Errors
    ///
    /// Returns error if any message cannot be inserted
    pub fn with_messages(messages: impl IntoIterator<Item = Message>) -> Result<Self> {
        let store = Self::new();
        for message in messages {
            store.insert(&message)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.snapshot().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored copy of a message
    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.snapshot()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Read access that survives a writer having panicked mid-update
    fn snapshot(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| ConvoviewError::Storage("message store lock poisoned".into()).into())
    }
}

impl MessageStore for MemoryMessageStore {
    fn messages_for_receiver(
        &self,
        receiver: &ReceiverId,
        filter: &MessageFilter,
    ) -> Result<Vec<Message>> {
        let inner = self.lock()?;
        let mut selected: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| &m.receiver == receiver && filter.matches(m))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(limit) = filter.page_size {
            selected.truncate(limit);
        }
        Ok(selected)
    }

    fn mark_as_read(&self, ids: &[MessageId]) -> Result<usize> {
        let mut inner = self.lock()?;
        let mut changed = 0;
        for message in inner.messages.iter_mut() {
            if !message.read && ids.contains(&message.id) {
                message.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn insert(&self, message: &Message) -> Result<MessageId> {
        let mut inner = self.lock()?;
        let mut stored = message.clone();
        if stored.id == 0 {
            inner.next_id += 1;
            stored.id = inner.next_id;
        } else {
            if inner.messages.iter().any(|m| m.id == stored.id) {
                return Err(ConvoviewError::Storage(format!(
                    "message {} already exists",
                    stored.id
                ))
                .into());
            }
            inner.next_id = inner.next_id.max(stored.id);
        }
        let id = stored.id;
        inner.messages.push(stored);
        Ok(id)
    }

    fn delete_for_receiver(&self, receiver: &ReceiverId) -> Result<usize> {
        let mut inner = self.lock()?;
        let before = inner.messages.len();
        inner.messages.retain(|m| &m.receiver != receiver);
        Ok(before - inner.messages.len())
    }
}
