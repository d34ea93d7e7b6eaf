//! Message stores
//!
//! The conversation view never talks to storage itself. A [`MessageStore`]
//! supplies pages of messages, unread queries and the mark-as-read
//! operation; the controller calls it from a blocking worker.
//!
//! Pages are always returned newest first.

pub mod filter;
pub mod memory;
pub mod sqlite;

pub use filter::MessageFilter;
pub use memory::MemoryMessageStore;
pub use sqlite::SqliteMessageStore;

use crate::error::Result;
use crate::model::{Message, MessageId, ReceiverId};

/// Backing store of conversation messages
pub trait MessageStore: Send + Sync {
    /// Messages of `receiver` matching `filter`, newest first
    fn messages_for_receiver(
        &self,
        receiver: &ReceiverId,
        filter: &MessageFilter,
    ) -> Result<Vec<Message>>;

    /// Inbound messages of `receiver` that have not been read
    fn unread_messages(&self, receiver: &ReceiverId) -> Result<Vec<Message>> {
        let filter = MessageFilter::all().with_unsaved(true).only_unread(true);
        self.messages_for_receiver(receiver, &filter)
    }

    fn unread_count(&self, receiver: &ReceiverId) -> Result<usize> {
        Ok(self.unread_messages(receiver)?.len())
    }

    /// Marks the given messages read
    ///
    /// # Returns
    ///
    /// Number of messages that changed state
    fn mark_as_read(&self, ids: &[MessageId]) -> Result<usize>;

    /// Stores a message, assigning an id when `message.id` is `0`
    fn insert(&self, message: &Message) -> Result<MessageId>;

    /// Deletes every message of `receiver`
    fn delete_for_receiver(&self, receiver: &ReceiverId) -> Result<usize>;
}
