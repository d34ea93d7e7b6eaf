//! Message event bus
//!
//! Collaborators that learn about new, changed or deleted messages publish
//! a [`MessageEvent`] on a [`MessageBus`]. Each open conversation holds its
//! own subscription for as long as it is open, so there is no process-wide
//! listener registry to register with and forget to leave.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::model::{Message, MessageId};

/// Default number of events buffered per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// Change to the message store
#[derive(Debug, Clone)]
pub enum MessageEvent {
    /// A message was created (sent or received)
    New(Arc<Message>),
    /// Messages changed (state, tags, download progress)
    Modified(Vec<Arc<Message>>),
    /// Messages were deleted
    Removed(Vec<MessageId>),
}

/// Broadcast channel of [`MessageEvent`]s
///
/// Subscribers see events in publish order; there is no ordering across
/// subscribers.
#[derive(Debug, Clone)]
pub struct MessageBus {
    sender: broadcast::Sender<MessageEvent>,
}

impl MessageBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event
    ///
    /// # Returns
    ///
    /// Number of subscribers that will see the event
    pub fn publish(&self, event: MessageEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MessageEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{at, message};

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let bus = MessageBus::default();
        assert_eq!(bus.publish(MessageEvent::Removed(vec![1])), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = MessageBus::new(8);
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(MessageEvent::New(message(1, at(2024, 1, 1, 1))));
        bus.publish(MessageEvent::Removed(vec![1]));

        assert!(matches!(rx.recv().await.unwrap(), MessageEvent::New(m) if m.id == 1));
        assert!(matches!(rx.recv().await.unwrap(), MessageEvent::Removed(ids) if ids == [1]));
    }

    #[test]
    fn test_dropping_receiver_unsubscribes() {
        let bus = MessageBus::default();
        let rx = bus.subscribe();
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
