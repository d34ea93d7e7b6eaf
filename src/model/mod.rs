//! Message and receiver data model

pub mod message;
pub mod receiver;

pub use message::{DisplayTags, Message, MessageId, MessageState, MessageType};
pub use receiver::{MessageReceiver, Receiver, ReceiverId};

#[cfg(test)]
pub use receiver::MockMessageReceiver;
