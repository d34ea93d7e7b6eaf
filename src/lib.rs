//! Convoview - conversation list viewer library
//!
//! This library keeps the in-memory list shown for one open conversation of
//! a messenger: messages oldest first, a date header in front of every
//! calendar day, older pages merged in at the top and live messages
//! appended at the bottom.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `view`: The ordered entry list and its merge rules
//! - `conversation`: Controller tying a view to its store, events and read receipts
//! - `store`: Message store trait with SQLite and in-memory implementations
//! - `model`: Messages and receivers
//! - `events`: Broadcast bus of store changes
//! - `render`: Terminal output of a view
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use convoview::clock::SystemClock;
//! use convoview::conversation::{ConversationController, ConversationOptions};
//! use convoview::model::{Receiver, ReceiverId};
//! use convoview::store::SqliteMessageStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(SqliteMessageStore::new()?);
//!     let receiver = Arc::new(Receiver::new(ReceiverId::contact("ECHOECHO")));
//!     let controller = ConversationController::new(
//!         store,
//!         receiver,
//!         ConversationOptions::default(),
//!         Arc::new(SystemClock),
//!     );
//!
//!     let summary = controller.open().await?;
//!     println!("{} messages, more: {}", summary.fetched, summary.has_more);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod model;
pub mod render;
pub mod store;
pub mod view;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{ConversationController, ConversationOptions};
pub use error::{ConvoviewError, Result};
pub use events::{MessageBus, MessageEvent};
pub use model::{Message, MessageId, ReceiverId};
pub use store::{MemoryMessageStore, MessageFilter, MessageStore, SqliteMessageStore};
pub use view::{ConversationView, ViewEntry};

#[cfg(test)]
pub mod test_utils;
