//! Message records as delivered by the message store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::receiver::ReceiverId;

/// Numeric message identifier assigned by the store
///
/// `0` means "not yet stored" and is never matched when replacing entries.
pub type MessageId = i64;

/// Kind of content a message carries
///
/// `Status` and `VoipStatus` are pseudo-types: they are produced locally
/// (group changes, call summaries) rather than typed by a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Voice,
    Video,
    File,
    Location,
    Ballot,
    Contact,
    Status,
    VoipStatus,
}

impl MessageType {
    /// Returns true for the status pseudo-type
    pub fn is_status(&self) -> bool {
        matches!(self, MessageType::Status)
    }

    /// Returns true for message kinds that never trigger a sent/received cue
    pub fn is_silent(&self) -> bool {
        matches!(self, MessageType::Status | MessageType::VoipStatus)
    }
}

/// Delivery state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    Pending,
    Sending,
    #[default]
    Sent,
    Delivered,
    Read,
    SendFailed,
}

/// Bit set of display tags attached to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayTags(u32);

impl DisplayTags {
    pub const NONE: DisplayTags = DisplayTags(0);
    pub const STARRED: DisplayTags = DisplayTags(1);
    pub const PINNED: DisplayTags = DisplayTags(1 << 1);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Returns true if every tag in `other` is also set here
    pub fn contains(&self, other: DisplayTags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: DisplayTags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: DisplayTags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// A single message of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned id, `0` if not stored yet
    #[serde(default)]
    pub id: MessageId,
    /// Protocol-level id, absent for local pseudo-messages
    #[serde(default)]
    pub api_message_id: Option<String>,
    /// Conversation this message belongs to
    pub receiver: ReceiverId,
    /// Creation time; a message without one is treated as malformed
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// True for messages we sent
    #[serde(default)]
    pub outbox: bool,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub state: MessageState,
    #[serde(default)]
    pub read: bool,
    #[serde(default = "default_true")]
    pub saved: bool,
    #[serde(default = "default_true")]
    pub downloaded: bool,
    #[serde(default)]
    pub content_type: i32,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub display_tags: DisplayTags,
}

fn default_true() -> bool {
    true
}

impl Message {
    /// Creates an inbound text message
    ///
    /// # Examples
    ///
    /// ```
    /// use convoview::model::{Message, ReceiverId};
    /// use chrono::Utc;
    ///
    /// let msg = Message::text(ReceiverId::contact("ECHOECHO"), Utc::now(), "hi");
    /// assert!(!msg.outbox);
    /// assert!(!msg.read);
    /// ```
    pub fn text(receiver: ReceiverId, created_at: DateTime<Utc>, body: impl Into<String>) -> Self {
        Self {
            id: 0,
            api_message_id: None,
            receiver,
            created_at: Some(created_at),
            outbox: false,
            message_type: MessageType::Text,
            state: MessageState::Sent,
            read: false,
            saved: true,
            downloaded: true,
            content_type: 0,
            body: Some(body.into()),
            display_tags: DisplayTags::NONE,
        }
    }

    pub fn with_id(mut self, id: MessageId) -> Self {
        self.id = id;
        self
    }

    pub fn with_api_message_id(mut self, api_message_id: impl Into<String>) -> Self {
        self.api_message_id = Some(api_message_id.into());
        self
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    /// Marks the message as outbound, which also makes it read
    pub fn outbound(mut self) -> Self {
        self.outbox = true;
        self.read = true;
        self
    }

    pub fn starred(mut self) -> Self {
        self.display_tags.insert(DisplayTags::STARRED);
        self
    }

    /// Inbound and not yet read
    pub fn is_unread(&self) -> bool {
        !self.outbox && !self.read
    }

    pub fn is_status_message(&self) -> bool {
        self.message_type.is_status()
    }
}
