//! Conversation receivers: contacts, groups and distribution lists

use serde::{Deserialize, Serialize};
use std::fmt;

use super::message::Message;

/// Identity of the conversation a message belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReceiverId {
    /// One-to-one chat with a contact identity
    Contact(String),
    /// Group chat
    Group(i64),
    /// Distribution list (one message fanned out to many contacts)
    DistributionList(i64),
}

impl ReceiverId {
    pub fn contact(identity: impl Into<String>) -> Self {
        ReceiverId::Contact(identity.into())
    }

    pub fn group(id: i64) -> Self {
        ReceiverId::Group(id)
    }

    pub fn distribution_list(id: i64) -> Self {
        ReceiverId::DistributionList(id)
    }

    /// Storage discriminator
    pub fn kind(&self) -> &'static str {
        match self {
            ReceiverId::Contact(_) => "contact",
            ReceiverId::Group(_) => "group",
            ReceiverId::DistributionList(_) => "distribution_list",
        }
    }

    /// Storage key within the kind
    pub fn key(&self) -> String {
        match self {
            ReceiverId::Contact(identity) => identity.clone(),
            ReceiverId::Group(id) | ReceiverId::DistributionList(id) => id.to_string(),
        }
    }

    /// Rebuilds a receiver id from its stored `(kind, key)` pair
    ///
    /// # Examples
    ///
    /// ```
    /// use convoview::model::ReceiverId;
    ///
    /// let id = ReceiverId::group(42);
    /// assert_eq!(ReceiverId::from_parts(id.kind(), &id.key()), Some(id));
    /// assert_eq!(ReceiverId::from_parts("group", "not-a-number"), None);
    /// ```
    pub fn from_parts(kind: &str, key: &str) -> Option<Self> {
        match kind {
            "contact" => Some(ReceiverId::Contact(key.to_string())),
            "group" => key.parse().ok().map(ReceiverId::Group),
            "distribution_list" => key.parse().ok().map(ReceiverId::DistributionList),
            _ => None,
        }
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.key())
    }
}

/// The owner of a conversation, as seen by the conversation view
///
/// The ownership check decides whether a live message is shown in an open
/// conversation at all.
#[cfg_attr(test, mockall::automock)]
pub trait MessageReceiver: Send + Sync {
    /// Identity of this receiver
    fn id(&self) -> &ReceiverId;

    /// Human readable name used in headers
    fn display_name(&self) -> String;

    /// Returns true if `message` belongs to this receiver's conversation
    fn belongs_to_me(&self, message: &Message) -> bool;
}

/// Plain receiver backed only by its id
#[derive(Debug, Clone)]
pub struct Receiver {
    id: ReceiverId,
    name: Option<String>,
}

impl Receiver {
    pub fn new(id: ReceiverId) -> Self {
        Self { id, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl MessageReceiver for Receiver {
    fn id(&self) -> &ReceiverId {
        &self.id
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    fn belongs_to_me(&self, message: &Message) -> bool {
        message.receiver == self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_receiver_id_round_trips_through_parts() {
        for id in [
            ReceiverId::contact("ECHOECHO"),
            ReceiverId::group(3),
            ReceiverId::distribution_list(9),
        ] {
            assert_eq!(ReceiverId::from_parts(id.kind(), &id.key()), Some(id));
        }
        assert_eq!(ReceiverId::from_parts("channel", "1"), None);
    }

    #[test]
    fn test_receiver_id_display() {
        assert_eq!(ReceiverId::group(5).to_string(), "group:5");
        assert_eq!(ReceiverId::contact("ABCD").to_string(), "contact:ABCD");
    }

    #[test]
    fn test_receiver_belongs_to_me_checks_receiver_id() {
        let receiver = Receiver::new(ReceiverId::group(1));
        let mine = Message::text(ReceiverId::group(1), Utc::now(), "a");
        let other = Message::text(ReceiverId::group(2), Utc::now(), "b");
        assert!(receiver.belongs_to_me(&mine));
        assert!(!receiver.belongs_to_me(&other));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let receiver = Receiver::new(ReceiverId::contact("ECHOECHO"));
        assert_eq!(receiver.display_name(), "contact:ECHOECHO");
        let named = receiver.with_name("Echo");
        assert_eq!(named.display_name(), "Echo");
    }

    #[test]
    fn test_receiver_id_serde_shape() {
        let json = serde_json::to_string(&ReceiverId::group(7)).unwrap();
        assert_eq!(json, r#"{"kind":"group","id":7}"#);
    }
}
