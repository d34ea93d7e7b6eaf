//! Message selection filters
//!
//! A [`MessageFilter`] describes one request against a message store: how
//! many messages, starting below which id, and which kinds of messages to
//! include. Both store implementations share [`MessageFilter::matches`].

use crate::model::{DisplayTags, Message, MessageId, MessageType};
use crate::view::PageCursor;

/// Selection criteria for [`MessageStore::messages_for_receiver`](super::MessageStore::messages_for_receiver)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageFilter {
    /// Maximum number of messages returned, `None` for all
    pub page_size: Option<usize>,
    /// Only messages with an id below this one
    pub page_reference_id: Option<MessageId>,
    /// Include status pseudo-messages
    pub with_status_messages: bool,
    /// Include messages that were not saved to the conversation
    pub with_unsaved: bool,
    /// Only inbound messages not yet read
    pub only_unread: bool,
    /// Only messages whose media has been downloaded
    pub only_downloaded: bool,
    /// Restrict to these types; empty means any type
    pub types: Vec<MessageType>,
    /// Restrict to these content types; empty means any
    pub content_types: Vec<i32>,
    /// Require these display tags
    pub display_tags: Option<DisplayTags>,
}

impl MessageFilter {
    /// Next page of a conversation below `cursor`
    ///
    /// # Examples
    ///
    /// ```
    /// use convoview::store::MessageFilter;
    /// use convoview::view::PageCursor;
    ///
    /// let filter = MessageFilter::page(100, Some(PageCursor::new(512)));
    /// assert_eq!(filter.page_size, Some(100));
    /// assert_eq!(filter.page_reference_id, Some(512));
    /// assert!(filter.with_status_messages);
    /// ```
    pub fn page(page_size: usize, cursor: Option<PageCursor>) -> Self {
        Self {
            page_size: Some(page_size),
            page_reference_id: cursor.map(|c| c.id()),
            with_status_messages: true,
            ..Default::default()
        }
    }

    /// The whole conversation, status messages included
    pub fn all() -> Self {
        Self {
            with_status_messages: true,
            ..Default::default()
        }
    }

    /// Newest `count` messages without status messages
    ///
    /// Used to bring a whole unread backlog into view when it is larger
    /// than one page.
    pub fn unread_backlog(count: usize) -> Self {
        Self {
            page_size: Some(count),
            ..Default::default()
        }
    }

    pub fn with_unsaved(mut self, with_unsaved: bool) -> Self {
        self.with_unsaved = with_unsaved;
        self
    }

    pub fn only_unread(mut self, only_unread: bool) -> Self {
        self.only_unread = only_unread;
        self
    }

    pub fn only_downloaded(mut self, only_downloaded: bool) -> Self {
        self.only_downloaded = only_downloaded;
        self
    }

    pub fn with_types(mut self, types: Vec<MessageType>) -> Self {
        self.types = types;
        self
    }

    pub fn with_content_types(mut self, content_types: Vec<i32>) -> Self {
        self.content_types = content_types;
        self
    }

    pub fn with_display_tags(mut self, tags: DisplayTags) -> Self {
        self.display_tags = Some(tags);
        self
    }

    /// Returns true if `message` passes every criterion except the page size
    pub fn matches(&self, message: &Message) -> bool {
        if let Some(reference) = self.page_reference_id {
            if message.id >= reference {
                return false;
            }
        }
        if !self.with_status_messages && message.is_status_message() {
            return false;
        }
        if !self.with_unsaved && !message.saved {
            return false;
        }
        if self.only_unread && !message.is_unread() {
            return false;
        }
        if self.only_downloaded && !message.downloaded {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&message.message_type) {
            return false;
        }
        if !self.content_types.is_empty() && !self.content_types.contains(&message.content_type) {
            return false;
        }
        if let Some(tags) = self.display_tags {
            if !message.display_tags.contains(tags) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReceiverId;
    use crate::test_utils::at;

    fn base() -> Message {
        Message::text(ReceiverId::group(1), at(2024, 1, 1, 9), "x").with_id(10)
    }

    #[test]
    fn test_page_reference_is_exclusive() {
        let filter = MessageFilter::page(10, Some(PageCursor::new(10)));
        assert!(!filter.matches(&base()));
        assert!(filter.matches(&base().with_id(9)));
    }

    #[test]
    fn test_status_messages_excluded_from_backlog() {
        let status = base().with_type(MessageType::Status);
        assert!(!MessageFilter::unread_backlog(5).matches(&status));
        assert!(MessageFilter::all().matches(&status));
    }

    #[test]
    fn test_unsaved_messages_need_opt_in() {
        let mut unsaved = base();
        unsaved.saved = false;
        assert!(!MessageFilter::all().matches(&unsaved));
        assert!(MessageFilter::all().with_unsaved(true).matches(&unsaved));
    }

    #[test]
    fn test_only_unread_and_downloaded() {
        let read = base().outbound();
        assert!(!MessageFilter::all().only_unread(true).matches(&read));
        assert!(MessageFilter::all().only_unread(true).matches(&base()));

        let mut pending = base();
        pending.downloaded = false;
        assert!(!MessageFilter::all().only_downloaded(true).matches(&pending));
    }

    #[test]
    fn test_type_restrictions() {
        let image = base().with_type(MessageType::Image);
        let filter = MessageFilter::all().with_types(vec![MessageType::Image, MessageType::Video]);
        assert!(filter.matches(&image));
        assert!(!filter.matches(&base()));
        assert!(MessageFilter::all().with_types(Vec::new()).matches(&base()));

        let mut pdf = base();
        pdf.content_type = 3;
        assert!(MessageFilter::all().with_content_types(vec![3]).matches(&pdf));
        assert!(!MessageFilter::all().with_content_types(vec![4]).matches(&pdf));
    }

    #[test]
    fn test_display_tag_restriction() {
        let filter = MessageFilter::all().with_display_tags(DisplayTags::STARRED);
        assert!(!filter.matches(&base()));
        assert!(filter.matches(&base().starred()));
    }
}
