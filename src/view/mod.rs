//! Conversation view with date separators and backward pagination
//!
//! A [`ConversationView`] is the ordered, in-memory list shown for one open
//! conversation. Index 0 is the oldest entry. Pages of older messages are
//! merged in at the front, live messages are appended at the back, and a
//! [`DateSeparator`] sits in front of every run of messages that share a
//! calendar day.
//!
//! # Separator labeling
//!
//! The topmost separator carries the date of the oldest message. While a
//! page is merged, a boundary separator is labeled with the running date
//! that was current *before* the boundary was crossed, which is the date of
//! the run that follows the separator in display order:
//!
//! ```text
//! [Sep(01-01), m1@01-01, m2@01-01, Sep(01-02), m3@01-02]
//! ```
//!
//! # Invariants
//!
//! - no two adjacent entries are separators
//! - entry 0 is a separator as soon as any message is shown
//! - messages of the same calendar day are never split by a separator
//! - the view never ends with a separator

pub mod entry;

pub use entry::{calendar_day, CalendarZone, DateSeparator, ViewEntry};

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use crate::clock::Clock;
use crate::model::{Message, MessageId, MessageReceiver};

/// Marker for requesting the next older page: the id of the oldest message
/// loaded so far
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageCursor(MessageId);

impl PageCursor {
    pub fn new(id: MessageId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> MessageId {
        self.0
    }
}

/// Loading state of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Created, nothing requested yet
    Empty,
    /// Initial page requested, not merged yet
    LoadingInitial,
    /// At least one page merged
    Ready,
}

/// Ordered view over one conversation's messages
pub struct ConversationView {
    entries: Vec<ViewEntry>,
    zone: CalendarZone,
    clock: Arc<dyn Clock>,
    initialized_at: Option<DateTime<Utc>>,
    page_cursor: Option<PageCursor>,
    state: ViewState,
}

impl std::fmt::Debug for ConversationView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationView")
            .field("entries", &self.entries.len())
            .field("zone", &self.zone)
            .field("initialized_at", &self.initialized_at)
            .field("page_cursor", &self.page_cursor)
            .field("state", &self.state)
            .finish()
    }
}

impl ConversationView {
    /// Creates an empty view
    ///
    /// # Arguments
    ///
    /// * `zone` - Time zone used to decide which calendar day a message is on
    /// * `clock` - Source of "now" for the initialized-at marker and live separators
    ///
    /// # Examples
    ///
    /// ```
    /// use convoview::clock::SystemClock;
    /// use convoview::view::{CalendarZone, ConversationView, ViewState};
    /// use std::sync::Arc;
    ///
    /// let view = ConversationView::new(CalendarZone::Local, Arc::new(SystemClock));
    /// assert!(view.is_empty());
    /// assert_eq!(view.state(), ViewState::Empty);
    /// ```
    pub fn new(zone: impl Into<CalendarZone>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Vec::new(),
            zone: zone.into(),
            clock,
            initialized_at: None,
            page_cursor: None,
            state: ViewState::Empty,
        }
    }

    /// Merges a page of messages in at the front of the view
    ///
    /// # Arguments
    ///
    /// * `messages` - Page from the store; oldest first if `oldest_first`, newest first otherwise
    /// * `oldest_first` - Ordering of `messages`
    /// * `replace_existing` - Clear the view before merging (full reload, search)
    ///
    /// # Returns
    ///
    /// The growth of the view length, separators included. A replacing load
    /// that shrinks the view reports zero.
    ///
    /// Messages without a creation time are skipped.
    pub fn insert_page(
        &mut self,
        messages: Vec<Arc<Message>>,
        oldest_first: bool,
        replace_existing: bool,
    ) -> usize {
        let initial_len = self.entries.len();

        let mut running = DateTime::<Utc>::default();
        if replace_existing {
            self.entries.clear();
        } else {
            // the topmost separator is regenerated below
            match self.entries.first() {
                Some(ViewEntry::DateSeparator(separator)) => {
                    running = separator.date;
                    self.entries.remove(0);
                }
                Some(ViewEntry::Message(top)) => {
                    if let Some(created_at) = top.created_at {
                        running = created_at;
                    }
                }
                None => {}
            }
        }

        // oldest message of the page, in store terms
        let oldest_id = if oldest_first {
            messages.first().map(|m| m.id)
        } else {
            messages.last().map(|m| m.id)
        };

        let newest_to_oldest: Box<dyn Iterator<Item = Arc<Message>>> = if oldest_first {
            Box::new(messages.into_iter().rev())
        } else {
            Box::new(messages.into_iter())
        };

        // built back to front, reversed once before splicing in
        let mut prefix: Vec<ViewEntry> = Vec::new();
        let mut skipped = 0usize;
        for message in newest_to_oldest {
            let Some(created_at) = message.created_at else {
                skipped += 1;
                tracing::warn!(
                    message_id = message.id,
                    "Skipping message without creation time"
                );
                continue;
            };

            if self.day(created_at) != self.day(running) {
                if !prefix.is_empty() || !self.entries.is_empty() {
                    prefix.push(ViewEntry::separator(running));
                }
                running = created_at;
            }
            prefix.push(ViewEntry::Message(message));
        }
        prefix.reverse();
        self.entries.splice(0..0, prefix);

        if let Some(top) = self.entries.first() {
            if !top.is_separator() {
                if let Some(date) = top.timestamp() {
                    self.entries.insert(0, ViewEntry::separator(date));
                }
            }
        }

        if let Some(id) = oldest_id {
            self.page_cursor = Some(PageCursor(id));
        }
        self.initialized_at = Some(self.clock.now());
        self.state = ViewState::Ready;

        let inserted = self.entries.len().saturating_sub(initial_len);
        tracing::debug!(
            inserted,
            skipped,
            total = self.entries.len(),
            replace_existing,
            "Merged page into conversation view"
        );
        inserted
    }

    /// Appends a message that arrived while the conversation is open
    ///
    /// Rejects messages without a creation time, messages created before
    /// the view was last initialized (already covered by a page), and
    /// messages that do not belong to `receiver`.
    ///
    /// # Returns
    ///
    /// True if the message was appended
    pub fn append_live(&mut self, message: Arc<Message>, receiver: &dyn MessageReceiver) -> bool {
        let Some(created_at) = message.created_at else {
            tracing::warn!(message_id = message.id, "Live message without creation time");
            return false;
        };

        if let Some(initialized_at) = self.initialized_at {
            if created_at < initialized_at {
                tracing::debug!(
                    message_id = message.id,
                    "Live message predates view initialization"
                );
                return false;
            }
        }

        if !receiver.belongs_to_me(&message) {
            return false;
        }

        let now = self.clock.now();
        let newest = self
            .entries
            .last()
            .and_then(ViewEntry::timestamp)
            .unwrap_or_default();
        if self.day(newest) != self.day(now) {
            self.entries.push(ViewEntry::separator(now));
        }
        self.entries.push(ViewEntry::Message(message));

        if self.state == ViewState::Empty {
            self.state = ViewState::Ready;
        }
        true
    }

    /// Replaces shown messages with updated versions, matched by id
    ///
    /// An entry is only swapped when the update is a different allocation
    /// than the one already shown. Updates for messages not in the view and
    /// updates with id `0` are ignored.
    ///
    /// # Returns
    ///
    /// The updates that replaced an entry
    pub fn replace(&mut self, updated: &[Arc<Message>]) -> Vec<Arc<Message>> {
        let mut replaced = Vec::new();
        for update in updated {
            if update.id == 0 {
                continue;
            }
            let Some(position) = self.position_of(update.id) else {
                continue;
            };
            let same = matches!(
                &self.entries[position],
                ViewEntry::Message(current) if Arc::ptr_eq(current, update)
            );
            if !same {
                self.entries[position] = ViewEntry::Message(Arc::clone(update));
                replaced.push(Arc::clone(update));
            }
        }
        replaced
    }

    /// Removes the messages with the given ids
    ///
    /// Separators left without a following message are dropped as well.
    ///
    /// # Returns
    ///
    /// Number of messages removed
    pub fn remove(&mut self, ids: &[MessageId]) -> usize {
        let ids: HashSet<MessageId> = ids.iter().copied().collect();
        let before = self.message_count();
        self.entries
            .retain(|entry| !matches!(entry.message_id(), Some(id) if ids.contains(&id)));
        let removed = before - self.message_count();
        if removed > 0 {
            self.prune_orphan_separators();
        }
        removed
    }

    /// Drops every entry and the page cursor
    pub fn clear(&mut self) {
        self.entries.clear();
        self.page_cursor = None;
    }

    /// Marks the initial page as requested
    pub fn begin_initial_load(&mut self) {
        if self.state == ViewState::Empty {
            self.state = ViewState::LoadingInitial;
        }
    }

    fn prune_orphan_separators(&mut self) {
        let mut i = 0;
        while i < self.entries.len() {
            let orphan = self.entries[i].is_separator()
                && self
                    .entries
                    .get(i + 1)
                    .map_or(true, ViewEntry::is_separator);
            if orphan {
                self.entries.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn day(&self, at: DateTime<Utc>) -> NaiveDate {
        self.zone.day(at)
    }

    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Shown messages, oldest first
    pub fn messages(&self) -> impl Iterator<Item = &Arc<Message>> {
        self.entries.iter().filter_map(ViewEntry::as_message)
    }

    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    /// Index of the message with the given id
    pub fn position_of(&self, id: MessageId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.message_id() == Some(id))
    }

    /// Index of the message with the given protocol id
    pub fn position_of_api_message_id(&self, api_message_id: &str) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry
                .as_message()
                .and_then(|m| m.api_message_id.as_deref())
                == Some(api_message_id)
        })
    }

    /// Index of the oldest unread inbound message
    pub fn first_unread_position(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.as_message().map_or(false, |m| m.is_unread()))
    }

    pub fn page_cursor(&self) -> Option<PageCursor> {
        self.page_cursor
    }

    pub fn initialized_at(&self) -> Option<DateTime<Utc>> {
        self.initialized_at
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// Zone used for calendar days
    pub fn zone(&self) -> CalendarZone {
        self.zone
    }

    /// Verifies the separator invariants
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.entries.is_empty() {
            return Ok(());
        }
        if !self.entries[0].is_separator() {
            return Err("topmost entry is not a date separator".to_string());
        }
        if self.entries.last().map_or(false, ViewEntry::is_separator) {
            return Err("view ends with a date separator".to_string());
        }
        for (i, pair) in self.entries.windows(2).enumerate() {
            if pair[0].is_separator() && pair[1].is_separator() {
                return Err(format!("adjacent date separators at {} and {}", i, i + 1));
            }
        }
        for (i, triple) in self.entries.windows(3).enumerate() {
            if let (ViewEntry::Message(before), ViewEntry::DateSeparator(_), ViewEntry::Message(after)) =
                (&triple[0], &triple[1], &triple[2])
            {
                if let (Some(a), Some(b)) = (before.created_at, after.created_at) {
                    if self.day(a) == self.day(b) {
                        return Err(format!("same-day messages split by separator at {}", i + 1));
                    }
                }
            }
        }
        Ok(())
    }
}
