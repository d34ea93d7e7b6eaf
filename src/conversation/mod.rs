//! Open conversations
//!
//! A [`ConversationController`] ties one [`ConversationView`](crate::view::ConversationView)
//! to its message store, its receiver and its read receipts, and applies
//! store events to the view.

pub mod controller;
pub mod read_tracker;

pub use controller::{ConversationController, LiveOutcome, OpenSummary, PageOutcome, SoundCue};
pub use read_tracker::ReadTracker;

use crate::config::Config;
use crate::view::CalendarZone;

/// Settings of one open conversation
#[derive(Debug, Clone)]
pub struct ConversationOptions {
    /// Messages requested per page
    pub page_size: usize,
    /// Mark the receiver's unread messages read after every page load
    pub mark_read_on_open: bool,
    /// Zone used for calendar days
    pub zone: CalendarZone,
}

impl ConversationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.view.page_size,
            mark_read_on_open: config.read.mark_read_on_open,
            zone: config.calendar_zone(),
        }
    }
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
