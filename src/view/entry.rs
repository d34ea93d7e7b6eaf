//! Entries of a conversation view

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::sync::Arc;

use crate::model::{Message, MessageId};

/// Synthetic header dividing messages of different calendar days
///
/// Never persisted; the view regenerates separators on every merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSeparator {
    pub date: DateTime<Utc>,
}

/// One row of a conversation view
#[derive(Debug, Clone)]
pub enum ViewEntry {
    Message(Arc<Message>),
    DateSeparator(DateSeparator),
}

impl ViewEntry {
    pub fn separator(date: DateTime<Utc>) -> Self {
        ViewEntry::DateSeparator(DateSeparator { date })
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, ViewEntry::DateSeparator(_))
    }

    pub fn as_message(&self) -> Option<&Arc<Message>> {
        match self {
            ViewEntry::Message(message) => Some(message),
            ViewEntry::DateSeparator(_) => None,
        }
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.as_message().map(|m| m.id)
    }

    /// Separator date or message creation time
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ViewEntry::Message(message) => message.created_at,
            ViewEntry::DateSeparator(separator) => Some(separator.date),
        }
    }
}

/// Time zone used to split messages into calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarZone {
    /// Host time zone, daylight saving included
    Local,
    /// Configured offset from UTC
    Fixed(FixedOffset),
}

impl CalendarZone {
    /// Calendar day of `at` in this zone
    pub fn day(&self, at: DateTime<Utc>) -> NaiveDate {
        match self {
            CalendarZone::Local => at.with_timezone(&chrono::Local).date_naive(),
            CalendarZone::Fixed(offset) => at.with_timezone(offset).date_naive(),
        }
    }

    /// Formats `at` as wall-clock time in this zone
    pub fn format(&self, at: DateTime<Utc>, fmt: &str) -> String {
        match self {
            CalendarZone::Local => at.with_timezone(&chrono::Local).format(fmt).to_string(),
            CalendarZone::Fixed(offset) => at.with_timezone(offset).format(fmt).to_string(),
        }
    }
}

impl From<FixedOffset> for CalendarZone {
    fn from(offset: FixedOffset) -> Self {
        CalendarZone::Fixed(offset)
    }
}

/// Calendar day of `at` as seen from `zone`
///
/// # Examples
///
/// ```
/// use convoview::view::{calendar_day, CalendarZone};
/// use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
///
/// let late = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
/// let cet = CalendarZone::Fixed(FixedOffset::east_opt(3600).unwrap());
/// assert_eq!(calendar_day(late, &cet), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
/// ```
pub fn calendar_day(at: DateTime<Utc>, zone: &CalendarZone) -> NaiveDate {
    zone.day(at)
}
