//! Test utilities for Convoview
//!
//! Shorthands for building timestamps, messages and temporary stores in
//! unit tests.

use crate::model::{Message, MessageId, ReceiverId};
use crate::store::SqliteMessageStore;
use crate::view::CalendarZone;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// Receiver used by [`message`]
pub const TEST_CONTACT: &str = "ECHOECHO";

/// UTC timestamp at the top of the given hour
pub fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid test timestamp")
}

/// Zero offset, so calendar days in tests are UTC days
pub fn utc() -> CalendarZone {
    CalendarZone::Fixed(FixedOffset::east_opt(0).expect("zero offset"))
}

/// Inbound text message for [`TEST_CONTACT`]
pub fn message(id: MessageId, created_at: DateTime<Utc>) -> Arc<Message> {
    Arc::new(
        Message::text(
            ReceiverId::contact(TEST_CONTACT),
            created_at,
            format!("message {}", id),
        )
        .with_id(id),
    )
}

/// SQLite store in a temporary directory
///
/// Returns the `TempDir` too so the caller keeps the directory alive.
pub fn temp_sqlite_store() -> (SqliteMessageStore, TempDir) {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let store = SqliteMessageStore::new_with_path(dir.path().join("messages.db"))
        .expect("Failed to create sqlite store");
    (store, dir)
}
