use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use convoview::model::{Message, ReceiverId};
use convoview::store::{MessageStore, SqliteMessageStore};
use convoview::view::CalendarZone;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const CONTACT: &str = "ECHOECHO";

#[allow(dead_code)]
pub fn create_temp_store() -> (SqliteMessageStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("messages.db");
    let store =
        SqliteMessageStore::new_with_path(db_path).expect("failed to create sqlite store with path");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

#[allow(dead_code)]
pub fn utc() -> CalendarZone {
    CalendarZone::Fixed(FixedOffset::east_opt(0).expect("zero offset"))
}

#[allow(dead_code)]
pub fn chat() -> ReceiverId {
    ReceiverId::contact(CONTACT)
}

/// Inserts `per_day` read messages on each of `days` consecutive days
/// starting 2024-03-01, returning the number stored
#[allow(dead_code)]
pub fn seed_history(store: &dyn MessageStore, days: u32, per_day: u32) -> usize {
    let mut stored = 0;
    for day in 0..days {
        for slot in 0..per_day {
            let mut message = Message::text(
                chat(),
                at(2024, 3, 1 + day, 8, slot),
                format!("day {} message {}", day + 1, slot + 1),
            );
            message.read = true;
            store.insert(&message).expect("failed to insert message");
            stored += 1;
        }
    }
    stored
}
