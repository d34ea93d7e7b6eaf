use anyhow::Context;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConvoviewError, Result};
use crate::model::{DisplayTags, Message, MessageId, ReceiverId};

use super::{MessageFilter, MessageStore};

/// Environment variable overriding the database location
pub const DB_PATH_ENV: &str = "CONVOVIEW_DB";

const SELECT_COLUMNS: &str = "id, api_message_id, receiver_kind, receiver_key, created_at, outbox,
    message_type, state, is_read, is_saved, is_downloaded, content_type, body, display_tags";

/// Message store backed by a SQLite file
///
/// Opens a fresh connection per call, so the store can be shared across
/// blocking workers without further locking.
#[derive(Debug, Clone)]
pub struct SqliteMessageStore {
    db_path: PathBuf,
}

impl SqliteMessageStore {
    /// Create a store in the user's data directory
    ///
    /// Honors the `CONVOVIEW_DB` environment variable.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var(DB_PATH_ENV) {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("org", "convoview", "convoview")
            .ok_or_else(|| ConvoviewError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("messages.db"))
    }

    /// Create a store using the given database file
    ///
    /// # Examples
    ///
    /// ```
    /// use convoview::store::SqliteMessageStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SqliteMessageStore::new_with_path(dir.path().join("m.db")).unwrap();
    /// assert!(store.db_path().ends_with("m.db"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| ConvoviewError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| ConvoviewError::Storage(e.to_string()).into())
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                api_message_id TEXT,
                receiver_kind TEXT NOT NULL,
                receiver_key TEXT NOT NULL,
                created_at TEXT,
                outbox INTEGER NOT NULL DEFAULT 0,
                message_type TEXT NOT NULL,
                state TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                is_saved INTEGER NOT NULL DEFAULT 1,
                is_downloaded INTEGER NOT NULL DEFAULT 1,
                content_type INTEGER NOT NULL DEFAULT 0,
                body TEXT,
                display_tags INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_messages_receiver
                ON messages (receiver_kind, receiver_key, id);",
        )
        .context("Failed to create tables")
        .map_err(|e| ConvoviewError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Raw column values of one `messages` row
struct StoredRow {
    id: i64,
    api_message_id: Option<String>,
    receiver_kind: String,
    receiver_key: String,
    created_at: Option<String>,
    outbox: bool,
    message_type: String,
    state: String,
    read: bool,
    saved: bool,
    downloaded: bool,
    content_type: i32,
    body: Option<String>,
    display_tags: u32,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            api_message_id: row.get(1)?,
            receiver_kind: row.get(2)?,
            receiver_key: row.get(3)?,
            created_at: row.get(4)?,
            outbox: row.get(5)?,
            message_type: row.get(6)?,
            state: row.get(7)?,
            read: row.get(8)?,
            saved: row.get(9)?,
            downloaded: row.get(10)?,
            content_type: row.get(11)?,
            body: row.get(12)?,
            display_tags: row.get(13)?,
        })
    }

    fn into_message(self) -> Result<Message> {
        let receiver = ReceiverId::from_parts(&self.receiver_kind, &self.receiver_key)
            .ok_or_else(|| {
                ConvoviewError::Storage(format!(
                    "message {} has unknown receiver {}:{}",
                    self.id, self.receiver_kind, self.receiver_key
                ))
            })?;

        // an unparsable timestamp surfaces as a missing one
        let created_at = self.created_at.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| tracing::warn!(message_id = self.id, "Bad created_at {}: {}", raw, e))
                .ok()
        });

        Ok(Message {
            id: self.id,
            api_message_id: self.api_message_id,
            receiver,
            created_at,
            outbox: self.outbox,
            message_type: enum_from_sql(&self.message_type)?,
            state: enum_from_sql(&self.state)?,
            read: self.read,
            saved: self.saved,
            downloaded: self.downloaded,
            content_type: self.content_type,
            body: self.body,
            display_tags: DisplayTags::from_bits(self.display_tags),
        })
    }
}

fn enum_to_sql<T: Serialize>(value: &T) -> Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(ConvoviewError::Storage(format!("unexpected enum encoding {}", other)).into()),
    }
}

fn enum_from_sql<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .with_context(|| format!("Unknown stored value '{}'", raw))
        .map_err(|e| ConvoviewError::Storage(e.to_string()).into())
}

impl MessageStore for SqliteMessageStore {
    fn messages_for_receiver(
        &self,
        receiver: &ReceiverId,
        filter: &MessageFilter,
    ) -> Result<Vec<Message>> {
        let conn = self.open()?;
        let query = format!(
            "SELECT {} FROM messages
            WHERE receiver_kind = ?1 AND receiver_key = ?2 AND id < ?3
            ORDER BY id DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&query)
            .context("Failed to prepare statement")
            .map_err(|e| ConvoviewError::Storage(e.to_string()))?;

        let below = filter.page_reference_id.unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(
                params![receiver.kind(), receiver.key(), below],
                StoredRow::from_row,
            )
            .context("Failed to query messages")
            .map_err(|e| ConvoviewError::Storage(e.to_string()))?;

        let limit = filter.page_size.unwrap_or(usize::MAX);
        let mut messages = Vec::new();
        for row in rows {
            if messages.len() >= limit {
                break;
            }
            let row = row
                .context("Failed to read message row")
                .map_err(|e| ConvoviewError::Storage(e.to_string()))?;
            let id = row.id;
            let message = match row.into_message() {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(message_id = id, "Skipping unreadable stored message: {:#}", e);
                    continue;
                }
            };
            if filter.matches(&message) {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    fn unread_count(&self, receiver: &ReceiverId) -> Result<usize> {
        let conn = self.open()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages
                WHERE receiver_kind = ?1 AND receiver_key = ?2 AND outbox = 0 AND is_read = 0",
                params![receiver.kind(), receiver.key()],
                |row| row.get(0),
            )
            .context("Failed to count unread messages")
            .map_err(|e| ConvoviewError::Storage(e.to_string()))?;
        Ok(count as usize)
    }

    fn mark_as_read(&self, ids: &[MessageId]) -> Result<usize> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| ConvoviewError::Storage(e.to_string()))?;

        let mut changed = 0;
        for id in ids {
            changed += tx
                .execute(
                    "UPDATE messages SET is_read = 1 WHERE id = ?1 AND is_read = 0",
                    params![id],
                )
                .context("Failed to mark message read")
                .map_err(|e| ConvoviewError::Storage(e.to_string()))?;
        }

        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| ConvoviewError::Storage(e.to_string()))?;
        Ok(changed)
    }

    fn insert(&self, message: &Message) -> Result<MessageId> {
        let conn = self.open()?;
        let id = (message.id != 0).then_some(message.id);
        let created_at = message.created_at.map(|dt| dt.to_rfc3339());

        conn.execute(
            "INSERT INTO messages (id, api_message_id, receiver_kind, receiver_key, created_at,
                outbox, message_type, state, is_read, is_saved, is_downloaded, content_type,
                body, display_tags)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                message.api_message_id,
                message.receiver.kind(),
                message.receiver.key(),
                created_at,
                message.outbox,
                enum_to_sql(&message.message_type)?,
                enum_to_sql(&message.state)?,
                message.read,
                message.saved,
                message.downloaded,
                message.content_type,
                message.body,
                message.display_tags.bits(),
            ],
        )
        .context("Failed to insert message")
        .map_err(|e| ConvoviewError::Storage(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn delete_for_receiver(&self, receiver: &ReceiverId) -> Result<usize> {
        let conn = self.open()?;
        let deleted = conn
            .execute(
                "DELETE FROM messages WHERE receiver_kind = ?1 AND receiver_key = ?2",
                params![receiver.kind(), receiver.key()],
            )
            .context("Failed to delete messages")
            .map_err(|e| ConvoviewError::Storage(e.to_string()))?;
        Ok(deleted)
    }
}
