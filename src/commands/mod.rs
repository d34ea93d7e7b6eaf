/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three command modules:

- `import` - Load messages from a JSON file into the store
- `show`   - Open a conversation and print it
- `clear`  - Delete every message of a conversation
*/

use crate::config::Config;
use crate::error::Result;
use crate::store::SqliteMessageStore;

pub mod clear;
pub mod import;
pub mod show;

/// Opens the message store selected by the configuration
///
/// Falls back to the default location (or `CONVOVIEW_DB`) when no path is
/// configured.
///
/// # Errors
///
/// Returns error if the database cannot be created or migrated
pub fn open_store(config: &Config) -> Result<SqliteMessageStore> {
    match &config.storage.db_path {
        Some(path) => {
            tracing::debug!("Using message database at {}", path);
            SqliteMessageStore::new_with_path(path)
        }
        None => SqliteMessageStore::new(),
    }
}
