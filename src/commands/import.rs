use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use crate::config::Config;
use crate::error::{ConvoviewError, Result};
use crate::model::Message;
use crate::store::MessageStore;

/// Outcome of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Messages the store refused, e.g. duplicate ids
    pub skipped: usize,
}

/// Handle the import command
pub fn run_import(config: &Config, file: &Path) -> Result<()> {
    let store = super::open_store(config)?;
    let messages = read_messages(file)?;
    tracing::info!("Importing {} messages from {}", messages.len(), file.display());

    let report = import_messages(&store, &messages);

    println!(
        "{}",
        format!(
            "Imported {} messages into {}",
            report.imported,
            store.db_path().display()
        )
        .green()
    );
    if report.skipped > 0 {
        println!(
            "{}",
            format!("Skipped {} messages, see log for details", report.skipped).yellow()
        );
    }
    Ok(())
}

/// Reads a JSON array of messages
///
/// # Errors
///
/// Returns error if the file cannot be read or is not a message array
pub fn read_messages(file: &Path) -> Result<Vec<Message>> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&contents)
        .map_err(|e| ConvoviewError::Import(format!("{}: {}", file.display(), e)).into())
}

/// Inserts every message, skipping the ones the store rejects
pub fn import_messages(store: &dyn MessageStore, messages: &[Message]) -> ImportReport {
    let mut report = ImportReport::default();
    for message in messages {
        match store.insert(message) {
            Ok(id) => {
                tracing::debug!(message_id = id, receiver = %message.receiver, "Imported message");
                report.imported += 1;
            }
            Err(e) => {
                tracing::warn!("Skipping message {}: {:#}", message.id, e);
                report.skipped += 1;
            }
        }
    }
    report
}
