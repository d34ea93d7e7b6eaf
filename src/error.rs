//! Error types for Convoview
//!
//! This module defines the error types used by the collaborators around the
//! conversation view, using `thiserror` for ergonomic error handling. The
//! view itself never fails; everything here originates in configuration,
//! storage, or the controller's lifecycle.

use thiserror::Error;

/// Main error type for Convoview operations
#[derive(Error, Debug)]
pub enum ConvoviewError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Message store errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A receiver could not be resolved from the given arguments
    #[error("Invalid receiver: {0}")]
    InvalidReceiver(String),

    /// Import file could not be turned into messages
    #[error("Import error: {0}")]
    Import(String),

    /// The conversation was closed while an operation was in flight
    #[error("Conversation closed: {0}")]
    ConversationClosed(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Convoview operations
///
/// Uses `anyhow::Error` so callers can attach context while propagating.
pub type Result<T> = anyhow::Result<T>;
