//! Configuration management for Convoview
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ConvoviewError, Result};
use crate::view::CalendarZone;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for `view.page_size`
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Largest UTC offset in use anywhere (UTC+14)
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Main configuration structure for Convoview
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Conversation view behavior
    #[serde(default)]
    pub view: ViewConfig,
    /// Message store location
    #[serde(default)]
    pub storage: StorageConfig,
    /// Read receipt behavior
    #[serde(default)]
    pub read: ReadConfig,
}

/// Conversation view configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Messages requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Offset used to split messages into calendar days
    ///
    /// When unset, the host's current local offset is used.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

fn default_page_size() -> usize {
    100
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            utc_offset_minutes: None,
        }
    }
}

/// Message store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// SQLite file; defaults to the platform data directory
    #[serde(default)]
    pub db_path: Option<String>,
}

/// Read receipt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadConfig {
    /// Mark the receiver's unread messages read when a conversation opens
    #[serde(default = "default_mark_read_on_open")]
    pub mark_read_on_open: bool,
}

fn default_mark_read_on_open() -> bool {
    true
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            mark_read_on_open: default_mark_read_on_open(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConvoviewError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ConvoviewError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(page_size) = std::env::var("CONVOVIEW_PAGE_SIZE") {
            if let Ok(value) = page_size.parse() {
                self.view.page_size = value;
            } else {
                tracing::warn!("Invalid CONVOVIEW_PAGE_SIZE: {}", page_size);
            }
        }

        if let Ok(offset) = std::env::var("CONVOVIEW_UTC_OFFSET_MINUTES") {
            if let Ok(value) = offset.parse() {
                self.view.utc_offset_minutes = Some(value);
            } else {
                tracing::warn!("Invalid CONVOVIEW_UTC_OFFSET_MINUTES: {}", offset);
            }
        }

        if let Ok(db_path) = std::env::var(crate::store::sqlite::DB_PATH_ENV) {
            self.storage.db_path = Some(db_path);
        }

        if let Ok(mark_read) = std::env::var("CONVOVIEW_MARK_READ_ON_OPEN") {
            if let Ok(value) = mark_read.parse() {
                self.read.mark_read_on_open = value;
            } else {
                tracing::warn!("Invalid CONVOVIEW_MARK_READ_ON_OPEN: {}", mark_read);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if let Some(db_path) = &cli.storage_path {
            self.storage.db_path = Some(db_path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.view.page_size == 0 {
            return Err(
                ConvoviewError::Config("view.page_size must be greater than 0".to_string()).into(),
            );
        }

        if self.view.page_size > MAX_PAGE_SIZE {
            return Err(ConvoviewError::Config(format!(
                "view.page_size must be less than or equal to {}",
                MAX_PAGE_SIZE
            ))
            .into());
        }

        if let Some(minutes) = self.view.utc_offset_minutes {
            if minutes.abs() > MAX_UTC_OFFSET_MINUTES {
                return Err(ConvoviewError::Config(format!(
                    "view.utc_offset_minutes must be within +/-{}",
                    MAX_UTC_OFFSET_MINUTES
                ))
                .into());
            }
        }

        if matches!(&self.storage.db_path, Some(p) if p.trim().is_empty()) {
            return Err(
                ConvoviewError::Config("storage.db_path cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }

    /// Zone used for calendar days
    ///
    /// Falls back to the host time zone, daylight saving included, when no
    /// offset is configured or the configured one is out of range.
    pub fn calendar_zone(&self) -> CalendarZone {
        self.view
            .utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .map_or(CalendarZone::Local, CalendarZone::Fixed)
    }
}
