//! Command-line interface definition for Convoview
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to import messages, show a conversation and empty it.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{ConvoviewError, Result};
use crate::model::ReceiverId;

/// Convoview - conversation list viewer
///
/// Renders one conversation of a message store the way a messenger shows
/// it: oldest first, paged from the newest end, with a header for every
/// calendar day.
#[derive(Parser, Debug, Clone)]
#[command(name = "convoview")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the message database path
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Convoview
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Import messages from a JSON array into the store
    Import {
        /// JSON file holding an array of messages
        file: PathBuf,
    },

    /// Show a conversation
    Show {
        #[command(flatten)]
        target: ReceiverArgs,

        /// Number of older pages to load after the initial page
        #[arg(short, long, default_value_t = 0)]
        pages: usize,

        /// Load the whole conversation
        #[arg(short, long, conflicts_with = "pages")]
        all: bool,

        /// Only show starred messages
        #[arg(long)]
        starred: bool,
    },

    /// Delete every message of a conversation
    Clear {
        #[command(flatten)]
        target: ReceiverArgs,
    },
}

/// Selects exactly one conversation
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ReceiverArgs {
    /// Contact identity
    #[arg(long)]
    pub contact: Option<String>,

    /// Group id
    #[arg(long)]
    pub group: Option<i64>,

    /// Distribution list id
    #[arg(long = "list")]
    pub distribution_list: Option<i64>,
}

impl ReceiverArgs {
    /// Receiver selected by the arguments
    ///
    /// # Errors
    ///
    /// Returns error if no receiver was given or the contact identity is blank
    pub fn receiver_id(&self) -> Result<ReceiverId> {
        match (&self.contact, self.group, self.distribution_list) {
            (Some(identity), None, None) if !identity.trim().is_empty() => {
                Ok(ReceiverId::contact(identity.trim()))
            }
            (None, Some(id), None) => Ok(ReceiverId::group(id)),
            (None, None, Some(id)) => Ok(ReceiverId::distribution_list(id)),
            _ => Err(ConvoviewError::InvalidReceiver(
                "exactly one of --contact, --group or --list is required".to_string(),
            )
            .into()),
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_contact() {
        let cli = Cli::try_parse_from(["convoview", "show", "--contact", "ECHOECHO", "-p", "2"])
            .unwrap();
        match cli.command {
            Commands::Show {
                target, pages, all, ..
            } => {
                assert_eq!(target.receiver_id().unwrap(), ReceiverId::contact("ECHOECHO"));
                assert_eq!(pages, 2);
                assert!(!all);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_exactly_one_receiver() {
        assert!(Cli::try_parse_from(["convoview", "show"]).is_err());
        assert!(
            Cli::try_parse_from(["convoview", "show", "--group", "1", "--list", "2"]).is_err()
        );
    }

    #[test]
    fn test_parse_clear_list() {
        let cli = Cli::try_parse_from(["convoview", "clear", "--list", "9"]).unwrap();
        match cli.command {
            Commands::Clear { target } => {
                assert_eq!(target.receiver_id().unwrap(), ReceiverId::distribution_list(9));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_all_conflicts_with_pages() {
        assert!(
            Cli::try_parse_from(["convoview", "show", "--group", "1", "--all", "--pages", "3"])
                .is_err()
        );
    }

    #[test]
    fn test_blank_contact_is_rejected() {
        let args = ReceiverArgs {
            contact: Some("  ".to_string()),
            group: None,
            distribution_list: None,
        };
        assert!(args.receiver_id().is_err());
    }

    #[test]
    fn test_global_storage_path() {
        let cli = Cli::try_parse_from([
            "convoview",
            "--storage-path",
            "/tmp/m.db",
            "import",
            "m.json",
        ])
        .unwrap();
        assert_eq!(cli.storage_path.as_deref(), Some("/tmp/m.db"));
    }
}
