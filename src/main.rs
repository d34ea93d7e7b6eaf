//! Convoview - conversation list viewer
//!
#![doc = "Main entry point for the Convoview command-line tool."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use convoview::cli::{Cli, Commands};
use convoview::commands;
use convoview::commands::show::ShowOptions;
use convoview::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Import { file } => {
            tracing::info!("Importing messages from {}", file.display());
            commands::import::run_import(&config, &file)?;
            Ok(())
        }
        Commands::Show {
            target,
            pages,
            all,
            starred,
        } => {
            let receiver = target.receiver_id()?;
            tracing::debug!("Showing conversation {}", receiver);
            let show = ShowOptions {
                pages,
                all,
                starred,
            };
            commands::show::run_show(config, receiver, show).await?;
            Ok(())
        }
        Commands::Clear { target } => {
            let receiver = target.receiver_id()?;
            tracing::info!("Emptying conversation {}", receiver);
            commands::clear::run_clear(config, receiver).await?;
            Ok(())
        }
    }
}

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over the verbose flag.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "convoview=debug"
    } else {
        "convoview=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
