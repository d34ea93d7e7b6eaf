use std::sync::Arc;

use colored::Colorize;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::conversation::{ConversationController, ConversationOptions};
use crate::error::Result;
use crate::model::{Receiver, ReceiverId};

/// Handle the clear command
pub async fn run_clear(config: Config, receiver: ReceiverId) -> Result<()> {
    let store = Arc::new(super::open_store(&config)?);
    let label = receiver.to_string();
    let controller = ConversationController::new(
        store,
        Arc::new(Receiver::new(receiver)),
        ConversationOptions::from_config(&config),
        Arc::new(SystemClock),
    );

    let deleted = controller.empty_chat().await?;
    controller.close();

    if deleted == 0 {
        println!("{}", format!("Conversation {} is already empty.", label).yellow());
    } else {
        println!(
            "{}",
            format!("Deleted {} messages from {}", deleted, label).green()
        );
    }
    Ok(())
}
