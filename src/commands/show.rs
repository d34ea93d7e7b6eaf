use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::conversation::{ConversationController, ConversationOptions};
use crate::error::Result;
use crate::model::{DisplayTags, Receiver, ReceiverId};
use crate::render::{self, RenderedLine};
use crate::store::{MessageFilter, MessageStore};
use crate::view::{CalendarZone, ConversationView};

/// What part of a conversation to show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowOptions {
    /// Older pages to load after the initial one
    pub pages: usize,
    pub all: bool,
    pub starred: bool,
}

/// Handle the show command
pub async fn run_show(config: Config, receiver: ReceiverId, show: ShowOptions) -> Result<()> {
    let store: Arc<dyn MessageStore> = Arc::new(super::open_store(&config)?);
    let options = ConversationOptions::from_config(&config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (lines, has_more) = if show.starred {
        let view = starred_view(store, receiver, options.zone, clock).await?;
        (render::render_view(&view, None), false)
    } else {
        let controller = ConversationController::new(
            store,
            Arc::new(Receiver::new(receiver)),
            options,
            clock,
        );
        let lines = conversation_lines(&controller, show).await?;
        controller.close();
        (lines, controller.has_more())
    };

    if lines.is_empty() {
        println!("{}", "No messages in this conversation.".yellow());
        return Ok(());
    }
    render::print_lines(&lines);
    if has_more {
        println!();
        println!(
            "Older messages available, use {} or {} to see them.",
            "--pages <N>".cyan(),
            "--all".cyan()
        );
    }
    Ok(())
}

/// Opens the conversation, loads what `show` asks for and renders it
pub async fn conversation_lines(
    controller: &ConversationController,
    show: ShowOptions,
) -> Result<Vec<RenderedLine>> {
    controller.open().await?;
    if show.all {
        controller.load_all().await?;
    } else {
        for _ in 0..show.pages {
            if !controller.has_more() {
                break;
            }
            controller.load_older().await?;
        }
    }
    let first_unread = controller.first_unread();
    Ok(controller.with_view(|view| render::render_view(view, first_unread)))
}

/// View holding only the starred messages of `receiver`
pub async fn starred_view(
    store: Arc<dyn MessageStore>,
    receiver: ReceiverId,
    zone: CalendarZone,
    clock: Arc<dyn Clock>,
) -> Result<ConversationView> {
    let filter = MessageFilter::all().with_display_tags(DisplayTags::STARRED);
    let messages = tokio::task::spawn_blocking(move || {
        store.messages_for_receiver(&receiver, &filter)
    })
    .await
    .context("starred messages task failed")??;

    let mut view = ConversationView::new(zone, clock);
    view.insert_page(messages.into_iter().map(Arc::new).collect(), false, true);
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::Message;
    use crate::store::MemoryMessageStore;
    use crate::test_utils::{at, utc, TEST_CONTACT};
    use tempfile::TempDir;

    fn chat() -> ReceiverId {
        ReceiverId::contact(TEST_CONTACT)
    }

    fn store() -> Arc<MemoryMessageStore> {
        let messages = (0..6u32).map(|i| {
            let m = Message::text(chat(), at(2024, 1, 1 + i / 3, 9 + i), format!("#{}", i + 1))
                .outbound();
            if i % 2 == 0 {
                m.starred()
            } else {
                m
            }
        });
        Arc::new(MemoryMessageStore::with_messages(messages).unwrap())
    }

    #[tokio::test]
    async fn test_starred_view_only_holds_starred() {
        let clock = Arc::new(ManualClock::new(at(2024, 2, 1, 0)));
        let view = starred_view(store(), chat(), utc(), clock).await.unwrap();
        let ids: Vec<_> = view.messages().map(|m| m.id).collect();
        assert_eq!(ids, [1, 3, 5]);
        assert!(view.check_invariants().is_ok());
    }

    #[tokio::test]
    async fn test_conversation_lines_loads_requested_pages() {
        let controller = ConversationController::new(
            store(),
            Arc::new(Receiver::new(chat())),
            ConversationOptions {
                page_size: 2,
                mark_read_on_open: true,
                zone: utc(),
            },
            Arc::new(ManualClock::new(at(2024, 2, 1, 0))),
        );
        let show = ShowOptions {
            pages: 1,
            ..Default::default()
        };

        let lines = conversation_lines(&controller, show).await.unwrap();
        let messages = lines
            .iter()
            .filter(|l| l.kind == render::LineKind::Outbound)
            .count();
        assert_eq!(messages, 4);
        assert!(controller.has_more());
    }

    #[tokio::test]
    async fn test_run_show_on_empty_database() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.db_path = Some(dir.path().join("m.db").to_string_lossy().to_string());

        run_show(config, chat(), ShowOptions::default()).await.unwrap();
    }
}
