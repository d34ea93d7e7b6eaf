//! Conversation controller
//!
//! Fetches run on a blocking worker; their results are applied to the view
//! only if the conversation is still open at that point. The view lock is
//! never held across an `.await`.

use anyhow::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::{ConvoviewError, Result};
use crate::events::{MessageBus, MessageEvent};
use crate::model::{Message, MessageId, MessageReceiver, ReceiverId};
use crate::store::{MessageFilter, MessageStore};
use crate::view::ConversationView;

use super::{ConversationOptions, ReadTracker};

/// Result of opening a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSummary {
    /// Messages fetched from the store
    pub fetched: usize,
    /// Entries now in the view, separators included
    pub inserted: usize,
    /// Whether older messages may exist
    pub has_more: bool,
    /// Unread messages at open time
    pub unread_count: usize,
    /// Oldest unread inbound message, where the unread bar goes
    pub first_unread: Option<MessageId>,
}

/// Result of loading a page of older messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOutcome {
    pub fetched: usize,
    /// Growth of the view, separators included
    pub inserted: usize,
    pub has_more: bool,
}

/// Sound to play for a live message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    Sent,
    Received,
}

/// Result of offering a live message to the conversation
#[derive(Debug)]
pub struct LiveOutcome {
    pub accepted: bool,
    pub sound: Option<SoundCue>,
    /// Pending mark-as-read for the message, if one was dispatched
    pub read_receipt: Option<JoinHandle<()>>,
}

impl LiveOutcome {
    fn rejected() -> Self {
        Self {
            accepted: false,
            sound: None,
            read_receipt: None,
        }
    }
}

/// Controller of one open conversation
pub struct ConversationController {
    view: Mutex<ConversationView>,
    store: Arc<dyn MessageStore>,
    receiver: Arc<dyn MessageReceiver>,
    read: ReadTracker,
    options: ConversationOptions,
    liveness: CancellationToken,
    has_more: AtomicBool,
    first_unread: Mutex<Option<MessageId>>,
}

impl ConversationController {
    /// Creates a controller with an empty view
    ///
    /// # Arguments
    ///
    /// * `store` - Source of messages and target of read receipts
    /// * `receiver` - Owner of the conversation
    /// * `options` - Page size, read behavior and calendar zone
    /// * `clock` - Time source for the view
    pub fn new(
        store: Arc<dyn MessageStore>,
        receiver: Arc<dyn MessageReceiver>,
        options: ConversationOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let view = ConversationView::new(options.zone, clock);
        Self {
            view: Mutex::new(view),
            read: ReadTracker::new(Arc::clone(&store)),
            store,
            receiver,
            options,
            liveness: CancellationToken::new(),
            has_more: AtomicBool::new(false),
            first_unread: Mutex::new(None),
        }
    }

    /// Loads the initial page, replacing whatever the view shows
    ///
    /// If more messages are unread than fit on a page, the whole unread
    /// backlog is loaded instead so the unread bar is reachable.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the conversation was closed
    /// before the page could be applied
    pub async fn open(&self) -> Result<OpenSummary> {
        self.ensure_live("open")?;
        self.lock_view().begin_initial_load();

        let unread_count = self
            .blocking("unread count", |store, receiver| store.unread_count(receiver))
            .await?;

        let filter = if unread_count > self.options.page_size {
            tracing::debug!(unread_count, "Loading whole unread backlog");
            MessageFilter::unread_backlog(unread_count)
        } else {
            MessageFilter::page(self.options.page_size, None)
        };
        let requested = filter.page_size;

        let messages = self.fetch(filter).await?;
        self.ensure_live("open")?;

        let fetched = messages.len();
        let has_more = requested.map_or(false, |size| fetched >= size);
        let (inserted, first_unread) = {
            let mut view = self.lock_view();
            let inserted = view.insert_page(into_shared(messages), false, true);
            let first_unread = view
                .first_unread_position()
                .and_then(|position| view.entries()[position].message_id());
            (inserted, first_unread)
        };
        *lock(&self.first_unread) = first_unread;
        self.has_more.store(has_more, Ordering::SeqCst);

        tracing::info!(
            receiver = %self.receiver.id(),
            fetched,
            unread_count,
            has_more,
            "Opened conversation"
        );

        self.mark_receiver_read().await;

        Ok(OpenSummary {
            fetched,
            inserted,
            has_more,
            unread_count,
            first_unread,
        })
    }

    /// Loads the next page of older messages in front of the view
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the conversation was closed
    pub async fn load_older(&self) -> Result<PageOutcome> {
        let outcome = self.load_older_page().await?;
        self.mark_receiver_read().await;
        Ok(outcome)
    }

    async fn load_older_page(&self) -> Result<PageOutcome> {
        self.ensure_live("load_older")?;
        let cursor = self.lock_view().page_cursor();
        let messages = self
            .fetch(MessageFilter::page(self.options.page_size, cursor))
            .await?;
        self.ensure_live("load_older")?;

        let fetched = messages.len();
        let has_more = fetched >= self.options.page_size;
        let inserted = self
            .lock_view()
            .insert_page(into_shared(messages), false, false);
        self.has_more.store(has_more, Ordering::SeqCst);

        tracing::debug!(fetched, inserted, has_more, "Loaded older messages");
        Ok(PageOutcome {
            fetched,
            inserted,
            has_more,
        })
    }

    /// Replaces the view with the whole conversation
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the conversation was closed
    pub async fn load_all(&self) -> Result<PageOutcome> {
        self.ensure_live("load_all")?;
        let messages = self.fetch(MessageFilter::all()).await?;
        self.ensure_live("load_all")?;

        let fetched = messages.len();
        let inserted = self
            .lock_view()
            .insert_page(into_shared(messages), false, true);
        self.has_more.store(false, Ordering::SeqCst);
        self.mark_receiver_read().await;

        Ok(PageOutcome {
            fetched,
            inserted,
            has_more: false,
        })
    }

    /// Finds a quoted message, paging back through history as needed
    ///
    /// Pages loaded while searching do not trigger read receipts.
    ///
    /// # Returns
    ///
    /// View index of the message, or `None` once history is exhausted
    pub async fn find_by_api_message_id(&self, api_message_id: &str) -> Result<Option<usize>> {
        loop {
            let found = self.lock_view().position_of_api_message_id(api_message_id);
            if found.is_some() {
                return Ok(found);
            }
            if !self.has_more() {
                return Ok(None);
            }
            let outcome = self.load_older_page().await?;
            if outcome.fetched == 0 {
                return Ok(None);
            }
        }
    }

    /// Offers a newly created message to the conversation
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_new(&self, message: Arc<Message>) -> LiveOutcome {
        if self.is_closed() {
            return LiveOutcome::rejected();
        }

        let accepted = self
            .lock_view()
            .append_live(Arc::clone(&message), self.receiver.as_ref());
        if !accepted {
            return LiveOutcome::rejected();
        }

        if message.outbox {
            *lock(&self.first_unread) = None;
        }

        let sound = if message.message_type.is_silent() {
            None
        } else if message.outbox {
            Some(SoundCue::Sent)
        } else if !self.read.is_paused() {
            Some(SoundCue::Received)
        } else {
            None
        };

        let read_receipt = self.read.track(Arc::clone(&message));
        tracing::debug!(message_id = message.id, outbox = message.outbox, "Live message added");

        LiveOutcome {
            accepted: true,
            sound,
            read_receipt,
        }
    }

    /// Applies modified messages to the view
    ///
    /// # Returns
    ///
    /// The messages whose entries were replaced
    pub fn on_modified(&self, messages: &[Arc<Message>]) -> Vec<Arc<Message>> {
        self.lock_view().replace(messages)
    }

    /// Drops deleted messages from the view
    pub fn on_removed(&self, ids: &[MessageId]) -> usize {
        let removed = self.lock_view().remove(ids);
        let mut first_unread = lock(&self.first_unread);
        if matches!(*first_unread, Some(id) if ids.contains(&id)) {
            *first_unread = None;
        }
        removed
    }

    /// Dispatches a bus event to the matching handler
    pub fn handle_event(&self, event: MessageEvent) {
        match event {
            MessageEvent::New(message) => {
                self.on_new(message);
            }
            MessageEvent::Modified(messages) => {
                self.on_modified(&messages);
            }
            MessageEvent::Removed(ids) => {
                self.on_removed(&ids);
            }
        }
    }

    /// Subscribes the conversation to `bus` until it is closed
    pub fn attach(self: &Arc<Self>, bus: &MessageBus) -> JoinHandle<()> {
        let mut events = bus.subscribe();
        let controller = Arc::clone(self);
        let liveness = self.liveness.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = liveness.cancelled() => break,
                    event = events.recv() => match event {
                        Ok(event) => controller.handle_event(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Conversation fell behind message events");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!(receiver = %controller.receiver.id(), "Detached from message bus");
        })
    }

    /// Conversation went to the background
    pub fn pause(&self) {
        self.read.pause();
    }

    /// Conversation is in the foreground again
    ///
    /// # Returns
    ///
    /// Pending mark-as-read for the messages that arrived while paused
    pub fn resume(&self) -> Option<JoinHandle<()>> {
        self.read.resume()
    }

    /// Deletes the conversation's messages and clears the view
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or the conversation was closed
    pub async fn empty_chat(&self) -> Result<usize> {
        self.ensure_live("empty_chat")?;
        let deleted = self
            .blocking("delete", |store, receiver| store.delete_for_receiver(receiver))
            .await?;

        self.lock_view().clear();
        *lock(&self.first_unread) = None;
        self.has_more.store(false, Ordering::SeqCst);

        tracing::info!(receiver = %self.receiver.id(), deleted, "Emptied conversation");
        Ok(deleted)
    }

    /// Closes the conversation; in-flight fetches are discarded
    pub fn close(&self) {
        self.liveness.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.liveness.is_cancelled()
    }

    /// Whether older messages may exist; false until the first open
    pub fn has_more(&self) -> bool {
        self.has_more.load(Ordering::SeqCst)
    }

    pub fn first_unread(&self) -> Option<MessageId> {
        *lock(&self.first_unread)
    }

    pub fn is_paused(&self) -> bool {
        self.read.is_paused()
    }

    /// Messages waiting for a read receipt
    pub fn pending_read(&self) -> Vec<Arc<Message>> {
        self.read.pending()
    }

    pub fn receiver(&self) -> &Arc<dyn MessageReceiver> {
        &self.receiver
    }

    /// Runs `f` against the current view
    pub fn with_view<R>(&self, f: impl FnOnce(&ConversationView) -> R) -> R {
        f(&self.lock_view())
    }

    fn lock_view(&self) -> MutexGuard<'_, ConversationView> {
        lock(&self.view)
    }

    fn ensure_live(&self, operation: &str) -> Result<()> {
        if self.is_closed() {
            return Err(ConvoviewError::ConversationClosed(operation.to_string()).into());
        }
        Ok(())
    }

    async fn fetch(&self, filter: MessageFilter) -> Result<Vec<Message>> {
        self.blocking("fetch", move |store, receiver| {
            store.messages_for_receiver(receiver, &filter)
        })
        .await
    }

    async fn blocking<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn MessageStore, &ReceiverId) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let receiver = self.receiver.id().clone();
        tokio::task::spawn_blocking(move || f(store.as_ref(), &receiver))
            .await
            .with_context(|| format!("{} task failed", operation))?
    }

    async fn mark_receiver_read(&self) {
        if !self.options.mark_read_on_open {
            return;
        }
        let unread = match self
            .blocking("unread messages", |store, receiver| {
                store.unread_messages(receiver)
            })
            .await
        {
            Ok(unread) => unread,
            Err(e) => {
                tracing::warn!("Could not load unread messages: {:#}", e);
                return;
            }
        };
        if unread.is_empty() {
            return;
        }
        if let Err(e) = self.read.mark_read(into_shared(unread), |_| {}).await {
            tracing::error!("Mark-as-read task failed: {}", e);
        }
    }
}

fn into_shared(messages: Vec<Message>) -> Vec<Arc<Message>> {
    messages.into_iter().map(Arc::new).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
