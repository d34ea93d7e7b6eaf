//! Integration tests for the conversation view merge rules
//!
//! Pages come from a real SQLite store so the view sees them exactly as the
//! controller would: newest first, bounded by the page cursor.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{at, chat, create_temp_store, seed_history, utc};
use convoview::clock::ManualClock;
use convoview::model::{Message, Receiver};
use convoview::store::{MessageFilter, MessageStore};
use convoview::view::{calendar_day, ConversationView, ViewEntry, ViewState};

fn load_page(store: &dyn MessageStore, view: &mut ConversationView, page_size: usize) -> usize {
    let filter = MessageFilter::page(page_size, view.page_cursor());
    let page = store
        .messages_for_receiver(&chat(), &filter)
        .expect("failed to load page");
    let fetched = page.len();
    view.insert_page(page.into_iter().map(Arc::new).collect(), false, false);
    fetched
}

fn distinct_days(view: &ConversationView) -> usize {
    view.messages()
        .filter_map(|m| m.created_at)
        .map(|created_at| calendar_day(created_at, &view.zone()))
        .collect::<BTreeSet<_>>()
        .len()
}

#[test]
fn test_paging_through_history_keeps_invariants() {
    let (store, _tmp) = create_temp_store();
    let total = seed_history(&store, 7, 5);
    let mut view = ConversationView::new(utc(), Arc::new(ManualClock::new(at(2024, 4, 1, 0, 0))));

    // 35 messages in pages of 8 end with a short page of 3
    let mut pages = 0;
    loop {
        let fetched = load_page(&store, &mut view, 8);
        pages += 1;
        view.check_invariants().expect("invariants after page");
        assert_eq!(view.len(), view.message_count() + distinct_days(&view));
        if fetched < 8 {
            break;
        }
    }

    assert_eq!(pages, 5);
    assert_eq!(view.message_count(), total);
    assert_eq!(view.len(), total + 7);
    assert_eq!(view.state(), ViewState::Ready);

    let timestamps: Vec<_> = view.messages().filter_map(|m| m.created_at).collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_separators_label_following_day() {
    let (store, _tmp) = create_temp_store();
    seed_history(&store, 3, 2);
    let mut view = ConversationView::new(utc(), Arc::new(ManualClock::new(at(2024, 4, 1, 0, 0))));

    // page boundary falls inside day two
    load_page(&store, &mut view, 3);
    load_page(&store, &mut view, 3);

    let entries = view.entries();
    for (i, entry) in entries.iter().enumerate() {
        if let ViewEntry::DateSeparator(separator) = entry {
            let next = entries[i + 1].as_message().expect("message after separator");
            assert_eq!(
                calendar_day(separator.date, &utc()),
                calendar_day(next.created_at.unwrap(), &utc())
            );
        }
    }
}

#[test]
fn test_live_messages_after_page_load() {
    let (store, _tmp) = create_temp_store();
    seed_history(&store, 2, 2);
    let clock = Arc::new(ManualClock::new(at(2024, 3, 2, 12, 0)));
    let mut view = ConversationView::new(utc(), clock.clone());
    load_page(&store, &mut view, 10);
    let receiver = Receiver::new(chat());
    let before = view.len();

    // same day as the newest message: no new separator
    clock.set(at(2024, 3, 2, 13, 0));
    let same_day = Message::text(chat(), at(2024, 3, 2, 13, 0), "later that day").with_id(100);
    assert!(view.append_live(Arc::new(same_day), &receiver));
    assert_eq!(view.len(), before + 1);

    // after midnight: separator first
    clock.set(at(2024, 3, 3, 0, 5));
    let next_day = Message::text(chat(), at(2024, 3, 3, 0, 5), "good morning").with_id(101);
    assert!(view.append_live(Arc::new(next_day), &receiver));
    assert_eq!(view.len(), before + 3);
    assert!(view.entries()[before + 1].is_separator());
    view.check_invariants().expect("invariants after live append");

    // predates initialization
    let stale = Message::text(chat(), at(2024, 3, 2, 11, 0), "late delivery").with_id(102);
    assert!(!view.append_live(Arc::new(stale), &receiver));
}

#[test]
fn test_remove_whole_day_drops_its_separator() {
    let (store, _tmp) = create_temp_store();
    seed_history(&store, 3, 2);
    let mut view = ConversationView::new(utc(), Arc::new(ManualClock::new(at(2024, 4, 1, 0, 0))));
    load_page(&store, &mut view, 10);
    assert_eq!(view.len(), 9);

    let day_two: Vec<_> = view
        .messages()
        .filter(|m| m.created_at.map(|c| c.format("%d").to_string()) == Some("02".into()))
        .map(|m| m.id)
        .collect();
    assert_eq!(day_two.len(), 2);

    assert_eq!(view.remove(&day_two), 2);
    assert_eq!(view.len(), 6);
    view.check_invariants().expect("invariants after removal");
}

#[test]
fn test_replace_keeps_position() {
    let (store, _tmp) = create_temp_store();
    seed_history(&store, 1, 3);
    let mut view = ConversationView::new(utc(), Arc::new(ManualClock::new(at(2024, 4, 1, 0, 0))));
    load_page(&store, &mut view, 10);

    let middle = view.messages().nth(1).cloned().expect("three messages");
    let position = view.position_of(middle.id).expect("shown");
    let mut edited = (*middle).clone();
    edited.body = Some("edited".to_string());

    let replaced = view.replace(&[Arc::new(edited)]);
    assert_eq!(replaced.len(), 1);
    assert_eq!(view.position_of(middle.id), Some(position));
    assert_eq!(
        view.entries()[position].as_message().unwrap().body.as_deref(),
        Some("edited")
    );

    // same allocation is not a modification
    let current = Arc::clone(view.entries()[position].as_message().unwrap());
    assert!(view.replace(&[current]).is_empty());
}

#[test]
fn test_reload_with_replace_existing_is_idempotent() {
    let (store, _tmp) = create_temp_store();
    seed_history(&store, 4, 3);
    let mut view = ConversationView::new(utc(), Arc::new(ManualClock::new(at(2024, 4, 1, 0, 0))));

    let all: Vec<Arc<_>> = store
        .messages_for_receiver(&chat(), &MessageFilter::all())
        .unwrap()
        .into_iter()
        .map(Arc::new)
        .collect();
    view.insert_page(all.clone(), false, true);
    let first: Vec<_> = view.entries().iter().map(|e| e.message_id()).collect();
    view.insert_page(all, false, true);
    let second: Vec<_> = view.entries().iter().map(|e| e.message_id()).collect();

    assert_eq!(first, second);
    assert_eq!(view.len(), 12 + 4);
}
