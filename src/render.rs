//! Terminal rendering of a conversation view
//!
//! Lines are built as plain text first so they can be inspected without a
//! terminal; [`print_lines`] adds the colors.

use colored::Colorize;

use crate::model::{Message, MessageId, MessageType};
use crate::view::{calendar_day, CalendarZone, ConversationView, DateSeparator, ViewEntry};

/// Kind of a rendered line, used to pick its color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Separator,
    UnreadBar,
    Inbound,
    Outbound,
}

/// One line of terminal output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub kind: LineKind,
    pub text: String,
}

/// Renders every entry of `view`, oldest first
///
/// An unread bar is placed above `first_unread` when it is shown.
pub fn render_view(view: &ConversationView, first_unread: Option<MessageId>) -> Vec<RenderedLine> {
    let zone = view.zone();
    let mut lines = Vec::with_capacity(view.len() + 1);
    for entry in view.entries() {
        match entry {
            ViewEntry::DateSeparator(separator) => lines.push(RenderedLine {
                kind: LineKind::Separator,
                text: separator_text(separator, &zone),
            }),
            ViewEntry::Message(message) => {
                if first_unread == Some(message.id) {
                    lines.push(RenderedLine {
                        kind: LineKind::UnreadBar,
                        text: "── unread messages ──".to_string(),
                    });
                }
                lines.push(RenderedLine {
                    kind: if message.outbox {
                        LineKind::Outbound
                    } else {
                        LineKind::Inbound
                    },
                    text: message_text(message, &zone),
                });
            }
        }
    }
    lines
}

/// Header text for a calendar day
pub fn separator_text(separator: &DateSeparator, zone: &CalendarZone) -> String {
    format!("── {} ──", calendar_day(separator.date, zone).format("%Y-%m-%d"))
}

/// Single-line summary of a message: time, direction, body
pub fn message_text(message: &Message, zone: &CalendarZone) -> String {
    let time = message
        .created_at
        .map(|at| zone.format(at, "%H:%M"))
        .unwrap_or_else(|| "--:--".to_string());
    let direction = if message.outbox { ">>" } else { "<<" };
    let body = match (&message.body, message.message_type) {
        (Some(body), MessageType::Text | MessageType::Status) => body.clone(),
        (Some(caption), other) if !caption.is_empty() => {
            format!("[{}] {}", type_label(other), caption)
        }
        (_, other) => format!("[{}]", type_label(other)),
    };
    let star = if message.display_tags.contains(crate::model::DisplayTags::STARRED) {
        " *"
    } else {
        ""
    };
    format!("{} {} {}{}", time, direction, body, star)
}

fn type_label(message_type: MessageType) -> &'static str {
    match message_type {
        MessageType::Text => "text",
        MessageType::Image => "image",
        MessageType::Voice => "voice message",
        MessageType::Video => "video",
        MessageType::File => "file",
        MessageType::Location => "location",
        MessageType::Ballot => "poll",
        MessageType::Contact => "contact",
        MessageType::Status => "status",
        MessageType::VoipStatus => "call",
    }
}

/// Prints rendered lines to stdout
pub fn print_lines(lines: &[RenderedLine]) {
    for line in lines {
        match line.kind {
            LineKind::Separator => println!("{}", line.text.bold()),
            LineKind::UnreadBar => println!("{}", line.text.yellow()),
            LineKind::Inbound => println!("{}", line.text),
            LineKind::Outbound => println!("{}", line.text.cyan()),
        }
    }
}
