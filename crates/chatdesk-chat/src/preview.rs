//! Sidebar history preview.
//!
//! The sidebar lists the first few messages of the conversation, each
//! prefixed with its author and cut short when long.

use chatdesk_core::types::{Message, Sender};

/// Marker appended to a truncated preview.
pub const ELLIPSIS: &str = "...";

/// One sidebar row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPreview {
    /// Position of the message in the conversation.
    pub index: usize,
    pub sender: Sender,
    /// `You: ` / `Bot: ` followed by the (possibly truncated) text.
    pub label: String,
}

pub fn sender_prefix(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You: ",
        Sender::Bot => "Bot: ",
    }
}

/// Keep the first `max_chars` characters, adding [`ELLIPSIS`] if anything was cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Preview rows for the first `count` messages.
pub fn history_preview(messages: &[Message], count: usize, max_chars: usize) -> Vec<HistoryPreview> {
    messages
        .iter()
        .take(count)
        .enumerate()
        .map(|(index, msg)| HistoryPreview {
            index,
            sender: msg.sender,
            label: format!(
                "{}{}",
                sender_prefix(msg.sender),
                truncate_preview(&msg.text, max_chars)
            ),
        })
        .collect()
}
