//! Plain-text rendering of the chat panel.
//!
//! The panel starts hidden behind the floating chat button. When open it
//! shows the history sidebar, the conversation, and the attachment banner.

use std::fmt::Write;

use chatdesk_chat::{history_preview, ConversationSnapshot};
use chatdesk_core::config::ChatConfig;
use chatdesk_core::types::{Message, Sender};

const RULE: &str = "------------------------------------------------------------";

/// UI-only state; never persisted.
#[derive(Debug, Clone)]
pub struct PanelView {
    open: bool,
    preview_count: usize,
    preview_max_chars: usize,
}

impl PanelView {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            open: false,
            preview_count: config.history_preview_count,
            preview_max_chars: config.preview_max_chars,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// The full message behind sidebar row `position` (1-based, as shown).
    ///
    /// `None` for position 0 or a row the sidebar does not show.
    pub fn recall_target(&self, messages: &[Message], position: usize) -> Option<Message> {
        let index = position.checked_sub(1)?;
        let rows = history_preview(messages, self.preview_count, self.preview_max_chars);
        let row = rows.get(index)?;
        messages.get(row.index).cloned()
    }

    pub fn render(&self, snapshot: &ConversationSnapshot) -> String {
        if !self.open {
            return "[ chat ]  /open to start chatting".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "Chat History");
        let rows = history_preview(
            &snapshot.messages,
            self.preview_count,
            self.preview_max_chars,
        );
        for (position, row) in rows.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", position + 1, row.label);
        }

        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "ChatBot");
        for msg in &snapshot.messages {
            match msg.sender {
                Sender::User => {
                    let _ = writeln!(out, "  > {}", msg.text);
                }
                Sender::Bot => {
                    let _ = writeln!(out, "    {}", msg.text);
                }
            }
        }

        if let Some(file) = &snapshot.attachment {
            let _ = writeln!(out, "{}", RULE);
            let _ = writeln!(out, "Uploaded files: {}  [x] /dismiss", file.name);
        }
        let _ = write!(out, "{}", RULE);
        out
    }
}
