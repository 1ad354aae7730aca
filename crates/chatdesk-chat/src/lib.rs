//! Conversation engine for Chatdesk.
//!
//! Resolves user input against a static answer table, keeps the message log
//! and attachment slot, and persists both through a key-value store.

pub mod error;
pub mod preview;
pub mod resolver;
pub mod store;

pub use error::ChatError;
pub use preview::{history_preview, truncate_preview, HistoryPreview};
pub use resolver::{normalize, trim_input, QaEntry, QaTable, ResponseResolver, FALLBACK_ANSWER};
pub use store::{
    ConversationSnapshot, ConversationStore, StoreEvent, ATTACHMENT_KEY, ATTACHMENT_TTL,
    MESSAGES_KEY,
};
