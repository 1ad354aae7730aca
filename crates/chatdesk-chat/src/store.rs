//! Conversation store.
//!
//! Owns the message log and the single attachment slot, writes both through
//! to a [`KeyValueStore`] after every change, and restores them at startup.
//! An attached file clears itself [`ATTACHMENT_TTL`] after it was attached
//! unless another attach or a dismissal happens first.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use chatdesk_core::types::{AttachmentDescriptor, Message};
use chatdesk_storage::KeyValueStore;

use crate::error::ChatError;
use crate::preview::{history_preview, HistoryPreview};
use crate::resolver::{trim_input, ResponseResolver};

/// Storage key for the serialized message log.
pub const MESSAGES_KEY: &str = "chatMessages";
/// Storage key for the serialized attachment descriptor.
pub const ATTACHMENT_KEY: &str = "uploadedFile";
/// How long an attachment stays in the slot.
pub const ATTACHMENT_TTL: Duration = Duration::from_secs(10);

const EVENT_CAPACITY: usize = 64;

/// Published after every state change, including timer-driven clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    MessagesChanged,
    AttachmentChanged,
}

/// Point-in-time copy of the store for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub attachment: Option<AttachmentDescriptor>,
}

struct StoreState {
    messages: Vec<Message>,
    attachment: Option<AttachmentDescriptor>,
    /// Bumped by every attach and dismissal; a clear timer only acts if the
    /// generation it captured is still current.
    generation: u64,
    pending_clear: Option<JoinHandle<()>>,
}

/// State reachable from both the caller and the clear timer task.
struct Shared {
    state: Mutex<StoreState>,
    kv: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<StoreEvent>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn persist_messages(&self, messages: &[Message]) {
        match serde_json::to_string(messages) {
            Ok(json) => {
                if let Err(e) = self.kv.set(MESSAGES_KEY, &json) {
                    warn!(key = MESSAGES_KEY, error = %e, "Failed to persist messages");
                }
            }
            Err(e) => warn!(key = MESSAGES_KEY, error = %e, "Failed to serialize messages"),
        }
    }

    fn persist_attachment(&self, attachment: Option<&AttachmentDescriptor>) {
        let result = match attachment {
            Some(file) => match serde_json::to_string(file) {
                Ok(json) => self.kv.set(ATTACHMENT_KEY, &json),
                Err(e) => {
                    warn!(key = ATTACHMENT_KEY, error = %e, "Failed to serialize attachment");
                    return;
                }
            },
            None => self.kv.remove(ATTACHMENT_KEY),
        };
        if let Err(e) = result {
            warn!(key = ATTACHMENT_KEY, error = %e, "Failed to persist attachment");
        }
    }

    /// Timer callback: clear the slot unless it was touched since `generation`.
    fn expire_attachment(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                generation,
                current = state.generation,
                "Ignoring stale attachment clear"
            );
            return;
        }
        let cleared = state.attachment.take();
        state.pending_clear = None;
        self.persist_attachment(None);
        drop(state);

        if let Some(file) = cleared {
            info!(name = %file.name, "Attachment cleared after timeout");
        }
        self.notify(StoreEvent::AttachmentChanged);
    }
}

/// The canonical conversation state.
///
/// Mutations persist immediately and are applied in call order. The store
/// must be created inside a Tokio runtime, which runs the attachment timers.
pub struct ConversationStore {
    shared: Arc<Shared>,
    resolver: ResponseResolver,
    runtime: Handle,
}

impl ConversationStore {
    /// Restore persisted state and build the store.
    ///
    /// Missing or unreadable persisted values start out empty. Fails only
    /// when called outside a Tokio runtime.
    pub fn initialize(
        kv: Arc<dyn KeyValueStore>,
        resolver: ResponseResolver,
    ) -> Result<Self, ChatError> {
        let runtime = Handle::try_current().map_err(|e| ChatError::Runtime(e.to_string()))?;

        let messages: Vec<Message> = load_json(kv.as_ref(), MESSAGES_KEY).unwrap_or_default();
        let attachment: Option<AttachmentDescriptor> = load_json(kv.as_ref(), ATTACHMENT_KEY);

        info!(
            messages = messages.len(),
            attachment = attachment.is_some(),
            "Conversation restored"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(StoreState {
                messages,
                attachment,
                generation: 0,
                pending_clear: None,
            }),
            kv,
            events,
        });

        Ok(Self {
            shared,
            resolver,
            runtime,
        })
    }

    /// Send a user message and record the bot reply.
    ///
    /// Returns `None` without touching the log when `user_text` is empty or
    /// only whitespace. The user text is stored as typed.
    pub fn append(&self, user_text: &str) -> Option<(Message, Message)> {
        if trim_input(user_text).is_empty() {
            return None;
        }

        let user = Message::user(user_text);
        let bot = Message::bot(self.resolver.resolve(user_text));

        let mut state = self.shared.lock();
        state.messages.push(user.clone());
        state.messages.push(bot.clone());
        self.shared.persist_messages(&state.messages);
        let count = state.messages.len();
        drop(state);

        debug!(count, "Message appended");
        self.shared.notify(StoreEvent::MessagesChanged);
        Some((user, bot))
    }

    /// Put a file in the attachment slot, replacing any previous one, and
    /// schedule it to clear after [`ATTACHMENT_TTL`].
    pub fn attach(&self, descriptor: AttachmentDescriptor) {
        let deadline = tokio::time::Instant::now() + ATTACHMENT_TTL;

        let mut state = self.shared.lock();
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        if let Some(previous) = state.pending_clear.take() {
            previous.abort();
        }
        self.shared.persist_attachment(Some(&descriptor));
        info!(name = %descriptor.name, generation, "Attachment set");
        state.attachment = Some(descriptor);

        let shared = Arc::clone(&self.shared);
        state.pending_clear = Some(self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.expire_attachment(generation);
        }));
        drop(state);

        self.shared.notify(StoreEvent::AttachmentChanged);
    }

    /// Empty the attachment slot and cancel its pending clear.
    pub fn clear_attachment(&self) {
        let mut state = self.shared.lock();
        state.generation = state.generation.wrapping_add(1);
        if let Some(pending) = state.pending_clear.take() {
            pending.abort();
        }
        let cleared = state.attachment.take();
        self.shared.persist_attachment(None);
        drop(state);

        if let Some(file) = cleared {
            info!(name = %file.name, "Attachment dismissed");
        }
        self.shared.notify(StoreEvent::AttachmentChanged);
    }

    /// Collapse the whole conversation to the single `message`.
    ///
    /// Everything else in the log is discarded.
    pub fn replace_history_with(&self, message: Message) {
        let mut state = self.shared.lock();
        let discarded = state.messages.len();
        state.messages = vec![message];
        self.shared.persist_messages(&state.messages);
        drop(state);

        debug!(discarded, "History replaced with recalled message");
        self.shared.notify(StoreEvent::MessagesChanged);
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.lock().messages.clone()
    }

    pub fn attachment(&self) -> Option<AttachmentDescriptor> {
        self.shared.lock().attachment.clone()
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        let state = self.shared.lock();
        ConversationSnapshot {
            messages: state.messages.clone(),
            attachment: state.attachment.clone(),
        }
    }

    /// Sidebar rows for the first `count` messages.
    pub fn history_preview(&self, count: usize, max_chars: usize) -> Vec<HistoryPreview> {
        history_preview(&self.shared.lock().messages, count, max_chars)
    }

    /// Receive a [`StoreEvent`] after every change.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    pub fn resolver(&self) -> &ResponseResolver {
        &self.resolver
    }
}

impl Drop for ConversationStore {
    fn drop(&mut self) {
        if let Some(pending) = self.shared.lock().pending_clear.take() {
            pending.abort();
        }
    }
}

/// Read and decode a persisted value, treating any failure as absent.
fn load_json<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted state; starting empty");
            return None;
        }
    };
    // A literal `null` is how the browser stored an empty slot.
    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Discarding malformed persisted state");
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
