//! End-to-end tests for the conversation store backed by SQLite.
//!
//! Each test opens its own database file, mutates the store, drops it, and
//! reopens to check what survived the restart.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chatdesk_chat::{
    ConversationStore, QaTable, ResponseResolver, ATTACHMENT_KEY, FALLBACK_ANSWER, MESSAGES_KEY,
};
use chatdesk_core::types::{AttachmentDescriptor, Message, Sender};
use chatdesk_storage::{KeyValueStore, SqliteStore};

// =============================================================================
// Helpers
// =============================================================================

fn resolver() -> ResponseResolver {
    ResponseResolver::new(QaTable::bundled().unwrap())
}

fn open(path: &Path) -> ConversationStore {
    let db = Arc::new(SqliteStore::open(path).unwrap());
    ConversationStore::initialize(db, resolver()).unwrap()
}

// =============================================================================
// Restart round-trips
// =============================================================================

#[tokio::test]
async fn test_round_trip_empty_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.db");

    drop(open(&path));
    let store = open(&path);
    assert!(store.messages().is_empty());
    assert!(store.attachment().is_none());
}

#[tokio::test]
async fn test_round_trip_single_message() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.db");

    {
        let store = open(&path);
        store.replace_history_with(Message::user("only me"));
    }

    let store = open(&path);
    assert_eq!(store.messages(), vec![Message::user("only me")]);
}

#[tokio::test]
async fn test_round_trip_many_messages_and_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.db");

    let before = {
        let store = open(&path);
        store.append("Hello");
        store.append("how are you?");
        store.append("something nobody asked");
        store.attach(AttachmentDescriptor::new("invoice.pdf"));
        store.snapshot()
    };
    assert_eq!(before.messages.len(), 6);

    let store = open(&path);
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.messages()[5], Message::bot(FALLBACK_ANSWER));
}

#[tokio::test]
async fn test_dismissed_attachment_stays_gone_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.db");

    {
        let store = open(&path);
        store.attach(AttachmentDescriptor::new("draft.docx"));
        store.clear_attachment();
    }

    let store = open(&path);
    assert!(store.attachment().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_expired_attachment_is_removed_from_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.db");
    let db = Arc::new(SqliteStore::open(&path).unwrap());
    let store = ConversationStore::initialize(db.clone(), resolver()).unwrap();

    store.attach(AttachmentDescriptor::new("photo.png"));
    assert!(db.get(ATTACHMENT_KEY).unwrap().is_some());

    tokio::time::sleep(Duration::from_secs(11)).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    assert!(store.attachment().is_none());
    assert!(db.get(ATTACHMENT_KEY).unwrap().is_none());
}

// =============================================================================
// Sidebar recall
// =============================================================================

#[tokio::test]
async fn test_recall_from_sidebar_replaces_conversation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.db");
    let store = open(&path);

    store.append("hello");
    store.append("bye");

    let rows = store.history_preview(5, 50);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1].sender, Sender::Bot);

    let picked = store.messages()[rows[1].index].clone();
    store.replace_history_with(picked.clone());
    assert_eq!(store.messages(), vec![picked.clone()]);

    drop(store);
    let store = open(&path);
    assert_eq!(store.messages(), vec![picked]);
}

#[tokio::test]
async fn test_browser_written_state_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.db");

    {
        let db = SqliteStore::open(&path).unwrap();
        db.set(
            MESSAGES_KEY,
            r#"[{"sender":"user","text":"hi"},{"sender":"bot","text":"Hi there! What can I do for you?"}]"#,
        )
        .unwrap();
        db.set(ATTACHMENT_KEY, r#"{"uid":"rc-upload-1","name":"a.csv","size":120}"#)
            .unwrap();
    }

    let store = open(&path);
    assert_eq!(store.messages().len(), 2);
    assert_eq!(
        store.attachment(),
        Some(AttachmentDescriptor::new("a.csv"))
    );
}
