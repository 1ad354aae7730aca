//! Chatdesk storage crate - durable key-value persistence.
//!
//! Provides the `KeyValueStore` trait the conversation store writes through,
//! a WAL-mode SQLite implementation with migrations, and an in-memory
//! implementation for tests and ephemeral sessions.

pub mod kv;
pub mod migrations;
pub mod sqlite;

pub use kv::{KeyValueStore, MemoryStore};
pub use sqlite::SqliteStore;
