//! Key-value persistence used by the conversation store.
//!
//! Values are opaque strings (the caller serializes them). `SqliteStore`
//! persists them on disk; `MemoryStore` keeps them in a map.

use std::collections::HashMap;
use std::sync::Mutex;

use chatdesk_core::error::ChatdeskError;

/// Durable string-to-string storage with browser local-storage semantics.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written or was removed.
    fn get(&self, key: &str) -> Result<Option<String>, ChatdeskError>;

    /// Insert or overwrite a value.
    fn set(&self, key: &str, value: &str) -> Result<(), ChatdeskError>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), ChatdeskError>;
}

/// Non-durable store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, ChatdeskError> {
        self.entries
            .lock()
            .map_err(|e| ChatdeskError::Storage(format!("Memory store lock poisoned: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatdeskError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatdeskError> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ChatdeskError> {
        self.entries()?.remove(key);
        Ok(())
    }
}
