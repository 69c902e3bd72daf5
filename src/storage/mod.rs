//! Origin-scoped key-value storage.
//!
//! A store behaves like a browser's local storage: string keys, string values,
//! enumerable by index, and shared by every handle opened on the same origin.
//! Writes made through one handle surface as [`StorageEvent`]s on the *other*
//! handles, never on the handle that made them.

mod memory_store;
mod sqlite_store;

pub use memory_store::{MemoryOrigin, MemoryStore};
pub use sqlite_store::SqliteStore;

use crate::error::Result;

/// A change made to the origin by another handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key, or `None` when the whole store was cleared
    pub key: Option<String>,
    pub old_value: Option<String>,
    /// New value, or `None` when the entry was removed
    pub new_value: Option<String>,
}

impl StorageEvent {
    pub fn set(key: impl Into<String>, old_value: Option<String>, new_value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value: Some(new_value.into()),
        }
    }

    pub fn removed(key: impl Into<String>, old_value: Option<String>) -> Self {
        Self {
            key: Some(key.into()),
            old_value,
            new_value: None,
        }
    }

    pub fn cleared() -> Self {
        Self {
            key: None,
            old_value: None,
            new_value: None,
        }
    }
}

/// Synchronous string store scoped to an origin.
pub trait KeyValueStore {
    /// Number of stored entries.
    fn len(&self) -> Result<usize>;

    /// Key at `index` in store-defined order.
    fn key(&self, index: usize) -> Result<Option<String>>;

    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`. Writing the value already stored is not a change.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not a change.
    fn remove_item(&mut self, key: &str) -> Result<()>;

    /// Remove every entry.
    fn clear(&mut self) -> Result<()>;

    /// Drain the changes other handles made since the last call.
    fn poll_changes(&mut self) -> Result<Vec<StorageEvent>>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All keys in enumeration order.
    fn keys(&self) -> Result<Vec<String>> {
        let len = self.len()?;
        let mut keys = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}
