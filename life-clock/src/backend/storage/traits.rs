//! # Storage Traits
//!
//! The key-value port every persisted document goes through. Keys are short
//! identifiers such as `memento-profiles`; values are complete JSON documents.

use anyhow::Result;

/// Whole-document key-value storage.
///
/// Implementations must be safe to share between the UI thread and the
/// background watcher.
pub trait KeyValueStore: Send + Sync {
    /// Raw stored value for `key`, `None` if nothing was ever written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value for `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Returns true if a value was present.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys currently holding a value, sorted
    fn keys(&self) -> Result<Vec<String>>;
}
