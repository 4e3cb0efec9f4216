//! # Storage Module
//!
//! Persistence for every user document: a key-value port with file and
//! in-memory backends, a change feed for cross-view and cross-process
//! synchronisation, and typed whole-document wrappers on top.

pub mod change_feed;
pub mod document;
pub mod file_store;
pub mod memory_store;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use change_feed::{ChangeFeed, ChangeOrigin, FileWatcher, KeyChange};
pub use document::StoredDocument;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use traits::KeyValueStore;
