/// Test utilities with automatic cleanup.
///
/// The temp directory is removed when the environment is dropped, even if the
/// test panics.
use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use super::change_feed::ChangeFeed;
use super::document::StoredDocument;
use super::file_store::FileStore;

pub struct TestEnvironment {
    pub store: Arc<FileStore>,
    pub feed: ChangeFeed,
    /// Data directory, for inspecting files or opening a second "process"
    pub base_path: PathBuf,
    _temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let store = Arc::new(FileStore::new(temp_dir.path())?);
        Ok(Self {
            store,
            feed: ChangeFeed::new(),
            base_path: temp_dir.path().to_path_buf(),
            _temp_dir: temp_dir,
        })
    }

    pub fn open_document<T>(&self, key: &str) -> StoredDocument<T>
    where
        T: Serialize + DeserializeOwned + Default + Send + Sync,
    {
        StoredDocument::open(key, self.store.clone(), self.feed.clone())
    }
}
