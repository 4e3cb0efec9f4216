//! # File Store
//!
//! One JSON file per key at the root of the data directory.
//!
//! ```text
//! data/
//! ├── config.yaml
//! ├── memento-profiles.json
//! ├── memento-theme.json
//! ├── life-clock-milestones.json
//! └── ...
//! ```
//!
//! Writes go to a temp file first and are renamed into place, so a reader in
//! another process never sees a half-written document.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use super::traits::KeyValueStore;

const FILE_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    base_directory: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `base_directory`, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_directory = base_directory.as_ref().to_path_buf();
        if !base_directory.exists() {
            fs::create_dir_all(&base_directory)
                .with_context(|| format!("Failed to create data directory {}", base_directory.display()))?;
            info!("Created data directory: {}", base_directory.display());
        }
        Ok(Self { base_directory })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// File backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        self.base_directory.join(format!("{}.{}", file_stem, FILE_EXTENSION))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(raw))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension(format!("{}.tmp", FILE_EXTENSION));

        fs::write(&temp_path, value).with_context(|| format!("Failed to write {}", temp_path.display()))?;
        fs::rename(&temp_path, &path).with_context(|| format!("Failed to move {} into place", path.display()))?;

        debug!("Stored key '{}' ({} bytes) at {}", key, value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        debug!("Removed key '{}'", key);
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base_directory)
            .with_context(|| format!("Failed to list {}", self.base_directory.display()))?;

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
