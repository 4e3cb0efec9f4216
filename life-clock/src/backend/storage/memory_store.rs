//! In-memory [`KeyValueStore`] for tests and throwaway sessions.

use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::traits::KeyValueStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.read().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut values = self.values.write().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(values.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let values = self.values.read().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(values.keys().cloned().collect())
    }
}
