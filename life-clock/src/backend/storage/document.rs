//! # Stored Documents
//!
//! [`StoredDocument`] keeps an in-memory copy of one key's JSON document.
//! Every write replaces the whole document: the update closure receives the
//! previous value and returns a new one, which is persisted and announced on
//! the [`ChangeFeed`]. [`StoredDocument::sync`] pulls in writes made by other
//! documents in this process or by other processes.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::broadcast::{self, error::TryRecvError};

use super::change_feed::{ChangeFeed, KeyChange};
use super::traits::KeyValueStore;

struct DocumentState<T> {
    value: Arc<T>,
    /// Raw text last read or written, used to skip echoes of our own writes
    raw: Option<String>,
}

pub struct StoredDocument<T> {
    key: String,
    store: Arc<dyn KeyValueStore>,
    feed: ChangeFeed,
    state: RwLock<DocumentState<T>>,
    changes: Mutex<broadcast::Receiver<KeyChange>>,
}

impl<T> StoredDocument<T>
where
    T: Serialize + DeserializeOwned + Default + Send + Sync,
{
    /// Load `key` from `store`. Missing or unreadable documents start from
    /// `T::default()`.
    pub fn open(key: &str, store: Arc<dyn KeyValueStore>, feed: ChangeFeed) -> Self {
        let changes = feed.subscribe();
        let (value, raw) = match store.get(key) {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => (value, Some(raw)),
                Err(e) => {
                    warn!("Stored '{}' is not valid, starting from default: {}", key, e);
                    (T::default(), None)
                }
            },
            Ok(None) => {
                debug!("No stored '{}', starting from default", key);
                (T::default(), None)
            }
            Err(e) => {
                warn!("Failed to read '{}', starting from default: {:#}", key, e);
                (T::default(), None)
            }
        };

        Self {
            key: key.to_string(),
            store,
            feed,
            state: RwLock::new(DocumentState {
                value: Arc::new(value),
                raw,
            }),
            changes: Mutex::new(changes),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current in-memory value
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.read_state().value)
    }

    /// Build a new document from the previous one and persist it
    pub fn update<F>(&self, f: F) -> Result<Arc<T>>
    where
        F: FnOnce(&T) -> T,
    {
        self.update_with(|prev| Ok((f(prev), ())))?;
        Ok(self.get())
    }

    /// Fallible update that also hands back a value computed alongside the
    /// new document. Nothing is written if `f` fails.
    pub fn update_with<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&T) -> Result<(T, R)>,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.refresh_from_store(&mut state);
        let (next, output) = f(&state.value)?;

        let raw = serde_json::to_string(&next).with_context(|| format!("Failed to serialize '{}'", self.key))?;
        self.store
            .set(&self.key, &raw)
            .with_context(|| format!("Failed to persist '{}'", self.key))?;

        state.value = Arc::new(next);
        state.raw = Some(raw.clone());
        drop(state);

        self.feed.publish_local(&self.key, Some(raw));
        Ok(output)
    }

    /// Replace the whole document
    pub fn replace(&self, value: T) -> Result<Arc<T>> {
        self.update(move |_| value)
    }

    /// Apply pending change notifications for this key.
    ///
    /// Only the newest pending payload is applied, so a notification that was
    /// already folded in by an update never rolls the document back. Returns 1
    /// when the document changed and 0 otherwise. Payloads that fail to parse
    /// are logged and skipped.
    pub fn sync(&self) -> usize {
        let mut changes = self.changes.lock().unwrap_or_else(PoisonError::into_inner);
        let mut latest: Option<Option<String>> = None;

        loop {
            match changes.try_recv() {
                Ok(change) if change.key == self.key => {
                    debug!("Pending {:?} change to '{}'", change.origin, self.key);
                    latest = Some(change.new_value);
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    info!("Missed {} change notifications, reloading '{}'", skipped, self.key);
                    match self.store.get(&self.key) {
                        Ok(raw) => latest = Some(raw),
                        Err(e) => warn!("Failed to reload '{}': {:#}", self.key, e),
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        match latest {
            Some(raw) if self.apply(raw.clone()) => {
                debug!("Applied pending change to '{}'", self.key);
                1
            }
            _ => 0,
        }
    }

    /// Swap in a new raw payload. Returns false when it was already current or
    /// could not be parsed.
    fn apply(&self, raw: Option<String>) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.raw == raw {
            return false;
        }

        let value = match raw.as_deref() {
            Some(text) => match serde_json::from_str::<T>(text) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Ignoring unparseable change to '{}': {}", self.key, e);
                    return false;
                }
            },
            None => T::default(),
        };

        state.value = Arc::new(value);
        state.raw = raw;
        true
    }

    /// Bring `state` up to date with the store before building on it, so a
    /// write another view made since our last `sync` is not lost.
    fn refresh_from_store(&self, state: &mut DocumentState<T>) {
        let raw = match self.store.get(&self.key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to re-read '{}' before update: {:#}", self.key, e);
                return;
            }
        };
        if state.raw == raw {
            return;
        }

        let value = match raw.as_deref() {
            Some(text) => match serde_json::from_str::<T>(text) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Stored '{}' is not valid, updating the in-memory copy: {}", self.key, e);
                    return;
                }
            },
            None => T::default(),
        };
        debug!("'{}' changed underneath this view, refreshed before update", self.key);
        state.value = Arc::new(value);
        state.raw = raw;
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, DocumentState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
