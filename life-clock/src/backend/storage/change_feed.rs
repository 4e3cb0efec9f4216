//! # Change Feed
//!
//! Single subscription point for "key X now holds value Y" notifications.
//!
//! Two sources publish into the same channel:
//! - [`ChangeFeed::publish_local`], called after every write made through a
//!   [`StoredDocument`](super::document::StoredDocument) in this process
//! - [`FileWatcher`], which polls the store and reports values rewritten by
//!   another process (a second terminal running the CLI, for instance)
//!
//! The watcher remembers what this process last wrote per key and stays quiet
//! about those values, so every write is reported exactly once.

use anyhow::{anyhow, Result};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::traits::KeyValueStore;

/// Buffered notifications before slow subscribers start lagging
pub const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    SameProcess,
    OtherProcess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub key: String,
    /// `None` when the key was removed
    pub new_value: Option<String>,
    pub origin: ChangeOrigin,
}

#[derive(Clone)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    sender: broadcast::Sender<KeyChange>,
    local_writes: Mutex<HashMap<String, Option<String>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            inner: Arc::new(FeedInner {
                sender,
                local_writes: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<KeyChange> {
        self.inner.sender.subscribe()
    }

    /// Announce a write made by this process
    pub fn publish_local(&self, key: &str, new_value: Option<String>) {
        self.inner
            .local_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), new_value.clone());
        self.send(KeyChange {
            key: key.to_string(),
            new_value,
            origin: ChangeOrigin::SameProcess,
        });
    }

    /// Announce a value observed on disk that this process did not write
    pub fn publish_external(&self, key: &str, new_value: Option<String>) {
        self.send(KeyChange {
            key: key.to_string(),
            new_value,
            origin: ChangeOrigin::OtherProcess,
        });
    }

    /// True if `value` is exactly what this process last wrote to `key`
    pub fn is_own_write(&self, key: &str, value: &Option<String>) -> bool {
        self.inner
            .local_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|written| written == value)
    }

    fn send(&self, change: KeyChange) {
        trace!("change feed: key={} origin={:?}", change.key, change.origin);
        // no subscribers is fine
        let _ = self.inner.sender.send(change);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Current value of every key in `store`
pub fn snapshot_store(store: &dyn KeyValueStore) -> Result<HashMap<String, String>> {
    let mut snapshot = HashMap::new();
    for key in store.keys()? {
        if let Some(value) = store.get(&key)? {
            snapshot.insert(key, value);
        }
    }
    Ok(snapshot)
}

/// Keys whose value differs between two snapshots, sorted by key
pub fn diff_snapshots(
    previous: &HashMap<String, String>,
    current: &HashMap<String, String>,
) -> Vec<(String, Option<String>)> {
    let mut changes: Vec<(String, Option<String>)> = current
        .iter()
        .filter(|(key, value)| previous.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), Some(value.clone())))
        .collect();

    changes.extend(
        previous
            .keys()
            .filter(|key| !current.contains_key(*key))
            .map(|key| (key.clone(), None)),
    );

    changes.sort_by(|a, b| a.0.cmp(&b.0));
    changes
}

/// Background poller reporting writes made by other processes
pub struct FileWatcher {
    task: JoinHandle<()>,
}

impl FileWatcher {
    /// Start polling `store` every `poll`. Requires a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>, feed: ChangeFeed, poll: Duration) -> Result<Self> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| anyhow!("File watcher needs a tokio runtime"))?;
        let mut seen = snapshot_store(store.as_ref())?;
        debug!("File watcher started: {} keys, poll every {:?}", seen.len(), poll);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(poll);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let current = match snapshot_store(store.as_ref()) {
                    Ok(current) => current,
                    Err(e) => {
                        warn!("File watcher failed to read store: {:#}", e);
                        continue;
                    }
                };

                for (key, new_value) in diff_snapshots(&seen, &current) {
                    if feed.is_own_write(&key, &new_value) {
                        continue;
                    }
                    debug!("Key '{}' changed outside this process", key);
                    feed.publish_external(&key, new_value);
                }
                seen = current;
            }
        });

        Ok(Self { task })
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::file_store::FileStore;
    use crate::backend::storage::test_utils::TestEnvironment;
    use tokio::sync::broadcast::error::TryRecvError;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_diff_snapshots() {
        let previous = map(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let current = map(&[("a", "1"), ("b", "20"), ("d", "4")]);

        assert_eq!(
            diff_snapshots(&previous, &current),
            vec![
                ("b".to_string(), Some("20".to_string())),
                ("c".to_string(), None),
                ("d".to_string(), Some("4".to_string())),
            ]
        );
        assert!(diff_snapshots(&current, &current).is_empty());
    }

    #[test]
    fn test_local_publish_reaches_every_subscriber() {
        let feed = ChangeFeed::new();
        let mut first = feed.subscribe();
        let mut second = feed.subscribe();

        feed.publish_local("memento-theme", Some("\"light\"".to_string()));

        for rx in [&mut first, &mut second] {
            let change = rx.try_recv().unwrap();
            assert_eq!(change.key, "memento-theme");
            assert_eq!(change.origin, ChangeOrigin::SameProcess);
            assert_eq!(change.new_value.as_deref(), Some("\"light\""));
        }
        assert!(feed.is_own_write("memento-theme", &Some("\"light\"".to_string())));
        assert!(!feed.is_own_write("memento-theme", &Some("\"dark\"".to_string())));
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let feed = ChangeFeed::new();
        feed.publish_external("memento-theme", None);
        feed.publish_local("memento-theme", None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watcher_reports_other_process_writes_only() {
        let env = TestEnvironment::new().unwrap();
        let mut rx = env.feed.subscribe();
        let _watcher = FileWatcher::spawn(env.store.clone(), env.feed.clone(), Duration::from_millis(500)).unwrap();

        // our own write: published locally, then seen on disk by the watcher
        env.store.set("memento-theme", "\"light\"").unwrap();
        env.feed.publish_local("memento-theme", Some("\"light\"".to_string()));

        // a second process sharing the directory
        let other = FileStore::new(&env.base_path).unwrap();
        other.set("life-clock-journal", "[]").unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;

        let first = rx.try_recv().unwrap();
        assert_eq!(first.origin, ChangeOrigin::SameProcess);

        let second = rx.try_recv().unwrap();
        assert_eq!(second.key, "life-clock-journal");
        assert_eq!(second.origin, ChangeOrigin::OtherProcess);
        assert_eq!(second.new_value.as_deref(), Some("[]"));

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        other.remove("life-clock-journal").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        let removed = rx.try_recv().unwrap();
        assert_eq!(removed.key, "life-clock-journal");
        assert_eq!(removed.new_value, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_watcher_stops_polling() {
        let env = TestEnvironment::new().unwrap();
        let mut rx = env.feed.subscribe();
        let watcher = FileWatcher::spawn(env.store.clone(), env.feed.clone(), Duration::from_millis(100)).unwrap();
        drop(watcher);

        FileStore::new(&env.base_path).unwrap().set("memento-theme", "\"light\"").unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
