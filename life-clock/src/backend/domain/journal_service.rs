//! Reflections written against the quote of the day, newest first.

use anyhow::Result;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::domain::clock::TimeSource;
use crate::backend::domain::models::journal::JournalValidationError;
use crate::backend::storage::{ChangeFeed, KeyValueStore, StoredDocument};
use shared::JournalEntry;

pub const JOURNAL_KEY: &str = "life-clock-journal";

#[derive(Clone)]
pub struct JournalService {
    document: Arc<StoredDocument<Vec<JournalEntry>>>,
    time_source: Arc<dyn TimeSource>,
}

impl JournalService {
    pub fn new(store: Arc<dyn KeyValueStore>, feed: ChangeFeed, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            document: Arc::new(StoredDocument::open(JOURNAL_KEY, store, feed)),
            time_source,
        }
    }

    pub fn add_entry(&self, quote_text: &str, quote_author: &str, reflection: &str) -> Result<JournalEntry> {
        if reflection.trim().is_empty() {
            return Err(JournalValidationError::EmptyReflection.into());
        }

        let entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            date: self.time_source.now(),
            quote_text: quote_text.to_string(),
            quote_author: quote_author.to_string(),
            reflection: reflection.to_string(),
        };

        let stored = entry.clone();
        self.document.update(move |prev| {
            let mut next = Vec::with_capacity(prev.len() + 1);
            next.push(stored);
            next.extend(prev.iter().cloned());
            next
        })?;

        info!("Added journal entry {}", entry.id);
        Ok(entry)
    }

    pub fn delete_entry(&self, entry_id: &str) -> Result<JournalEntry> {
        let removed = self.document.update_with(|prev| {
            let position = prev
                .iter()
                .position(|e| e.id == entry_id)
                .ok_or_else(|| JournalValidationError::EntryNotFound(entry_id.to_string()))?;
            let mut next = prev.clone();
            let removed = next.remove(position);
            Ok((next, removed))
        })?;
        info!("Deleted journal entry {}", removed.id);
        Ok(removed)
    }

    /// All entries, newest first
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.document.get().as_ref().clone()
    }

    pub fn sync(&self) -> usize {
        self.document.sync()
    }
}
