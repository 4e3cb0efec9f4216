//! Bucket list items with a pending/achieved status.

use anyhow::Result;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::domain::clock::TimeSource;
use crate::backend::domain::commands::bucket_list::AddBucketItemCommand;
use crate::backend::domain::models::bucket_list::BucketListValidationError;
use crate::backend::storage::{ChangeFeed, KeyValueStore, StoredDocument};
use shared::{BucketListItem, BucketStatus};

pub const BUCKET_LIST_KEY: &str = "life-clock-bucket-list";

#[derive(Clone)]
pub struct BucketListService {
    document: Arc<StoredDocument<Vec<BucketListItem>>>,
    time_source: Arc<dyn TimeSource>,
}

impl BucketListService {
    pub fn new(store: Arc<dyn KeyValueStore>, feed: ChangeFeed, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            document: Arc::new(StoredDocument::open(BUCKET_LIST_KEY, store, feed)),
            time_source,
        }
    }

    pub fn add_item(&self, command: AddBucketItemCommand) -> Result<BucketListItem> {
        let title = command.title.trim();
        if title.is_empty() {
            return Err(BucketListValidationError::EmptyTitle.into());
        }

        let item = BucketListItem {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            image_url: command.image_url.filter(|url| !url.trim().is_empty()),
            created_at: self.time_source.now(),
            completed_at: None,
            status: BucketStatus::Pending,
        };

        let stored = item.clone();
        self.document.update(move |prev| {
            let mut next = prev.clone();
            next.push(stored);
            next
        })?;

        info!("Added bucket list item: {} ({})", item.title, item.id);
        Ok(item)
    }

    pub fn remove_item(&self, item_id: &str) -> Result<BucketListItem> {
        let removed = self.document.update_with(|prev| {
            let position = prev
                .iter()
                .position(|i| i.id == item_id)
                .ok_or_else(|| BucketListValidationError::ItemNotFound(item_id.to_string()))?;
            let mut next = prev.clone();
            let removed = next.remove(position);
            Ok((next, removed))
        })?;
        info!("Removed bucket list item: {}", removed.id);
        Ok(removed)
    }

    /// Flip pending/achieved. Achieving stamps `completed_at`; reopening clears it.
    pub fn toggle_status(&self, item_id: &str) -> Result<BucketListItem> {
        let now = self.time_source.now();
        let item = self.modify_item(item_id, |item| match item.status {
            BucketStatus::Pending => {
                item.status = BucketStatus::Achieved;
                item.completed_at = Some(now);
            }
            BucketStatus::Achieved => {
                item.status = BucketStatus::Pending;
                item.completed_at = None;
            }
        })?;
        info!("Bucket list item {} is now {:?}", item.id, item.status);
        Ok(item)
    }

    pub fn update_item_image(&self, item_id: &str, image_url: &str) -> Result<BucketListItem> {
        let image_url = image_url.to_string();
        self.modify_item(item_id, move |item| item.image_url = Some(image_url))
    }

    pub fn items(&self) -> Vec<BucketListItem> {
        self.document.get().as_ref().clone()
    }

    pub fn sync(&self) -> usize {
        self.document.sync()
    }

    fn modify_item<F>(&self, item_id: &str, change: F) -> Result<BucketListItem>
    where
        F: FnOnce(&mut BucketListItem),
    {
        self.document.update_with(|prev| {
            let mut next = prev.clone();
            let item = next
                .iter_mut()
                .find(|i| i.id == item_id)
                .ok_or_else(|| BucketListValidationError::ItemNotFound(item_id.to_string()))?;
            change(item);
            let updated = item.clone();
            Ok((next, updated))
        })
    }
}
