//! # Milestone Service
//!
//! Dated events the user counts down to, stored as one list under
//! `life-clock-milestones`.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::domain::clock::TimeSource;
use crate::backend::domain::commands::milestone::{
    CreateMilestoneCommand, ImportMilestonesResult, UpdateMilestoneCommand,
};
use crate::backend::domain::milestone_import::parse_schedule;
use crate::backend::domain::models::milestone::{
    MilestoneCountdown, MilestoneValidationError, DEFAULT_MILESTONE_COLOR,
};
use crate::backend::storage::{ChangeFeed, KeyValueStore, StoredDocument};
use shared::{Milestone, MilestoneCategory};

pub const MILESTONES_KEY: &str = "life-clock-milestones";

#[derive(Clone)]
pub struct MilestoneService {
    document: Arc<StoredDocument<Vec<Milestone>>>,
    time_source: Arc<dyn TimeSource>,
}

impl MilestoneService {
    pub fn new(store: Arc<dyn KeyValueStore>, feed: ChangeFeed, time_source: Arc<dyn TimeSource>) -> Self {
        Self {
            document: Arc::new(StoredDocument::open(MILESTONES_KEY, store, feed)),
            time_source,
        }
    }

    pub fn add_milestone(&self, command: CreateMilestoneCommand) -> Result<Milestone> {
        info!("Adding milestone: {} on {}", command.title, command.target_date);

        let milestone = self.build(
            &command.title,
            command.target_date,
            command.category,
            command.icon,
            command.color,
        )?;

        let stored = milestone.clone();
        self.document.update(move |prev| {
            let mut next = prev.clone();
            next.push(stored);
            next
        })?;

        Ok(milestone)
    }

    pub fn remove_milestone(&self, milestone_id: &str) -> Result<Milestone> {
        let removed = self.document.update_with(|prev| {
            let position = prev
                .iter()
                .position(|m| m.id == milestone_id)
                .ok_or_else(|| MilestoneValidationError::MilestoneNotFound(milestone_id.to_string()))?;
            let mut next = prev.clone();
            let removed = next.remove(position);
            Ok((next, removed))
        })?;

        info!("Removed milestone: {} ({})", removed.title, removed.id);
        Ok(removed)
    }

    /// Apply the provided fields; everything else is kept
    pub fn update_milestone(&self, command: UpdateMilestoneCommand) -> Result<Milestone> {
        info!("Updating milestone: {}", command.milestone_id);

        let title = match &command.title {
            Some(title) => Some(validate_title(title)?),
            None => None,
        };

        self.document.update_with(|prev| {
            let mut next = prev.clone();
            let milestone = next
                .iter_mut()
                .find(|m| m.id == command.milestone_id)
                .ok_or_else(|| MilestoneValidationError::MilestoneNotFound(command.milestone_id.clone()))?;

            if let Some(title) = title {
                milestone.title = title;
            }
            if let Some(target_date) = command.target_date {
                milestone.target_date = target_date;
            }
            if let Some(category) = command.category {
                milestone.category = Some(category);
            }
            if command.icon.is_some() {
                milestone.icon = command.icon.clone();
            }
            if command.color.is_some() {
                milestone.color = command.color.clone();
            }

            let updated = milestone.clone();
            Ok((next, updated))
        })
    }

    pub fn get_milestone(&self, milestone_id: &str) -> Option<Milestone> {
        self.document.get().iter().find(|m| m.id == milestone_id).cloned()
    }

    /// Milestones ordered by target date, optionally limited to one category.
    /// Milestones without a category count as `Other`.
    pub fn list_sorted(&self, filter: Option<MilestoneCategory>) -> Vec<Milestone> {
        let mut milestones: Vec<Milestone> = self
            .document
            .get()
            .iter()
            .filter(|m| filter.map_or(true, |category| m.category_or_default() == category))
            .cloned()
            .collect();
        milestones.sort_by_key(|m| m.target_date);
        debug!("Listing {} milestones (filter: {:?})", milestones.len(), filter);
        milestones
    }

    pub fn countdown(&self, milestone: &Milestone) -> MilestoneCountdown {
        MilestoneCountdown::at(milestone, self.time_source.now())
    }

    /// Add one milestone per recognised line of `text`, all in `category`
    pub fn import_schedule(&self, text: &str, category: MilestoneCategory) -> Result<ImportMilestonesResult> {
        let now_local = self.time_source.now().with_timezone(&Local).naive_local();
        let schedule = parse_schedule(text, now_local);

        let mut imported = Vec::with_capacity(schedule.items.len());
        for item in schedule.items {
            imported.push(self.build(&item.title, local_to_utc(item.target), category, None, None)?);
        }

        if !imported.is_empty() {
            let stored = imported.clone();
            self.document.update(move |prev| {
                let mut next = prev.clone();
                next.extend(stored);
                next
            })?;
        }

        info!(
            "Imported {} milestones into {} ({} lines skipped)",
            imported.len(),
            category,
            schedule.skipped.len()
        );
        Ok(ImportMilestonesResult {
            imported,
            skipped_lines: schedule.skipped,
        })
    }

    pub fn sync(&self) -> usize {
        self.document.sync()
    }

    fn build(
        &self,
        title: &str,
        target_date: DateTime<Utc>,
        category: MilestoneCategory,
        icon: Option<String>,
        color: Option<String>,
    ) -> Result<Milestone> {
        Ok(Milestone {
            id: Uuid::new_v4().to_string(),
            title: validate_title(title)?,
            target_date,
            created_at: self.time_source.now(),
            icon,
            color: Some(color.unwrap_or_else(|| DEFAULT_MILESTONE_COLOR.to_string())),
            category: Some(category),
        })
    }
}

fn validate_title(input: &str) -> Result<String, MilestoneValidationError> {
    let title = input.trim();
    if title.is_empty() {
        return Err(MilestoneValidationError::EmptyTitle);
    }
    Ok(title.to_string())
}

/// Read a local wall-clock time as an instant. Ambiguous times take the
/// earlier reading; times in a DST gap move forward an hour.
pub fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + chrono::Duration::hours(1))).earliest())
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
