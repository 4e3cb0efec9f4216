//! Daily goals for the active profile, stored alongside the profiles.

use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::domain::clock::TimeSource;
use crate::backend::domain::models::goal::{GoalValidationError, MAX_GOAL_LENGTH};
use crate::backend::domain::profile_service::ProfileService;
use crate::backend::storage::StoredDocument;
use shared::{DailyGoal, ProfilesState};

#[derive(Clone)]
pub struct GoalService {
    document: Arc<StoredDocument<ProfilesState>>,
    time_source: Arc<dyn TimeSource>,
}

impl GoalService {
    pub fn new(profile_service: &ProfileService) -> Self {
        Self {
            document: profile_service.document(),
            time_source: profile_service.time_source(),
        }
    }

    /// Add a goal for the active profile, dated today
    pub fn add_goal(&self, text: &str) -> Result<DailyGoal> {
        let text = validate_goal_text(text)?;
        let today = self.time_source.today();
        let now = self.time_source.now();

        let goal = self.document.update_with(move |prev| {
            let profile_id = prev.active_profile_id.clone().ok_or(GoalValidationError::NoActiveProfile)?;
            let goal = DailyGoal {
                id: Uuid::new_v4().to_string(),
                profile_id,
                date: today,
                created_at: Some(now),
                goal: text,
                completed: false,
            };
            let mut next = prev.clone();
            next.goals.push(goal.clone());
            Ok((next, goal))
        })?;

        info!("Added goal {} for profile {} on {}", goal.id, goal.profile_id, goal.date);
        Ok(goal)
    }

    /// Goals of the active profile dated today, in insertion order
    pub fn today_goals(&self) -> Vec<DailyGoal> {
        let state = self.document.get();
        let Some(active_id) = state.active_profile_id.as_deref() else {
            return Vec::new();
        };
        let today = self.time_source.today();
        let goals: Vec<DailyGoal> = state
            .goals
            .iter()
            .filter(|g| g.profile_id == active_id && g.date == today)
            .cloned()
            .collect();
        debug!("{} goals for today ({})", goals.len(), today);
        goals
    }

    pub fn update_goal(&self, goal_id: &str, text: &str) -> Result<DailyGoal> {
        let text = validate_goal_text(text)?;
        self.modify_goal(goal_id, move |goal| goal.goal = text)
    }

    pub fn toggle_goal(&self, goal_id: &str) -> Result<DailyGoal> {
        let goal = self.modify_goal(goal_id, |goal| goal.completed = !goal.completed)?;
        info!("Goal {} is now {}", goal.id, if goal.completed { "done" } else { "open" });
        Ok(goal)
    }

    pub fn delete_goal(&self, goal_id: &str) -> Result<DailyGoal> {
        let removed = self.document.update_with(|prev| {
            let position = prev
                .goals
                .iter()
                .position(|g| g.id == goal_id)
                .ok_or_else(|| GoalValidationError::GoalNotFound(goal_id.to_string()))?;
            let mut next = prev.clone();
            let removed = next.goals.remove(position);
            Ok((next, removed))
        })?;
        info!("Deleted goal {}", removed.id);
        Ok(removed)
    }

    fn modify_goal<F>(&self, goal_id: &str, change: F) -> Result<DailyGoal>
    where
        F: FnOnce(&mut DailyGoal),
    {
        self.document.update_with(|prev| {
            let mut next = prev.clone();
            let goal = next
                .goals
                .iter_mut()
                .find(|g| g.id == goal_id)
                .ok_or_else(|| GoalValidationError::GoalNotFound(goal_id.to_string()))?;
            change(goal);
            let updated = goal.clone();
            Ok((next, updated))
        })
    }
}

fn validate_goal_text(input: &str) -> Result<String, GoalValidationError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(GoalValidationError::EmptyGoal);
    }
    if text.chars().count() > MAX_GOAL_LENGTH {
        return Err(GoalValidationError::GoalTooLong);
    }
    Ok(text.to_string())
}
