use chrono::{DateTime, Utc};
use shared::Milestone;

/// Color stored on milestones created without one
pub const DEFAULT_MILESTONE_COLOR: &str = "amber";

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MilestoneValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Milestone not found: {0}")]
    MilestoneNotFound(String),
}

/// Time left until a milestone, as shown on its card
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MilestoneCountdown {
    pub days_remaining: i64,
    /// Hours past the whole days, 0..24
    pub hours_remaining: i64,
    /// Minutes past the whole hours, 0..60
    pub minutes_remaining: i64,
    /// Share of the creation-to-target span already elapsed, 0..=100
    pub progress_percent: f64,
    pub is_completed: bool,
}

impl MilestoneCountdown {
    pub fn at(milestone: &Milestone, now: DateTime<Utc>) -> Self {
        Self::between(milestone.created_at, milestone.target_date, now)
    }

    pub fn between(created_at: DateTime<Utc>, target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let left = target - now;
        let left_ms = left.num_milliseconds();

        let days_remaining = left.num_days().max(0);
        let hours_remaining = left_ms.div_euclid(MILLIS_PER_HOUR).max(0) % 24;
        let minutes_remaining = left_ms.div_euclid(MILLIS_PER_MINUTE).max(0) % 60;

        let total_ms = (target - created_at).num_milliseconds();
        let elapsed_ms = (now - created_at).num_milliseconds();
        let progress = if total_ms > 0 {
            elapsed_ms as f64 / total_ms as f64 * 100.0
        } else if elapsed_ms > 0 {
            100.0
        } else {
            0.0
        };

        Self {
            days_remaining,
            hours_remaining,
            minutes_remaining,
            progress_percent: progress.clamp(0.0, 100.0),
            is_completed: days_remaining == 0 && hours_remaining == 0 && minutes_remaining == 0,
        }
    }
}
