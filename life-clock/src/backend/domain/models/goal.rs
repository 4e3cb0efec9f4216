/// Longest accepted goal text, in characters
pub const MAX_GOAL_LENGTH: usize = 200;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GoalValidationError {
    #[error("Goal cannot be empty")]
    EmptyGoal,
    #[error("Goal is too long")]
    GoalTooLong,
    #[error("No active profile - add or select a profile first")]
    NoActiveProfile,
    #[error("Goal not found: {0}")]
    GoalNotFound(String),
}
