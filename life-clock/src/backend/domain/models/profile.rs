use chrono::NaiveDate;

/// Longest accepted profile name, in characters
pub const MAX_NAME_LENGTH: usize = 50;

/// Date-of-birth input format
pub const DATE_OF_BIRTH_FORMAT: &str = "%Y-%m-%d";

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProfileValidationError {
    #[error("Please enter a name")]
    EmptyName,
    #[error("Name is too long (max 50 characters)")]
    NameTooLong,
    #[error("Invalid date of birth '{0}', expected YYYY-MM-DD")]
    InvalidDateOfBirth(String),
    #[error("Date of birth cannot be in the future")]
    BirthInFuture,
    #[error("Target age must be between 1 and 150, got {0}")]
    TargetAgeOutOfRange(i64),
    #[error("Target age must be greater than current age ({current_age})")]
    TargetBelowCurrentAge { target_age: u32, current_age: i64 },
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),
}

/// Whole years lived, counted as 365.25-day years
pub fn approximate_age_years(date_of_birth: NaiveDate, today: NaiveDate) -> i64 {
    let days = (today - date_of_birth).num_days();
    (days as f64 / DAYS_PER_YEAR).floor() as i64
}
