#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JournalValidationError {
    #[error("Reflection cannot be empty")]
    EmptyReflection,
    #[error("Journal entry not found: {0}")]
    EntryNotFound(String),
}
