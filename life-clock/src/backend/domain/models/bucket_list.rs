#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BucketListValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error("Bucket list item not found: {0}")]
    ItemNotFound(String),
}
