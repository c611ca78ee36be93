use thiserror::Error;
use validator::ValidationErrors;

use crate::repository::errors::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("notification store is not configured")]
    Unconfigured,

    #[error("a fetch is already in flight")]
    Busy,

    #[error("no more pages to fetch")]
    NoMorePages,

    #[error("notification id must not be empty")]
    InvalidId,

    #[error("notification store has been disposed")]
    Disposed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<ValidationErrors> for StoreError {
    fn from(e: ValidationErrors) -> Self {
        StoreError::InvalidConfig(e.to_string())
    }
}
