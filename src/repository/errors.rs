use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Unexpected status: {0}")]
    Status(u16),
    #[error("Decode error: {0}")]
    Decode(String),
}
