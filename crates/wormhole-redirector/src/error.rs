use thiserror::Error;
use wormhole_core::StorageError;

pub type Result<T> = std::result::Result<T, RedirectorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectorError {
    /// The code is unknown, deleted, or expired.
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
