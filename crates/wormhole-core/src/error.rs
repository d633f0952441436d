use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
    /// The store behind a read-through cache failed while filling a miss.
    #[error("cache loader failed: {0}")]
    Loader(Box<StorageError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

/// Errors raised by link stores and click logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    DuplicateCode(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
}

impl StorageError {
    /// Only an unavailable backend is worth retrying locally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// Errors surfaced to callers of the shorten and delete operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortenerError {
    #[error("invalid alias: {0}")]
    AliasInvalid(String),
    #[error("alias already taken: {0}")]
    AliasTaken(String),
    #[error("could not generate a free short code after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },
    #[error("short code already exists: {0}")]
    DuplicateCode(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::AliasInvalid(message),
        }
    }
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::DuplicateCode(code) => Self::DuplicateCode(code),
            StorageError::NotFound(code) => Self::NotFound(code),
            StorageError::Unavailable(message) => Self::StoreUnavailable(message),
            other => Self::Storage(other.to_string()),
        }
    }
}
