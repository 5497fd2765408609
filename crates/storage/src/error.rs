use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be decoded back into a record.
    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
