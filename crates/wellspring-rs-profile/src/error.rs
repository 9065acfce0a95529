//! Error types for profile storage.

/// Errors returned by profile stores.
#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The user id is empty or otherwise unusable.
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),
}
