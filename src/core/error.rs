use thiserror::Error;

/// Failure kinds reported by a [`DocumentStore`](crate::storage::DocumentStore).
///
/// The command layer never shows these to callers directly: every operation
/// runs them through its own translation in `command::translate`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record id not found for document '{0}'")]
    RidNotFound(String),

    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("Invalid collection: {0}")]
    InvalidCollection(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Document '{id}' has version {current}, update was based on version {supplied}")]
    VersionConflict {
        id: String,
        current: u64,
        supplied: u64,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Role '{0}' not found")]
    RoleNotFound(String),

    #[error("Principal already exists: {0}")]
    DuplicatePrincipal(String),

    #[error("Invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("SQL injection attempt detected: {0}")]
    SqlInjection(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
