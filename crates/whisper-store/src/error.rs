use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite / SQLCipher error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a key-value backend.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A record could not be serialized for writing.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// No local identity has been saved.
    #[error("No identity stored")]
    NoIdentity,

    /// The persisted identity record has unusable key material.
    #[error("Stored identity is corrupt: {0}")]
    CorruptIdentity(#[from] whisper_shared::IdentityError),

    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// App-lock PIN did not match the stored hash.
    #[error("Incorrect PIN")]
    InvalidPin,

    /// Caller input rejected before touching storage.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
