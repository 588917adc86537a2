//! Store error types.

use thiserror::Error;

/// A private key that cannot be used for the requested operation.
///
/// The three cases are one error kind because callers treat them the same way;
/// the messages name the conflicting identifiers for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnknownKeyError {
    #[error("key {key_id} not found")]
    NotFound { key_id: String },

    #[error("key {key_id} is owned by a different node ({actual_node_id}, not {expected_node_id})")]
    OwnedByAnotherNode {
        key_id: String,
        expected_node_id: String,
        actual_node_id: String,
    },

    #[error(
        "session key {key_id} is bound to another peer ({actual_peer_id}, not {expected_peer_id})"
    )]
    BoundToAnotherPeer {
        key_id: String,
        expected_peer_id: String,
        actual_peer_id: String,
    },
}

/// Store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown key: {0}")]
    UnknownKey(#[from] UnknownKeyError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error(transparent)]
    Core(#[from] keystead_core::Error),
}

impl StoreError {
    /// Whether this is an [`UnknownKeyError`], whatever the reason.
    pub fn is_unknown_key(&self) -> bool {
        matches!(self, StoreError::UnknownKey(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
