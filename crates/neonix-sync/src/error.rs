use neonix_store::StoreError;
use neonix_types::{ObjectKind, TypeError};

/// Errors from synchronization between a domain graph and a container store.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A path step does not exist in the store.
    #[error("no element at {path}")]
    NotFound { path: String },

    /// A cross-reference points at an object that was never written.
    #[error("{kind} {name:?} is referenced but has not been written")]
    UnboundReference { kind: ObjectKind, name: String },

    /// The channel arrays of one signal disagree.
    #[error("inconsistent signal group {prefix:?}: {reason}")]
    InconsistentSignalGroup { prefix: String, reason: String },

    /// A path string could not be parsed or does not address a domain object.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// A domain object has no store representation.
    #[error("{kind} {name:?} cannot be stored: {reason}")]
    Unrepresentable {
        kind: ObjectKind,
        name: String,
        reason: String,
    },

    /// A stored element does not have the shape its type promises.
    #[error("malformed element {element:?}: {reason}")]
    Malformed { element: String, reason: String },

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

/// Result alias for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
