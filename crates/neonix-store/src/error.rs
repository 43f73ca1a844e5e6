use crate::element::{ElementId, ElementKind};

/// Errors from container store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No element with this id exists.
    #[error("element not found: {0}")]
    UnknownElement(ElementId),

    /// A sibling of the same kind already carries this name.
    #[error("{kind} named {name:?} already exists in this container")]
    DuplicateName { kind: ElementKind, name: String },

    /// The element kind cannot live under the given parent.
    #[error("{child} cannot be created under {parent}")]
    InvalidParent {
        parent: String,
        child: ElementKind,
    },

    /// The operation does not apply to this element kind.
    #[error("{id} is a {actual}, expected {expected}")]
    WrongKind {
        id: ElementId,
        expected: ElementKind,
        actual: ElementKind,
    },

    /// Array data does not match the declared shape or existing type.
    #[error("invalid array data: {0}")]
    InvalidData(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The file is damaged (bad magic, length or checksum).
    #[error("corrupt container file: {0}")]
    Corrupt(String),

    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage is opened read-only.
    #[error("store is read-only")]
    ReadOnly,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
