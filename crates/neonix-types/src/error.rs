use thiserror::Error;

/// Errors produced by domain type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("cannot rescale {from} to {to}")]
    IncompatibleUnits { from: String, to: String },

    #[error("shape {shape:?} needs {expected} values, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("unknown container label: {0}")]
    UnknownLabel(String),
}
