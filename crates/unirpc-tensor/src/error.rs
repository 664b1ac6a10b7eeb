//! Array codec errors.

use crate::dtype::DType;

/// Errors produced while encoding or decoding array values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TensorError {
    #[error("Unsupported element type: {0}")]
    UnsupportedElementType(String),

    #[error("Unknown dtype: {0}")]
    UnknownDtype(String),

    #[error("Size mismatch: shape requires {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Dtype mismatch: array holds {found}, requested {expected}")]
    DtypeMismatch { expected: DType, found: DType },

    #[error("Not an array value: {0}")]
    NotAnArray(String),
}

/// A specialized Result type for array codec operations.
pub type Result<T> = std::result::Result<T, TensorError>;
