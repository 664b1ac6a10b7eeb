//! Wire decoding errors.

/// Errors produced while turning envelopes into text and back.
///
/// Any of these is fatal to the exchange that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Missing rpc_tag field")]
    MissingTag,

    #[error("Unknown rpc_tag: {0}")]
    UnknownTag(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::MalformedInput(e.to_string())
    }
}

/// A specialized Result type for wire codec operations.
pub type Result<T> = std::result::Result<T, WireError>;
