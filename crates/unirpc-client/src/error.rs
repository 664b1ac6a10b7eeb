//! Channel and transport errors.

use std::time::Duration;

use unirpc_core::{FrameError, Uid, WireError};

/// Failures of the underlying connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    #[error("Connecting to {0} timed out")]
    ConnectTimeout(String),

    #[error("Peer closed the connection")]
    Disconnected,
}

/// Failures of a single call.
///
/// A remote failure is not one of these: it arrives as a normal
/// [`Reply::Error`](unirpc_core::Reply::Error).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("Channel busy: another call is awaiting its reply")]
    ChannelBusy,

    #[error("Correlation mismatch: sent uid {expected}, reply carries uid {found}")]
    CorrelationMismatch { expected: Uid, found: Uid },

    #[error("Peer replied with a call envelope")]
    UnexpectedCall,

    #[error("Channel closed")]
    Closed,

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A specialized Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
