//! Core types for the unirpc protocol.
//!
//! This crate provides the pieces both peers share:
//! - The tagged envelope model (call, result, error)
//! - Loosely-typed values with embedded n-dimensional arrays
//! - The JSON wire codec
//! - Length-prefixed framing for stream transports

pub mod envelope;
pub mod error;
pub mod framing;
pub mod value;
pub mod wire;

pub use envelope::{Call, Envelope, RemoteError, Reply, RpcResult, Tag, Uid, TAG_FIELD};
pub use error::WireError;
pub use framing::{encode_frame, FrameError, FrameParser, MAX_FRAME_SIZE};
pub use value::Value;

pub use unirpc_tensor as tensor;
pub use unirpc_tensor::{ArrayValue, DType, Tensor};
