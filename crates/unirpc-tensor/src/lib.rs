//! Typed n-dimensional array values for the unirpc protocol.
//!
//! Arrays cross the wire as a self-describing object: a canonical dtype
//! name, a shape, and the base64 of the row-major byte image. This crate
//! owns the dtype table, the decoded [`Tensor`] type and the
//! [`ArrayValue`] wire form.
//!
//! # Example
//!
//! ```rust
//! use unirpc_tensor::{ArrayValue, DType, Tensor};
//!
//! let tensor = Tensor::from_slice(&[6i64, 7, 8], None).unwrap();
//! let wire = ArrayValue::encode(&tensor);
//! assert_eq!(wire.dtype, "int64");
//! assert_eq!(wire.data, "BgAAAAAAAAAHAAAAAAAAAAgAAAAAAAAA");
//!
//! let back = wire.decode().unwrap();
//! assert_eq!(back.dtype(), DType::Int64);
//! assert_eq!(back.to_vec::<i64>().unwrap(), vec![6, 7, 8]);
//! ```

pub mod codec;
pub mod dtype;
pub mod error;
pub mod tensor;

pub use codec::{ArrayTag, ArrayValue, ARRAY_VALUE_TAG};
pub use dtype::{DType, Element};
pub use error::TensorError;
pub use tensor::{Tensor, TensorMeta};
