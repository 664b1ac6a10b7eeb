//! Wire form of array values.
//!
//! An array travels as a JSON object:
//!
//! ```json
//! {"rpc_tag": "__RPC_VAL_NDARRAY__", "dtype": "int64", "shape": [3],
//!  "data": "BgAAAAAAAAAHAAAAAAAAAAgAAAAAAAAA"}
//! ```
//!
//! `data` is the standard-alphabet base64 of the row-major little-endian
//! byte image.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::dtype::DType;
use crate::error::{Result, TensorError};
use crate::tensor::{Tensor, TensorMeta};

/// Wire tag carried by every array value.
pub const ARRAY_VALUE_TAG: &str = "__RPC_VAL_NDARRAY__";

/// Marker for the `rpc_tag` field of an array value.
///
/// Serializes as [`ARRAY_VALUE_TAG`] and refuses to deserialize from any
/// other string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ArrayTag;

impl Serialize for ArrayTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(ARRAY_VALUE_TAG)
    }
}

impl<'de> Deserialize<'de> for ArrayTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        if tag == ARRAY_VALUE_TAG {
            Ok(ArrayTag)
        } else {
            Err(de::Error::invalid_value(
                de::Unexpected::Str(&tag),
                &ARRAY_VALUE_TAG,
            ))
        }
    }
}

/// An array value as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub rpc_tag: ArrayTag,
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data: String,
}

impl ArrayValue {
    /// Encodes a tensor: its dtype name, shape and base64 byte image.
    pub fn encode(tensor: &Tensor) -> Self {
        Self {
            rpc_tag: ArrayTag,
            dtype: tensor.dtype().name().to_string(),
            shape: tensor.shape().to_vec(),
            data: BASE64.encode(tensor.as_bytes()),
        }
    }

    /// Decodes back into a tensor.
    ///
    /// Fails with [`TensorError::UnknownDtype`] for a dtype outside the
    /// canonical table, [`TensorError::InvalidBase64`] for a bad payload
    /// and [`TensorError::SizeMismatch`] when the payload length disagrees
    /// with `product(shape) * element_size`.
    pub fn decode(&self) -> Result<Tensor> {
        let dtype: DType = self.dtype.parse()?;
        let bytes = BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| TensorError::InvalidBase64(e.to_string()))?;
        Tensor::new(TensorMeta::new(self.shape.clone(), dtype), bytes.into())
    }

    /// Reads the wire fields out of a JSON value without decoding the payload.
    ///
    /// Fails with [`TensorError::NotAnArray`] unless the value is an object
    /// carrying the array tag and well-formed `dtype`/`shape`/`data` fields.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Self::deserialize(value).map_err(|e| TensorError::NotAnArray(e.to_string()))
    }

    /// Converts to a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "rpc_tag": ARRAY_VALUE_TAG,
            "dtype": self.dtype,
            "shape": self.shape,
            "data": self.data,
        })
    }

    /// Sniffs a JSON value as an array and decodes it in one step.
    pub fn try_decode_json(value: &serde_json::Value) -> Result<Tensor> {
        Self::from_json(value)?.decode()
    }
}

impl From<&Tensor> for ArrayValue {
    fn from(tensor: &Tensor) -> Self {
        Self::encode(tensor)
    }
}

impl TryFrom<&ArrayValue> for Tensor {
    type Error = TensorError;

    fn try_from(value: &ArrayValue) -> Result<Self> {
        value.decode()
    }
}

impl Serialize for Tensor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        ArrayValue::encode(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tensor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        ArrayValue::deserialize(deserializer)?
            .decode()
            .map_err(de::Error::custom)
    }
}
