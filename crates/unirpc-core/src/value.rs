//! Loosely-typed argument and result values.
//!
//! A [`Value`] is the JSON data model plus one extra leaf, [`Value::Array`],
//! for typed n-dimensional arrays. Converting from JSON sniffs every object
//! that carries the array tag: when it decodes cleanly it becomes an
//! `Array`, otherwise it stays a plain `Map`. The wire carries no other
//! per-element type hint.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use tracing::debug;
use unirpc_tensor::{ArrayValue, Tensor, ARRAY_VALUE_TAG};

use crate::envelope::TAG_FIELD;

/// A loosely-typed value carried in `args`, `kwargs` or `result`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Array(Tensor),
}

impl Value {
    /// Converts a JSON value, recovering embedded arrays.
    pub fn from_json(json: serde_json::Value) -> Self {
        if let Some(tensor) = sniff_array(&json) {
            return Value::Array(tensor);
        }
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to JSON, encoding arrays into their wire objects.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Array(tensor) => ArrayValue::encode(tensor).to_json(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Value::Array(tensor) => Some(tensor),
            _ => None,
        }
    }

    /// Short name of the variant, for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Array(_) => "array",
        }
    }
}

/// Only objects tagged as arrays are attempted; a failed attempt is logged
/// and the caller keeps the object as it was.
fn sniff_array(json: &serde_json::Value) -> Option<Tensor> {
    if json.get(TAG_FIELD).and_then(|t| t.as_str()) != Some(ARRAY_VALUE_TAG) {
        return None;
    }
    match ArrayValue::try_decode_json(json) {
        Ok(tensor) => Some(tensor),
        Err(e) => {
            debug!(error = %e, "array-tagged object kept as a plain map");
            None
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Array(tensor) => write!(f, "{}", tensor),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Array(tensor) => tensor.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::from(f64::from(n))
    }
}

impl From<Tensor> for Value {
    fn from(tensor: Tensor) -> Self {
        Value::Array(tensor)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_roundtrip() {
        let json = json!({
            "name": "probe",
            "count": 3,
            "ratio": 0.25,
            "flags": [true, false, null],
            "nested": {"inner": [1, 2, 3]}
        });

        let value = Value::from_json(json.clone());
        assert!(matches!(value, Value::Map(_)));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_sniffs_nested_arrays() {
        let json = json!({
            "weights": {
                "rpc_tag": "__RPC_VAL_NDARRAY__",
                "dtype": "int64",
                "shape": [3],
                "data": "BgAAAAAAAAAHAAAAAAAAAAgAAAAAAAAA"
            },
            "batch": [[{
                "rpc_tag": "__RPC_VAL_NDARRAY__",
                "dtype": "uint8",
                "shape": [2],
                "data": "AQI="
            }]]
        });

        let value = Value::from_json(json.clone());
        let map = value.as_map().unwrap();

        let weights = map["weights"].as_tensor().unwrap();
        assert_eq!(weights.to_vec::<i64>().unwrap(), vec![6, 7, 8]);

        let inner = &map["batch"].as_list().unwrap()[0].as_list().unwrap()[0];
        assert_eq!(inner.as_tensor().unwrap().to_vec::<u8>().unwrap(), vec![1, 2]);

        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_broken_array_is_kept_as_map() {
        let json = json!({
            "rpc_tag": "__RPC_VAL_NDARRAY__",
            "dtype": "int64",
            "shape": [3],
            "data": "AAAA"
        });

        let value = Value::from_json(json.clone());
        let map = value.as_map().expect("kept as map");
        assert_eq!(map["dtype"].as_str(), Some("int64"));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_untagged_lookalike_is_not_sniffed() {
        let json = json!({"dtype": "int64", "shape": [1], "data": "AQAAAAAAAAA="});
        assert!(matches!(Value::from_json(json), Value::Map(_)));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(5i32).as_i64(), Some(5));
        assert_eq!(Value::from(2.5f64).as_f64(), Some(2.5));
        assert_eq!(Value::from(f64::NAN), Value::Null);
        assert_eq!(Value::from("ok").as_str(), Some("ok"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(
            Value::from(vec![1u8, 2]).to_json(),
            json!([1, 2])
        );
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let tensor = Tensor::from_slice(&[1.5f32, 2.5], None).unwrap();
        let value = Value::List(vec![Value::from("x"), Value::Array(tensor)]);

        let via_serde = serde_json::to_value(&value).unwrap();
        assert_eq!(via_serde, value.to_json());

        let back: Value = serde_json::from_value(via_serde).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_display() {
        let tensor = Tensor::from_slice(&[0i16; 4], Some(vec![2, 2])).unwrap();
        assert_eq!(Value::Array(tensor).to_string(), "int16[2, 2]");
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
    }
}
