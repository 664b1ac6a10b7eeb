//! JSON wire codec for envelopes.
//!
//! Decoding never needs to know which variant to expect: the text is parsed
//! as generic JSON, the `rpc_tag` field selects the variant, and the
//! variant's fields are read from the same object.

use bytes::Bytes;
use serde::Deserialize;
use tracing::trace;

use crate::envelope::{Call, Envelope, RemoteError, RpcResult, Tag, TAG_FIELD};
use crate::error::{Result, WireError};

/// Serializes an envelope to its JSON text.
pub fn encode(envelope: &Envelope) -> Result<String> {
    serde_json::to_string(envelope).map_err(|e| WireError::Encode(e.to_string()))
}

/// Serializes an envelope to a frame payload.
pub fn encode_bytes(envelope: &Envelope) -> Result<Bytes> {
    serde_json::to_vec(envelope)
        .map(Bytes::from)
        .map_err(|e| WireError::Encode(e.to_string()))
}

/// Parses JSON text into an envelope.
pub fn decode(text: &str) -> Result<Envelope> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    decode_value(json)
}

/// Parses a frame payload into an envelope. Invalid UTF-8 is malformed input.
pub fn decode_slice(bytes: &[u8]) -> Result<Envelope> {
    let json: serde_json::Value = serde_json::from_slice(bytes)?;
    decode_value(json)
}

/// Interprets an already-parsed JSON value as an envelope.
pub fn decode_value(json: serde_json::Value) -> Result<Envelope> {
    let tag = match json.get(TAG_FIELD) {
        None | Some(serde_json::Value::Null) => return Err(WireError::MissingTag),
        Some(serde_json::Value::String(tag)) => tag.clone(),
        Some(other) => return Err(WireError::UnknownTag(other.to_string())),
    };

    trace!(rpc_tag = %tag, "decoding envelope");

    match Tag::from_wire(&tag) {
        Some(Tag::Call) => Ok(Envelope::Call(Call::deserialize(json)?)),
        Some(Tag::Result) => Ok(Envelope::Result(RpcResult::deserialize(json)?)),
        Some(Tag::Error) => Ok(Envelope::Error(RemoteError::deserialize(json)?)),
        // arrays are values, never top-level messages
        Some(Tag::ArrayValue) | None => Err(WireError::UnknownTag(tag)),
    }
}

/// Reads `handle` and `uid` from raw bytes on a best-effort basis.
///
/// Used to address an error reply to a request that failed to decode.
pub fn peek_identity(bytes: &[u8]) -> (Option<String>, Option<i64>) {
    let Ok(json) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return (None, None);
    };
    let handle = json
        .get("handle")
        .and_then(|h| h.as_str())
        .map(str::to_string);
    let uid = json.get("uid").and_then(|u| u.as_i64());
    (handle, uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;
    use unirpc_tensor::Tensor;

    fn roundtrip(envelope: Envelope) {
        let text = encode(&envelope).unwrap();
        assert_eq!(decode(&text).unwrap(), envelope);

        let bytes = encode_bytes(&envelope).unwrap();
        assert_eq!(decode_slice(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_call_roundtrip() {
        let weights = Tensor::from_slice(&[5.5f32, 6e-3, 7.00007, 80.08, 9.0], None).unwrap();
        roundtrip(Envelope::Call(
            Call::new("testfun", 69420)
                .arg(5)
                .arg(7)
                .arg(Value::Null)
                .kwarg("array", weights)
                .kwarg("label", "lul"),
        ));
        roundtrip(Envelope::Call(Call::new("noargs", -1)));
    }

    #[test]
    fn test_result_roundtrip() {
        let tensor = Tensor::from_rows(&[[1i32, 2], [3, 4]]);
        roundtrip(Envelope::Result(RpcResult::new(
            "testfun",
            666,
            vec![Value::from("some string"), Value::Array(tensor), Value::from(3.25)],
        )));
    }

    #[test]
    fn test_error_roundtrip() {
        roundtrip(Envelope::Error(RemoteError::new(
            Some("testfun".into()),
            Some(666),
            "ValueError",
            "whoops",
        )));
        roundtrip(Envelope::Error(RemoteError::new(None, None, "JSONDecodeError", "")));
    }

    #[test]
    fn test_call_field_layout() {
        let text = encode(&Envelope::Call(Call::new("testfun", 69420))).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            json,
            json!({
                "rpc_tag": "__RPC_CALL__",
                "handle": "testfun",
                "uid": 69420,
                "args": [],
                "kwargs": {}
            })
        );
        assert!(text.starts_with(r#"{"rpc_tag":"__RPC_CALL__""#));
    }

    #[test]
    fn test_error_field_layout() {
        let env = Envelope::Error(RemoteError::new(None, Some(3), "KeyError", "'x'"));
        let json: serde_json::Value = serde_json::from_str(&encode(&env).unwrap()).unwrap();
        assert_eq!(
            json,
            json!({
                "rpc_tag": "__RPC_ERROR__",
                "handle": null,
                "uid": 3,
                "exception": "KeyError",
                "descr": "'x'"
            })
        );
    }

    #[test]
    fn test_mixed_result_elements() {
        let text = r#"{"rpc_tag": "__RPC_RESULT__",
            "handle": "testfun",
            "uid": 666,
            "result": ["some string",
                {"rpc_tag": "__RPC_VAL_NDARRAY__",
                 "dtype": "int64",
                 "shape": [3],
                 "data": "BgAAAAAAAAAHAAAAAAAAAAgAAAAAAAAA"}]}"#;

        let Envelope::Result(res) = decode(text).unwrap() else {
            panic!("expected a result envelope");
        };
        assert_eq!(res.handle, "testfun");
        assert_eq!(res.uid, 666);
        assert_eq!(res.result[0], Value::from("some string"));

        let tensor = res.result[1].as_tensor().expect("element 1 is an array");
        assert_eq!(tensor.shape(), &[3]);
        assert_eq!(tensor.to_vec::<i64>().unwrap(), vec![6, 7, 8]);
    }

    #[test]
    fn test_result_with_broken_array_keeps_raw_element() {
        let text = r#"{"rpc_tag": "__RPC_RESULT__", "handle": "f", "uid": 1,
            "result": [{"rpc_tag": "__RPC_VAL_NDARRAY__", "dtype": "float128",
                        "shape": [1], "data": "AAAAAAAAAAAAAAAAAAAAAA=="}]}"#;

        let Envelope::Result(res) = decode(text).unwrap() else {
            panic!("expected a result envelope");
        };
        let raw = res.result[0].as_map().expect("kept as a map");
        assert_eq!(raw["dtype"].as_str(), Some("float128"));
    }

    #[test]
    fn test_call_kwargs_arrays_are_recovered() {
        let text = r#"{"rpc_tag": "__RPC_CALL__", "handle": "testfun", "uid": 666,
            "args": ["lul", "wut"],
            "kwargs": {"some string": {"rpc_tag": "__RPC_VAL_NDARRAY__",
                "dtype": "int64", "shape": [3],
                "data": "BgAAAAAAAAAHAAAAAAAAAAgAAAAAAAAA"}}}"#;

        let Envelope::Call(call) = decode(text).unwrap() else {
            panic!("expected a call envelope");
        };
        assert_eq!(call.args, vec![Value::from("lul"), Value::from("wut")]);
        let tensor = call.kwargs["some string"].as_tensor().unwrap();
        assert_eq!(tensor.to_vec::<i64>().unwrap(), vec![6, 7, 8]);
    }

    #[test]
    fn test_call_defaults_missing_collections() {
        let env = decode(r#"{"rpc_tag": "__RPC_CALL__", "handle": "f", "uid": 9}"#).unwrap();
        assert_eq!(env, Envelope::Call(Call::new("f", 9)));
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            decode(r#"{"rpc_tag": "__RPC_PING__", "handle": "f", "uid": 1}"#),
            Err(WireError::UnknownTag("__RPC_PING__".into()))
        );
        assert!(matches!(
            decode(r#"{"rpc_tag": 7, "handle": "f", "uid": 1}"#),
            Err(WireError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_array_is_not_a_top_level_envelope() {
        let text = r#"{"rpc_tag": "__RPC_VAL_NDARRAY__", "dtype": "uint8", "shape": [1], "data": "AQ=="}"#;
        assert_eq!(
            decode(text),
            Err(WireError::UnknownTag("__RPC_VAL_NDARRAY__".into()))
        );
    }

    #[test]
    fn test_missing_tag() {
        assert_eq!(
            decode(r#"{"handle": "f", "uid": 1, "result": []}"#),
            Err(WireError::MissingTag)
        );
        assert_eq!(decode(r#"{"rpc_tag": null}"#), Err(WireError::MissingTag));
        assert_eq!(decode("[1, 2, 3]"), Err(WireError::MissingTag));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(decode(""), Err(WireError::MalformedInput(_))));
        assert!(matches!(decode("{not json"), Err(WireError::MalformedInput(_))));
        assert!(matches!(
            decode_slice(&[0xff, 0xfe, 0x00]),
            Err(WireError::MalformedInput(_))
        ));
        // right tag, wrong field types
        assert!(matches!(
            decode(r#"{"rpc_tag": "__RPC_CALL__", "handle": "f", "uid": "one"}"#),
            Err(WireError::MalformedInput(_))
        ));
        assert!(matches!(
            decode(r#"{"rpc_tag": "__RPC_RESULT__", "uid": 1}"#),
            Err(WireError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_envelope_serde_impls() {
        let env = Envelope::Result(RpcResult::new("f", 2, vec![Value::from(1)]));
        let json = serde_json::to_value(&env).unwrap();
        let back: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);

        let err = serde_json::from_value::<Envelope>(json!({"uid": 1})).unwrap_err();
        assert!(err.to_string().contains("Missing rpc_tag"));
    }

    #[test]
    fn test_peek_identity() {
        assert_eq!(
            peek_identity(br#"{"handle": "f", "uid": 12, "rpc_tag": "bogus"}"#),
            (Some("f".to_string()), Some(12))
        );
        assert_eq!(peek_identity(b"garbage"), (None, None));
    }
}
