//! The tagged envelope model.
//!
//! Every message carries an identity header (`rpc_tag`, `handle`, `uid`).
//! The tag alone decides which of the remaining fields exist:
//!
//! | tag              | fields                 |
//! |------------------|------------------------|
//! | `__RPC_CALL__`   | `args`, `kwargs`       |
//! | `__RPC_RESULT__` | `result`               |
//! | `__RPC_ERROR__`  | `exception`, `descr`   |
//!
//! Arrays (`__RPC_VAL_NDARRAY__`) share the tag field but are values, not
//! messages; they only ever appear nested inside the collections above.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use unirpc_tensor::ARRAY_VALUE_TAG;

use crate::value::Value;

/// JSON field holding the tag.
pub const TAG_FIELD: &str = "rpc_tag";

/// Caller-chosen correlation id.
pub type Uid = i64;

/// Discriminator carried in the `rpc_tag` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    #[serde(rename = "__RPC_CALL__")]
    Call,
    #[serde(rename = "__RPC_RESULT__")]
    Result,
    #[serde(rename = "__RPC_ERROR__")]
    Error,
    #[serde(rename = "__RPC_VAL_NDARRAY__")]
    ArrayValue,
}

impl Tag {
    /// Returns the wire literal for this tag.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Tag::Call => "__RPC_CALL__",
            Tag::Result => "__RPC_RESULT__",
            Tag::Error => "__RPC_ERROR__",
            Tag::ArrayValue => ARRAY_VALUE_TAG,
        }
    }

    /// Parses a wire literal.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "__RPC_CALL__" => Some(Tag::Call),
            "__RPC_RESULT__" => Some(Tag::Result),
            "__RPC_ERROR__" => Some(Tag::Error),
            ARRAY_VALUE_TAG => Some(Tag::ArrayValue),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to invoke `handle` on the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub handle: String,
    pub uid: Uid,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
}

impl Call {
    /// Creates a call with no arguments.
    pub fn new(handle: impl Into<String>, uid: Uid) -> Self {
        Self {
            handle: handle.into(),
            uid,
            args: Vec::new(),
            kwargs: BTreeMap::new(),
        }
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a keyword argument, replacing any earlier value for `name`.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Replaces all positional arguments.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Replaces all keyword arguments.
    pub fn with_kwargs(mut self, kwargs: BTreeMap<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }
}

/// A successful reply. Multiple return values travel as multiple elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResult {
    pub handle: String,
    pub uid: Uid,
    #[serde(default)]
    pub result: Vec<Value>,
}

impl RpcResult {
    pub fn new(handle: impl Into<String>, uid: Uid, result: Vec<Value>) -> Self {
        Self {
            handle: handle.into(),
            uid,
            result,
        }
    }
}

/// A failure raised on the peer, carried as a normal reply.
///
/// `handle` and `uid` are null when the peer could not read them from the
/// request it failed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{exception}: {descr}")]
pub struct RemoteError {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub uid: Option<Uid>,
    pub exception: String,
    #[serde(default)]
    pub descr: String,
}

impl RemoteError {
    pub fn new(
        handle: Option<String>,
        uid: Option<Uid>,
        exception: impl Into<String>,
        descr: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            uid,
            exception: exception.into(),
            descr: descr.into(),
        }
    }
}

/// Any top-level message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rpc_tag")]
pub enum Envelope {
    #[serde(rename = "__RPC_CALL__")]
    Call(Call),
    #[serde(rename = "__RPC_RESULT__")]
    Result(RpcResult),
    #[serde(rename = "__RPC_ERROR__")]
    Error(RemoteError),
}

impl Envelope {
    pub fn tag(&self) -> Tag {
        match self {
            Envelope::Call(_) => Tag::Call,
            Envelope::Result(_) => Tag::Result,
            Envelope::Error(_) => Tag::Error,
        }
    }

    pub fn handle(&self) -> Option<&str> {
        match self {
            Envelope::Call(call) => Some(&call.handle),
            Envelope::Result(res) => Some(&res.handle),
            Envelope::Error(err) => err.handle.as_deref(),
        }
    }

    pub fn uid(&self) -> Option<Uid> {
        match self {
            Envelope::Call(call) => Some(call.uid),
            Envelope::Result(res) => Some(res.uid),
            Envelope::Error(err) => err.uid,
        }
    }

    /// Narrows to a reply; a `Call` is handed back unchanged.
    pub fn into_reply(self) -> Result<Reply, Call> {
        match self {
            Envelope::Call(call) => Err(call),
            Envelope::Result(res) => Ok(Reply::Result(res)),
            Envelope::Error(err) => Ok(Reply::Error(err)),
        }
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        crate::wire::decode_value(json).map_err(serde::de::Error::custom)
    }
}

impl From<Call> for Envelope {
    fn from(call: Call) -> Self {
        Envelope::Call(call)
    }
}

impl From<RpcResult> for Envelope {
    fn from(res: RpcResult) -> Self {
        Envelope::Result(res)
    }
}

impl From<RemoteError> for Envelope {
    fn from(err: RemoteError) -> Self {
        Envelope::Error(err)
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uid = self
            .uid()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "ID {} is {} for {}",
            uid,
            self.tag(),
            self.handle().unwrap_or("-")
        )
    }
}

/// What a call can come back as.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Result(RpcResult),
    Error(RemoteError),
}

impl Reply {
    pub fn uid(&self) -> Option<Uid> {
        match self {
            Reply::Result(res) => Some(res.uid),
            Reply::Error(err) => err.uid,
        }
    }

    pub fn handle(&self) -> Option<&str> {
        match self {
            Reply::Result(res) => Some(&res.handle),
            Reply::Error(err) => err.handle.as_deref(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Unwraps the result values, turning a remote failure into `Err`.
    pub fn into_result(self) -> Result<Vec<Value>, RemoteError> {
        match self {
            Reply::Result(res) => Ok(res.result),
            Reply::Error(err) => Err(err),
        }
    }
}

impl From<Reply> for Envelope {
    fn from(reply: Reply) -> Self {
        match reply {
            Reply::Result(res) => Envelope::Result(res),
            Reply::Error(err) => Envelope::Error(err),
        }
    }
}
