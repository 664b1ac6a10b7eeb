//! Registry of callable handles.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use unirpc_core::tensor::TensorError;
use unirpc_core::{Tensor, Value};

/// Failure raised by a handler, sent back as an error reply.
///
/// `exception` names the kind of failure, `descr` describes it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{exception}: {descr}")]
pub struct HandlerError {
    pub exception: String,
    pub descr: String,
}

impl HandlerError {
    pub fn new(exception: impl Into<String>, descr: impl Into<String>) -> Self {
        Self {
            exception: exception.into(),
            descr: descr.into(),
        }
    }

    /// An argument had the wrong kind or was missing
    pub fn type_error(descr: impl Into<String>) -> Self {
        Self::new("TypeError", descr)
    }

    /// An argument had the right kind but an unusable value
    pub fn value_error(descr: impl Into<String>) -> Self {
        Self::new("ValueError", descr)
    }
}

impl From<TensorError> for HandlerError {
    fn from(err: TensorError) -> Self {
        Self::value_error(err.to_string())
    }
}

/// Decoded arguments of one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new(args: Vec<Value>, kwargs: BTreeMap<String, Value>) -> Self {
        Self { args, kwargs }
    }

    /// Positional argument `index`, if given
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Keyword argument `name`, if given
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }

    /// Positional argument `index`, or a `TypeError` naming it
    pub fn require(&self, index: usize) -> Result<&Value, HandlerError> {
        self.get(index)
            .ok_or_else(|| HandlerError::type_error(format!("missing positional argument {}", index)))
    }

    /// Positional argument `index` as an array
    pub fn tensor(&self, index: usize) -> Result<&Tensor, HandlerError> {
        let value = self.require(index)?;
        value.as_tensor().ok_or_else(|| {
            HandlerError::type_error(format!("argument {} must be an array, got {}", index, value.kind()))
        })
    }
}

/// Boxed async handler
pub type HandlerFn = Arc<
    dyn Fn(CallArgs) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, HandlerError>> + Send>>
        + Send
        + Sync,
>;

/// Handles that can be called by name
#[derive(Clone, Default)]
pub struct HandleRegistry {
    handles: HashMap<String, HandlerFn>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler. An existing handler of the same name is replaced.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Value>, HandlerError>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |args: CallArgs| Box::pin(handler(args)) as Pin<Box<_>>);
        self.handles.insert(name.into(), handler);
        self
    }

    /// Register a synchronous handler
    pub fn register_fn<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(CallArgs) -> Result<Vec<Value>, HandlerError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.register(name, move |args: CallArgs| {
            let handler = Arc::clone(&handler);
            async move { handler(args) }
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handles.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&HandlerFn> {
        self.handles.get(name)
    }
}

impl fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("handles", &self.names())
            .finish()
    }
}
