//! Server side of the unirpc protocol.
//!
//! This crate provides:
//! - A registry of named handles
//! - Dispatch of one request to one reply
//! - A TCP server runtime
//!
//! ```no_run
//! use unirpc_core::Value;
//! use unirpc_server::RpcServer;
//!
//! # async fn run() -> Result<(), unirpc_server::ServerError> {
//! RpcServer::builder()
//!     .bind("127.0.0.1:6789")
//!     .register_fn("testfun", |_| Ok(vec![Value::from("ok")]))
//!     .build()
//!     .serve()
//!     .await
//! # }
//! ```

pub mod dispatch;
pub mod handles;
pub mod server;

pub use dispatch::{dispatch, dispatch_frame, HANDLER_PANIC, INVALID_CALL, MALFORMED_INPUT, UNKNOWN_HANDLE};
pub use handles::{CallArgs, HandleRegistry, HandlerError, HandlerFn};
pub use server::{RpcServer, ServerBuilder, ServerError, DEFAULT_BIND, ENCODE_FAILED};
