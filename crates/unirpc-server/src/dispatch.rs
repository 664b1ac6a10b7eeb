//! Turns one request into exactly one reply.
//!
//! Every failure, including a request that cannot be decoded, becomes an
//! error envelope. Nothing here returns `Err`.

use tracing::{debug, warn};
use unirpc_core::{wire, Call, Envelope, RemoteError, RpcResult};

use crate::handles::{CallArgs, HandleRegistry};

/// Reply kind for a request that is not a call.
pub const INVALID_CALL: &str = "InvalidCall";

/// Reply kind for a call naming no registered handle.
pub const UNKNOWN_HANDLE: &str = "UnknownHandle";

/// Reply kind for a request that could not be decoded.
pub const MALFORMED_INPUT: &str = "MalformedInput";

/// Reply kind for a handler that panicked.
pub const HANDLER_PANIC: &str = "HandlerPanic";

/// Dispatch a decoded envelope to its handle
pub async fn dispatch(registry: &HandleRegistry, envelope: Envelope) -> Envelope {
    let call = match envelope {
        Envelope::Call(call) => call,
        other => {
            warn!(envelope = %other, "not a call");
            return RemoteError::new(
                other.handle().map(str::to_string),
                other.uid(),
                INVALID_CALL,
                format!("Invalid RPC call: expected {}, got {}", unirpc_core::Tag::Call, other.tag()),
            )
            .into();
        }
    };

    dispatch_call(registry, call).await
}

/// Decode a request frame and dispatch it
pub async fn dispatch_frame(registry: &HandleRegistry, frame: &[u8]) -> Envelope {
    match wire::decode_slice(frame) {
        Ok(envelope) => dispatch(registry, envelope).await,
        Err(err) => {
            let (handle, uid) = wire::peek_identity(frame);
            warn!(error = %err, ?handle, ?uid, "undecodable request");
            RemoteError::new(handle, uid, MALFORMED_INPUT, err.to_string()).into()
        }
    }
}

async fn dispatch_call(registry: &HandleRegistry, call: Call) -> Envelope {
    let Call {
        handle,
        uid,
        args,
        kwargs,
    } = call;

    let Some(handler) = registry.get(&handle) else {
        warn!(%handle, uid, "unknown handle");
        let descr = format!("Invalid RPC call: unknown handle `{}`", handle);
        return RemoteError::new(Some(handle), Some(uid), UNKNOWN_HANDLE, descr).into();
    };

    debug!(%handle, uid, args = args.len(), kwargs = kwargs.len(), "dispatching call");

    // run on its own task so a panicking handler still gets a reply
    let outcome = tokio::spawn(handler(CallArgs::new(args, kwargs))).await;

    match outcome {
        Ok(Ok(result)) => {
            debug!(%handle, uid, values = result.len(), "returning result");
            RpcResult::new(handle, uid, result).into()
        }
        Ok(Err(err)) => {
            debug!(%handle, uid, error = %err, "returning error");
            RemoteError::new(Some(handle), Some(uid), err.exception, err.descr).into()
        }
        Err(join_err) => {
            warn!(%handle, uid, error = %join_err, "handler did not complete");
            RemoteError::new(Some(handle), Some(uid), HANDLER_PANIC, join_err.to_string()).into()
        }
    }
}
