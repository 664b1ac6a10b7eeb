//! The request/reply channel.
//!
//! A channel owns one transport and allows one outstanding call at a time.
//! A second call issued while the first is waiting fails immediately with
//! [`ChannelError::ChannelBusy`]; nothing is queued.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use unirpc_core::{wire, Call, Envelope, Reply, Uid, Value};

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::transport::{TcpTransport, Transport};

/// Observable state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Ready to send a call
    Idle,
    /// A call has been sent and its reply is pending
    AwaitingReply,
    /// The channel was closed
    Closed,
}

impl ChannelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::AwaitingReply,
            2 => Self::Closed,
            _ => Self::Idle,
        }
    }
}

/// Marks the channel as awaiting a reply until dropped
struct InFlight<'a> {
    state: &'a AtomicU8,
}

impl<'a> InFlight<'a> {
    fn enter(state: &'a AtomicU8) -> Self {
        state.store(ChannelState::AwaitingReply as u8, Ordering::Release);
        Self { state }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let _ = self.state.compare_exchange(
            ChannelState::AwaitingReply as u8,
            ChannelState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

/// Synchronous request/reply channel
pub struct RpcChannel<T: Transport = TcpTransport> {
    transport: Mutex<Option<T>>,
    config: ChannelConfig,
    next_uid: AtomicI64,
    state: AtomicU8,
    /// Set while a sent request has no consumed reply; a call abandoned
    /// in that window leaves its reply on the connection
    stale: AtomicBool,
}

impl RpcChannel<TcpTransport> {
    /// Connect to the configured endpoint
    pub async fn open(config: ChannelConfig) -> Result<Self> {
        let transport = TcpTransport::connect(config.endpoint.clone(), config.connect_timeout).await?;
        debug!(endpoint = %config.endpoint, "channel open");
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> RpcChannel<T> {
    /// Wrap an already connected transport
    pub fn with_transport(transport: T, config: ChannelConfig) -> Self {
        let seed = rand::thread_rng().gen_range(1..=i64::from(i32::MAX));
        Self {
            transport: Mutex::new(Some(transport)),
            config,
            next_uid: AtomicI64::new(seed),
            state: AtomicU8::new(ChannelState::Idle as u8),
            stale: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Allocate a fresh uid
    pub fn next_uid(&self) -> Uid {
        self.next_uid.fetch_add(1, Ordering::Relaxed)
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Send `call` and wait for its reply using the configured timeout.
    ///
    /// A remote failure is returned as `Ok(Reply::Error(..))`.
    pub async fn call(&self, call: Call) -> Result<Reply> {
        self.call_with_timeout(call, self.config.timeout).await
    }

    /// Send `call` and wait at most `timeout` for its reply
    #[instrument(
        skip(self, call),
        fields(rpc.handle = %call.handle, rpc.uid = call.uid, rpc.system = "unirpc")
    )]
    pub async fn call_with_timeout(&self, call: Call, timeout: Duration) -> Result<Reply> {
        let uid = call.uid;
        let frame = wire::encode_bytes(&Envelope::Call(call))?;
        self.exchange(frame, Some(uid), timeout).await
    }

    /// Send pre-encoded envelope text.
    ///
    /// The reply uid is checked against the `uid` found in `text`, if any.
    pub async fn call_text(&self, text: &str, timeout: Duration) -> Result<Reply> {
        let (_, uid) = wire::peek_identity(text.as_bytes());
        self.exchange(Bytes::copy_from_slice(text.as_bytes()), uid, timeout)
            .await
    }

    /// Build and send a call to `handle` with a freshly allocated uid
    pub async fn invoke(
        &self,
        handle: &str,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Reply> {
        let call = Call::new(handle, self.next_uid())
            .with_args(args)
            .with_kwargs(kwargs);
        self.call(call).await
    }

    /// Release the transport. Later calls fail with [`ChannelError::Closed`].
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.transport.lock().await;
        if let Some(mut transport) = guard.take() {
            self.state.store(ChannelState::Closed as u8, Ordering::Release);
            transport.close().await?;
            debug!("channel closed");
        }
        Ok(())
    }

    async fn exchange(&self, frame: Bytes, uid: Option<Uid>, timeout: Duration) -> Result<Reply> {
        let mut guard = self
            .transport
            .try_lock()
            .map_err(|_| ChannelError::ChannelBusy)?;
        let transport = guard.as_mut().ok_or(ChannelError::Closed)?;

        if self.stale.swap(false, Ordering::AcqRel) {
            debug!("dropping connection of an abandoned call");
            transport.reset();
        }

        let _in_flight = InFlight::enter(&self.state);
        self.stale.store(true, Ordering::Release);
        let received = match transport.send(frame).await {
            Ok(()) => transport.recv(timeout).await,
            Err(e) => Err(e),
        };
        self.stale.store(false, Ordering::Release);

        let Some(bytes) = received? else {
            warn!(?timeout, "no reply");
            transport.reset();
            return Err(ChannelError::Timeout(timeout));
        };

        let reply = wire::decode_slice(&bytes)?
            .into_reply()
            .map_err(|_| ChannelError::UnexpectedCall)?;

        if self.config.check_correlation {
            if let (Some(expected), Some(found)) = (uid, reply.uid()) {
                if expected != found {
                    warn!(expected, found, "reply uid mismatch");
                    transport.reset();
                    return Err(ChannelError::CorrelationMismatch { expected, found });
                }
            }
        }

        debug!(is_error = reply.is_error(), "reply received");
        Ok(reply)
    }
}
