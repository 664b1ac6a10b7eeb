//! TCP request/reply server

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use unirpc_core::{encode_frame, wire, Envelope, FrameError, FrameParser, RemoteError, Value, WireError};

use crate::dispatch::dispatch_frame;
use crate::handles::{CallArgs, HandleRegistry, HandlerError};

/// Default listen address.
pub const DEFAULT_BIND: &str = "0.0.0.0:6789";

/// Reply kind for a reply that could not be serialized.
pub const ENCODE_FAILED: &str = "EncodeError";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Framing error: {0}")]
    Frame(#[from] FrameError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),
}

/// unirpc server
pub struct RpcServer {
    registry: Arc<HandleRegistry>,
    bind: String,
}

impl RpcServer {
    /// Create a server for `registry` on the default address
    pub fn new(registry: HandleRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            bind: DEFAULT_BIND.to_string(),
        }
    }

    /// Create a builder for configuring the server
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(&self.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind.clone(),
                source,
            })
    }

    /// Bind and serve until the process ends
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// Open connections are told to stop once `shutdown` fires; a request
    /// already being dispatched still gets its reply.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr()?;
        info!(addr = %local, handles = ?self.registry.names(), "unirpc server listening");

        let (conn_shutdown_tx, conn_shutdown_rx) = watch::channel(false);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("unirpc server shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let registry = Arc::clone(&self.registry);
                            let mut conn_shutdown = conn_shutdown_rx.clone();

                            tokio::spawn(async move {
                                debug!(%peer, "connection opened");
                                match handle_connection(stream, &registry, &mut conn_shutdown).await {
                                    Ok(()) => debug!(%peer, "connection closed"),
                                    Err(e) => warn!(%peer, error = %e, "connection ended"),
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "accept failed");
                        }
                    }
                }
            }
        }

        let _ = conn_shutdown_tx.send(true);
        Ok(())
    }
}

/// Answer every request frame on `stream` with exactly one reply frame
async fn handle_connection(
    mut stream: TcpStream,
    registry: &HandleRegistry,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<(), ServerError> {
    stream.set_nodelay(true)?;
    let mut parser = FrameParser::new();

    loop {
        while let Some(frame) = parser.parse_frame()? {
            let reply = dispatch_frame(registry, &frame).await;
            let payload = encode_reply(&reply)?;
            stream.write_all(&encode_frame(&payload)).await?;
        }

        let read = tokio::select! {
            read = stream.read_buf(parser.buffer_mut()) => read?,
            _ = shutdown.changed() => return Ok(()),
        };
        if read == 0 {
            return Ok(());
        }
    }
}

fn encode_reply(reply: &Envelope) -> Result<Bytes, WireError> {
    wire::encode_bytes(reply).or_else(|err| {
        warn!(error = %err, reply = %reply, "reply not serializable");
        let fallback = RemoteError::new(
            reply.handle().map(str::to_string),
            reply.uid(),
            ENCODE_FAILED,
            err.to_string(),
        );
        wire::encode_bytes(&fallback.into())
    })
}

/// Builder for creating a server
pub struct ServerBuilder {
    registry: HandleRegistry,
    bind: String,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandleRegistry::new(),
            bind: DEFAULT_BIND.to_string(),
        }
    }

    /// Set the listen address
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = addr.into();
        self
    }

    /// Start from an existing registry, dropping handles registered so far
    pub fn handles(mut self, registry: HandleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register an async handler
    pub fn register<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Value>, HandlerError>> + Send + 'static,
    {
        self.registry.register(name, handler);
        self
    }

    /// Register a synchronous handler
    pub fn register_fn<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(CallArgs) -> Result<Vec<Value>, HandlerError> + Send + Sync + 'static,
    {
        self.registry.register_fn(name, handler);
        self
    }

    /// Build the server
    pub fn build(self) -> RpcServer {
        RpcServer {
            registry: Arc::new(self.registry),
            bind: self.bind,
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
