//! Request/reply transports.
//!
//! A transport moves opaque frames: it sends one and can wait a bounded
//! time for one to come back. It knows nothing about envelopes.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, trace};
use unirpc_core::{encode_frame, FrameParser};

use crate::config::Endpoint;
use crate::error::TransportError;

/// Trait for frame transports
pub trait Transport: Send + 'static {
    /// Send exactly one frame
    fn send(&mut self, frame: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait up to `timeout` for one frame; `Ok(None)` means nothing arrived
    fn recv(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;

    /// Drop connection state so a late reply cannot be read as the answer
    /// to a later request
    fn reset(&mut self);

    /// Release the connection
    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Length-prefixed frames over a TCP connection.
///
/// The connection is opened eagerly by [`connect`](Self::connect) and
/// reopened on the next send after a [`reset`](Transport::reset).
pub struct TcpTransport {
    endpoint: Endpoint,
    connect_timeout: Duration,
    stream: Option<TcpStream>,
    parser: FrameParser,
}

impl TcpTransport {
    /// Connect to `endpoint`
    pub async fn connect(endpoint: Endpoint, connect_timeout: Duration) -> Result<Self, TransportError> {
        let stream = open_stream(&endpoint, connect_timeout).await?;
        Ok(Self {
            endpoint,
            connect_timeout,
            stream: Some(stream),
            parser: FrameParser::new(),
        })
    }

    /// Peer address
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether a connection is currently open
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn stream(&mut self) -> Result<&mut TcpStream, TransportError> {
        if self.stream.is_none() {
            debug!(endpoint = %self.endpoint, "reconnecting");
            let stream = open_stream(&self.endpoint, self.connect_timeout).await?;
            self.parser.clear();
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(TransportError::Disconnected)
    }
}

async fn open_stream(endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream, TransportError> {
    let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
    let stream = tokio::time::timeout(timeout, connect)
        .await
        .map_err(|_| TransportError::ConnectTimeout(endpoint.to_string()))??;
    stream.set_nodelay(true)?;
    debug!(%endpoint, "connected");
    Ok(stream)
}

impl Transport for TcpTransport {
    async fn send(&mut self, frame: Bytes) -> Result<(), TransportError> {
        let framed = encode_frame(&frame);
        let written = {
            let stream = self.stream().await?;
            stream.write_all(&framed).await
        };
        if let Err(e) = written {
            self.reset();
            return Err(e.into());
        }
        trace!(bytes = frame.len(), "frame sent");
        Ok(())
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Option<Bytes>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.parser.parse_frame() {
                Ok(Some(frame)) => {
                    trace!(bytes = frame.len(), "frame received");
                    return Ok(Some(frame));
                }
                Ok(None) => {}
                Err(e) => {
                    // the stream cannot be resynchronised past a bad header
                    self.reset();
                    return Err(e.into());
                }
            }

            let stream = self.stream.as_mut().ok_or(TransportError::Disconnected)?;
            let read = tokio::time::timeout_at(deadline, stream.read_buf(self.parser.buffer_mut())).await;
            match read {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    self.reset();
                    return Err(TransportError::Disconnected);
                }
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => {
                    self.reset();
                    return Err(e.into());
                }
            }
        }
    }

    fn reset(&mut self) {
        if self.stream.take().is_some() {
            debug!(endpoint = %self.endpoint, "connection reset");
        }
        self.parser.clear();
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.parser.clear();
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
            debug!(endpoint = %self.endpoint, "connection closed");
        }
        Ok(())
    }
}
