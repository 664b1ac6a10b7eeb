//! Client side of the unirpc protocol.
//!
//! ```no_run
//! use unirpc_client::{ChannelConfig, RpcChannel};
//! use unirpc_core::Call;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let channel = RpcChannel::open(ChannelConfig::default()).await?;
//! let reply = channel.call(Call::new("testfun", 69420)).await?;
//! println!("{:?}", reply.into_result()?);
//! channel.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod transport;

pub use channel::{ChannelState, RpcChannel};
pub use config::{ChannelConfig, Endpoint, InvalidEndpoint, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use error::{ChannelError, Result, TransportError};
pub use transport::{TcpTransport, Transport};
