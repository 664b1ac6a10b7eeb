//! Call a remote handle and print the reply

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use unirpc_client::{ChannelConfig, Endpoint, RpcChannel, DEFAULT_TIMEOUT};
use unirpc_core::{Call, Envelope, Reply, Value};

use super::read_input;
use crate::config::FileConfig;

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Name of the handle to invoke
    pub handle: String,

    /// Positional arguments: a JSON array, @file, or - for stdin
    #[arg(short, long)]
    pub args: Option<String>,

    /// Keyword arguments: a JSON object, @file, or - for stdin
    #[arg(short, long)]
    pub kwargs: Option<String>,

    /// Peer address (tcp://host:port)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Reply timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Correlation id to send; picked automatically when omitted
    #[arg(long)]
    pub uid: Option<i64>,

    /// Pretty-print the reply
    #[arg(long)]
    pub pretty: bool,
}

impl CallArgs {
    fn channel_config(&self, file: &FileConfig) -> Result<ChannelConfig> {
        let endpoint = match self.endpoint.as_deref().or(file.endpoint.as_deref()) {
            Some(s) => s.parse::<Endpoint>().context("Invalid input")?,
            None => Endpoint::default(),
        };
        let timeout = self
            .timeout_ms
            .or(file.timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TIMEOUT);
        Ok(ChannelConfig::new(endpoint).timeout(timeout))
    }
}

/// Parse `--args` as a JSON array
pub fn parse_args(input: Option<&str>) -> Result<Vec<Value>> {
    let Some(input) = input else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<serde_json::Value>(&read_input(input)?).context("Invalid input: --args")? {
        serde_json::Value::Array(items) => Ok(items.into_iter().map(Value::from_json).collect()),
        other => bail!("Invalid input: --args must be a JSON array, got {}", other),
    }
}

/// Parse `--kwargs` as a JSON object
pub fn parse_kwargs(input: Option<&str>) -> Result<BTreeMap<String, Value>> {
    let Some(input) = input else {
        return Ok(BTreeMap::new());
    };
    match serde_json::from_str::<serde_json::Value>(&read_input(input)?).context("Invalid input: --kwargs")? {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, Value::from_json(v)))
            .collect()),
        other => bail!("Invalid input: --kwargs must be a JSON object, got {}", other),
    }
}

fn render(reply: &Reply, pretty: bool) -> Result<String> {
    let envelope = Envelope::from(reply.clone());
    let text = if pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    Ok(text)
}

pub async fn run(args: CallArgs, file: &FileConfig) -> Result<()> {
    let config = args.channel_config(file)?;
    let call_args = parse_args(args.args.as_deref())?;
    let call_kwargs = parse_kwargs(args.kwargs.as_deref())?;

    tracing::debug!(endpoint = %config.endpoint, timeout = ?config.timeout, "opening channel");
    let channel = RpcChannel::open(config)
        .await
        .context("Connection failed")?;

    let uid = args.uid.unwrap_or_else(|| channel.next_uid());
    let call = Call::new(args.handle, uid)
        .with_args(call_args)
        .with_kwargs(call_kwargs);

    let reply = channel.call(call).await;
    if let Err(e) = channel.close().await {
        tracing::debug!(error = %e, "close failed");
    }
    let reply = reply.context("RPC call failed")?;

    println!("{}", render(&reply, args.pretty)?);

    match reply {
        Reply::Result(_) => Ok(()),
        Reply::Error(err) => Err(err.into()),
    }
}
