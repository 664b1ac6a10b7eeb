//! CLI tool for unirpc.
//!
//! Provides commands for:
//! - call: Invoking a handle on a peer
//! - serve: Running a demo peer
//! - explain: Describing a captured frame

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{call, explain, serve};
use tracing_subscriber::EnvFilter;
use unirpc_client::{ChannelError, InvalidEndpoint, TransportError};
use unirpc_core::RemoteError;

use crate::config::FileConfig;

#[derive(Parser)]
#[command(name = "unirpc")]
#[command(about = "CLI tool for unirpc", long_about = None)]
#[command(version)]
struct Cli {
    /// YAML file with endpoint, timeout and bind defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a handle and print the reply
    Call(call::CallArgs),
    /// Run a demo server
    Serve(serve::ServeArgs),
    /// Describe a captured frame
    Explain(explain::ExplainArgs),
}

fn init_tracing(level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level.unwrap_or("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit status for a failed command
fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.downcast_ref::<RemoteError>().is_some() {
            return 4;
        }
        if let Some(e) = cause.downcast_ref::<ChannelError>() {
            return match e {
                ChannelError::Timeout(_) | ChannelError::Transport(_) => 3,
                _ => 1,
            };
        }
        if cause.downcast_ref::<TransportError>().is_some() {
            return 3;
        }
        if cause.downcast_ref::<InvalidEndpoint>().is_some()
            || cause.downcast_ref::<serde_json::Error>().is_some()
            || cause.downcast_ref::<serde_yaml::Error>().is_some()
        {
            return 2;
        }
    }
    if err.to_string().starts_with("Invalid input") {
        return 2;
    }
    1
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let file = match FileConfig::load(cli.config.as_deref()) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };
    init_tracing(file.log_level.as_deref());

    let result = match cli.command {
        Commands::Call(args) => call::run(args, &file).await,
        Commands::Serve(args) => serve::run(args, &file).await,
        Commands::Explain(args) => explain::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}
