//! Demo server

use anyhow::Result;
use clap::Args;
use unirpc_core::tensor::DType;
use unirpc_core::{Tensor, Value};
use unirpc_server::{CallArgs, HandleRegistry, HandlerError, RpcServer, DEFAULT_BIND};

use crate::config::FileConfig;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Registry with the demo handles
pub fn demo_handles() -> HandleRegistry {
    let mut registry = HandleRegistry::new();
    registry
        .register_fn("echo", echo)
        .register_fn("testfun", testfun)
        .register_fn("sum", sum)
        .register_fn("shape", shape);
    registry
}

/// Positional arguments come back unchanged
fn echo(call: CallArgs) -> Result<Vec<Value>, HandlerError> {
    Ok(call.args)
}

/// "ok", followed by the `array` keyword argument when one was sent
fn testfun(call: CallArgs) -> Result<Vec<Value>, HandlerError> {
    let mut out = vec![Value::from("ok")];
    if let Some(array) = call.kwarg("array") {
        out.push(array.clone());
    }
    Ok(out)
}

/// Sum of every number and every array element among the positional arguments
fn sum(call: CallArgs) -> Result<Vec<Value>, HandlerError> {
    let mut total = 0.0;
    for (i, value) in call.args.iter().enumerate() {
        total += match value {
            Value::Array(tensor) => tensor_f64(tensor)
                .ok_or_else(|| {
                    HandlerError::type_error(format!("cannot sum {} elements", tensor.dtype()))
                })?
                .iter()
                .sum(),
            other => other.as_f64().ok_or_else(|| {
                HandlerError::type_error(format!("argument {} is a {}, not a number", i, other.kind()))
            })?,
        };
    }
    Ok(vec![Value::from(total)])
}

/// Dtype and shape of the first positional argument
fn shape(call: CallArgs) -> Result<Vec<Value>, HandlerError> {
    let tensor = call.tensor(0)?;
    let dims: Vec<u64> = tensor.shape().iter().map(|&d| d as u64).collect();
    Ok(vec![Value::from(tensor.dtype().name()), Value::from(dims)])
}

/// Every element widened to `f64`; `None` for longdouble
pub(crate) fn tensor_f64(tensor: &Tensor) -> Option<Vec<f64>> {
    let values = match tensor.dtype() {
        DType::Int8 => tensor.to_vec::<i8>().ok()?.into_iter().map(f64::from).collect(),
        DType::Int16 => tensor.to_vec::<i16>().ok()?.into_iter().map(f64::from).collect(),
        DType::Int32 => tensor.to_vec::<i32>().ok()?.into_iter().map(f64::from).collect(),
        DType::Int64 => tensor.to_vec::<i64>().ok()?.into_iter().map(|v| v as f64).collect(),
        DType::UInt8 => tensor.to_vec::<u8>().ok()?.into_iter().map(f64::from).collect(),
        DType::UInt16 => tensor.to_vec::<u16>().ok()?.into_iter().map(f64::from).collect(),
        DType::UInt32 => tensor.to_vec::<u32>().ok()?.into_iter().map(f64::from).collect(),
        DType::UInt64 => tensor.to_vec::<u64>().ok()?.into_iter().map(|v| v as f64).collect(),
        DType::Float32 => tensor.to_vec::<f32>().ok()?.into_iter().map(f64::from).collect(),
        DType::Float64 => tensor.to_vec::<f64>().ok()?,
        DType::LongDouble => return None,
    };
    Some(values)
}

pub async fn run(args: ServeArgs, file: &FileConfig) -> Result<()> {
    let bind = args
        .bind
        .or_else(|| file.bind.clone())
        .unwrap_or_else(|| DEFAULT_BIND.to_string());

    let server = RpcServer::builder()
        .bind(bind)
        .handles(demo_handles())
        .build();
    let listener = server.bind().await?;

    server
        .serve_with_shutdown(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await?;
    Ok(())
}
