//! Describe a captured wire frame
//!
//! Decodes one envelope and prints its header and every argument or
//! result, spelling out the contents of embedded arrays.

use std::fmt::{Debug, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use unirpc_core::tensor::{DType, TensorError};
use unirpc_core::{wire, Envelope, Tensor, Value};

/// Arrays longer than this are truncated in the output
const MAX_ELEMENTS: usize = 32;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// File holding the JSON text of one frame; `-` reads stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,
}

pub fn run(args: ExplainArgs) -> Result<()> {
    let text = if args.input.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read from stdin")?
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("Failed to read frame file: {}", args.input.display()))?
    };
    print!("{}", explain(&text)?);
    Ok(())
}

/// Render a human-readable description of one frame
pub fn explain(text: &str) -> Result<String> {
    let envelope = wire::decode(text.trim()).context("Invalid input")?;

    let mut out = String::new();
    writeln!(out, "tag:    {}", envelope.tag())?;
    writeln!(out, "handle: {}", envelope.handle().unwrap_or("-"))?;
    match envelope.uid() {
        Some(uid) => writeln!(out, "uid:    {}", uid)?,
        None => writeln!(out, "uid:    -")?,
    }

    match &envelope {
        Envelope::Call(call) => {
            for (i, arg) in call.args.iter().enumerate() {
                writeln!(out, "args[{}]: {}", i, describe_value(arg))?;
            }
            for (name, arg) in &call.kwargs {
                writeln!(out, "kwargs[{:?}]: {}", name, describe_value(arg))?;
            }
        }
        Envelope::Result(res) => {
            for (i, value) in res.result.iter().enumerate() {
                writeln!(out, "result[{}]: {}", i, describe_value(value))?;
            }
        }
        Envelope::Error(err) => {
            writeln!(out, "exception: {}", err.exception)?;
            writeln!(out, "descr:     {}", err.descr)?;
        }
    }
    Ok(out)
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Array(tensor) => describe_tensor(tensor),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(describe_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{:?}: {}", k, describe_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        other => other.to_string(),
    }
}

fn describe_tensor(tensor: &Tensor) -> String {
    let values = match tensor.dtype() {
        DType::Int8 => format_values(tensor.to_vec::<i8>()),
        DType::Int16 => format_values(tensor.to_vec::<i16>()),
        DType::Int32 => format_values(tensor.to_vec::<i32>()),
        DType::Int64 => format_values(tensor.to_vec::<i64>()),
        DType::UInt8 => format_values(tensor.to_vec::<u8>()),
        DType::UInt16 => format_values(tensor.to_vec::<u16>()),
        DType::UInt32 => format_values(tensor.to_vec::<u32>()),
        DType::UInt64 => format_values(tensor.to_vec::<u64>()),
        DType::Float32 => format_values(tensor.to_vec::<f32>()),
        DType::Float64 => format_values(tensor.to_vec::<f64>()),
        DType::LongDouble => format!("<{} elements, not portable>", tensor.numel()),
    };
    format!("{} = {}", tensor, values)
}

fn format_values<T: Debug>(values: Result<Vec<T>, TensorError>) -> String {
    match values {
        Ok(values) if values.len() > MAX_ELEMENTS => {
            let shown: Vec<String> = values[..MAX_ELEMENTS].iter().map(|v| format!("{:?}", v)).collect();
            format!("[{}, ... {} more]", shown.join(", "), values.len() - MAX_ELEMENTS)
        }
        Ok(values) => format!("{:?}", values),
        Err(e) => format!("<{}>", e),
    }
}
