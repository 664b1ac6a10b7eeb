pub mod call;
pub mod explain;
pub mod serve;

use anyhow::{Context, Result};

/// Read an argument given inline, as `@path`, or as `-` for stdin
pub(crate) fn read_input(input: &str) -> Result<String> {
    if let Some(path) = input.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read input file: {}", path))
    } else if input == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read from stdin")
    } else {
        Ok(input.to_string())
    }
}
