//! Optional YAML defaults for the command line.
//!
//! ```yaml
//! endpoint: tcp://gamehost:6789
//! timeout_ms: 500
//! bind: 0.0.0.0:6789
//! log_level: debug
//! ```
//!
//! Flags always win over values read here.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Peer to call
    pub endpoint: Option<String>,
    /// Reply timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Address `serve` listens on
    pub bind: Option<String>,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Load from `path`, or return empty defaults when no path was given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = FileConfig::parse(
            "endpoint: tcp://gamehost:7000\ntimeout_ms: 250\nbind: 127.0.0.1:7000\nlog_level: debug\n",
        )
        .unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("tcp://gamehost:7000"));
        assert_eq!(config.timeout_ms, Some(250));
        assert_eq!(config.bind.as_deref(), Some("127.0.0.1:7000"));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_partial_and_empty() {
        let config = FileConfig::parse("timeout_ms: 100").unwrap();
        assert_eq!(config.endpoint, None);
        assert_eq!(config.timeout_ms, Some(100));

        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(FileConfig::parse("endpont: localhost").is_err());
    }

    #[test]
    fn test_missing_path_is_default() {
        assert_eq!(FileConfig::load(None).unwrap(), FileConfig::default());
    }
}
