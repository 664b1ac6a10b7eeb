//! Channel configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default reply timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default port of a unirpc peer.
pub const DEFAULT_PORT: u16 = 6789;

/// Address of a peer.
///
/// Parses `tcp://host:port`, `host:port`, or a bare host (default port).
/// IPv6 literals are written in brackets, as in `tcp://[::1]:6789`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the `tcp://host:port` form.
    pub fn to_url(&self) -> String {
        format!("tcp://{}", self)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid endpoint `{0}`")]
pub struct InvalidEndpoint(pub String);

impl FromStr for Endpoint {
    type Err = InvalidEndpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidEndpoint(s.to_string());
        let rest = s.strip_prefix("tcp://").unwrap_or(s);
        let (host, port) = match rest.strip_prefix('[') {
            Some(bracketed) => {
                let (host, tail) = bracketed.split_once(']').ok_or_else(invalid)?;
                match tail {
                    "" => (host, None),
                    _ => (host, Some(tail.strip_prefix(':').ok_or_else(invalid)?)),
                }
            }
            None => match rest.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (rest, None),
            },
        };
        let port = match port {
            Some(port) => port.parse().map_err(|_| invalid())?,
            None => DEFAULT_PORT,
        };
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(host, port))
    }
}

/// Channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Peer address
    pub endpoint: Endpoint,
    /// How long a call waits for its reply
    pub timeout: Duration,
    /// How long opening the connection may take
    pub connect_timeout: Duration,
    /// Reject replies whose uid differs from the request's
    pub check_correlation: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(5),
            check_correlation: true,
        }
    }
}

impl ChannelConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Set the reply timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable reply uid checking
    pub fn check_correlation(mut self, enabled: bool) -> Self {
        self.check_correlation = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint() {
        assert_eq!(
            "tcp://localhost:6789".parse::<Endpoint>().unwrap(),
            Endpoint::new("localhost", 6789)
        );
        assert_eq!(
            "10.0.0.2:7000".parse::<Endpoint>().unwrap(),
            Endpoint::new("10.0.0.2", 7000)
        );
        assert_eq!(
            "gamehost".parse::<Endpoint>().unwrap(),
            Endpoint::new("gamehost", DEFAULT_PORT)
        );
        assert!("tcp://:80".parse::<Endpoint>().is_err());
        assert!("host:notaport".parse::<Endpoint>().is_err());
        assert!("host:70000".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_parse_ipv6_endpoint() {
        let ep = "tcp://[::1]:6789".parse::<Endpoint>().unwrap();
        assert_eq!(ep, Endpoint::new("::1", 6789));
        assert_eq!(ep.to_url(), "tcp://[::1]:6789");
        assert_eq!(
            "[fe80::2]".parse::<Endpoint>().unwrap(),
            Endpoint::new("fe80::2", DEFAULT_PORT)
        );
        assert!("[::1".parse::<Endpoint>().is_err());
        assert!("[::1]6789".parse::<Endpoint>().is_err());
        assert!("[]:6789".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_endpoint_display() {
        let ep = Endpoint::new("localhost", 6789);
        assert_eq!(ep.to_string(), "localhost:6789");
        assert_eq!(ep.to_url(), "tcp://localhost:6789");
    }

    #[test]
    fn test_config_defaults() {
        let config = ChannelConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.endpoint, Endpoint::default());
        assert!(config.check_correlation);

        let config = ChannelConfig::new(Endpoint::new("h", 1))
            .timeout(Duration::from_millis(50))
            .check_correlation(false);
        assert_eq!(config.timeout, Duration::from_millis(50));
        assert!(!config.check_correlation);
    }
}
