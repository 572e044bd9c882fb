//! Server Configuration
//!
//! Where the server listens and how much it is willing to buffer per
//! connection.

use std::time::Duration;
use thiserror::Error;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

/// The default port StatePort listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host StatePort binds to
pub const DEFAULT_HOST: &str = "localhost";

/// The default path prefix clients connect to
pub const DEFAULT_PATH: &str = "/";

/// Largest text message accepted from a client (64 KB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Per-connection receive buffer (4 KB)
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Largest HTTP upgrade request head accepted (8 KB)
pub const DEFAULT_MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Time a client has to complete the upgrade handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors in a server address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported scheme in {0:?} (expected ws:// or http://)")]
    UnsupportedScheme(String),

    #[error("missing host in {0:?}")]
    MissingHost(String),

    #[error("invalid port: {0:?}")]
    InvalidPort(String),
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Path prefix that accepts upgrades
    pub path: String,
    /// Largest message (and frame) accepted from a client
    pub max_message_size: usize,
    /// Size of each connection's receive buffer
    pub read_buffer_size: usize,
    /// Largest upgrade request head accepted
    pub max_request_head: usize,
    /// Time allowed for the upgrade handshake
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_request_head: DEFAULT_MAX_REQUEST_HEAD,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration for `host:port` with default limits.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the path prefix, adding the leading `/` if missing.
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = normalize_path(path);
        self
    }

    /// Parses an address such as `ws://localhost:8080/` or
    /// `http://0.0.0.0:9000/state`.
    ///
    /// A missing port defaults to 80, a missing path to `/`.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let rest = strip_scheme(url, "ws://")
            .or_else(|| strip_scheme(url, "http://"))
            .ok_or_else(|| ConfigError::UnsupportedScheme(url.to_string()))?;

        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, DEFAULT_PATH),
        };

        let (host, port) = split_authority(authority)?;
        if host.is_empty() {
            return Err(ConfigError::MissingHost(url.to_string()));
        }

        Ok(Self::new(host, port).with_path(path))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The URL clients connect to.
    pub fn url(&self) -> String {
        format!("ws://{}{}", self.bind_address(), self.path)
    }

    /// Codec limits applied to every upgraded connection.
    pub fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .read_buffer_size(self.read_buffer_size)
            .max_message_size(Some(self.max_message_size))
            .max_frame_size(Some(self.max_message_size))
    }
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let head = url.get(..scheme.len())?;
    if head.eq_ignore_ascii_case(scheme) {
        Some(&url[scheme.len()..])
    } else {
        None
    }
}

fn split_authority(authority: &str) -> Result<(&str, u16), ConfigError> {
    // [::1]:8080
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| ConfigError::MissingHost(authority.to_string()))?;
        return match after.strip_prefix(':') {
            Some(port) => Ok((host, parse_port(port)?)),
            None if after.is_empty() => Ok((host, 80)),
            None => Err(ConfigError::InvalidPort(after.to_string())),
        };
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((host, parse_port(port)?)),
        None => Ok((authority, 80)),
    }
}

fn parse_port(port: &str) -> Result<u16, ConfigError> {
    port.parse()
        .map_err(|_| ConfigError::InvalidPort(port.to_string()))
}

fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "localhost:8080");
        assert_eq!(config.url(), "ws://localhost:8080/");
        assert_eq!(config.max_message_size, 64 * 1024);
    }

    #[test]
    fn test_from_url() {
        let config = ServerConfig::from_url("ws://localhost:8080/").unwrap();
        assert_eq!(config, ServerConfig::default());

        let config = ServerConfig::from_url("http://0.0.0.0:9000/state").unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.path, "/state");
    }

    #[test]
    fn test_from_url_defaults() {
        let config = ServerConfig::from_url("WS://example.local").unwrap();
        assert_eq!(config.host, "example.local");
        assert_eq!(config.port, 80);
        assert_eq!(config.path, "/");
    }

    #[test]
    fn test_from_url_ipv6() {
        let config = ServerConfig::from_url("ws://[::1]:8081/ws").unwrap();
        assert_eq!(config.host, "::1");
        assert_eq!(config.port, 8081);
        assert_eq!(config.bind_address(), "[::1]:8081");
        assert_eq!(config.url(), "ws://[::1]:8081/ws");
    }

    #[test]
    fn test_from_url_errors() {
        assert!(matches!(
            ServerConfig::from_url("ftp://localhost:21/"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ServerConfig::from_url("ws://:8080/"),
            Err(ConfigError::MissingHost(_))
        ));
        assert!(matches!(
            ServerConfig::from_url("ws://localhost:http/"),
            Err(ConfigError::InvalidPort(ref p)) if p == "http"
        ));
        assert!(matches!(
            ServerConfig::from_url("ws://localhost:70000/"),
            Err(ConfigError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_with_path() {
        let config = ServerConfig::new("127.0.0.1", 0).with_path("state");
        assert_eq!(config.path, "/state");
        assert_eq!(config.url(), "ws://127.0.0.1:0/state");
    }
}
