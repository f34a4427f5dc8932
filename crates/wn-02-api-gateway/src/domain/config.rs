//! Gateway configuration with validation.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Publish/status API listener
    pub api: ApiConfig,
    /// WebSocket subscription listener
    pub websocket: WebSocketConfig,
    /// Request size limits
    pub limits: LimitsConfig,
    /// Shared secret expected in the `Auth` header (empty = no check)
    pub api_secret: String,
    /// Shared secret for subscription signatures (empty = no check)
    pub websocket_secret: String,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Port 0 asks the OS for an ephemeral port, so it never collides.
        if self.api.port != 0 && self.api_addr() == self.ws_addr() {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.limits.max_body_size == 0 {
            return Err(ConfigError::InvalidLimit("max_body_size cannot be 0".into()));
        }

        if self.websocket.max_message_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_message_size cannot be 0".into(),
            ));
        }

        if self.websocket.queue_capacity == 0 {
            return Err(ConfigError::InvalidLimit("queue_capacity cannot be 0".into()));
        }

        if self.websocket.write_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "write_timeout cannot be 0".into(),
            ));
        }

        self.api.tls()?;
        self.websocket.tls()?;

        if !self.websocket.path.starts_with('/') || self.websocket.path == "/health" {
            return Err(ConfigError::Invalid(format!(
                "websocket path must start with '/' and not be /health: {}",
                self.websocket.path
            )));
        }

        Ok(())
    }

    /// Get API server bind address
    pub fn api_addr(&self) -> SocketAddr {
        SocketAddr::new(self.api.host, self.api.port)
    }

    /// Get WebSocket server bind address
    pub fn ws_addr(&self) -> SocketAddr {
        SocketAddr::new(self.websocket.host, self.websocket.port)
    }
}

/// API listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8000)
    pub port: u16,
    /// PEM certificate chain; serves HTTPS together with `ssl_key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_cert: Option<PathBuf>,
    /// PEM private key for `ssl_cert`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_key: Option<PathBuf>,
}

impl ApiConfig {
    /// Certificate files, if this listener serves TLS
    pub fn tls(&self) -> Result<Option<TlsFiles>, ConfigError> {
        tls_files("API", self.ssl_cert.as_deref(), self.ssl_key.as_deref())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8000,
            ssl_cert: None,
            ssl_key: None,
        }
    }
}

/// WebSocket listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8001)
    pub port: u16,
    /// Upgrade path
    pub path: String,
    /// Outbound queue capacity per connection
    pub queue_capacity: usize,
    /// Maximum time one delivery write may take
    #[serde(with = "humantime_serde")]
    pub write_timeout: Duration,
    /// Maximum inbound message size in bytes
    pub max_message_size: usize,
    /// PEM certificate chain; serves WSS together with `ssl_key`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_cert: Option<PathBuf>,
    /// PEM private key for `ssl_cert`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_key: Option<PathBuf>,
}

impl WebSocketConfig {
    /// Certificate files, if this listener serves TLS
    pub fn tls(&self) -> Result<Option<TlsFiles>, ConfigError> {
        tls_files("WebSocket", self.ssl_cert.as_deref(), self.ssl_key.as_deref())
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8001,
            path: "/ws".to_string(),
            queue_capacity: wn_01_subscriptions::DEFAULT_QUEUE_CAPACITY,
            write_timeout: Duration::from_secs(10),
            max_message_size: 64 * 1024,
            ssl_cert: None,
            ssl_key: None,
        }
    }
}

/// Certificate and key of a TLS listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Pair up a listener's certificate and key. Empty paths count as unset.
fn tls_files(
    listener: &str,
    cert: Option<&Path>,
    key: Option<&Path>,
) -> Result<Option<TlsFiles>, ConfigError> {
    fn set(path: Option<&Path>) -> Option<&Path> {
        path.filter(|p| !p.as_os_str().is_empty())
    }

    match (set(cert), set(key)) {
        (Some(cert), Some(key)) => Ok(Some(TlsFiles {
            cert: cert.to_path_buf(),
            key: key.to_path_buf(),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Tls(format!(
            "{listener} SSL certificate is defined, but the SSL key is not"
        ))),
        (None, Some(_)) => Err(ConfigError::Tls(format!(
            "{listener} SSL key is defined, but the SSL certificate is not"
        ))),
    }
}

/// Request validation limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum publish body size in bytes (default: 1MB)
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 1024 * 1024,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Both listeners bound to the same address
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Certificate without key or key without certificate
    #[error("invalid TLS configuration: {0}")]
    Tls(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" must be checked before "s" and "m".
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
