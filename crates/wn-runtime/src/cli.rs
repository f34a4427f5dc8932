//! Command-line flags.
//!
//! Every override flag can also be given through its `WEBSOCKET_NOTIFY_*`
//! environment variable; a flag on the command line wins over the variable.

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/websocket-notify.yaml";

/// websocket-notify: tag-based publish/subscribe relay over WebSockets
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "websocket-notify", version)]
#[command(about = "Relay published events to WebSocket subscribers by tag")]
pub struct Args {
    /// YAML configuration file (a missing file is ignored)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Secret publishers must send in the Auth header
    #[arg(long, env = "WEBSOCKET_NOTIFY_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// API listener IP address (interface names such as eth0 are not accepted)
    #[arg(long, env = "WEBSOCKET_NOTIFY_API_HOST")]
    pub api_host: Option<IpAddr>,

    /// API listener port
    #[arg(long, env = "WEBSOCKET_NOTIFY_API_PORT")]
    pub api_port: Option<u16>,

    /// API TLS certificate (PEM); requires --api-ssl-key
    #[arg(long, env = "WEBSOCKET_NOTIFY_API_SSL_CERT")]
    pub api_ssl_cert: Option<PathBuf>,

    /// API TLS private key (PEM); requires --api-ssl-cert
    #[arg(long, env = "WEBSOCKET_NOTIFY_API_SSL_KEY")]
    pub api_ssl_key: Option<PathBuf>,

    /// Secret subscription tokens are derived from
    #[arg(long, env = "WEBSOCKET_NOTIFY_WS_SECRET", hide_env_values = true)]
    pub ws_secret: Option<String>,

    /// WebSocket listener IP address (interface names such as eth0 are not accepted)
    #[arg(long, env = "WEBSOCKET_NOTIFY_WS_HOST")]
    pub ws_host: Option<IpAddr>,

    /// WebSocket listener port
    #[arg(long, env = "WEBSOCKET_NOTIFY_WS_PORT")]
    pub ws_port: Option<u16>,

    /// WebSocket TLS certificate (PEM); requires --ws-ssl-key
    #[arg(long, env = "WEBSOCKET_NOTIFY_WS_SSL_CERT")]
    pub ws_ssl_cert: Option<PathBuf>,

    /// WebSocket TLS private key (PEM); requires --ws-ssl-cert
    #[arg(long, env = "WEBSOCKET_NOTIFY_WS_SSL_KEY")]
    pub ws_ssl_key: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, env = "WEBSOCKET_NOTIFY_DEBUG")]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
