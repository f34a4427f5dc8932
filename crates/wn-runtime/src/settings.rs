//! Layered configuration.
//!
//! Precedence, lowest first: built-in defaults, YAML file, environment,
//! command-line flags. Environment and flags arrive merged through
//! [`Args`], so this module only has to apply them over the file.

use crate::cli::Args;
use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use wn_02_api_gateway::{ConfigError, GatewayConfig};

/// Runtime-only keys accepted next to the gateway sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct LoggingKeys {
    debug: bool,
    log_json: bool,
}

/// Fully resolved process configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub gateway: GatewayConfig,
    pub debug: bool,
    pub log_json: bool,
    /// File the settings were read from, if it existed
    pub source: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

impl Settings {
    /// Resolve settings from the file named in `args` and the overrides in `args`.
    pub fn load(args: &Args) -> Result<Self, SettingsError> {
        let mut settings = Self::from_file(&args.config)?;
        settings.apply(args);
        settings.gateway.validate()?;
        Ok(settings)
    }

    /// Read the YAML file, falling back to defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut settings = Self::from_yaml(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.source = Some(path.to_path_buf());
        Ok(settings)
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        // An empty document is a valid, empty configuration.
        if value.is_null() {
            return Ok(Self::default());
        }

        let gateway: GatewayConfig = serde_yaml::from_value(value.clone())?;
        let logging: LoggingKeys = serde_yaml::from_value(value)?;

        Ok(Self {
            gateway,
            debug: logging.debug,
            log_json: logging.log_json,
            source: None,
        })
    }

    /// Overlay environment and flag values.
    pub fn apply(&mut self, args: &Args) {
        let gateway = &mut self.gateway;

        if let Some(secret) = &args.api_secret {
            gateway.api_secret = secret.clone();
        }
        if let Some(host) = args.api_host {
            gateway.api.host = host;
        }
        if let Some(port) = args.api_port {
            gateway.api.port = port;
        }
        if let Some(cert) = &args.api_ssl_cert {
            gateway.api.ssl_cert = Some(cert.clone());
        }
        if let Some(key) = &args.api_ssl_key {
            gateway.api.ssl_key = Some(key.clone());
        }
        if let Some(secret) = &args.ws_secret {
            gateway.websocket_secret = secret.clone();
        }
        if let Some(host) = args.ws_host {
            gateway.websocket.host = host;
        }
        if let Some(port) = args.ws_port {
            gateway.websocket.port = port;
        }
        if let Some(cert) = &args.ws_ssl_cert {
            gateway.websocket.ssl_cert = Some(cert.clone());
        }
        if let Some(key) = &args.ws_ssl_key {
            gateway.websocket.ssl_key = Some(key.clone());
        }

        // Flags can only switch these on.
        self.debug |= args.debug;
        self.log_json |= args.log_json;
    }
}
