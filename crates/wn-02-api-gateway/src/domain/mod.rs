//! Domain types for the API Gateway.
//!
//! Configuration and error handling. Subscription state lives in
//! `wn-01-subscriptions`.

pub mod config;
pub mod error;

// Re-exports for convenience
pub use config::{
    ApiConfig, ConfigError, GatewayConfig, LimitsConfig, TlsFiles, WebSocketConfig,
};
pub use error::{ApiError, ApiResult, GatewayError};
