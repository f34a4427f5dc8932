//! WN-02 API Gateway - HTTP publish API and WebSocket subscription endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    API GATEWAY (wn-02)                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────────┐      ┌───────────────────────┐    │
//! │  │   API listener :8000  │      │   WS listener :8001   │    │
//! │  │  POST /event          │      │  GET /ws  (upgrade)   │    │
//! │  │  GET  /status         │      │  GET /health          │    │
//! │  │  GET  /health         │      └──────────┬────────────┘    │
//! │  └──────────┬────────────┘                 │                 │
//! │  ┌──────────┴────────────┐      ┌──────────┴────────────┐    │
//! │  │ Auth → BodyLimit      │      │ session loop + pump   │    │
//! │  └──────────┬────────────┘      └──────────┬────────────┘    │
//! └─────────────┼──────────────────────────────┼─────────────────┘
//!               │ distribute / status           │ subscribe / close
//!               ▼                               ▼
//!                    wn-01-subscriptions (SubscriptionApi)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wn_02_api_gateway::{GatewayConfig, GatewayService};
//!
//! let service = GatewayService::new(GatewayConfig::default())?;
//! let bound = service.bind().await?;
//! bound.serve(shutdown_signal()).await?;
//! ```
//!
//! # Security
//!
//! - `Auth` header compared in constant time against the API secret
//! - Publish bodies capped before buffering (413)
//! - WebSocket frames capped by `max_message_size`
//! - Subscriptions gated by PBKDF2 tag-set tokens

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod domain;
pub mod http;
pub mod middleware;
pub mod service;
pub mod ws;

pub use domain::{
    ApiConfig, ApiError, ApiResult, ConfigError, GatewayConfig, GatewayError, LimitsConfig,
    TlsFiles, WebSocketConfig,
};
pub use service::{BoundGateway, GatewayService};
