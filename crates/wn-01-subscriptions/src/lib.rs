//! WN-01 Subscriptions - Tag registry and event distribution engine.
//!
//! Holds every subscriber connection of the relay, the reverse index from
//! tag to subscribers, and the signature check guarding subscriptions.
//!
//! # Architecture
//!
//! ```text
//!   session loop ──subscribe/unsubscribe──┐
//!                                          ▼
//!   POST /event ──distribute──▶ SubscriptionManager
//!                                 │  ConnectionRegistry  (dense ids)
//!                                 │  TagIndex            (tag -> conns)
//!                                 │  SignatureVerifier   (PBKDF2 tokens)
//!                                 ▼
//!                          OutboundQueue (per connection)
//!                                 │
//!                          DeliveryPump ──▶ EventSink (transport)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wn_01_subscriptions::{SubscriptionApi, SubscriptionManager, DeliveryPump};
//!
//! let manager = Arc::new(SubscriptionManager::new("secret"));
//! let (conn, queue) = manager.open_connection();
//! tokio::spawn(DeliveryPump::new(conn.clone(), queue, sink, manager.clone()).run());
//! manager.subscribe(&conn, &tags, &token)?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod domain;
pub mod ports;
pub mod pump;
pub mod service;

pub use domain::connection::{Connection, OutboundQueue};
pub use domain::entities::{ConnectionKey, Event, RelayStatus};
pub use domain::errors::{SubscriptionError, TransportError};
pub use domain::registry::ConnectionRegistry;
pub use domain::signature::{derive_token, sanitize_tag, sanitize_tags, SignatureVerifier};
pub use domain::tag_index::TagIndex;
pub use ports::inbound::SubscriptionApi;
pub use ports::outbound::EventSink;
pub use pump::{DeliveryPump, PumpExit};
pub use service::SubscriptionManager;

/// Default outbound queue capacity per connection.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1;
