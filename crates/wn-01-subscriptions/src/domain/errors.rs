//! # Subscription Errors
//!
//! Error types for the subscription engine and the delivery transport.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by subscription manager operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The supplied token does not match the one derived for the tag set.
    ///
    /// The caller must close the connection; no state was changed.
    #[error("invalid subscription signature")]
    Unauthorized,

    /// The connection has already been closed; it can no longer be
    /// registered, joined to tags, or enqueued onto.
    #[error("connection closed")]
    ConnectionClosed,

    /// The event could not be serialized into a delivery payload.
    #[error("event serialization failed: {0}")]
    Serialization(String),
}

/// Errors from writing to a connection's transport.
///
/// Any of these ends the delivery pump and tears the connection down.
/// Nothing is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The underlying write failed.
    #[error("transport write failed: {0}")]
    Write(String),

    /// The write did not complete in time.
    #[error("transport write timed out after {0:?}")]
    Timeout(Duration),

    /// The peer already went away.
    #[error("transport closed by peer")]
    Closed,
}

impl From<serde_json::Error> for SubscriptionError {
    fn from(e: serde_json::Error) -> Self {
        SubscriptionError::Serialization(e.to_string())
    }
}
