//! # Inbound Ports (Driving Ports / API)
//!
//! The API the gateway drives: session loops call subscribe, unsubscribe
//! and close; publish handlers call distribute and status.

use crate::domain::connection::{Connection, OutboundQueue};
use crate::domain::entities::{Event, RelayStatus};
use crate::domain::errors::SubscriptionError;
use async_trait::async_trait;
use std::sync::Arc;

/// Subscription management API.
///
/// Implementations must be thread-safe (`Send + Sync`); every method may be
/// called concurrently from any number of tasks.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    /// Create a connection for a freshly accepted transport.
    ///
    /// The connection is not registered until its first successful subscribe.
    fn open_connection(&self) -> (Arc<Connection>, OutboundQueue);

    /// Verify `token` for `tags` (in the order given) and join every tag.
    ///
    /// Returns the number of newly joined tags. On `Unauthorized` nothing is
    /// changed and the caller must close the connection.
    fn subscribe(
        &self,
        connection: &Arc<Connection>,
        tags: &[String],
        token: &str,
    ) -> Result<usize, SubscriptionError>;

    /// Leave each of `tags`. Tags not held are ignored.
    fn unsubscribe(&self, connection: &Connection, tags: &[String]) -> usize;

    /// Tear the connection down: leave all tags, unregister, close the queue.
    ///
    /// Returns `true` only for the call that actually performed the teardown.
    fn close_connection(&self, connection: &Connection) -> bool;

    /// Enqueue `event` onto every connection subscribed to any of its tags.
    ///
    /// A connection matching several of the event's tags receives the
    /// payload once per matching tag. Returns the number of enqueues.
    async fn distribute(&self, event: &Event) -> Result<usize, SubscriptionError>;

    /// Connection count and per-tag subscriber counts.
    fn status(&self) -> RelayStatus;
}
