//! # Subscription Manager
//!
//! Application service implementing [`SubscriptionApi`] on top of the
//! connection registry, the tag index and the signature verifier.
//!
//! ## Lock discipline
//!
//! The registry and the tag index each own one mutex. No call path holds
//! both at once: subscribe registers first and joins second, close leaves
//! first and unregisters second, each step taking and releasing its own lock.
//! Closed connections are refused inside both locks, so a subscribe racing a
//! close can never leave the connection behind in either structure.

use crate::domain::connection::{Connection, OutboundQueue};
use crate::domain::entities::{ConnectionKey, Event, RelayStatus};
use crate::domain::errors::SubscriptionError;
use crate::domain::registry::ConnectionRegistry;
use crate::domain::signature::{sanitize_tags, SignatureVerifier};
use crate::domain::tag_index::TagIndex;
use crate::ports::inbound::SubscriptionApi;
use crate::DEFAULT_QUEUE_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns every subscription index of the relay.
///
/// Construct one per process and share it behind an `Arc`.
pub struct SubscriptionManager {
    verifier: SignatureVerifier,
    registry: ConnectionRegistry,
    index: TagIndex,
    next_key: AtomicU64,
    queue_capacity: usize,
}

impl SubscriptionManager {
    /// Create a manager verifying tokens against `secret`.
    ///
    /// An empty secret disables subscription authorization.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_queue_capacity(secret, DEFAULT_QUEUE_CAPACITY)
    }

    /// Create a manager with a specific outbound queue capacity.
    pub fn with_queue_capacity(secret: impl Into<Vec<u8>>, queue_capacity: usize) -> Self {
        Self {
            verifier: SignatureVerifier::new(secret),
            registry: ConnectionRegistry::new(),
            index: TagIndex::new(),
            next_key: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }
}

#[async_trait]
impl SubscriptionApi for SubscriptionManager {
    fn open_connection(&self) -> (Arc<Connection>, OutboundQueue) {
        let key = ConnectionKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        debug!(connection = %key, "Connection opened");
        Connection::open(key, self.queue_capacity)
    }

    fn subscribe(
        &self,
        connection: &Arc<Connection>,
        tags: &[String],
        token: &str,
    ) -> Result<usize, SubscriptionError> {
        let tags = sanitize_tags(tags);

        if let Err(e) = self.verifier.verify(&tags, token) {
            warn!(
                connection = %connection.key(),
                tags = ?tags,
                "Subscription rejected: invalid signature"
            );
            return Err(e);
        }

        if !connection.is_registered() {
            self.registry.register(connection)?;
        }

        let joined = self.index.join_many(&tags, connection)?;

        debug!(
            connection = %connection.key(),
            tags = ?tags,
            joined,
            "Subscribed"
        );
        Ok(joined)
    }

    fn unsubscribe(&self, connection: &Connection, tags: &[String]) -> usize {
        let tags = sanitize_tags(tags);
        let left = self.index.leave_many(&tags, connection);

        debug!(
            connection = %connection.key(),
            tags = ?tags,
            left,
            "Unsubscribed"
        );
        left
    }

    fn close_connection(&self, connection: &Connection) -> bool {
        if !connection.mark_closed() {
            return false;
        }

        let tags = self.index.leave_all(connection);
        let was_registered = self.registry.unregister(connection);

        info!(
            connection = %connection.key(),
            tags = tags.len(),
            was_registered,
            "Connection closed"
        );
        true
    }

    async fn distribute(&self, event: &Event) -> Result<usize, SubscriptionError> {
        let payload = event.to_payload()?;
        let mut deliveries = 0;

        for tag in &event.tags {
            for connection in self.index.snapshot(tag) {
                match connection.enqueue(payload.clone()).await {
                    Ok(()) => deliveries += 1,
                    Err(_) => {
                        debug!(
                            connection = %connection.key(),
                            tag = %tag,
                            "Skipped closed connection during distribution"
                        );
                    }
                }
            }
        }

        debug!(
            event = %event.name,
            tags = ?event.tags,
            deliveries,
            "Event distributed"
        );
        Ok(deliveries)
    }

    fn status(&self) -> RelayStatus {
        RelayStatus {
            connections: self.registry.len(),
            subscriptions: self.index.counts(),
        }
    }
}
