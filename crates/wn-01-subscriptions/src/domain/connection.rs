//! # Connection
//!
//! One long-lived subscriber session: an outbound queue, the set of tags it
//! currently receives, and its dense registry slot while registered.
//!
//! ## Ownership of mutable state
//!
//! | Field        | Written by                      | Under lock          |
//! |--------------|---------------------------------|---------------------|
//! | `slot`       | [`ConnectionRegistry`]          | registry mutex      |
//! | `tag_slots`  | [`TagIndex`]                    | tag index mutex     |
//! | `closed`     | [`Connection::mark_closed`]     | none (first wins)   |
//!
//! The per-connection mutexes are leaf locks: they are only taken while the
//! owning structure's mutex is already held, and never while another leaf
//! lock is held.
//!
//! ## Outbound queue
//!
//! The queue has two states, open and closed. Closing is signalled through a
//! dedicated watch channel rather than a sentinel payload, so an empty payload
//! is just an empty payload. Once closed, pending enqueues return
//! [`SubscriptionError::ConnectionClosed`] and the receiving side stops
//! yielding, even if payloads are still buffered.
//!
//! [`ConnectionRegistry`]: crate::domain::registry::ConnectionRegistry
//! [`TagIndex`]: crate::domain::tag_index::TagIndex

use crate::domain::entities::ConnectionKey;
use crate::domain::errors::SubscriptionError;
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// A subscriber connection.
pub struct Connection {
    key: ConnectionKey,
    /// Dense registry id, `Some` iff registered.
    slot: Mutex<Option<usize>>,
    /// Tag name -> position of this connection in that tag's collection.
    tag_slots: Mutex<HashMap<String, usize>>,
    outbound: mpsc::Sender<Bytes>,
    closed: watch::Sender<bool>,
}

/// Receiving half of a connection's outbound queue.
///
/// Owned by exactly one delivery pump.
pub struct OutboundQueue {
    key: ConnectionKey,
    receiver: mpsc::Receiver<Bytes>,
    closed: watch::Receiver<bool>,
}

impl Connection {
    /// Create a connection and the receiving half of its queue.
    ///
    /// `capacity` is clamped to at least 1. With capacity 1 the queue is the
    /// closest bounded equivalent of a synchronous handoff: a second enqueue
    /// waits until the pump has taken the first payload.
    pub fn open(key: ConnectionKey, capacity: usize) -> (Arc<Self>, OutboundQueue) {
        let (outbound, receiver) = mpsc::channel(capacity.max(1));
        let (closed, closed_rx) = watch::channel(false);

        let connection = Arc::new(Self {
            key,
            slot: Mutex::new(None),
            tag_slots: Mutex::new(HashMap::new()),
            outbound,
            closed,
        });

        let queue = OutboundQueue {
            key,
            receiver,
            closed: closed_rx,
        };

        (connection, queue)
    }

    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    /// Dense registry id; meaningful only while registered.
    pub fn id(&self) -> Option<usize> {
        *self.slot.lock()
    }

    pub fn is_registered(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Tags currently held, sorted by name.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.tag_slots.lock().keys().cloned().collect();
        tags.sort();
        tags
    }

    pub fn holds_tag(&self, tag: &str) -> bool {
        self.tag_slots.lock().contains_key(tag)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Transition to closed. Returns `true` only for the first caller.
    ///
    /// Wakes every task blocked in [`Connection::enqueue`] and the pump.
    pub fn mark_closed(&self) -> bool {
        self.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        })
    }

    /// Resolve once the connection is closed.
    pub async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        wait_closed(&mut closed).await;
    }

    /// Hand a payload to the delivery pump.
    ///
    /// Blocks while the queue is full. Returns `ConnectionClosed` if the
    /// connection is, or becomes, closed before the payload is accepted.
    pub async fn enqueue(&self, payload: Bytes) -> Result<(), SubscriptionError> {
        let mut closed = self.closed.subscribe();

        tokio::select! {
            biased;
            _ = wait_closed(&mut closed) => Err(SubscriptionError::ConnectionClosed),
            sent = self.outbound.send(payload) => {
                sent.map_err(|_| SubscriptionError::ConnectionClosed)
            }
        }
    }

    pub(crate) fn slot(&self) -> MutexGuard<'_, Option<usize>> {
        self.slot.lock()
    }

    pub(crate) fn tag_slots(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.tag_slots.lock()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("key", &self.key)
            .field("id", &self.id())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl OutboundQueue {
    pub fn key(&self) -> ConnectionKey {
        self.key
    }

    /// Next payload in FIFO order, or `None` once the connection is closed.
    ///
    /// Buffered payloads are not drained after close.
    pub async fn recv(&mut self) -> Option<Bytes> {
        tokio::select! {
            biased;
            _ = wait_closed(&mut self.closed) => None,
            payload = self.receiver.recv() => payload,
        }
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed {
            return;
        }
        if closed.changed().await.is_err() {
            return;
        }
    }
}
