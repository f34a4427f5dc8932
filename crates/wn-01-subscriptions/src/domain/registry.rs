//! # Connection Registry
//!
//! Maps dense ids `0..N` to registered connections.
//!
//! Ids stay contiguous: removing a connection moves the last-slot
//! connection into the vacated slot, so allocation is always `id = N` and
//! no free list is needed. Both operations are O(1).

use crate::domain::connection::Connection;
use crate::domain::errors::SubscriptionError;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Dense id -> connection table guarded by a single mutex.
#[derive(Default)]
pub struct ConnectionRegistry {
    slots: Mutex<Vec<Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` and return its id.
    ///
    /// Already registered connections keep their id. Closed connections are
    /// refused so that a late subscribe cannot resurrect them.
    pub fn register(&self, connection: &Arc<Connection>) -> Result<usize, SubscriptionError> {
        let mut slots = self.slots.lock();

        if connection.is_closed() {
            return Err(SubscriptionError::ConnectionClosed);
        }

        let mut slot = connection.slot();
        if let Some(id) = *slot {
            return Ok(id);
        }

        let id = slots.len();
        slots.push(Arc::clone(connection));
        *slot = Some(id);

        debug!(connection = %connection.key(), id, "Connection registered");
        Ok(id)
    }

    /// Remove `connection` from the registry.
    ///
    /// Returns `false` without touching anything if it was not registered,
    /// so a double unregister can never move another connection's id.
    pub fn unregister(&self, connection: &Connection) -> bool {
        let mut slots = self.slots.lock();

        let Some(id) = *connection.slot() else {
            return false;
        };

        let occupant_matches = slots
            .get(id)
            .is_some_and(|occupant| std::ptr::eq(occupant.as_ref(), connection));
        if !occupant_matches {
            warn!(
                connection = %connection.key(),
                id,
                "Registry slot does not hold this connection, skipping unregister"
            );
            return false;
        }

        slots.swap_remove(id);
        *connection.slot() = None;

        if let Some(moved) = slots.get(id) {
            *moved.slot() = Some(id);
            debug!(connection = %moved.key(), id, "Connection moved into vacated slot");
        }

        debug!(connection = %connection.key(), id, "Connection unregistered");
        true
    }

    /// Number of registered connections (`N`).
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Connection currently occupying slot `id`.
    pub fn get(&self, id: usize) -> Option<Arc<Connection>> {
        self.slots.lock().get(id).cloned()
    }
}
