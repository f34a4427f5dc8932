//! # Entities
//!
//! Value types shared by the subscription engine and its adapters.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A published event.
///
/// Transient: it lives for the duration of one distribution call and is
/// never stored. Absent fields decode as empty; unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Event {
    /// Event name chosen by the publisher.
    pub name: String,
    /// Tags this event is fanned out to, in publisher order.
    pub tags: Vec<String>,
    /// Opaque event body.
    pub data: String,
}

impl Event {
    pub fn new(name: impl Into<String>, tags: Vec<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags,
            data: data.into(),
        }
    }

    /// Serialize the event into the wire payload delivered to subscribers.
    pub fn to_payload(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}

/// Stable identity of a connection for its whole lifetime.
///
/// Unlike the dense registry id, a key is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey(pub u64);

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Relay status snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    /// Number of registered connections.
    pub connections: usize,
    /// Subscriber count for every tag currently present in the index.
    pub subscriptions: BTreeMap<String, usize>,
}
