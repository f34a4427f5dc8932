//! # Tag Index
//!
//! Maps each tag to the dense collection of connections subscribed to it.
//!
//! ## Layout
//!
//! ```text
//! tags:  "room1" -> [conn-4, conn-9, conn-2]      (contiguous Vec)
//!                      0       1       2
//! conn-9.tag_slots:  { "room1" -> 1, ... }        (reverse lookup)
//! ```
//!
//! Leaving swaps the last member into the vacated position and patches that
//! member's reverse entry, so join and leave are O(1) amortized. A tag whose
//! collection becomes empty is dropped.
//!
//! ## Invariant
//!
//! A connection is in a tag's collection iff the tag is in the connection's
//! tag set. Both sides change together under the index mutex, which also
//! covers [`TagIndex::snapshot`]: distribution never iterates a collection
//! that is being mutated.

use crate::domain::connection::Connection;
use crate::domain::errors::SubscriptionError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::error;

type Members = Vec<Arc<Connection>>;

/// Tag -> subscriber collection, guarded by one mutex for all tags.
#[derive(Default)]
pub struct TagIndex {
    tags: Mutex<HashMap<String, Members>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `connection` to `tag`.
    ///
    /// Returns `Ok(false)` if it was already a member.
    pub fn join(&self, tag: &str, connection: &Arc<Connection>) -> Result<bool, SubscriptionError> {
        let mut tags = self.tags.lock();
        if connection.is_closed() {
            return Err(SubscriptionError::ConnectionClosed);
        }
        Ok(join_locked(&mut tags, tag, connection))
    }

    /// Subscribe `connection` to every tag in `requested` atomically.
    ///
    /// Returns how many tags were newly joined.
    pub fn join_many<S: AsRef<str>>(
        &self,
        requested: &[S],
        connection: &Arc<Connection>,
    ) -> Result<usize, SubscriptionError> {
        let mut tags = self.tags.lock();
        if connection.is_closed() {
            return Err(SubscriptionError::ConnectionClosed);
        }
        Ok(requested
            .iter()
            .filter(|tag| join_locked(&mut tags, tag.as_ref(), connection))
            .count())
    }

    /// Unsubscribe `connection` from `tag`. No-op if not a member.
    pub fn leave(&self, tag: &str, connection: &Connection) -> bool {
        let mut tags = self.tags.lock();
        leave_locked(&mut tags, tag, connection)
    }

    /// Unsubscribe `connection` from each tag in `requested`.
    ///
    /// Returns how many tags were actually left.
    pub fn leave_many<S: AsRef<str>>(&self, requested: &[S], connection: &Connection) -> usize {
        let mut tags = self.tags.lock();
        requested
            .iter()
            .filter(|tag| leave_locked(&mut tags, tag.as_ref(), connection))
            .count()
    }

    /// Unsubscribe `connection` from everything it holds.
    ///
    /// Returns the tags that were left.
    pub fn leave_all(&self, connection: &Connection) -> Vec<String> {
        let mut tags = self.tags.lock();
        let held = connection.tags();
        for tag in &held {
            leave_locked(&mut tags, tag, connection);
        }
        held
    }

    /// Copy of the subscriber collection for `tag` at this instant.
    pub fn snapshot(&self, tag: &str) -> Vec<Arc<Connection>> {
        self.tags.lock().get(tag).cloned().unwrap_or_default()
    }

    /// Number of subscribers of `tag` (0 if absent).
    pub fn subscriber_count(&self, tag: &str) -> usize {
        self.tags.lock().get(tag).map_or(0, Vec::len)
    }

    /// Subscriber count for every present tag.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.tags
            .lock()
            .iter()
            .map(|(tag, members)| (tag.clone(), members.len()))
            .collect()
    }

    /// Number of tags with at least one subscriber.
    pub fn len(&self) -> usize {
        self.tags.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.lock().is_empty()
    }
}

fn join_locked(tags: &mut HashMap<String, Members>, tag: &str, connection: &Arc<Connection>) -> bool {
    let mut held = connection.tag_slots();
    if held.contains_key(tag) {
        return false;
    }

    let members = tags.entry(tag.to_owned()).or_default();
    members.push(Arc::clone(connection));
    held.insert(tag.to_owned(), members.len() - 1);
    true
}

fn leave_locked(tags: &mut HashMap<String, Members>, tag: &str, connection: &Connection) -> bool {
    let Some(recorded) = connection.tag_slots().remove(tag) else {
        return false;
    };

    let Some(members) = tags.get_mut(tag) else {
        error!(connection = %connection.key(), tag, "Tag held by connection but absent from index");
        return true;
    };

    let slot = if members
        .get(recorded)
        .is_some_and(|member| std::ptr::eq(member.as_ref(), connection))
    {
        recorded
    } else {
        error!(connection = %connection.key(), tag, slot = recorded, "Stale tag slot, searching");
        match members
            .iter()
            .position(|member| std::ptr::eq(member.as_ref(), connection))
        {
            Some(found) => found,
            None => return true,
        }
    };

    members.swap_remove(slot);
    if let Some(moved) = members.get(slot) {
        moved.tag_slots().insert(tag.to_owned(), slot);
    }
    if members.is_empty() {
        tags.remove(tag);
    }
    true
}
