//! Change tracking for mutable collections
//!
//! Every tracked collection owns a [`Timeline`]: an append-only log of the
//! mutations applied since its tracking baseline. Replaying the events in
//! order against the baseline contents reproduces the current contents,
//! which is what lets the delta codec ship the log instead of the collection.
//!
//! Nested values report their own dirtiness through [`Trackable`]; a
//! container is dirty when its own timeline is non-empty or any child it
//! owns is dirty. There are no parent back-pointers.

use std::fmt;

use crate::types::RecordId;

/// Anything that can accumulate changes since a tracking baseline.
pub trait Trackable {
    /// Whether anything changed since the last [`reset_tracking`](Self::reset_tracking).
    fn is_dirty(&self) -> bool;

    /// Make the current state the new baseline, recursively.
    fn reset_tracking(&mut self);
}

impl Trackable for RecordId {
    fn is_dirty(&self) -> bool {
        false
    }

    fn reset_tracking(&mut self) {}
}

impl<T: Trackable> Trackable for Option<T> {
    fn is_dirty(&self) -> bool {
        self.as_ref().map_or(false, Trackable::is_dirty)
    }

    fn reset_tracking(&mut self) {
        if let Some(inner) = self {
            inner.reset_tracking();
        }
    }
}

/// Kind of a recorded mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Element inserted
    Add,
    /// Element at an existing position/key overwritten
    Update,
    /// Element removed
    Remove,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Add => f.write_str("ADD"),
            ChangeKind::Update => f.write_str("UPDATE"),
            ChangeKind::Remove => f.write_str("REMOVE"),
        }
    }
}

/// A single recorded mutation
///
/// `K` identifies where the change happened (a list position, a map key, or
/// `()` for unordered collections). Values are snapshots taken when the
/// mutation happened.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent<K, V> {
    /// `value` was inserted at `key`
    Add {
        /// Position or key of the insert
        key: K,
        /// Inserted value
        value: V,
    },
    /// The element at `key` was overwritten
    Update {
        /// Position or key that was overwritten
        key: K,
        /// Previous element
        old_value: V,
        /// New element
        value: V,
    },
    /// The element at `key` was removed
    Remove {
        /// Position or key of the removal
        key: K,
        /// Removed element
        old_value: V,
    },
}

impl<K, V> ChangeEvent<K, V> {
    /// The kind of this event
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Add { .. } => ChangeKind::Add,
            ChangeEvent::Update { .. } => ChangeKind::Update,
            ChangeEvent::Remove { .. } => ChangeKind::Remove,
        }
    }

    /// Position or key the event applies to
    pub fn key(&self) -> &K {
        match self {
            ChangeEvent::Add { key, .. }
            | ChangeEvent::Update { key, .. }
            | ChangeEvent::Remove { key, .. } => key,
        }
    }
}

/// Ordered log of the mutations applied to one collection
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline<K, V> {
    events: Vec<ChangeEvent<K, V>>,
}

impl<K, V> Default for Timeline<K, V> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<K, V> Timeline<K, V> {
    /// Create an empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&mut self, event: ChangeEvent<K, V>) {
        self.events.push(event);
    }

    /// Events in the order they happened
    pub fn events(&self) -> &[ChangeEvent<K, V>] {
        &self.events
    }

    /// Iterate over the events in order
    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEvent<K, V>> {
        self.events.iter()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no event was recorded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop every event
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl<'a, K, V> IntoIterator for &'a Timeline<K, V> {
    type Item = &'a ChangeEvent<K, V>;
    type IntoIter = std::slice::Iter<'a, ChangeEvent<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
