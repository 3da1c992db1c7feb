//! Tracked collections
//!
//! Lists, sets and maps that record every structural mutation in a
//! [`Timeline`]. Embedded collections hand out [`TrackedMut`] handles to
//! their trackable elements through `get_mut`; changes made that way are
//! recorded by the element's own tracking. Elements are never exposed as
//! raw mutable slots, so replacing one always goes through `set`/`insert`.
//!
//! Any element inserted through a tracked API has its tracking reset first:
//! the insert event carries the element in full, so its earlier history must
//! not be replayed a second time.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::tracking::{ChangeEvent, Timeline, Trackable};
use crate::types::RecordId;
use crate::value::{TrackedMut, Value};

/// Ordered list of typed values (EMBEDDEDLIST)
pub type EmbeddedList = TrackedList<Option<Value>>;
/// Unordered set of typed values (EMBEDDEDSET)
pub type EmbeddedSet = TrackedSet<Option<Value>>;
/// Text-keyed map of typed values (EMBEDDEDMAP)
pub type EmbeddedMap = TrackedMap<Option<Value>>;
/// Ordered list of references (LINKLIST)
pub type LinkList = TrackedList<Option<RecordId>>;
/// Set of references (LINKSET)
pub type LinkSet = TrackedSet<Option<RecordId>>;
/// Text-keyed map of references (LINKMAP)
pub type LinkMap = TrackedMap<Option<RecordId>>;

// ============================================================================
// TrackedList
// ============================================================================

/// Ordered list whose structural changes are recorded by position
#[derive(Debug, Clone)]
pub struct TrackedList<T> {
    items: Vec<T>,
    timeline: Timeline<usize, T>,
}

impl<T> Default for TrackedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            timeline: Timeline::new(),
        }
    }
}

impl<T: Trackable + Clone> TrackedList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list whose contents are the tracking baseline
    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            timeline: Timeline::new(),
        }
    }

    /// Append an element
    pub fn push(&mut self, mut item: T) {
        item.reset_tracking();
        self.timeline.push(ChangeEvent::Add {
            key: self.items.len(),
            value: item.clone(),
        });
        self.items.push(item);
    }

    /// Overwrite the element at `index`, returning the previous one
    pub fn set(&mut self, index: usize, mut item: T) -> Result<T> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, len })?;
        item.reset_tracking();
        let old = std::mem::replace(slot, item.clone());
        self.timeline.push(ChangeEvent::Update {
            key: index,
            old_value: old.clone(),
            value: item,
        });
        Ok(old)
    }

    /// Remove the element at `index`, shifting later elements down
    pub fn remove(&mut self, index: usize) -> Result<T> {
        if index >= self.items.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        let old = self.items.remove(index);
        self.timeline.push(ChangeEvent::Remove {
            key: index,
            old_value: old.clone(),
        });
        Ok(old)
    }

    /// Remove and return the last element
    pub fn pop(&mut self) -> Option<T> {
        let last = self.items.len().checked_sub(1)?;
        self.remove(last).ok()
    }
}

impl<T> TrackedList<T> {
    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over the elements in order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Elements as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Structural changes since the baseline
    pub fn timeline(&self) -> &Timeline<usize, T> {
        &self.timeline
    }

    /// Mutable access to the timeline, for callers replaying external logs
    pub fn timeline_mut(&mut self) -> &mut Timeline<usize, T> {
        &mut self.timeline
    }

    /// Whether the timeline holds any event
    pub fn is_modified(&self) -> bool {
        !self.timeline.is_empty()
    }
}

impl TrackedList<Option<Value>> {
    /// Mutable handle to the trackable element at `index`
    ///
    /// `None` for out-of-range, null and scalar elements; replace those with
    /// [`TrackedList::set`].
    pub fn get_mut(&mut self, index: usize) -> Option<TrackedMut<'_>> {
        self.items.get_mut(index)?.as_mut()?.tracked_mut()
    }
}

impl<T: Trackable> Trackable for TrackedList<T> {
    fn is_dirty(&self) -> bool {
        !self.timeline.is_empty() || self.items.iter().any(Trackable::is_dirty)
    }

    fn reset_tracking(&mut self) {
        self.timeline.clear();
        self.items.iter_mut().for_each(Trackable::reset_tracking);
    }
}

impl<T: PartialEq> PartialEq for TrackedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Trackable + Clone> FromIterator<T> for TrackedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a TrackedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ============================================================================
// TrackedSet
// ============================================================================

/// Set without positions; iteration follows insertion order
///
/// Membership uses `PartialEq`, so elements need not be hashable. Sets never
/// record `Update`: replacing a member is a remove followed by an add.
///
/// A remove is replayed elsewhere by value, so the recorded `old_value` must
/// be the element as it was before any in-place change. `get_mut` keeps a
/// copy of each clean element it hands out for that purpose.
#[derive(Debug, Clone)]
pub struct TrackedSet<T> {
    items: Vec<T>,
    // parallel to `items`
    clean_copies: Vec<Option<T>>,
    timeline: Timeline<(), T>,
}

impl<T> Default for TrackedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            clean_copies: Vec::new(),
            timeline: Timeline::new(),
        }
    }
}

impl<T: Trackable + Clone + PartialEq> TrackedSet<T> {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set whose contents are the tracking baseline; duplicates are dropped
    pub fn from_items(items: Vec<T>) -> Self {
        let mut set = Self::default();
        for item in items {
            if !set.items.contains(&item) {
                set.items.push(item);
                set.clean_copies.push(None);
            }
        }
        set
    }

    /// Insert an element; returns `false` when an equal element is present
    pub fn insert(&mut self, mut item: T) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        item.reset_tracking();
        self.timeline.push(ChangeEvent::Add {
            key: (),
            value: item.clone(),
        });
        self.items.push(item);
        self.clean_copies.push(None);
        true
    }

    /// Remove an element equal to `item`; returns `false` when absent
    ///
    /// The recorded `old_value` is the element as of the baseline or its
    /// insertion, before any change made through `get_mut`.
    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|x| x == item) {
            Some(pos) => {
                let current = self.items.remove(pos);
                let old_value = self.clean_copies.remove(pos).unwrap_or(current);
                self.timeline.push(ChangeEvent::Remove { key: (), old_value });
                true
            }
            None => false,
        }
    }

    /// Check membership
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

impl TrackedSet<Option<Value>> {
    /// Mutable handle to the trackable element at `ordinal` in iteration order
    ///
    /// `None` for out-of-range, null and scalar elements. The first handle
    /// taken on a clean element snapshots it for a later `remove`.
    pub fn get_mut(&mut self, ordinal: usize) -> Option<TrackedMut<'_>> {
        let item = self.items.get_mut(ordinal)?;
        let copy = &mut self.clean_copies[ordinal];
        let trackable = item
            .as_ref()
            .map_or(false, |v| v.type_tag().is_trackable());
        if trackable && copy.is_none() && !item.is_dirty() {
            *copy = Some(item.clone());
        }
        item.as_mut()?.tracked_mut()
    }
}

impl<T> TrackedSet<T> {
    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Structural changes since the baseline
    pub fn timeline(&self) -> &Timeline<(), T> {
        &self.timeline
    }

    /// Mutable access to the timeline, for callers replaying external logs
    pub fn timeline_mut(&mut self) -> &mut Timeline<(), T> {
        &mut self.timeline
    }

    /// Whether the timeline holds any event
    pub fn is_modified(&self) -> bool {
        !self.timeline.is_empty()
    }
}

impl<T: Trackable> Trackable for TrackedSet<T> {
    fn is_dirty(&self) -> bool {
        !self.timeline.is_empty() || self.items.iter().any(Trackable::is_dirty)
    }

    fn reset_tracking(&mut self) {
        self.timeline.clear();
        self.items.iter_mut().for_each(Trackable::reset_tracking);
        self.clean_copies.iter_mut().for_each(|copy| *copy = None);
    }
}

// Order-insensitive multiset comparison
impl<T: PartialEq> PartialEq for TrackedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.items.len() != other.items.len() {
            return false;
        }
        self.items.iter().all(|item| {
            let mine = self.items.iter().filter(|x| *x == item).count();
            let theirs = other.items.iter().filter(|x| *x == item).count();
            mine == theirs
        })
    }
}

impl<T: Trackable + Clone + PartialEq> FromIterator<T> for TrackedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_items(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a TrackedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ============================================================================
// TrackedMap
// ============================================================================

/// Text-keyed map; iteration follows insertion order
#[derive(Debug, Clone)]
pub struct TrackedMap<T> {
    entries: IndexMap<String, T>,
    timeline: Timeline<String, T>,
}

impl<T> Default for TrackedMap<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            timeline: Timeline::new(),
        }
    }
}

impl<T: Trackable + Clone> TrackedMap<T> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map whose contents are the tracking baseline
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            timeline: Timeline::new(),
        }
    }

    /// Insert or overwrite `key`, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, mut value: T) -> Option<T> {
        let key = key.into();
        value.reset_tracking();
        match self.entries.insert(key.clone(), value.clone()) {
            Some(old) => {
                self.timeline.push(ChangeEvent::Update {
                    key,
                    old_value: old.clone(),
                    value,
                });
                Some(old)
            }
            None => {
                self.timeline.push(ChangeEvent::Add { key, value });
                None
            }
        }
    }

    /// Remove `key`, keeping the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let old = self.entries.shift_remove(key)?;
        self.timeline.push(ChangeEvent::Remove {
            key: key.to_string(),
            old_value: old.clone(),
        });
        Some(old)
    }
}

impl<T> TrackedMap<T> {
    /// Value for `key`
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    /// Check if `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, T> {
        self.entries.iter()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, T> {
        self.entries.keys()
    }

    /// Structural changes since the baseline
    pub fn timeline(&self) -> &Timeline<String, T> {
        &self.timeline
    }

    /// Mutable access to the timeline, for callers replaying external logs
    pub fn timeline_mut(&mut self) -> &mut Timeline<String, T> {
        &mut self.timeline
    }

    /// Whether the timeline holds any event
    pub fn is_modified(&self) -> bool {
        !self.timeline.is_empty()
    }
}

impl TrackedMap<Option<Value>> {
    /// Mutable handle to the trackable value at `key`
    ///
    /// `None` for absent, null and scalar values; replace those with
    /// [`TrackedMap::insert`].
    pub fn get_mut(&mut self, key: &str) -> Option<TrackedMut<'_>> {
        self.entries.get_mut(key)?.as_mut()?.tracked_mut()
    }
}

impl<T: Trackable> Trackable for TrackedMap<T> {
    fn is_dirty(&self) -> bool {
        !self.timeline.is_empty() || self.entries.values().any(Trackable::is_dirty)
    }

    fn reset_tracking(&mut self) {
        self.timeline.clear();
        self.entries.values_mut().for_each(Trackable::reset_tracking);
    }
}

// Compared by key, ignoring insertion order
impl<T: PartialEq> PartialEq for TrackedMap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.entries.get(k) == Some(v))
    }
}

impl<'a, T> IntoIterator for &'a TrackedMap<T> {
    type Item = (&'a String, &'a T);
    type IntoIter = indexmap::map::Iter<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
