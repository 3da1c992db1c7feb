//! Reference bags
//!
//! A [`LinkBag`] is an unordered multiset of [`RecordId`]s. Small bags keep
//! their members in memory (embedded storage); large bags live in an external
//! tree addressed by a [`BagPointer`] and carry only the pending per-record
//! count changes that have not been flushed to that tree yet.
//!
//! Which storage a bag uses is the bag's own state. The codec may still
//! choose the external wire representation for a large embedded bag.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use uuid::Uuid;

use crate::tracking::{ChangeEvent, Timeline, Trackable};
use crate::types::RecordId;

/// Address of an externally stored bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BagPointer {
    /// File holding the tree
    pub file_id: i64,
    /// Page of the tree root
    pub page_index: i64,
    /// Offset of the root within its page
    pub page_offset: i32,
}

impl BagPointer {
    /// Create a new pointer
    pub const fn new(file_id: i64, page_index: i64, page_offset: i32) -> Self {
        Self {
            file_id,
            page_index,
            page_offset,
        }
    }
}

/// Pending change to one record's count in an external bag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BagChange {
    /// Add `n` (possibly negative) to the stored count
    Diff(i32),
    /// Overwrite the stored count with `n`
    Absolute(i32),
}

impl BagChange {
    /// Signed magnitude carried by the change
    pub fn magnitude(&self) -> i32 {
        match self {
            BagChange::Diff(n) | BagChange::Absolute(n) => *n,
        }
    }

    /// Count after applying this change to `stored`
    pub fn apply(&self, stored: i32) -> i32 {
        match self {
            BagChange::Diff(n) => stored.saturating_add(*n),
            BagChange::Absolute(n) => *n,
        }
    }

    fn adjusted(self, delta: i32) -> BagChange {
        match self {
            BagChange::Diff(n) => BagChange::Diff(n.saturating_add(delta)),
            BagChange::Absolute(n) => BagChange::Absolute(n.saturating_add(delta).max(0)),
        }
    }
}

/// Where a bag's members live
#[derive(Debug, Clone, PartialEq)]
pub enum BagStorage {
    /// Members held in memory, duplicates allowed
    Embedded(Vec<RecordId>),
    /// Members held in an external tree plus unflushed changes
    External {
        /// Tree address; `None` until the bag is first flushed
        pointer: Option<BagPointer>,
        /// Logical member count, duplicates included
        size: usize,
        /// Unflushed count changes per record
        changes: BTreeMap<RecordId, BagChange>,
    },
}

/// Unordered multiset of record references
#[derive(Debug, Clone)]
pub struct LinkBag {
    // set at most once between explicit replacements
    sync_id: OnceLock<Uuid>,
    storage: BagStorage,
    timeline: Timeline<(), RecordId>,
}

impl Default for LinkBag {
    fn default() -> Self {
        Self {
            sync_id: OnceLock::new(),
            storage: BagStorage::Embedded(Vec::new()),
            timeline: Timeline::new(),
        }
    }
}

impl LinkBag {
    /// Create an empty embedded bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an embedded bag whose members are the tracking baseline
    pub fn from_links(links: Vec<RecordId>) -> Self {
        Self {
            storage: BagStorage::Embedded(links),
            ..Self::default()
        }
    }

    /// Create an external bag whose state is the tracking baseline
    pub fn external(
        pointer: Option<BagPointer>,
        size: usize,
        changes: BTreeMap<RecordId, BagChange>,
    ) -> Self {
        Self {
            storage: BagStorage::External {
                pointer,
                size,
                changes,
            },
            ..Self::default()
        }
    }

    /// Set the synchronization id
    pub fn with_sync_id(mut self, sync_id: Uuid) -> Self {
        self.set_sync_id(Some(sync_id));
        self
    }

    /// Synchronization id, if assigned
    pub fn sync_id(&self) -> Option<Uuid> {
        self.sync_id.get().copied()
    }

    /// Replace the synchronization id
    pub fn set_sync_id(&mut self, sync_id: Option<Uuid>) {
        self.sync_id = match sync_id {
            Some(id) => OnceLock::from(id),
            None => OnceLock::new(),
        };
    }

    /// Keep `sync_id` unless an id is already assigned; returns the bag's id
    ///
    /// Takes `&self` so an encoder holding a shared borrow can pin the id a
    /// registry issued, and later encodings of the same bag repeat it.
    pub fn adopt_sync_id(&self, sync_id: Uuid) -> Uuid {
        *self.sync_id.get_or_init(|| sync_id)
    }

    /// Current storage
    pub fn storage(&self) -> &BagStorage {
        &self.storage
    }

    /// Whether members are held in memory
    pub fn is_embedded(&self) -> bool {
        matches!(self.storage, BagStorage::Embedded(_))
    }

    /// Logical member count, duplicates included
    pub fn size(&self) -> usize {
        match &self.storage {
            BagStorage::Embedded(links) => links.len(),
            BagStorage::External { size, .. } => *size,
        }
    }

    /// Check if the bag has no members
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Add one occurrence of `rid`
    pub fn add(&mut self, rid: RecordId) {
        match &mut self.storage {
            BagStorage::Embedded(links) => links.push(rid),
            BagStorage::External { size, changes, .. } => {
                let change = changes
                    .get(&rid)
                    .map_or(BagChange::Diff(1), |c| c.adjusted(1));
                changes.insert(rid, change);
                *size += 1;
            }
        }
        self.timeline.push(ChangeEvent::Add { key: (), value: rid });
    }

    /// Remove one occurrence of `rid`
    ///
    /// Returns `false` when the bag is known not to contain `rid`. An external
    /// bag with a pointer cannot check membership and trusts the caller.
    pub fn remove(&mut self, rid: RecordId) -> bool {
        match &mut self.storage {
            BagStorage::Embedded(links) => match links.iter().position(|r| *r == rid) {
                Some(pos) => {
                    links.remove(pos);
                }
                None => return false,
            },
            BagStorage::External {
                pointer,
                size,
                changes,
            } => {
                let current = changes.get(&rid).copied();
                if pointer.is_none() && current.map_or(0, |c| c.apply(0)) <= 0 {
                    return false;
                }
                let change = current.map_or(BagChange::Diff(-1), |c| c.adjusted(-1));
                changes.insert(rid, change);
                *size = size.saturating_sub(1);
            }
        }
        self.timeline.push(ChangeEvent::Remove {
            key: (),
            old_value: rid,
        });
        true
    }

    /// Logical members, when they can be determined without the external tree
    ///
    /// Always `Some` for embedded bags and for external bags that were never
    /// flushed (no pointer). The order is unspecified.
    pub fn contents(&self) -> Option<Vec<RecordId>> {
        match &self.storage {
            BagStorage::Embedded(links) => Some(links.clone()),
            BagStorage::External {
                pointer: None,
                changes,
                ..
            } => {
                let mut links = Vec::new();
                for (rid, change) in changes {
                    let count = change.apply(0).max(0) as usize;
                    links.extend(std::iter::repeat(*rid).take(count));
                }
                Some(links)
            }
            BagStorage::External { .. } => None,
        }
    }

    /// Structural changes since the baseline
    pub fn timeline(&self) -> &Timeline<(), RecordId> {
        &self.timeline
    }

    /// Mutable access to the timeline, for callers replaying external logs
    pub fn timeline_mut(&mut self) -> &mut Timeline<(), RecordId> {
        &mut self.timeline
    }
}

impl Trackable for LinkBag {
    fn is_dirty(&self) -> bool {
        !self.timeline.is_empty()
    }

    fn reset_tracking(&mut self) {
        self.timeline.clear();
    }
}

// Bags compare as multisets when both memberships are known, otherwise by storage.
impl PartialEq for LinkBag {
    fn eq(&self, other: &Self) -> bool {
        match (self.contents(), other.contents()) {
            (Some(mut a), Some(mut b)) => {
                a.sort_unstable();
                b.sort_unstable();
                a == b
            }
            _ => self.storage == other.storage,
        }
    }
}
