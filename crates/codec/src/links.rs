//! Record references and link bags
//!
//! # Format
//!
//! ```text
//! link        [cluster_id: varint][position: varint]
//!             (-2, -1) is null inside link collections
//!
//! link bag    [sync id: 16 bytes, all 0xFF when none][repr: byte]
//!   repr 1    [size: varint][link]*size
//!   repr 2    [file_id: varint][page_index: varint][page_offset: varint]
//!             [size: varint][change count: varint]
//!             ([link][kind: byte][magnitude: varint])*count
//! ```
//!
//! A missing external pointer is written as (-1, -1, -1). Change kind 0 is a
//! relative count change, kind 1 an absolute count.

use std::collections::BTreeMap;

use docwire_core::{
    BagChange, BagPointer, BagStorage, BagSyncRegistry, Error, LinkBag, RecordId, Result,
};
use tracing::trace;
use uuid::Uuid;

use crate::wire::{WireReader, WireWriter};

/// Representation byte for bags written member by member.
pub const REPR_EMBEDDED: u8 = 1;
/// Representation byte for bags written as pointer plus pending changes.
pub const REPR_EXTERNAL: u8 = 2;

/// Change kind byte for [`BagChange::Diff`].
pub const CHANGE_DIFF: u8 = 0;
/// Change kind byte for [`BagChange::Absolute`].
pub const CHANGE_ABSOLUTE: u8 = 1;

const NO_SYNC_ID: [u8; 16] = [0xFF; 16];
const NO_POINTER: (i64, i64, i32) = (-1, -1, -1);

/// Write a reference; `None` and the null marker become the null sentinel.
pub fn write_link(w: &mut WireWriter, link: Option<RecordId>) {
    let rid = link.unwrap_or(RecordId::NULL_MARKER);
    w.write_varint(i64::from(rid.cluster_id));
    w.write_varint(rid.position);
}

/// Read a reference pair as-is.
pub fn read_record_id(r: &mut WireReader<'_>) -> Result<RecordId> {
    let cluster_id = r.read_i32_varint()?;
    let position = r.read_varint()?;
    Ok(RecordId::new(cluster_id, position))
}

/// Read a reference, mapping the null sentinel to `None`.
pub fn read_link(r: &mut WireReader<'_>) -> Result<Option<RecordId>> {
    let rid = read_record_id(r)?;
    Ok(if rid.is_null_marker() { None } else { Some(rid) })
}

/// Read a reference that must not be null (bag members).
pub fn read_present_link(r: &mut WireReader<'_>) -> Result<RecordId> {
    let start = r.position();
    read_link(r)?.ok_or_else(|| Error::malformed(start, "null reference inside a link bag"))
}

fn write_sync_id(w: &mut WireWriter, sync_id: Option<Uuid>) {
    match sync_id {
        Some(id) => w.write_raw(id.as_bytes()),
        None => w.write_raw(&NO_SYNC_ID),
    }
}

fn read_sync_id(r: &mut WireReader<'_>) -> Result<Option<Uuid>> {
    let raw = r.read_raw(16)?;
    if raw == NO_SYNC_ID {
        return Ok(None);
    }
    let start = r.position() - 16;
    Uuid::from_slice(&raw)
        .map(Some)
        .map_err(|e| Error::malformed(start, format!("invalid sync id: {}", e)))
}

/// Whether a bag is written with the external representation.
pub fn uses_external_repr(bag: &LinkBag, threshold: usize) -> bool {
    !bag.is_embedded() || bag.size() >= threshold
}

/// Write a link bag, choosing its representation from `threshold`.
pub fn write_link_bag(
    w: &mut WireWriter,
    bag: &LinkBag,
    threshold: usize,
    registry: &dyn BagSyncRegistry,
) -> Result<()> {
    if !uses_external_repr(bag, threshold) {
        trace!(target: "docwire::codec", size = bag.size(), "Writing embedded link bag");
        write_sync_id(w, bag.sync_id());
        w.write_u8(REPR_EMBEDDED);
        w.write_len(bag.size());
        if let BagStorage::Embedded(links) = bag.storage() {
            for rid in links {
                write_link(w, Some(*rid));
            }
        }
        return Ok(());
    }

    trace!(target: "docwire::codec", size = bag.size(), embedded = bag.is_embedded(), "Writing external link bag");
    let sync_id = match registry.register_or_lookup(bag) {
        Some(id) => Some(bag.adopt_sync_id(id)),
        None => bag.sync_id(),
    };
    write_sync_id(w, sync_id);
    w.write_u8(REPR_EXTERNAL);

    match bag.storage() {
        BagStorage::Embedded(links) => {
            let mut counts: BTreeMap<RecordId, i32> = BTreeMap::new();
            for rid in links {
                *counts.entry(*rid).or_insert(0) += 1;
            }
            write_pointer(w, None);
            w.write_len(links.len());
            w.write_len(counts.len());
            for (rid, count) in counts {
                write_change(w, rid, BagChange::Diff(count));
            }
        }
        BagStorage::External {
            pointer,
            size,
            changes,
        } => {
            write_pointer(w, pointer.as_ref());
            w.write_len(*size);
            w.write_len(changes.len());
            for (rid, change) in changes {
                write_change(w, *rid, *change);
            }
        }
    }
    Ok(())
}

fn write_pointer(w: &mut WireWriter, pointer: Option<&BagPointer>) {
    let (file_id, page_index, page_offset) = pointer.map_or(NO_POINTER, |p| {
        (p.file_id, p.page_index, p.page_offset)
    });
    w.write_varint(file_id);
    w.write_varint(page_index);
    w.write_varint(i64::from(page_offset));
}

fn write_change(w: &mut WireWriter, rid: RecordId, change: BagChange) {
    write_link(w, Some(rid));
    w.write_u8(match change {
        BagChange::Diff(_) => CHANGE_DIFF,
        BagChange::Absolute(_) => CHANGE_ABSOLUTE,
    });
    w.write_varint(i64::from(change.magnitude()));
}

/// Read a link bag in either representation.
pub fn read_link_bag(r: &mut WireReader<'_>) -> Result<LinkBag> {
    let sync_id = read_sync_id(r)?;
    let repr_at = r.position();
    let mut bag = match r.read_u8()? {
        REPR_EMBEDDED => {
            let size = r.read_len()?;
            let mut links = Vec::with_capacity(size);
            for _ in 0..size {
                links.push(read_present_link(r)?);
            }
            LinkBag::from_links(links)
        }
        REPR_EXTERNAL => {
            let file_id = r.read_varint()?;
            let page_index = r.read_varint()?;
            let page_offset = r.read_i32_varint()?;
            let pointer = if (file_id, page_index, page_offset) == NO_POINTER {
                None
            } else {
                Some(BagPointer::new(file_id, page_index, page_offset))
            };
            let size = r.read_index()?;
            let count = r.read_len()?;
            let mut changes = BTreeMap::new();
            for _ in 0..count {
                let entry_at = r.position();
                let rid = read_present_link(r)?;
                let kind_at = r.position();
                let kind = r.read_u8()?;
                let magnitude = r.read_i32_varint()?;
                let change = match kind {
                    CHANGE_DIFF => BagChange::Diff(magnitude),
                    CHANGE_ABSOLUTE => BagChange::Absolute(magnitude),
                    other => {
                        return Err(Error::malformed(
                            kind_at,
                            format!("unknown bag change kind {:#04x}", other),
                        ))
                    }
                };
                if changes.insert(rid, change).is_some() {
                    return Err(Error::malformed(
                        entry_at,
                        format!("duplicate bag change for {}", rid),
                    ));
                }
            }
            LinkBag::external(pointer, size, changes)
        }
        other => {
            return Err(Error::malformed(
                repr_at,
                format!("unknown link bag representation {:#04x}", other),
            ))
        }
    };
    bag.set_sync_id(sync_id);
    Ok(bag)
}
