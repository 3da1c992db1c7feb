//! Type tag and delta op bytes
//!
//! A type tag byte precedes every value; [`NULL_TAG`] stands for null and no
//! value bytes follow it. Delta entries start with a [`DeltaOp`] byte.

use docwire_core::{Error, FieldChange, Result, TypeTag, NULL_TAG};

use crate::wire::{WireReader, WireWriter};

/// Operation byte leading each delta entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeltaOp {
    /// New field, element or key, sent in full
    Created = 1,
    /// Overwritten field, position or key, sent in full
    Replaced = 2,
    /// Value mutated in place, sent as a nested delta
    Changed = 3,
    /// Removed field, position, key or member
    Removed = 4,
}

impl DeltaOp {
    /// Convert to byte representation
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Try to create from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(DeltaOp::Created),
            2 => Some(DeltaOp::Replaced),
            3 => Some(DeltaOp::Changed),
            4 => Some(DeltaOp::Removed),
            _ => None,
        }
    }
}

impl From<FieldChange> for DeltaOp {
    fn from(change: FieldChange) -> Self {
        match change {
            FieldChange::Created => DeltaOp::Created,
            FieldChange::Replaced => DeltaOp::Replaced,
            FieldChange::Changed => DeltaOp::Changed,
            FieldChange::Removed => DeltaOp::Removed,
        }
    }
}

/// Write an op byte.
pub fn write_op(w: &mut WireWriter, op: DeltaOp) {
    w.write_u8(op.as_byte());
}

/// Read an op byte.
pub fn read_op(r: &mut WireReader<'_>) -> Result<DeltaOp> {
    let start = r.position();
    let byte = r.read_u8()?;
    DeltaOp::from_byte(byte)
        .ok_or_else(|| Error::malformed(start, format!("unknown delta op {:#04x}", byte)))
}

/// Write a type tag, or the null marker for `None`.
pub fn write_tag(w: &mut WireWriter, tag: Option<TypeTag>) {
    w.write_u8(tag.map_or(NULL_TAG, |t| t.as_byte()));
}

/// Read a type tag; `None` means null.
pub fn read_tag(r: &mut WireReader<'_>) -> Result<Option<TypeTag>> {
    let start = r.position();
    match r.read_u8()? {
        NULL_TAG => Ok(None),
        byte => TypeTag::from_byte(byte)
            .map(Some)
            .ok_or_else(|| Error::malformed(start, format!("unknown type tag {:#04x}", byte))),
    }
}

/// Read a type tag that must not be null.
pub fn read_required_tag(r: &mut WireReader<'_>) -> Result<TypeTag> {
    let start = r.position();
    read_tag(r)?.ok_or_else(|| Error::malformed(start, "null tag where a type is required"))
}
