//! Core types for docwire
//!
//! This module defines the foundational types:
//! - TypeTag: Closed discriminator written in front of every non-null value
//! - RecordId: Opaque reference to another record
//! - Decimal: Fixed-point number carried by the DECIMAL tag

use std::fmt;

/// Wire byte written in place of a type tag when the value is null.
pub const NULL_TAG: u8 = 0xFF;

/// Type discriminator for every encodable value
///
/// Exactly one tag accompanies each non-null value on the wire; a missing
/// tag (the [`NULL_TAG`] byte) encodes null.
///
/// ## TypeTag Values
///
/// The byte values are part of the wire contract and follow the storage
/// engine's historical type ids, which is why 18 (transient) and 23 (any)
/// are absent: those types are never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeTag {
    /// Boolean
    Boolean = 0,
    /// 32-bit signed integer
    Integer = 1,
    /// 16-bit signed integer
    Short = 2,
    /// 64-bit signed integer
    Long = 3,
    /// 32-bit float
    Float = 4,
    /// 64-bit float
    Double = 5,
    /// Instant with millisecond precision
    DateTime = 6,
    /// UTF-8 text
    String = 7,
    /// Raw bytes
    Binary = 8,
    /// Embedded document
    Embedded = 9,
    /// Ordered list of typed values
    EmbeddedList = 10,
    /// Unordered set of typed values
    EmbeddedSet = 11,
    /// Text-keyed map of typed values
    EmbeddedMap = 12,
    /// Single record reference
    Link = 13,
    /// Ordered list of record references
    LinkList = 14,
    /// Set of record references
    LinkSet = 15,
    /// Text-keyed map of record references
    LinkMap = 16,
    /// Single byte
    Byte = 17,
    /// Calendar date
    Date = 19,
    /// Application-defined blob
    Custom = 20,
    /// Fixed-point decimal
    Decimal = 21,
    /// Multiset of record references
    LinkBag = 22,
}

impl TypeTag {
    /// Every tag, in wire-id order.
    pub const ALL: [TypeTag; 22] = [
        TypeTag::Boolean,
        TypeTag::Integer,
        TypeTag::Short,
        TypeTag::Long,
        TypeTag::Float,
        TypeTag::Double,
        TypeTag::DateTime,
        TypeTag::String,
        TypeTag::Binary,
        TypeTag::Embedded,
        TypeTag::EmbeddedList,
        TypeTag::EmbeddedSet,
        TypeTag::EmbeddedMap,
        TypeTag::Link,
        TypeTag::LinkList,
        TypeTag::LinkSet,
        TypeTag::LinkMap,
        TypeTag::Byte,
        TypeTag::Date,
        TypeTag::Custom,
        TypeTag::Decimal,
        TypeTag::LinkBag,
    ];

    /// Convert to byte representation
    pub fn as_byte(&self) -> u8 {
        *self as u8
    }

    /// Try to create from byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TypeTag::Boolean),
            1 => Some(TypeTag::Integer),
            2 => Some(TypeTag::Short),
            3 => Some(TypeTag::Long),
            4 => Some(TypeTag::Float),
            5 => Some(TypeTag::Double),
            6 => Some(TypeTag::DateTime),
            7 => Some(TypeTag::String),
            8 => Some(TypeTag::Binary),
            9 => Some(TypeTag::Embedded),
            10 => Some(TypeTag::EmbeddedList),
            11 => Some(TypeTag::EmbeddedSet),
            12 => Some(TypeTag::EmbeddedMap),
            13 => Some(TypeTag::Link),
            14 => Some(TypeTag::LinkList),
            15 => Some(TypeTag::LinkSet),
            16 => Some(TypeTag::LinkMap),
            17 => Some(TypeTag::Byte),
            19 => Some(TypeTag::Date),
            20 => Some(TypeTag::Custom),
            21 => Some(TypeTag::Decimal),
            22 => Some(TypeTag::LinkBag),
            _ => None,
        }
    }

    /// Upper-case wire name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::Integer => "INTEGER",
            TypeTag::Short => "SHORT",
            TypeTag::Long => "LONG",
            TypeTag::Float => "FLOAT",
            TypeTag::Double => "DOUBLE",
            TypeTag::DateTime => "DATETIME",
            TypeTag::String => "STRING",
            TypeTag::Binary => "BINARY",
            TypeTag::Embedded => "EMBEDDED",
            TypeTag::EmbeddedList => "EMBEDDEDLIST",
            TypeTag::EmbeddedSet => "EMBEDDEDSET",
            TypeTag::EmbeddedMap => "EMBEDDEDMAP",
            TypeTag::Link => "LINK",
            TypeTag::LinkList => "LINKLIST",
            TypeTag::LinkSet => "LINKSET",
            TypeTag::LinkMap => "LINKMAP",
            TypeTag::Byte => "BYTE",
            TypeTag::Date => "DATE",
            TypeTag::Custom => "CUSTOM",
            TypeTag::Decimal => "DECIMAL",
            TypeTag::LinkBag => "LINKBAG",
        }
    }

    /// Whether values of this tag carry change tracking and can be written as a delta
    pub fn is_trackable(&self) -> bool {
        matches!(
            self,
            TypeTag::Embedded
                | TypeTag::EmbeddedList
                | TypeTag::EmbeddedSet
                | TypeTag::EmbeddedMap
                | TypeTag::LinkList
                | TypeTag::LinkSet
                | TypeTag::LinkMap
                | TypeTag::LinkBag
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque reference to another record
///
/// A reference names a record by the container it lives in and its position
/// inside that container. The codec never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    /// Container (cluster) identifier
    pub cluster_id: i32,
    /// Position within the container
    pub position: i64,
}

impl RecordId {
    /// Reserved pair that stands for a null element inside a link collection.
    ///
    /// A `Some(RecordId::NULL_MARKER)` element is written exactly like `None`
    /// and therefore decodes as `None`.
    pub const NULL_MARKER: RecordId = RecordId {
        cluster_id: -2,
        position: -1,
    };

    /// Create a new record reference
    pub const fn new(cluster_id: i32, position: i64) -> Self {
        Self {
            cluster_id,
            position,
        }
    }

    /// Whether this is the reserved null sentinel
    pub fn is_null_marker(&self) -> bool {
        *self == Self::NULL_MARKER
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster_id, self.position)
    }
}

/// Fixed-point decimal: `unscaled * 10^-scale`
///
/// Equality is representational: `1.0` (10, scale 1) and `1.00`
/// (100, scale 2) are different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    /// Unscaled magnitude
    pub unscaled: i64,
    /// Number of digits after the decimal point
    pub scale: i32,
}

impl Decimal {
    /// Create a new decimal
    pub const fn new(unscaled: i64, scale: i32) -> Self {
        Self { unscaled, scale }
    }

    /// Approximate value as `f64`
    pub fn to_f64(&self) -> f64 {
        self.unscaled as f64 / 10f64.powi(self.scale)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        if self.scale < 0 {
            return write!(f, "{}e{}", self.unscaled, -self.scale);
        }
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let sign = if self.unscaled < 0 { "-" } else { "" };
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int, frac)
        } else {
            write!(f, "{}0.{:0>width$}", sign, digits, width = scale)
        }
    }
}
