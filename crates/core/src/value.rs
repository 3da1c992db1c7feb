//! Value types for docwire
//!
//! This module defines:
//! - Value: closed sum type for every encodable field or element value
//! - TrackedMut: mutable borrow of the trackable variants
//!
//! Null is never a `Value`; every slot that admits null holds an
//! `Option<Value>`. The variant chosen at construction is what the codec
//! falls back to when neither the field entry nor the schema declares a type.
//!
//! ## Equality
//!
//! - Different variants are never equal: `Integer(1) != Long(1)`
//! - Floats follow IEEE-754: `NaN != NaN`, `-0.0 == 0.0`
//! - Sets compare as multisets, maps by key, documents field by field

use crate::collections::{EmbeddedList, EmbeddedMap, EmbeddedSet, LinkList, LinkMap, LinkSet};
use crate::custom::CustomValue;
use crate::document::Document;
use crate::link_bag::LinkBag;
use crate::tracking::Trackable;
use crate::types::{Decimal, RecordId, TypeTag};

/// A typed value held by a field or collection element
#[derive(Debug, Clone)]
pub enum Value {
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 16-bit signed integer
    Short(i16),
    /// UTF-8 text
    String(String),
    /// 64-bit float
    Double(f64),
    /// 32-bit float
    Float(f32),
    /// Single byte
    Byte(u8),
    /// Boolean
    Boolean(bool),
    /// Calendar date, as epoch milliseconds of midnight in the database time zone
    Date(i64),
    /// Instant, as epoch milliseconds
    DateTime(i64),
    /// Fixed-point decimal
    Decimal(Decimal),
    /// Raw bytes
    Binary(Vec<u8>),
    /// Embedded document
    Embedded(Document),
    /// Ordered list of typed values
    EmbeddedList(EmbeddedList),
    /// Set of typed values
    EmbeddedSet(EmbeddedSet),
    /// Text-keyed map of typed values
    EmbeddedMap(EmbeddedMap),
    /// Record reference
    Link(RecordId),
    /// Ordered list of record references
    LinkList(LinkList),
    /// Set of record references
    LinkSet(LinkSet),
    /// Text-keyed map of record references
    LinkMap(LinkMap),
    /// Multiset of record references
    LinkBag(LinkBag),
    /// Application-defined blob
    Custom(CustomValue),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Embedded(a), Value::Embedded(b)) => a == b,
            (Value::EmbeddedList(a), Value::EmbeddedList(b)) => a == b,
            (Value::EmbeddedSet(a), Value::EmbeddedSet(b)) => a == b,
            (Value::EmbeddedMap(a), Value::EmbeddedMap(b)) => a == b,
            (Value::Link(a), Value::Link(b)) => a == b,
            (Value::LinkList(a), Value::LinkList(b)) => a == b,
            (Value::LinkSet(a), Value::LinkSet(b)) => a == b,
            (Value::LinkMap(a), Value::LinkMap(b)) => a == b,
            (Value::LinkBag(a), Value::LinkBag(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Tag inferred from the variant
    ///
    /// Used only when no declared type is available for the slot.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Integer(_) => TypeTag::Integer,
            Value::Long(_) => TypeTag::Long,
            Value::Short(_) => TypeTag::Short,
            Value::String(_) => TypeTag::String,
            Value::Double(_) => TypeTag::Double,
            Value::Float(_) => TypeTag::Float,
            Value::Byte(_) => TypeTag::Byte,
            Value::Boolean(_) => TypeTag::Boolean,
            Value::Date(_) => TypeTag::Date,
            Value::DateTime(_) => TypeTag::DateTime,
            Value::Decimal(_) => TypeTag::Decimal,
            Value::Binary(_) => TypeTag::Binary,
            Value::Embedded(_) => TypeTag::Embedded,
            Value::EmbeddedList(_) => TypeTag::EmbeddedList,
            Value::EmbeddedSet(_) => TypeTag::EmbeddedSet,
            Value::EmbeddedMap(_) => TypeTag::EmbeddedMap,
            Value::Link(_) => TypeTag::Link,
            Value::LinkList(_) => TypeTag::LinkList,
            Value::LinkSet(_) => TypeTag::LinkSet,
            Value::LinkMap(_) => TypeTag::LinkMap,
            Value::LinkBag(_) => TypeTag::LinkBag,
            Value::Custom(_) => TypeTag::Custom,
        }
    }

    /// Variant name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Short(_) => "Short",
            Value::String(_) => "String",
            Value::Double(_) => "Double",
            Value::Float(_) => "Float",
            Value::Byte(_) => "Byte",
            Value::Boolean(_) => "Boolean",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Decimal(_) => "Decimal",
            Value::Binary(_) => "Binary",
            Value::Embedded(_) => "Embedded",
            Value::EmbeddedList(_) => "EmbeddedList",
            Value::EmbeddedSet(_) => "EmbeddedSet",
            Value::EmbeddedMap(_) => "EmbeddedMap",
            Value::Link(_) => "Link",
            Value::LinkList(_) => "LinkList",
            Value::LinkSet(_) => "LinkSet",
            Value::LinkMap(_) => "LinkMap",
            Value::LinkBag(_) => "LinkBag",
            Value::Custom(_) => "Custom",
        }
    }

    /// Integral value widened to `i64`, for Integer, Long, Short and Byte
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Byte(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Get as text if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bool if this is a Boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as f64 if this is a Double or Float value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Get the embedded document
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Embedded(d) => Some(d),
            _ => None,
        }
    }

    /// Get the embedded list
    pub fn as_list(&self) -> Option<&EmbeddedList> {
        match self {
            Value::EmbeddedList(l) => Some(l),
            _ => None,
        }
    }

    /// Get the embedded map
    pub fn as_map(&self) -> Option<&EmbeddedMap> {
        match self {
            Value::EmbeddedMap(m) => Some(m),
            _ => None,
        }
    }

    /// Get the link bag
    pub fn as_link_bag(&self) -> Option<&LinkBag> {
        match self {
            Value::LinkBag(b) => Some(b),
            _ => None,
        }
    }

    /// Mutable handle to a trackable value; `None` for scalars
    ///
    /// Changes made through the handle are recorded by the container's own
    /// tracking. Scalars have no handle: they change only by reassigning the
    /// slot that holds them, which records the change.
    pub fn tracked_mut(&mut self) -> Option<TrackedMut<'_>> {
        match self {
            Value::Embedded(d) => Some(TrackedMut::Embedded(d)),
            Value::EmbeddedList(l) => Some(TrackedMut::EmbeddedList(l)),
            Value::EmbeddedSet(s) => Some(TrackedMut::EmbeddedSet(s)),
            Value::EmbeddedMap(m) => Some(TrackedMut::EmbeddedMap(m)),
            Value::LinkList(l) => Some(TrackedMut::LinkList(l)),
            Value::LinkSet(s) => Some(TrackedMut::LinkSet(s)),
            Value::LinkMap(m) => Some(TrackedMut::LinkMap(m)),
            Value::LinkBag(b) => Some(TrackedMut::LinkBag(b)),
            _ => None,
        }
    }
}

impl Trackable for Value {
    fn is_dirty(&self) -> bool {
        match self {
            Value::Embedded(d) => d.is_dirty(),
            Value::EmbeddedList(l) => l.is_dirty(),
            Value::EmbeddedSet(s) => s.is_dirty(),
            Value::EmbeddedMap(m) => m.is_dirty(),
            Value::LinkList(l) => l.is_dirty(),
            Value::LinkSet(s) => s.is_dirty(),
            Value::LinkMap(m) => m.is_dirty(),
            Value::LinkBag(b) => b.is_dirty(),
            _ => false,
        }
    }

    fn reset_tracking(&mut self) {
        match self {
            Value::Embedded(d) => d.reset_tracking(),
            Value::EmbeddedList(l) => l.reset_tracking(),
            Value::EmbeddedSet(s) => s.reset_tracking(),
            Value::EmbeddedMap(m) => m.reset_tracking(),
            Value::LinkList(l) => l.reset_tracking(),
            Value::LinkSet(s) => s.reset_tracking(),
            Value::LinkMap(m) => m.reset_tracking(),
            Value::LinkBag(b) => b.reset_tracking(),
            _ => {}
        }
    }
}

// ============================================================================
// TrackedMut
// ============================================================================

/// Mutable borrow of a trackable value inside a field or element slot
///
/// Handed out instead of `&mut Value` so the slot itself cannot be
/// overwritten behind the owner's back.
#[derive(Debug)]
pub enum TrackedMut<'a> {
    /// Embedded document
    Embedded(&'a mut Document),
    /// Embedded list
    EmbeddedList(&'a mut EmbeddedList),
    /// Embedded set
    EmbeddedSet(&'a mut EmbeddedSet),
    /// Embedded map
    EmbeddedMap(&'a mut EmbeddedMap),
    /// Link list
    LinkList(&'a mut LinkList),
    /// Link set
    LinkSet(&'a mut LinkSet),
    /// Link map
    LinkMap(&'a mut LinkMap),
    /// Link bag
    LinkBag(&'a mut LinkBag),
}

impl<'a> TrackedMut<'a> {
    /// Name of the borrowed variant, as [`Value::type_name`] reports it
    pub fn type_name(&self) -> &'static str {
        match self {
            TrackedMut::Embedded(_) => "Embedded",
            TrackedMut::EmbeddedList(_) => "EmbeddedList",
            TrackedMut::EmbeddedSet(_) => "EmbeddedSet",
            TrackedMut::EmbeddedMap(_) => "EmbeddedMap",
            TrackedMut::LinkList(_) => "LinkList",
            TrackedMut::LinkSet(_) => "LinkSet",
            TrackedMut::LinkMap(_) => "LinkMap",
            TrackedMut::LinkBag(_) => "LinkBag",
        }
    }

    /// The embedded document, if that is what is borrowed
    pub fn into_document(self) -> Option<&'a mut Document> {
        match self {
            TrackedMut::Embedded(d) => Some(d),
            _ => None,
        }
    }

    /// The embedded list, if that is what is borrowed
    pub fn into_list(self) -> Option<&'a mut EmbeddedList> {
        match self {
            TrackedMut::EmbeddedList(l) => Some(l),
            _ => None,
        }
    }

    /// The embedded set, if that is what is borrowed
    pub fn into_set(self) -> Option<&'a mut EmbeddedSet> {
        match self {
            TrackedMut::EmbeddedSet(s) => Some(s),
            _ => None,
        }
    }

    /// The embedded map, if that is what is borrowed
    pub fn into_map(self) -> Option<&'a mut EmbeddedMap> {
        match self {
            TrackedMut::EmbeddedMap(m) => Some(m),
            _ => None,
        }
    }

    /// The link list, if that is what is borrowed
    pub fn into_link_list(self) -> Option<&'a mut LinkList> {
        match self {
            TrackedMut::LinkList(l) => Some(l),
            _ => None,
        }
    }

    /// The link set, if that is what is borrowed
    pub fn into_link_set(self) -> Option<&'a mut LinkSet> {
        match self {
            TrackedMut::LinkSet(s) => Some(s),
            _ => None,
        }
    }

    /// The link map, if that is what is borrowed
    pub fn into_link_map(self) -> Option<&'a mut LinkMap> {
        match self {
            TrackedMut::LinkMap(m) => Some(m),
            _ => None,
        }
    }

    /// The link bag, if that is what is borrowed
    pub fn into_link_bag(self) -> Option<&'a mut LinkBag> {
        match self {
            TrackedMut::LinkBag(b) => Some(b),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations
// ============================================================================

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Byte(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<RecordId> for Value {
    fn from(rid: RecordId) -> Self {
        Value::Link(rid)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Embedded(doc)
    }
}

impl From<EmbeddedList> for Value {
    fn from(list: EmbeddedList) -> Self {
        Value::EmbeddedList(list)
    }
}

impl From<EmbeddedSet> for Value {
    fn from(set: EmbeddedSet) -> Self {
        Value::EmbeddedSet(set)
    }
}

impl From<EmbeddedMap> for Value {
    fn from(map: EmbeddedMap) -> Self {
        Value::EmbeddedMap(map)
    }
}

impl From<LinkList> for Value {
    fn from(list: LinkList) -> Self {
        Value::LinkList(list)
    }
}

impl From<LinkSet> for Value {
    fn from(set: LinkSet) -> Self {
        Value::LinkSet(set)
    }
}

impl From<LinkMap> for Value {
    fn from(map: LinkMap) -> Self {
        Value::LinkMap(map)
    }
}

impl From<LinkBag> for Value {
    fn from(bag: LinkBag) -> Self {
        Value::LinkBag(bag)
    }
}

impl From<CustomValue> for Value {
    fn from(v: CustomValue) -> Self {
        Value::Custom(v)
    }
}
