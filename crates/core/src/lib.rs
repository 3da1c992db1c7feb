//! Core types and traits for docwire
//!
//! This crate defines the document model the codec reads and writes:
//! - TypeTag: Closed discriminator for every encodable value
//! - RecordId, Decimal: Scalar building blocks
//! - Value: Sum type over every supported value kind, plus TrackedMut handles
//! - Document: Ordered fields with per-field change state
//! - Tracking: Change timelines and the Trackable trait
//! - Collections: Tracked lists, sets and maps
//! - LinkBag: Reference multiset with embedded and external storage
//! - Custom: Application-defined values and their registry
//! - Traits: Schema and bag synchronization collaborators
//! - Error: Error type shared with the codec

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collections;
pub mod custom;
pub mod document;
pub mod error;
pub mod link_bag;
pub mod tracking;
pub mod traits;
pub mod types;
pub mod value;

pub use collections::{
    EmbeddedList, EmbeddedMap, EmbeddedSet, LinkList, LinkMap, LinkSet, TrackedList, TrackedMap,
    TrackedSet,
};
pub use custom::{CustomDecoder, CustomType, CustomTypeRegistry, CustomValue};
pub use document::{Document, FieldChange, FieldEntry, FieldState};
pub use error::{Error, Result};
pub use link_bag::{BagChange, BagPointer, BagStorage, LinkBag};
pub use tracking::{ChangeEvent, ChangeKind, Timeline, Trackable};
pub use traits::{
    BagSyncRegistry, DeclaredType, InMemorySyncRegistry, MapSchema, NoSchema, NoSyncRegistry,
    SchemaResolver,
};
pub use types::{Decimal, RecordId, TypeTag, NULL_TAG};
pub use value::{TrackedMut, Value};
