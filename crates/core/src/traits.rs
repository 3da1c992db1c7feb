//! Collaborator traits
//!
//! The codec consults two injected collaborators:
//! - [`SchemaResolver`]: declared types for `(class, field)` pairs
//! - [`BagSyncRegistry`]: synchronization ids for externally written bags
//!
//! Both must be safe to share across threads (`Send + Sync`); the codec holds
//! them behind `Arc`s.

use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::link_bag::LinkBag;
use crate::types::TypeTag;

/// Declared type of a field, as known to the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    /// Field type
    pub tag: TypeTag,
    /// Element type for collections, if declared
    pub linked: Option<TypeTag>,
}

impl DeclaredType {
    /// Declared type without an element type
    pub const fn of(tag: TypeTag) -> Self {
        Self { tag, linked: None }
    }

    /// Collection type with a declared element type
    pub const fn collection(tag: TypeTag, linked: TypeTag) -> Self {
        Self {
            tag,
            linked: Some(linked),
        }
    }
}

/// Schema lookup
///
/// Thread safety: implementations are shared by every codec call.
pub trait SchemaResolver: Send + Sync {
    /// Declared type of `field` in `class`, if the schema knows one
    fn resolve(&self, class: Option<&str>, field: &str) -> Option<DeclaredType>;
}

/// Schema that declares nothing; every type is inferred
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl SchemaResolver for NoSchema {
    fn resolve(&self, _class: Option<&str>, _field: &str) -> Option<DeclaredType> {
        None
    }
}

/// In-memory schema keyed by class and field name
///
/// Documents without a class resolve against the empty class name.
#[derive(Debug, Clone, Default)]
pub struct MapSchema {
    fields: HashMap<(String, String), DeclaredType>,
}

impl MapSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field type
    pub fn declare(
        &mut self,
        class: impl Into<String>,
        field: impl Into<String>,
        declared: DeclaredType,
    ) {
        self.fields.insert((class.into(), field.into()), declared);
    }

    /// Builder form of [`declare`](Self::declare)
    pub fn with_field(
        mut self,
        class: impl Into<String>,
        field: impl Into<String>,
        declared: DeclaredType,
    ) -> Self {
        self.declare(class, field, declared);
        self
    }
}

impl SchemaResolver for MapSchema {
    fn resolve(&self, class: Option<&str>, field: &str) -> Option<DeclaredType> {
        self.fields
            .get(&(class.unwrap_or("").to_string(), field.to_string()))
            .copied()
    }
}

/// Registry of bags whose changes are synchronized by the storage engine
pub trait BagSyncRegistry: Send + Sync {
    /// Stable id for `bag`, or `None` when the bag is not synchronized
    ///
    /// The codec pins a returned id on the bag with
    /// [`LinkBag::adopt_sync_id`], so an implementation that returns the
    /// bag's existing id when it has one stays stable across encodings.
    fn register_or_lookup(&self, bag: &LinkBag) -> Option<Uuid>;
}

/// Registry that synchronizes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSyncRegistry;

impl BagSyncRegistry for NoSyncRegistry {
    fn register_or_lookup(&self, _bag: &LinkBag) -> Option<Uuid> {
        None
    }
}

/// Registry that keeps bag ids and hands out fresh ones in memory
///
/// A bag that already carries a sync id keeps it; a bag without one gets a
/// new random id, which the codec then pins on the bag.
#[derive(Debug, Default)]
pub struct InMemorySyncRegistry {
    issued: Mutex<Vec<Uuid>>,
}

impl InMemorySyncRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registrations served so far
    pub fn registrations(&self) -> usize {
        self.issued.lock().len()
    }

    /// Ids returned so far, in order
    pub fn issued(&self) -> Vec<Uuid> {
        self.issued.lock().clone()
    }
}

impl BagSyncRegistry for InMemorySyncRegistry {
    fn register_or_lookup(&self, bag: &LinkBag) -> Option<Uuid> {
        let id = bag.sync_id().unwrap_or_else(Uuid::new_v4);
        self.issued.lock().push(id);
        Some(id)
    }
}
