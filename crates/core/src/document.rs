//! Documents and per-field change state
//!
//! A [`Document`] is an optional class name plus an insertion-ordered map of
//! named fields. Each field carries a [`FieldState`] recording what happened
//! to it since the tracking baseline; together with the dirtiness of the
//! value it holds, that state classifies the field for delta encoding.
//!
//! Removing a field that existed at the baseline leaves a tombstone entry
//! (state `Removed`, no value) in its slot until [`Trackable::reset_tracking`].

use indexmap::IndexMap;

use crate::tracking::Trackable;
use crate::types::TypeTag;
use crate::value::{TrackedMut, Value};

/// What happened to a field since the tracking baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldState {
    /// Present at the baseline and not reassigned
    Unmodified,
    /// Absent at the baseline
    Created,
    /// Present at the baseline and reassigned wholesale
    Replaced,
    /// Present at the baseline and removed (tombstone)
    Removed,
}

/// Delta classification of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldChange {
    /// Newly introduced; sent in full
    Created,
    /// Reassigned; sent in full
    Replaced,
    /// Same value, mutated in place; sent as a nested delta
    Changed,
    /// Tombstone; sent by name only
    Removed,
}

/// A field slot: value, optional declared type and change state
#[derive(Debug, Clone)]
pub struct FieldEntry {
    value: Option<Value>,
    declared_type: Option<TypeTag>,
    state: FieldState,
}

impl FieldEntry {
    fn new(value: Option<Value>, declared_type: Option<TypeTag>, state: FieldState) -> Self {
        Self {
            value,
            declared_type,
            state,
        }
    }

    /// Current value; `None` for null fields and tombstones
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Type the entry was set or decoded with, if any
    pub fn declared_type(&self) -> Option<TypeTag> {
        self.declared_type
    }

    /// Recorded state
    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Whether this entry is a tombstone
    pub fn is_removed(&self) -> bool {
        self.state == FieldState::Removed
    }

    /// Classify the entry for delta encoding
    ///
    /// Priority: tombstone, created, replaced, then an unmodified entry whose
    /// value is dirty. Payloads are never compared.
    pub fn change(&self) -> Option<FieldChange> {
        match self.state {
            FieldState::Removed => Some(FieldChange::Removed),
            FieldState::Created => Some(FieldChange::Created),
            FieldState::Replaced => Some(FieldChange::Replaced),
            FieldState::Unmodified if self.value.is_dirty() => Some(FieldChange::Changed),
            FieldState::Unmodified => None,
        }
    }
}

/// Ordered mapping from field name to typed value, with change tracking
#[derive(Debug, Clone, Default)]
pub struct Document {
    class_name: Option<String>,
    fields: IndexMap<String, FieldEntry>,
}

impl Document {
    /// Create an empty document without a class
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty document of the given class
    pub fn with_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            fields: IndexMap::new(),
        }
    }

    /// Class name, if any
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Replace the class name
    pub fn set_class_name(&mut self, class_name: Option<String>) {
        self.class_name = class_name;
    }

    /// Set a field to a non-null value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.set_field(name, Some(value.into()), None);
    }

    /// Set a field to null
    pub fn set_null(&mut self, name: impl Into<String>) {
        self.set_field(name, None, None);
    }

    /// Set a field with an explicit type, overriding schema and inference
    pub fn set_typed(&mut self, name: impl Into<String>, value: Option<Value>, tag: TypeTag) {
        self.set_field(name, value, Some(tag));
    }

    /// Set a field, tracked as created or replaced
    ///
    /// `declared_type` replaces whatever type the entry carried before.
    pub fn set_field(
        &mut self,
        name: impl Into<String>,
        mut value: Option<Value>,
        declared_type: Option<TypeTag>,
    ) {
        let name = name.into();
        value.reset_tracking();
        match self.fields.get_mut(&name) {
            Some(entry) => {
                if entry.state != FieldState::Created {
                    entry.state = FieldState::Replaced;
                }
                entry.value = value;
                entry.declared_type = declared_type;
            }
            None => {
                self.fields.insert(
                    name,
                    FieldEntry::new(value, declared_type, FieldState::Created),
                );
            }
        }
    }

    /// Insert a field as part of the baseline, without recording a change
    ///
    /// Used by decoders building a fresh document.
    pub fn load_field(
        &mut self,
        name: impl Into<String>,
        value: Option<Value>,
        declared_type: Option<TypeTag>,
    ) {
        self.fields.insert(
            name.into(),
            FieldEntry::new(value, declared_type, FieldState::Unmodified),
        );
    }

    /// Remove a field, returning its value
    ///
    /// A field present at the baseline becomes a tombstone. A field created
    /// since the baseline is dropped outright. Absent fields are ignored.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        let entry = self.fields.get_mut(name)?;
        let state = entry.state;
        match state {
            FieldState::Removed => None,
            FieldState::Created => self.fields.shift_remove(name).and_then(|e| e.value),
            FieldState::Unmodified | FieldState::Replaced => {
                entry.state = FieldState::Removed;
                entry.declared_type = None;
                entry.value.take()
            }
        }
    }

    /// Value of a live field; `None` for absent, removed or null fields
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(FieldEntry::value)
    }

    /// Mutable handle to the trackable value of a live field
    ///
    /// `None` for absent, removed, null and scalar fields; reassign those
    /// with [`Document::set`]. The field state is not touched, so changes made
    /// through the handle surface as `Changed` via the value's own tracking.
    pub fn get_mut(&mut self, name: &str) -> Option<TrackedMut<'_>> {
        self.fields
            .get_mut(name)
            .and_then(|e| e.value.as_mut())
            .and_then(Value::tracked_mut)
    }

    /// Field slot, including tombstones
    pub fn entry(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.get(name)
    }

    /// Whether a live (non-removed) field exists, null or not
    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.get(name).map_or(false, |e| !e.is_removed())
    }

    /// Number of live fields
    pub fn len(&self) -> usize {
        self.fields.values().filter(|e| !e.is_removed()).count()
    }

    /// Check if there are no live fields
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.fields
            .iter()
            .filter(|(_, e)| !e.is_removed())
            .map(|(k, e)| (k.as_str(), e))
    }

    /// Names of the live fields in insertion order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields().map(|(name, _)| name)
    }

    /// Every slot, tombstones included, in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.fields.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Fields that belong in a delta, with their classification
    pub fn changes(&self) -> Vec<(&str, &FieldEntry, FieldChange)> {
        self.fields
            .iter()
            .filter_map(|(name, entry)| entry.change().map(|c| (name.as_str(), entry, c)))
            .collect()
    }
}

impl Trackable for Document {
    fn is_dirty(&self) -> bool {
        self.fields.values().any(|e| e.change().is_some())
    }

    fn reset_tracking(&mut self) {
        self.fields.retain(|_, e| !e.is_removed());
        for entry in self.fields.values_mut() {
            entry.state = FieldState::Unmodified;
            entry.value.reset_tracking();
        }
    }
}

// Tracking state, declared types and tombstones do not take part.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.class_name == other.class_name
            && self.len() == other.len()
            && self
                .fields()
                .all(|(name, entry)| match other.fields.get(name) {
                    Some(theirs) if !theirs.is_removed() => entry.value == theirs.value,
                    _ => false,
                })
    }
}
