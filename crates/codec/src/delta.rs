//! Delta document encoding
//!
//! # Format
//!
//! ```text
//! document   [class name: text][dirty field count: varint] entry*
//! entry      [4][name]                          removed
//!            [1|2][name][tag | 0xFF][value]     created / replaced, full value
//!            [3][name][tag][delta]              changed in place
//! ```
//!
//! Collection deltas replay the collection's timeline ("root pass") and then,
//! for embedded collections, list the elements still present whose own
//! tracking is dirty ("nested pass"). Each pass is prefixed by its count.
//!
//! ```text
//! embedded list   root:   [1][tag][value] | [2][pos][tag][value] | [4][pos]
//!                 nested: [3][pos][tag][delta]
//! embedded set    root:   [1][tag][value] | [4][tag][value]
//!                 nested: [3][ordinal][tag][delta]
//! embedded map    root:   [1][key][tag][value] | [2][key][tag][value] | [4][key]
//!                 nested: [3][key][tag][delta]
//! link list       root:   [1][link] | [2][pos][link] | [4][pos]
//! link set        root:   [1][link] | [4][link]
//! link map        root:   [1][key][link] | [2][key][link] | [4][key]
//! link bag        root:   [1][link] | [4][link] | [3]
//! ```
//!
//! Decoding applies each entry to a live target through its tracked API, so
//! the target records the applied changes in turn.

use docwire_core::{
    ChangeEvent, Document, EmbeddedList, EmbeddedMap, EmbeddedSet, Error, FieldChange, LinkBag,
    LinkList, LinkMap, LinkSet, Result, Trackable, TrackedMut, TypeTag, Value,
};
use tracing::trace;

use crate::links::{read_link, read_present_link, write_link};
use crate::tags::{read_op, read_required_tag, read_tag, write_op, write_tag, DeltaOp};
use crate::wire::{WireReader, WireWriter};
use crate::DocumentCodec;

fn no_delta(tag: TypeTag) -> Error {
    Error::UnsupportedOperation(format!("{} values cannot be written as a delta", tag))
}

fn set_update(tag: TypeTag) -> Error {
    Error::UnsupportedOperation(format!("{} does not support positional updates", tag))
}

/// Tag of a `[3]` entry; only trackable kinds carry a nested delta
fn read_delta_tag(r: &mut WireReader<'_>) -> Result<TypeTag> {
    let tag = read_required_tag(r)?;
    if !tag.is_trackable() {
        return Err(no_delta(tag));
    }
    Ok(tag)
}

fn unexpected_op(start: usize, op: DeltaOp, pass: &str) -> Error {
    Error::malformed(start, format!("op {:?} is not valid in a {} pass", op, pass))
}

/// Elements that are themselves dirty, with their position
fn dirty_elements<'a, K, I>(items: I) -> Vec<(K, &'a Value)>
where
    I: Iterator<Item = (K, &'a Option<Value>)>,
{
    items
        .filter_map(|(key, element)| {
            element
                .as_ref()
                .filter(|value| value.is_dirty())
                .map(|value| (key, value))
        })
        .collect()
}

impl DocumentCodec {
    // ========================================================================
    // Encoding
    // ========================================================================

    pub(crate) fn write_document_delta(&self, w: &mut WireWriter, doc: &Document) -> Result<()> {
        w.write_text(doc.class_name().unwrap_or(""));
        let changes = doc.changes();
        w.write_len(changes.len());
        for (name, entry, change) in changes {
            trace!(target: "docwire::codec", field = name, change = ?change, "Writing field delta");
            write_op(w, DeltaOp::from(change));
            w.write_text(name);
            match change {
                FieldChange::Removed => {}
                FieldChange::Created | FieldChange::Replaced => {
                    let field_type = self.field_type(doc, name, entry);
                    self.write_field_value(w, entry.value(), field_type)?;
                }
                FieldChange::Changed => {
                    let field_type = self.field_type(doc, name, entry);
                    match (entry.value(), field_type.tag) {
                        (Some(value), Some(tag)) => {
                            write_tag(w, Some(tag));
                            self.write_value_delta(w, value, tag, field_type.linked)?;
                        }
                        _ => {
                            return Err(Error::UnsupportedOperation(format!(
                                "field '{}' has no value to write as a delta",
                                name
                            )))
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn write_value_delta(
        &self,
        w: &mut WireWriter,
        value: &Value,
        tag: TypeTag,
        linked: Option<TypeTag>,
    ) -> Result<()> {
        if !tag.is_trackable() {
            return Err(no_delta(tag));
        }
        match (tag, value) {
            (TypeTag::Embedded, Value::Embedded(doc)) => self.write_document_delta(w, doc),
            (TypeTag::EmbeddedList, Value::EmbeddedList(list)) => {
                self.write_list_delta(w, list, linked)
            }
            (TypeTag::EmbeddedSet, Value::EmbeddedSet(set)) => self.write_set_delta(w, set, linked),
            (TypeTag::EmbeddedMap, Value::EmbeddedMap(map)) => self.write_map_delta(w, map, linked),
            (TypeTag::LinkList, Value::LinkList(list)) => {
                write_link_list_delta(w, list);
                Ok(())
            }
            (TypeTag::LinkSet, Value::LinkSet(set)) => write_link_set_delta(w, set),
            (TypeTag::LinkMap, Value::LinkMap(map)) => {
                write_link_map_delta(w, map);
                Ok(())
            }
            (TypeTag::LinkBag, Value::LinkBag(bag)) => {
                write_link_bag_delta(w, bag);
                Ok(())
            }
            _ => Err(Error::UnsupportedType(format!(
                "{} value cannot be written as {}",
                value.type_name(),
                tag
            ))),
        }
    }

    /// `[3][tag][delta]` for one dirty element, after its key was written
    fn write_element_delta(
        &self,
        w: &mut WireWriter,
        value: &Value,
        linked: Option<TypeTag>,
    ) -> Result<()> {
        let tag = linked.unwrap_or_else(|| value.type_tag());
        write_tag(w, Some(tag));
        self.write_value_delta(w, value, tag, None)
    }

    fn write_list_delta(
        &self,
        w: &mut WireWriter,
        list: &EmbeddedList,
        linked: Option<TypeTag>,
    ) -> Result<()> {
        w.write_len(list.timeline().len());
        for event in list.timeline() {
            match event {
                ChangeEvent::Add { value, .. } => {
                    write_op(w, DeltaOp::Created);
                    self.write_element(w, value, linked)?;
                }
                ChangeEvent::Update { key, value, .. } => {
                    write_op(w, DeltaOp::Replaced);
                    w.write_len(*key);
                    self.write_element(w, value, linked)?;
                }
                ChangeEvent::Remove { key, .. } => {
                    write_op(w, DeltaOp::Removed);
                    w.write_len(*key);
                }
            }
        }

        let dirty = dirty_elements(list.iter().enumerate());
        w.write_len(dirty.len());
        for (pos, value) in dirty {
            write_op(w, DeltaOp::Changed);
            w.write_len(pos);
            self.write_element_delta(w, value, linked)?;
        }
        Ok(())
    }

    fn write_set_delta(
        &self,
        w: &mut WireWriter,
        set: &EmbeddedSet,
        linked: Option<TypeTag>,
    ) -> Result<()> {
        w.write_len(set.timeline().len());
        for event in set.timeline() {
            match event {
                ChangeEvent::Add { value, .. } => {
                    write_op(w, DeltaOp::Created);
                    self.write_element(w, value, linked)?;
                }
                ChangeEvent::Remove { old_value, .. } => {
                    write_op(w, DeltaOp::Removed);
                    self.write_element(w, old_value, linked)?;
                }
                ChangeEvent::Update { .. } => return Err(set_update(TypeTag::EmbeddedSet)),
            }
        }

        let dirty = dirty_elements(set.iter().enumerate());
        w.write_len(dirty.len());
        for (ordinal, value) in dirty {
            write_op(w, DeltaOp::Changed);
            w.write_len(ordinal);
            self.write_element_delta(w, value, linked)?;
        }
        Ok(())
    }

    fn write_map_delta(
        &self,
        w: &mut WireWriter,
        map: &EmbeddedMap,
        linked: Option<TypeTag>,
    ) -> Result<()> {
        w.write_len(map.timeline().len());
        for event in map.timeline() {
            match event {
                ChangeEvent::Add { key, value } => {
                    write_op(w, DeltaOp::Created);
                    w.write_text(key);
                    self.write_element(w, value, linked)?;
                }
                ChangeEvent::Update { key, value, .. } => {
                    write_op(w, DeltaOp::Replaced);
                    w.write_text(key);
                    self.write_element(w, value, linked)?;
                }
                ChangeEvent::Remove { key, .. } => {
                    write_op(w, DeltaOp::Removed);
                    w.write_text(key);
                }
            }
        }

        let dirty = dirty_elements(map.iter());
        w.write_len(dirty.len());
        for (key, value) in dirty {
            write_op(w, DeltaOp::Changed);
            w.write_text(key);
            self.write_element_delta(w, value, linked)?;
        }
        Ok(())
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    pub(crate) fn read_document_delta(
        &self,
        r: &mut WireReader<'_>,
        target: &mut Document,
    ) -> Result<()> {
        let class_name = r.read_text()?;
        if !class_name.is_empty() && target.class_name() != Some(class_name.as_str()) {
            target.set_class_name(Some(class_name));
        }
        let count = r.read_len()?;
        for _ in 0..count {
            let op = read_op(r)?;
            let name = r.read_text()?;
            match op {
                DeltaOp::Removed => {
                    target.remove_field(&name);
                }
                DeltaOp::Created | DeltaOp::Replaced => {
                    let tag = read_tag(r)?;
                    let value = match tag {
                        Some(tag) => Some(self.read_value(r, tag)?),
                        None => None,
                    };
                    target.set_field(name, value, tag);
                }
                DeltaOp::Changed => {
                    let tag = read_delta_tag(r)?;
                    let found = match target.get(&name) {
                        Some(value) => value.type_name(),
                        None => {
                            return Err(Error::inconsistent(format!(
                                "no field '{}' to apply changes to",
                                name
                            )))
                        }
                    };
                    let value = target.get_mut(&name).ok_or_else(|| {
                        Error::inconsistent(format!("expected {} target, found {}", tag, found))
                    })?;
                    self.read_value_delta(r, value, tag)?;
                }
            }
        }
        Ok(())
    }

    fn read_value_delta(
        &self,
        r: &mut WireReader<'_>,
        target: TrackedMut<'_>,
        tag: TypeTag,
    ) -> Result<()> {
        let found = target.type_name();
        let mismatch =
            || Error::inconsistent(format!("expected {} target, found {}", tag, found));
        match (tag, target) {
            (TypeTag::Embedded, TrackedMut::Embedded(doc)) => self.read_document_delta(r, doc),
            (TypeTag::EmbeddedList, TrackedMut::EmbeddedList(list)) => {
                self.read_list_delta(r, list)
            }
            (TypeTag::EmbeddedSet, TrackedMut::EmbeddedSet(set)) => self.read_set_delta(r, set),
            (TypeTag::EmbeddedMap, TrackedMut::EmbeddedMap(map)) => self.read_map_delta(r, map),
            (TypeTag::LinkList, TrackedMut::LinkList(list)) => read_link_list_delta(r, list),
            (TypeTag::LinkSet, TrackedMut::LinkSet(set)) => read_link_set_delta(r, set),
            (TypeTag::LinkMap, TrackedMut::LinkMap(map)) => read_link_map_delta(r, map),
            (TypeTag::LinkBag, TrackedMut::LinkBag(bag)) => read_link_bag_delta(r, bag),
            _ => Err(mismatch()),
        }
    }

    /// Nested entry header: `[3]`; anything else is malformed
    fn read_nested_op(r: &mut WireReader<'_>) -> Result<()> {
        let start = r.position();
        match read_op(r)? {
            DeltaOp::Changed => Ok(()),
            op => Err(unexpected_op(start, op, "nested")),
        }
    }

    fn read_list_delta(&self, r: &mut WireReader<'_>, list: &mut EmbeddedList) -> Result<()> {
        let root = r.read_len()?;
        for _ in 0..root {
            let start = r.position();
            match read_op(r)? {
                DeltaOp::Created => {
                    let element = self.read_element(r)?;
                    list.push(element);
                }
                DeltaOp::Replaced => {
                    let pos = r.read_index()?;
                    let element = self.read_element(r)?;
                    list.set(pos, element).map_err(|_| missing_position(pos, list.len()))?;
                }
                DeltaOp::Removed => {
                    let pos = r.read_index()?;
                    list.remove(pos).map_err(|_| missing_position(pos, list.len()))?;
                }
                op => return Err(unexpected_op(start, op, "root")),
            }
        }

        let nested = r.read_len()?;
        for _ in 0..nested {
            Self::read_nested_op(r)?;
            let pos = r.read_index()?;
            let tag = read_delta_tag(r)?;
            let len = list.len();
            let value = list
                .get_mut(pos)
                .ok_or_else(|| missing_position(pos, len))?;
            self.read_value_delta(r, value, tag)?;
        }
        Ok(())
    }

    fn read_set_delta(&self, r: &mut WireReader<'_>, set: &mut EmbeddedSet) -> Result<()> {
        let root = r.read_len()?;
        for _ in 0..root {
            let start = r.position();
            match read_op(r)? {
                DeltaOp::Created => {
                    let element = self.read_element(r)?;
                    set.insert(element);
                }
                DeltaOp::Removed => {
                    let element = self.read_element(r)?;
                    set.remove(&element);
                }
                DeltaOp::Replaced => return Err(set_update(TypeTag::EmbeddedSet)),
                op => return Err(unexpected_op(start, op, "root")),
            }
        }

        let nested = r.read_len()?;
        for _ in 0..nested {
            Self::read_nested_op(r)?;
            let ordinal = r.read_index()?;
            let tag = read_delta_tag(r)?;
            let len = set.len();
            let value = set
                .get_mut(ordinal)
                .ok_or_else(|| missing_position(ordinal, len))?;
            self.read_value_delta(r, value, tag)?;
        }
        Ok(())
    }

    fn read_map_delta(&self, r: &mut WireReader<'_>, map: &mut EmbeddedMap) -> Result<()> {
        let root = r.read_len()?;
        for _ in 0..root {
            let start = r.position();
            match read_op(r)? {
                DeltaOp::Created | DeltaOp::Replaced => {
                    let key = r.read_text()?;
                    let element = self.read_element(r)?;
                    map.insert(key, element);
                }
                DeltaOp::Removed => {
                    let key = r.read_text()?;
                    map.remove(&key);
                }
                op => return Err(unexpected_op(start, op, "root")),
            }
        }

        let nested = r.read_len()?;
        for _ in 0..nested {
            Self::read_nested_op(r)?;
            let key = r.read_text()?;
            let tag = read_delta_tag(r)?;
            let value = map
                .get_mut(&key)
                .ok_or_else(|| Error::inconsistent(format!("no value at key '{}'", key)))?;
            self.read_value_delta(r, value, tag)?;
        }
        Ok(())
    }
}

fn missing_position(pos: usize, len: usize) -> Error {
    Error::inconsistent(format!("no element at position {} (length {})", pos, len))
}

// ============================================================================
// Link collections: root pass only
// ============================================================================

fn write_link_list_delta(w: &mut WireWriter, list: &LinkList) {
    w.write_len(list.timeline().len());
    for event in list.timeline() {
        match event {
            ChangeEvent::Add { value, .. } => {
                write_op(w, DeltaOp::Created);
                write_link(w, *value);
            }
            ChangeEvent::Update { key, value, .. } => {
                write_op(w, DeltaOp::Replaced);
                w.write_len(*key);
                write_link(w, *value);
            }
            ChangeEvent::Remove { key, .. } => {
                write_op(w, DeltaOp::Removed);
                w.write_len(*key);
            }
        }
    }
}

fn write_link_set_delta(w: &mut WireWriter, set: &LinkSet) -> Result<()> {
    w.write_len(set.timeline().len());
    for event in set.timeline() {
        match event {
            ChangeEvent::Add { value, .. } => {
                write_op(w, DeltaOp::Created);
                write_link(w, *value);
            }
            ChangeEvent::Remove { old_value, .. } => {
                write_op(w, DeltaOp::Removed);
                write_link(w, *old_value);
            }
            ChangeEvent::Update { .. } => return Err(set_update(TypeTag::LinkSet)),
        }
    }
    Ok(())
}

fn write_link_map_delta(w: &mut WireWriter, map: &LinkMap) {
    w.write_len(map.timeline().len());
    for event in map.timeline() {
        match event {
            ChangeEvent::Add { key, value } => {
                write_op(w, DeltaOp::Created);
                w.write_text(key);
                write_link(w, *value);
            }
            ChangeEvent::Update { key, value, .. } => {
                write_op(w, DeltaOp::Replaced);
                w.write_text(key);
                write_link(w, *value);
            }
            ChangeEvent::Remove { key, .. } => {
                write_op(w, DeltaOp::Removed);
                w.write_text(key);
            }
        }
    }
}

fn write_link_bag_delta(w: &mut WireWriter, bag: &LinkBag) {
    w.write_len(bag.timeline().len());
    for event in bag.timeline() {
        match event {
            ChangeEvent::Add { value, .. } => {
                write_op(w, DeltaOp::Created);
                write_link(w, Some(*value));
            }
            ChangeEvent::Remove { old_value, .. } => {
                write_op(w, DeltaOp::Removed);
                write_link(w, Some(*old_value));
            }
            // bags have no positions; kept as a bare marker
            ChangeEvent::Update { .. } => write_op(w, DeltaOp::Changed),
        }
    }
}

fn read_link_list_delta(r: &mut WireReader<'_>, list: &mut LinkList) -> Result<()> {
    let root = r.read_len()?;
    for _ in 0..root {
        let start = r.position();
        match read_op(r)? {
            DeltaOp::Created => {
                let link = read_link(r)?;
                list.push(link);
            }
            DeltaOp::Replaced => {
                let pos = r.read_index()?;
                let link = read_link(r)?;
                list.set(pos, link).map_err(|_| missing_position(pos, list.len()))?;
            }
            DeltaOp::Removed => {
                let pos = r.read_index()?;
                list.remove(pos).map_err(|_| missing_position(pos, list.len()))?;
            }
            op => return Err(unexpected_op(start, op, "root")),
        }
    }
    Ok(())
}

fn read_link_set_delta(r: &mut WireReader<'_>, set: &mut LinkSet) -> Result<()> {
    let root = r.read_len()?;
    for _ in 0..root {
        let start = r.position();
        match read_op(r)? {
            DeltaOp::Created => {
                let link = read_link(r)?;
                set.insert(link);
            }
            DeltaOp::Removed => {
                let link = read_link(r)?;
                set.remove(&link);
            }
            DeltaOp::Replaced => return Err(set_update(TypeTag::LinkSet)),
            op => return Err(unexpected_op(start, op, "root")),
        }
    }
    Ok(())
}

fn read_link_map_delta(r: &mut WireReader<'_>, map: &mut LinkMap) -> Result<()> {
    let root = r.read_len()?;
    for _ in 0..root {
        let start = r.position();
        match read_op(r)? {
            DeltaOp::Created | DeltaOp::Replaced => {
                let key = r.read_text()?;
                let link = read_link(r)?;
                map.insert(key, link);
            }
            DeltaOp::Removed => {
                let key = r.read_text()?;
                map.remove(&key);
            }
            op => return Err(unexpected_op(start, op, "root")),
        }
    }
    Ok(())
}

fn read_link_bag_delta(r: &mut WireReader<'_>, bag: &mut LinkBag) -> Result<()> {
    let root = r.read_len()?;
    for _ in 0..root {
        let start = r.position();
        match read_op(r)? {
            DeltaOp::Created => bag.add(read_present_link(r)?),
            DeltaOp::Removed => {
                bag.remove(read_present_link(r)?);
            }
            DeltaOp::Changed => {}
            op => return Err(unexpected_op(start, op, "link bag")),
        }
    }
    Ok(())
}
