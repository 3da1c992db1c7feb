//! Delta encoding scenarios
//!
//! Each test starts two replicas from the same full encoding, mutates one,
//! ships its delta to the other and compares.

use crate::common::*;

/// Source and target replicas of `baseline`
fn replicas(codec: &DocumentCodec, baseline: &Document) -> (Document, Document) {
    (reload(codec, baseline), reload(codec, baseline))
}

fn assert_converges(codec: &DocumentCodec, source: &Document, mut target: Document) {
    ship(codec, source, &mut target);
    assert_eq!(&target, source);
    assert_eq!(target, reload(codec, source));
}

fn list_mut<'a>(doc: &'a mut Document, name: &str) -> &'a mut EmbeddedList {
    doc.get_mut(name).and_then(TrackedMut::into_list).unwrap()
}

fn map_mut<'a>(doc: &'a mut Document, name: &str) -> &'a mut EmbeddedMap {
    doc.get_mut(name).and_then(TrackedMut::into_map).unwrap()
}

// ============================================================================
// Documented scenarios
// ============================================================================

#[test]
fn append_and_replace_scenario() {
    let codec = codec();
    let (mut source, mut target) = replicas(&codec, &person());

    list_mut(&mut source, "tags").push(Some(Value::from("z")));
    source.set("name", "b");

    let changes: Vec<(&str, FieldChange)> =
        source.changes().into_iter().map(|(n, _, c)| (n, c)).collect();
    assert_eq!(
        changes,
        vec![("name", FieldChange::Replaced), ("tags", FieldChange::Changed)]
    );

    let bytes = codec.encode_delta(&source).unwrap();
    let mut expected = WireWriter::new();
    expected.write_text("Person");
    expected.write_len(2);
    expected.write_u8(DeltaOp::Replaced.as_byte());
    expected.write_text("name");
    expected.write_u8(TypeTag::String.as_byte());
    expected.write_text("b");
    expected.write_u8(DeltaOp::Changed.as_byte());
    expected.write_text("tags");
    expected.write_u8(TypeTag::EmbeddedList.as_byte());
    expected.write_len(1);
    expected.write_u8(DeltaOp::Created.as_byte());
    expected.write_u8(TypeTag::String.as_byte());
    expected.write_text("z");
    expected.write_len(0);
    assert_eq!(bytes, expected.into_bytes());

    codec.decode_delta(&bytes, &mut target).unwrap();
    let mut wanted = Document::with_class("Person");
    wanted.set("name", "b");
    wanted.set("tags", strings(&["x", "y", "z"]));
    assert_eq!(target, wanted);
}

#[test]
fn removed_field_scenario() {
    let codec = codec();
    let mut source = reload(&codec, &person());
    source.remove_field("name");

    let changes = source.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!((changes[0].0, changes[0].2), ("name", FieldChange::Removed));

    let bytes = codec.encode_delta(&source).unwrap();

    let mut same = reload(&codec, &person());
    codec.decode_delta(&bytes, &mut same).unwrap();
    assert!(!same.contains_field("name"));

    let mut other = Document::with_class("Person");
    other.set("name", 99i64);
    other.set("kept", true);
    other.reset_tracking();
    codec.decode_delta(&bytes, &mut other).unwrap();
    assert!(!other.contains_field("name"));
    assert!(other.contains_field("kept"));
}

#[test]
fn no_changes_yield_an_empty_delta() {
    let codec = codec();
    let clean = reload(&codec, &person());
    let mut expected = WireWriter::new();
    expected.write_text("Person");
    expected.write_len(0);
    assert_eq!(codec.encode_delta(&clean).unwrap(), expected.into_bytes());

    let mut doc = person();
    doc.set("count", 1i32);
    doc.reset_tracking();
    let mut w = WireWriter::new();
    codec.write_delta(&mut w, &doc).unwrap();
    let mut r = WireReader::new(w.as_bytes());
    assert_eq!(r.read_text().unwrap(), "Person");
    assert_eq!(r.read_len().unwrap(), 0);
    assert!(r.is_exhausted());
}

#[test]
fn nested_mutation_is_isolated() {
    let codec = codec();
    let mut address = Document::with_class("Address");
    address.set("city", "Lyon");
    address.set("zip", "69001");
    let mut baseline = person();
    baseline.set("address", address);
    let (mut source, target) = replicas(&codec, &baseline);

    source
        .get_mut("address")
        .and_then(TrackedMut::into_document)
        .unwrap()
        .set("city", "Paris");

    let changes = source.changes();
    assert_eq!(changes.len(), 1);
    assert_eq!((changes[0].0, changes[0].2), ("address", FieldChange::Changed));

    let nested = source.get("address").and_then(Value::as_document).unwrap();
    let nested_changes: Vec<(&str, FieldChange)> =
        nested.changes().into_iter().map(|(n, _, c)| (n, c)).collect();
    assert_eq!(nested_changes, vec![("city", FieldChange::Replaced)]);

    let bytes = codec.encode_delta(&source).unwrap();
    let mut expected = WireWriter::new();
    expected.write_text("Person");
    expected.write_len(1);
    expected.write_u8(DeltaOp::Changed.as_byte());
    expected.write_text("address");
    expected.write_u8(TypeTag::Embedded.as_byte());
    expected.write_text("Address");
    expected.write_len(1);
    expected.write_u8(DeltaOp::Replaced.as_byte());
    expected.write_text("city");
    expected.write_u8(TypeTag::String.as_byte());
    expected.write_text("Paris");
    assert_eq!(bytes, expected.into_bytes());

    assert_converges(&codec, &source, target);
}

// ============================================================================
// Document fields
// ============================================================================

#[test]
fn created_then_removed_field_is_not_shipped() {
    let codec = codec();
    let (mut source, target) = replicas(&codec, &person());
    source.set("temp", 1i32);
    source.remove_field("temp");
    assert!(source.changes().is_empty());
    assert_converges(&codec, &source, target);
}

#[test]
fn removed_then_set_again_is_a_replace() {
    let codec = codec();
    let (mut source, target) = replicas(&codec, &person());
    source.remove_field("name");
    source.set("name", 5i32);
    let changes = source.changes();
    assert_eq!(changes[0].2, FieldChange::Replaced);
    assert_converges(&codec, &source, target);
}

#[test]
fn replaced_collection_ships_in_full() {
    let codec = codec();
    let (mut source, target) = replicas(&codec, &person());
    source.set("tags", strings(&["new"]));
    list_mut(&mut source, "tags").push(Some(Value::from("newer")));
    let changes = source.changes();
    assert_eq!(changes[0].2, FieldChange::Replaced);
    assert_converges(&codec, &source, target);
}

#[test]
fn null_fields_are_created_and_replaced() {
    let codec = codec();
    let (mut source, target) = replicas(&codec, &person());
    source.set_null("name");
    source.set_null("nickname");
    assert_converges(&codec, &source, target);
}

#[test]
fn class_name_follows_the_source() {
    let codec = codec();
    let (mut source, mut target) = replicas(&codec, &person());
    source.set_class_name(Some("Employee".to_string()));
    source.set("name", "b");
    ship(&codec, &source, &mut target);
    assert_eq!(target.class_name(), Some("Employee"));
}

// ============================================================================
// Embedded collections
// ============================================================================

#[test]
fn list_updates_and_removals_replay_in_order() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set("l", strings(&["a", "b", "c", "d"]));
    let (mut source, target) = replicas(&codec, &baseline);

    let list = list_mut(&mut source, "l");
    list.remove(1).unwrap();
    list.set(0, Some(Value::from("A"))).unwrap();
    list.push(None);
    list.remove(2).unwrap();
    list.push(Some(Value::from(7i32)));

    assert_converges(&codec, &source, target);
}

#[test]
fn list_nested_pass_uses_current_positions() {
    let codec = codec();
    let mut first = Document::new();
    first.set("n", 1i32);
    let mut second = Document::new();
    second.set("n", 2i32);
    let mut baseline = Document::new();
    baseline.set(
        "docs",
        [Some(Value::from(first)), Some(Value::from(second))]
            .into_iter()
            .collect::<EmbeddedList>(),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    let list = list_mut(&mut source, "docs");
    list.remove(0).unwrap();
    if let Some(TrackedMut::Embedded(doc)) = list.get_mut(0) {
        doc.set("n", 20i32);
        doc.set("extra", "x");
    }

    assert_converges(&codec, &source, target);
}

#[test]
fn element_mutated_after_insert_converges() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set("docs", EmbeddedList::new());
    let (mut source, target) = replicas(&codec, &baseline);

    let mut fresh = Document::new();
    fresh.set("n", 1i32);
    let list = list_mut(&mut source, "docs");
    list.push(Some(Value::from(fresh)));
    if let Some(TrackedMut::Embedded(doc)) = list.get_mut(0) {
        doc.set("n", 2i32);
    }

    assert_converges(&codec, &source, target);
}

#[test]
fn list_of_lists_recurses() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set(
        "grid",
        [
            Some(Value::from(strings(&["a"]))),
            Some(Value::from(strings(&["b"]))),
        ]
        .into_iter()
        .collect::<EmbeddedList>(),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    if let Some(TrackedMut::EmbeddedList(row)) = list_mut(&mut source, "grid").get_mut(1) {
        row.push(Some(Value::from("c")));
        row.set(0, Some(Value::from("B"))).unwrap();
    }

    assert_converges(&codec, &source, target);
}

#[test]
fn set_adds_and_removes_by_value() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set(
        "s",
        [Some(Value::from("a")), Some(Value::from("b"))]
            .into_iter()
            .collect::<EmbeddedSet>(),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    let set = source.get_mut("s").and_then(TrackedMut::into_set).unwrap();
    assert!(set.remove(&Some(Value::from("a"))));
    assert!(set.insert(Some(Value::from("c"))));
    assert!(set.insert(None));

    assert_converges(&codec, &source, target);
}

#[test]
fn set_nested_pass_uses_ordinals() {
    let codec = codec();
    let mut inner = Document::new();
    inner.set("n", 1i32);
    let mut baseline = Document::new();
    baseline.set(
        "s",
        [Some(Value::from("plain")), Some(Value::from(inner))]
            .into_iter()
            .collect::<EmbeddedSet>(),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    let set = source.get_mut("s").and_then(TrackedMut::into_set).unwrap();
    if let Some(TrackedMut::Embedded(doc)) = set.get_mut(1) {
        doc.set("n", 2i32);
    }

    assert_converges(&codec, &source, target);
}

#[test]
fn map_puts_removes_and_nested_changes() {
    let codec = codec();
    let mut profile = Document::new();
    profile.set("bio", "hi");
    let mut baseline = Document::new();
    baseline.set(
        "m",
        EmbeddedMap::from_entries([
            ("a", Some(Value::from(1i32))),
            ("b", Some(Value::from(2i32))),
            ("profile", Some(Value::from(profile))),
        ]),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    let map = map_mut(&mut source, "m");
    map.insert("a", Some(Value::from(10i32)));
    map.remove("b");
    map.insert("c", None);
    if let Some(TrackedMut::Embedded(doc)) = map.get_mut("profile") {
        doc.set("bio", "updated");
    }

    assert_converges(&codec, &source, target);
}

#[test]
fn scalar_slots_change_only_through_recorded_setters() {
    let codec = codec();
    let (mut source, target) = replicas(&codec, &person());

    assert!(source.get_mut("name").is_none());
    assert!(list_mut(&mut source, "tags").get_mut(0).is_none());

    source.set("name", "b");
    list_mut(&mut source, "tags")
        .set(0, Some(Value::from("q")))
        .unwrap();

    assert_converges(&codec, &source, target);
}

#[test]
fn set_element_changed_then_removed_converges() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set(
        "items",
        [Some(Value::from(strings(&["a"])))]
            .into_iter()
            .collect::<EmbeddedSet>(),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    let set = source.get_mut("items").and_then(TrackedMut::into_set).unwrap();
    if let Some(TrackedMut::EmbeddedList(list)) = set.get_mut(0) {
        list.push(Some(Value::from("b")));
    }
    let current = set.iter().next().cloned().unwrap();
    assert!(set.remove(&current));

    assert_converges(&codec, &source, target);
}

#[test]
fn set_element_changed_then_kept_converges() {
    let codec = codec();
    let mut first = Document::new();
    first.set("id", 1i32);
    let mut second = Document::new();
    second.set("id", 2i32);
    let mut baseline = Document::new();
    baseline.set(
        "members",
        [Some(Value::from(first)), Some(Value::from(second))]
            .into_iter()
            .collect::<EmbeddedSet>(),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    let set = source.get_mut("members").and_then(TrackedMut::into_set).unwrap();
    if let Some(TrackedMut::Embedded(doc)) = set.get_mut(0) {
        doc.set("seen", true);
    }
    if let Some(TrackedMut::Embedded(doc)) = set.get_mut(1) {
        doc.set("seen", false);
    }
    let second = set.iter().nth(1).cloned().unwrap();
    assert!(set.remove(&second));

    assert_converges(&codec, &source, target);
}

// ============================================================================
// Link collections
// ============================================================================

#[test]
fn link_list_changes() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set("ll", links(&[1, 2, 3]));
    let (mut source, target) = replicas(&codec, &baseline);

    if let Some(TrackedMut::LinkList(list)) = source.get_mut("ll") {
        list.remove(0).unwrap();
        list.set(1, Some(rid(30))).unwrap();
        list.push(None);
        list.push(Some(rid(4)));
    }

    assert_converges(&codec, &source, target);
}

#[test]
fn link_set_and_link_map_changes() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set(
        "ls",
        [Some(rid(1)), Some(rid(2))].into_iter().collect::<LinkSet>(),
    );
    baseline.set(
        "lm",
        LinkMap::from_entries([("owner", Some(rid(1))), ("editor", Some(rid(2)))]),
    );
    let (mut source, target) = replicas(&codec, &baseline);

    if let Some(TrackedMut::LinkSet(set)) = source.get_mut("ls") {
        set.remove(&Some(rid(1)));
        set.insert(Some(rid(3)));
    }
    if let Some(TrackedMut::LinkMap(map)) = source.get_mut("lm") {
        map.insert("owner", Some(rid(9)));
        map.remove("editor");
        map.insert("viewer", None);
    }

    assert_converges(&codec, &source, target);
}

#[test]
fn link_collections_have_no_nested_pass() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set("ll", links(&[1]));
    let (mut source, _) = replicas(&codec, &baseline);

    if let Some(TrackedMut::LinkList(list)) = source.get_mut("ll") {
        list.push(Some(rid(2)));
    }
    let bytes = codec.encode_delta(&source).unwrap();

    let mut expected = WireWriter::new();
    expected.write_text("");
    expected.write_len(1);
    expected.write_u8(DeltaOp::Changed.as_byte());
    expected.write_text("ll");
    expected.write_u8(TypeTag::LinkList.as_byte());
    expected.write_len(1);
    expected.write_u8(DeltaOp::Created.as_byte());
    expected.write_varint(12);
    expected.write_varint(2);
    assert_eq!(bytes, expected.into_bytes());
}

#[test]
fn link_bag_adds_and_removes() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set("bag", LinkBag::from_links(vec![rid(1), rid(1), rid(2)]));
    let (mut source, target) = replicas(&codec, &baseline);

    if let Some(bag) = source.get_mut("bag").and_then(TrackedMut::into_link_bag) {
        assert!(bag.remove(rid(1)));
        bag.add(rid(3));
        bag.add(rid(3));
    }

    assert_converges(&codec, &source, target);
}

// ============================================================================
// Chained deltas
// ============================================================================

#[test]
fn successive_deltas_after_reset() {
    let codec = codec();
    let (mut source, mut target) = replicas(&codec, &person());

    for round in 0..5i32 {
        list_mut(&mut source, "tags").push(Some(Value::from(round)));
        source.set("round", round);
        ship(&codec, &source, &mut target);
        assert_eq!(target, source);

        source.reset_tracking();
        target.reset_tracking();
    }
    assert_eq!(
        target.get("tags").and_then(Value::as_list).map(|l| l.len()),
        Some(7)
    );
}
