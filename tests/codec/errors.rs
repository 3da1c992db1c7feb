//! Error kinds surfaced by the codec

use crate::common::*;
use docwire::ChangeEvent;

// ============================================================================
// UnsupportedType
// ============================================================================

#[test]
fn value_not_matching_its_declared_type() {
    let mut doc = Document::new();
    doc.set_typed("age", Some(Value::from("forty")), TypeTag::Integer);
    let err = codec().encode_full(&doc).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType(_)));
    assert!(err.to_string().contains("String value cannot be written as INTEGER"));
}

#[test]
fn integer_out_of_range_for_declared_short() {
    let mut doc = Document::new();
    doc.set_typed("small", Some(Value::from(70_000i32)), TypeTag::Short);
    assert!(matches!(
        codec().encode_full(&doc),
        Err(Error::UnsupportedType(_))
    ));
}

#[test]
fn mismatched_changed_field_is_unsupported_type() {
    let codec = codec();
    let mut doc = reload(&codec, &person());
    if let Some(list) = doc.get_mut("tags").and_then(TrackedMut::into_list) {
        list.push(None);
    }
    let mut typed = Document::new();
    let tags = doc.get("tags").cloned();
    typed.load_field("tags", tags, Some(TypeTag::EmbeddedMap));
    assert!(matches!(
        codec.encode_delta(&typed),
        Err(Error::UnsupportedType(_))
    ));
}

// ============================================================================
// UnsupportedOperation
// ============================================================================

#[test]
fn positional_update_on_a_set() {
    let mut set: LinkSet = [Some(rid(1))].into_iter().collect();
    set.timeline_mut().push(ChangeEvent::Update {
        key: (),
        old_value: Some(rid(1)),
        value: Some(rid(2)),
    });
    let mut doc = Document::new();
    doc.load_field("links", Some(Value::from(set)), None);
    assert!(matches!(
        codec().encode_delta(&doc),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn replaced_op_inside_a_set_delta() {
    let mut w = WireWriter::new();
    w.write_text("");
    w.write_len(1);
    w.write_u8(DeltaOp::Changed.as_byte());
    w.write_text("s");
    w.write_u8(TypeTag::EmbeddedSet.as_byte());
    w.write_len(1);
    w.write_u8(DeltaOp::Replaced.as_byte());
    w.write_u8(0xFF);
    w.write_len(0);

    let mut target = Document::new();
    target.load_field("s", Some(Value::from(EmbeddedSet::new())), None);
    assert!(matches!(
        codec().decode_delta(w.as_bytes(), &mut target),
        Err(Error::UnsupportedOperation(_))
    ));
}

// ============================================================================
// InconsistentTarget
// ============================================================================

#[test]
fn changed_field_missing_on_target() {
    let codec = codec();
    let mut source = reload(&codec, &person());
    if let Some(list) = source.get_mut("tags").and_then(TrackedMut::into_list) {
        list.push(Some(Value::from("z")));
    }
    let bytes = codec.encode_delta(&source).unwrap();

    let mut target = Document::with_class("Person");
    target.set("name", "a");
    let err = codec.decode_delta(&bytes, &mut target).unwrap_err();
    assert!(matches!(err, Error::InconsistentTarget(_)));
    assert!(err.to_string().contains("tags"));
}

#[test]
fn position_missing_on_target() {
    let codec = codec();
    let mut baseline = Document::new();
    baseline.set("l", strings(&["a", "b", "c"]));
    let mut source = reload(&codec, &baseline);
    if let Some(list) = source.get_mut("l").and_then(TrackedMut::into_list) {
        list.set(2, Some(Value::from("C"))).unwrap();
    }
    let bytes = codec.encode_delta(&source).unwrap();

    let mut shorter = Document::new();
    shorter.set("l", strings(&["a"]));
    shorter.reset_tracking();
    assert!(matches!(
        codec.decode_delta(&bytes, &mut shorter),
        Err(Error::InconsistentTarget(_))
    ));
}

#[test]
fn nested_key_missing_on_target() {
    let codec = codec();
    let mut inner = Document::new();
    inner.set("n", 1i32);
    let mut baseline = Document::new();
    baseline.set("m", EmbeddedMap::from_entries([("k", Some(Value::from(inner)))]));
    let mut source = reload(&codec, &baseline);
    if let Some(TrackedMut::Embedded(doc)) = source
        .get_mut("m")
        .and_then(TrackedMut::into_map)
        .and_then(|m| m.get_mut("k"))
    {
        doc.set("n", 2i32);
    }
    let bytes = codec.encode_delta(&source).unwrap();

    let mut target = Document::new();
    target.set("m", EmbeddedMap::new());
    target.reset_tracking();
    assert!(matches!(
        codec.decode_delta(&bytes, &mut target),
        Err(Error::InconsistentTarget(_))
    ));
}

// ============================================================================
// MalformedStream
// ============================================================================

#[test]
fn every_truncation_is_malformed() {
    let codec = codec();
    let mut doc = person();
    doc.set("score", 2.5f64);
    doc.set("owner", rid(3));
    doc.set("bag", LinkBag::from_links(vec![rid(1)]));
    let bytes = codec.encode_full(&doc).unwrap();

    for end in 0..bytes.len() {
        let result = codec.decode_full(&bytes[..end]);
        assert!(
            matches!(result, Err(Error::MalformedStream { .. })),
            "prefix of {} bytes decoded to {:?}",
            end,
            result
        );
    }
}

#[test]
fn unknown_type_tag() {
    let mut w = WireWriter::new();
    w.write_text("");
    w.write_len(1);
    w.write_text("f");
    w.write_u8(0x63);
    let err = codec().decode_full(w.as_bytes()).unwrap_err();
    assert!(matches!(err, Error::MalformedStream { offset: 4, .. }));
}

#[test]
fn unknown_delta_op() {
    let mut w = WireWriter::new();
    w.write_text("");
    w.write_len(1);
    w.write_u8(9);
    w.write_text("f");
    let mut target = Document::new();
    assert!(matches!(
        codec().decode_delta(w.as_bytes(), &mut target),
        Err(Error::MalformedStream { .. })
    ));
}

#[test]
fn trailing_bytes_after_document() {
    let codec = codec();
    let mut bytes = codec.encode_full(&person()).unwrap();
    bytes.extend_from_slice(&[1, 2, 3]);
    let err = codec.decode_full(&bytes).unwrap_err();
    assert!(err.to_string().contains("3 trailing bytes"));
}

#[test]
fn invalid_utf8_text() {
    let mut w = WireWriter::new();
    w.write_len(2);
    w.write_raw(&[0xC3, 0x28]);
    w.write_len(0);
    assert!(matches!(
        codec().decode_full(w.as_bytes()),
        Err(Error::MalformedStream { offset: 0, .. })
    ));
}

#[test]
fn null_reference_inside_a_bag() {
    let mut w = WireWriter::new();
    w.write_text("");
    w.write_len(1);
    w.write_text("bag");
    w.write_u8(TypeTag::LinkBag.as_byte());
    w.write_raw(&[0xFF; 16]);
    w.write_u8(1);
    w.write_len(1);
    w.write_varint(-2);
    w.write_varint(-1);
    assert!(matches!(
        codec().decode_full(w.as_bytes()),
        Err(Error::MalformedStream { .. })
    ));
}

// ============================================================================
// CustomTypeResolutionFailure
// ============================================================================

#[test]
fn unregistered_custom_type() {
    let mut doc = Document::new();
    doc.set("where", CustomValue::new(Point { x: 1, y: 2 }));
    let bytes = codec().encode_full(&doc).unwrap();
    let err = codec().decode_full(&bytes).unwrap_err();
    assert!(matches!(
        err,
        Error::CustomTypeResolutionFailure { ref type_key, .. } if type_key == POINT_KEY
    ));
}
