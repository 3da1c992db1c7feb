//! Link bag representation choice and synchronization ids

use crate::common::*;
use docwire::links::{REPR_EMBEDDED, REPR_EXTERNAL};
use docwire::{BagStorage, InMemorySyncRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

const THRESHOLD: usize = 4;

fn small_threshold_codec() -> DocumentCodec {
    DocumentCodec::builder()
        .config(CodecConfig {
            link_bag_threshold: THRESHOLD,
            ..CodecConfig::default()
        })
        .build()
        .unwrap()
}

fn bag_of(size: usize) -> LinkBag {
    LinkBag::from_links((0..size as i64).map(|p| rid(p % 3)).collect())
}

/// Representation byte of the only field of a one-field document
fn repr_byte(bytes: &[u8]) -> u8 {
    let mut r = WireReader::new(bytes);
    r.read_text().unwrap();
    r.read_len().unwrap();
    r.read_text().unwrap();
    assert_eq!(r.read_u8().unwrap(), TypeTag::LinkBag.as_byte());
    r.read_raw(16).unwrap();
    r.read_u8().unwrap()
}

#[test]
fn threshold_boundary_selects_representation() {
    let codec = small_threshold_codec();

    let mut below = Document::new();
    below.set("bag", bag_of(THRESHOLD - 1));
    let below_bytes = codec.encode_full(&below).unwrap();
    assert_eq!(repr_byte(&below_bytes), REPR_EMBEDDED);

    let mut at = Document::new();
    at.set("bag", bag_of(THRESHOLD));
    let at_bytes = codec.encode_full(&at).unwrap();
    assert_eq!(repr_byte(&at_bytes), REPR_EXTERNAL);
}

#[test]
fn both_representations_decode_to_the_same_multiset() {
    let codec = small_threshold_codec();
    for size in [THRESHOLD - 1, THRESHOLD, THRESHOLD + 5] {
        let mut doc = Document::new();
        doc.set("bag", bag_of(size));
        let decoded = codec.decode_full(&codec.encode_full(&doc).unwrap()).unwrap();
        let bag = decoded.get("bag").and_then(Value::as_link_bag).unwrap();
        assert_eq!(bag.size(), size);
        assert_eq!(bag, &bag_of(size));
    }
}

#[test]
fn externalized_bag_stays_external_once_decoded() {
    let codec = small_threshold_codec();
    let mut doc = Document::new();
    doc.set("bag", bag_of(THRESHOLD));
    let decoded = reload(&codec, &doc);
    let bag = decoded.get("bag").and_then(Value::as_link_bag).unwrap();
    assert!(!bag.is_embedded());

    // external bags are never folded back, even below the threshold
    let mut shrunk = decoded.clone();
    if let Some(bag) = shrunk.get_mut("bag").and_then(TrackedMut::into_link_bag) {
        bag.remove(rid(0));
        bag.remove(rid(1));
    }
    let bytes = codec.encode_full(&shrunk).unwrap();
    assert_eq!(repr_byte(&bytes), REPR_EXTERNAL);
}

#[test]
fn stored_bag_keeps_pointer_and_pending_changes() {
    let codec = codec();
    let mut changes = BTreeMap::new();
    changes.insert(rid(1), BagChange::Diff(2));
    changes.insert(rid(2), BagChange::Absolute(1));
    let bag = LinkBag::external(Some(BagPointer::new(3, 17, 256)), 90, changes);

    let mut doc = Document::new();
    doc.set("bag", bag.clone());
    let decoded = reload(&codec, &doc);
    let decoded_bag = decoded.get("bag").and_then(Value::as_link_bag).unwrap();

    assert_eq!(decoded_bag.storage(), bag.storage());
    assert_eq!(decoded_bag.contents(), None);
    match decoded_bag.storage() {
        BagStorage::External { pointer, size, .. } => {
            assert_eq!(*pointer, Some(BagPointer::new(3, 17, 256)));
            assert_eq!(*size, 90);
        }
        BagStorage::Embedded(_) => panic!("expected external storage"),
    }
}

#[test]
fn sync_registry_is_consulted_for_external_bags_only() {
    let registry = Arc::new(InMemorySyncRegistry::new());
    let codec = DocumentCodec::builder()
        .config(CodecConfig {
            link_bag_threshold: THRESHOLD,
            ..CodecConfig::default()
        })
        .sync_registry(registry.clone())
        .build()
        .unwrap();

    let mut small = Document::new();
    small.set("bag", bag_of(1));
    codec.encode_full(&small).unwrap();
    assert_eq!(registry.registrations(), 0);

    let mut large = Document::new();
    large.set("bag", bag_of(THRESHOLD));
    let decoded = reload(&codec, &large);
    assert_eq!(registry.registrations(), 1);

    let issued = registry.issued()[0];
    let bag = decoded.get("bag").and_then(Value::as_link_bag).unwrap();
    assert_eq!(bag.sync_id(), Some(issued));
}

#[test]
fn repeated_encodings_repeat_the_issued_sync_id() {
    let registry = Arc::new(InMemorySyncRegistry::new());
    let codec = DocumentCodec::builder()
        .config(CodecConfig {
            link_bag_threshold: THRESHOLD,
            ..CodecConfig::default()
        })
        .sync_registry(registry.clone())
        .build()
        .unwrap();

    let mut doc = Document::new();
    doc.set("bag", bag_of(THRESHOLD));
    let first = codec.encode_full(&doc).unwrap();
    let second = codec.encode_full(&doc).unwrap();

    assert_eq!(first, second);
    let issued = registry.issued();
    assert_eq!(issued.len(), 2);
    assert_eq!(issued[0], issued[1]);
}

#[test]
fn existing_sync_id_is_kept() {
    let registry = Arc::new(InMemorySyncRegistry::new());
    let codec = DocumentCodec::builder()
        .sync_registry(registry.clone())
        .build()
        .unwrap();
    let id = Uuid::new_v4();

    let mut doc = Document::new();
    doc.set("bag", LinkBag::from_links(vec![rid(1)]).with_sync_id(id));
    let decoded = reload(&codec, &doc);
    let bag = decoded.get("bag").and_then(Value::as_link_bag).unwrap();
    assert_eq!(bag.sync_id(), Some(id));
    assert_eq!(registry.registrations(), 0);
}

#[test]
fn delta_onto_external_bag() {
    let codec = small_threshold_codec();
    let mut baseline = Document::new();
    baseline.set("bag", bag_of(THRESHOLD + 2));
    let mut source = reload(&codec, &baseline);
    let mut target = reload(&codec, &baseline);

    if let Some(bag) = source.get_mut("bag").and_then(TrackedMut::into_link_bag) {
        bag.add(rid(7));
        assert!(bag.remove(rid(0)));
    }
    ship(&codec, &source, &mut target);

    let bag = target.get("bag").and_then(Value::as_link_bag).unwrap();
    assert_eq!(bag.size(), THRESHOLD + 2);
    assert_eq!(target, source);
}
