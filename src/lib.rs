//! docwire - Binary full and delta codec for tracked documents
//!
//! Documents carry typed fields and record every mutation since their last
//! baseline. The codec ships either the whole document or just those
//! changes, and replays a delta onto a replica through the replica's own
//! tracked API.
//!
//! # Quick Start
//!
//! ```ignore
//! use docwire::{Document, DocumentCodec, Trackable};
//!
//! let codec = DocumentCodec::new();
//!
//! let mut doc = Document::with_class("Person");
//! doc.set("name", "a");
//! let mut replica = codec.decode_full(&codec.encode_full(&doc)?)?;
//!
//! doc.reset_tracking();
//! doc.set("name", "b");
//! codec.decode_delta(&codec.encode_delta(&doc)?, &mut replica)?;
//! ```
//!
//! # Architecture
//!
//! - `docwire-core`: the document model, change tracking and collaborator traits
//! - `docwire-codec`: wire primitives, the full and delta formats, configuration

pub use docwire_codec::{
    builder, config, links, tags, wire, CodecConfig, DeltaOp, DocumentCodec,
    DocumentCodecBuilder, WireReader, WireWriter,
};
pub use docwire_core::*;
