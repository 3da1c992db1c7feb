//! Binary full and delta encoding for tracked documents
//!
//! A [`DocumentCodec`] turns a [`Document`] into bytes in one of two forms:
//!
//! - **Full**: the complete live contents, decoded into a fresh document
//!   whose tracking starts clean.
//! - **Delta**: only what changed since the document's tracking baseline,
//!   applied onto an existing document that holds that baseline.
//!
//! Both forms share the primitives in [`wire`] (signed ZigZag varints,
//! length-prefixed text) and the tag bytes in [`tags`]. Link bags pick their
//! representation by size, see [`links`].
//!
//! # Example
//!
//! ```ignore
//! use docwire_codec::DocumentCodec;
//! use docwire_core::Document;
//!
//! let codec = DocumentCodec::new();
//! let mut doc = Document::with_class("Person");
//! doc.set("name", "a");
//! let bytes = codec.encode_full(&doc)?;
//!
//! let mut replica = codec.decode_full(&bytes)?;
//! doc.reset_tracking();
//! doc.set("name", "b");
//! codec.decode_delta(&codec.encode_delta(&doc)?, &mut replica)?;
//! assert_eq!(replica, doc);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod config;
mod delta;
mod full;
pub mod links;
pub mod tags;
pub mod wire;

pub use builder::DocumentCodecBuilder;
pub use config::CodecConfig;
pub use tags::DeltaOp;
pub use wire::{WireReader, WireWriter};

use std::fmt;
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use docwire_core::{
    BagSyncRegistry, CustomTypeRegistry, Document, NoSchema, NoSyncRegistry, Result,
    SchemaResolver,
};
use tracing::debug;

/// Encoder and decoder for the full and delta document formats
///
/// Stateless between calls and shareable across threads; collaborators are
/// held behind `Arc`.
pub struct DocumentCodec {
    pub(crate) config: CodecConfig,
    pub(crate) time_zone: FixedOffset,
    pub(crate) schema: Arc<dyn SchemaResolver>,
    pub(crate) sync_registry: Arc<dyn BagSyncRegistry>,
    pub(crate) custom_types: Arc<CustomTypeRegistry>,
}

impl DocumentCodec {
    /// Codec with the default configuration and no collaborators
    pub fn new() -> Self {
        Self {
            config: CodecConfig::default(),
            time_zone: Utc.fix(),
            schema: Arc::new(NoSchema),
            sync_registry: Arc::new(NoSyncRegistry),
            custom_types: Arc::new(CustomTypeRegistry::new()),
        }
    }

    /// Start configuring a codec
    pub fn builder() -> DocumentCodecBuilder {
        DocumentCodecBuilder::new()
    }

    /// Active configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    // ========================================================================
    // Full form
    // ========================================================================

    /// Encode the live contents of `doc`
    ///
    /// # Errors
    ///
    /// `UnsupportedType` when a value cannot be written under its resolved
    /// type, for example an integer out of range for a declared `SHORT`.
    pub fn encode_full(&self, doc: &Document) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        self.write_full(&mut w, doc)?;
        debug!(
            target: "docwire::codec",
            class = doc.class_name().unwrap_or(""),
            fields = doc.len(),
            bytes = w.len(),
            "Encoded full document"
        );
        Ok(w.into_bytes())
    }

    /// Decode a full encoding into a fresh, clean document
    ///
    /// The whole input must be consumed.
    pub fn decode_full(&self, bytes: &[u8]) -> Result<Document> {
        let mut r = WireReader::new(bytes);
        let doc = self.read_full(&mut r)?;
        r.expect_end()?;
        debug!(
            target: "docwire::codec",
            class = doc.class_name().unwrap_or(""),
            fields = doc.len(),
            bytes = bytes.len(),
            "Decoded full document"
        );
        Ok(doc)
    }

    /// Append the full encoding of `doc` to a writer
    pub fn write_full(&self, w: &mut WireWriter, doc: &Document) -> Result<()> {
        self.write_document(w, doc)
    }

    /// Read one full encoding from a reader, leaving any trailing bytes
    pub fn read_full(&self, r: &mut WireReader<'_>) -> Result<Document> {
        self.read_document(r)
    }

    // ========================================================================
    // Delta form
    // ========================================================================

    /// Encode what changed in `doc` since its tracking baseline
    ///
    /// A clean document encodes to its class name and a zero count.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` when a recorded change has no delta form, such
    /// as a positional update on a set. `UnsupportedType` as for
    /// [`encode_full`](Self::encode_full).
    pub fn encode_delta(&self, doc: &Document) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        self.write_delta(&mut w, doc)?;
        debug!(
            target: "docwire::codec",
            class = doc.class_name().unwrap_or(""),
            changes = doc.changes().len(),
            bytes = w.len(),
            "Encoded document delta"
        );
        Ok(w.into_bytes())
    }

    /// Apply a delta encoding onto `target`
    ///
    /// `target` must hold the baseline the delta was produced against. Every
    /// applied change is recorded by the target's own tracking. On error the
    /// target may be partially updated.
    ///
    /// # Errors
    ///
    /// `InconsistentTarget` when the target lacks a field, position or key
    /// the delta refers to, or holds a value of another kind.
    /// `MalformedStream` on truncated or invalid input, including trailing
    /// bytes.
    pub fn decode_delta(&self, bytes: &[u8], target: &mut Document) -> Result<()> {
        let mut r = WireReader::new(bytes);
        self.apply_delta(&mut r, target)?;
        r.expect_end()?;
        debug!(
            target: "docwire::codec",
            class = target.class_name().unwrap_or(""),
            bytes = bytes.len(),
            "Applied document delta"
        );
        Ok(())
    }

    /// Append the delta encoding of `doc` to a writer
    pub fn write_delta(&self, w: &mut WireWriter, doc: &Document) -> Result<()> {
        self.write_document_delta(w, doc)
    }

    /// Read one delta encoding from a reader and apply it onto `target`
    pub fn apply_delta(&self, r: &mut WireReader<'_>, target: &mut Document) -> Result<()> {
        self.read_document_delta(r, target)
    }
}

impl Default for DocumentCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCodec")
            .field("config", &self.config)
            .field("time_zone", &self.time_zone)
            .field("custom_types", &self.custom_types)
            .finish_non_exhaustive()
    }
}

// Compile-time check
#[allow(dead_code)]
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<DocumentCodec>();
    }
};
