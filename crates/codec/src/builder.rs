//! Codec builder for fluent configuration
//!
//! Every collaborator has a neutral default, so the builder only needs the
//! pieces a caller actually has.

use std::fmt;
use std::sync::Arc;

use docwire_core::{
    BagSyncRegistry, CustomTypeRegistry, NoSchema, NoSyncRegistry, Result, SchemaResolver,
};

use crate::config::CodecConfig;
use crate::DocumentCodec;

// ============================================================================
// Codec Builder Pattern
// ============================================================================

/// Builder for [`DocumentCodec`]
///
/// ```ignore
/// use std::sync::Arc;
/// use docwire_codec::{CodecConfig, DocumentCodec};
/// use docwire_core::MapSchema;
///
/// let codec = DocumentCodec::builder()
///     .config(CodecConfig::from_file(path)?)
///     .schema(Arc::new(MapSchema::new()))
///     .build()?;
/// ```
pub struct DocumentCodecBuilder {
    config: CodecConfig,
    schema: Arc<dyn SchemaResolver>,
    sync_registry: Arc<dyn BagSyncRegistry>,
    custom_types: CustomTypeRegistry,
}

impl DocumentCodecBuilder {
    /// Create new builder with defaults
    pub fn new() -> Self {
        Self {
            config: CodecConfig::default(),
            schema: Arc::new(NoSchema),
            sync_registry: Arc::new(NoSyncRegistry),
            custom_types: CustomTypeRegistry::new(),
        }
    }

    /// Set the codec configuration
    pub fn config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the schema consulted for declared field types
    pub fn schema(mut self, schema: Arc<dyn SchemaResolver>) -> Self {
        self.schema = schema;
        self
    }

    /// Set the registry that issues sync ids for external link bags
    pub fn sync_registry(mut self, registry: Arc<dyn BagSyncRegistry>) -> Self {
        self.sync_registry = registry;
        self
    }

    /// Set the registry used to rebuild custom values
    pub fn custom_types(mut self, registry: CustomTypeRegistry) -> Self {
        self.custom_types = registry;
        self
    }

    /// Validate the configuration and build the codec
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](docwire_core::Error::InvalidConfig)
    /// when the configuration does not validate.
    pub fn build(self) -> Result<DocumentCodec> {
        self.config.validate()?;
        let time_zone = self.config.time_zone()?;
        Ok(DocumentCodec {
            config: self.config,
            time_zone,
            schema: self.schema,
            sync_registry: self.sync_registry,
            custom_types: Arc::new(self.custom_types),
        })
    }
}

impl Default for DocumentCodecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentCodecBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCodecBuilder")
            .field("config", &self.config)
            .field("custom_types", &self.custom_types)
            .finish_non_exhaustive()
    }
}
