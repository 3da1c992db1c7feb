//! Application-defined custom values
//!
//! A custom value is written as its type key followed by the bytes its
//! [`CustomType::to_stream`] produces. Decoding looks the key up in a
//! [`CustomTypeRegistry`], populated at startup by whoever defines the types.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A value type the document model does not know natively
pub trait CustomType: fmt::Debug + Send + Sync {
    /// Stable identifier written in front of the payload
    fn type_key(&self) -> &str;

    /// Serialized payload
    fn to_stream(&self) -> Vec<u8>;
}

/// Shared handle to a custom value
///
/// Equality compares the type key and the serialized payload.
#[derive(Debug, Clone)]
pub struct CustomValue(Arc<dyn CustomType>);

impl CustomValue {
    /// Wrap a custom type instance
    pub fn new<T: CustomType + 'static>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Type key of the wrapped value
    pub fn type_key(&self) -> &str {
        self.0.type_key()
    }

    /// Serialized payload of the wrapped value
    pub fn to_stream(&self) -> Vec<u8> {
        self.0.to_stream()
    }

    /// The wrapped value
    pub fn inner(&self) -> &dyn CustomType {
        self.0.as_ref()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_key() == other.type_key() && self.to_stream() == other.to_stream()
    }
}

/// Decoder turning a payload back into a custom value
pub type CustomDecoder =
    Arc<dyn Fn(&[u8]) -> std::result::Result<CustomValue, String> + Send + Sync>;

/// Map from type key to decoder
#[derive(Clone, Default)]
pub struct CustomTypeRegistry {
    decoders: HashMap<String, CustomDecoder>,
}

impl CustomTypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the decoder for `type_key`, replacing any previous one
    pub fn register<F>(&mut self, type_key: impl Into<String>, decoder: F)
    where
        F: Fn(&[u8]) -> std::result::Result<CustomValue, String> + Send + Sync + 'static,
    {
        self.decoders.insert(type_key.into(), Arc::new(decoder));
    }

    /// Whether a decoder is registered for `type_key`
    pub fn contains(&self, type_key: &str) -> bool {
        self.decoders.contains_key(type_key)
    }

    /// Number of registered type keys
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// Check if no decoder is registered
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Decode `payload` with the decoder registered for `type_key`
    ///
    /// # Errors
    ///
    /// `CustomTypeResolutionFailure` when the key is unknown, the decoder
    /// fails, or the decoder returns a value of another type key.
    pub fn instantiate(&self, type_key: &str, payload: &[u8]) -> Result<CustomValue> {
        let decoder = self
            .decoders
            .get(type_key)
            .ok_or_else(|| Error::custom_type(type_key, "no decoder registered"))?;
        let value = decoder(payload).map_err(|reason| Error::custom_type(type_key, reason))?;
        if value.type_key() != type_key {
            return Err(Error::custom_type(
                type_key,
                format!("decoder produced type '{}'", value.type_key()),
            ));
        }
        Ok(value)
    }
}

impl fmt::Debug for CustomTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.decoders.keys().collect();
        keys.sort();
        f.debug_struct("CustomTypeRegistry")
            .field("type_keys", &keys)
            .finish()
    }
}
