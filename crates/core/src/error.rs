//! Error types for docwire
//!
//! This module defines all error types used by the document model and the codec.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every error is fatal for the call that raised it: an encode or decode stops at
//! the first error and leaves any partial output or partially-mutated target for
//! the caller to discard.

use thiserror::Error;

/// Result type alias for docwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the document model and codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A value cannot be written under the type tag it resolved to
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// A delta operation is structurally illegal for the target kind
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A delta references a field, position or key the live target lacks
    #[error("Inconsistent target: {0}")]
    InconsistentTarget(String),

    /// The input ended early or holds a byte sequence the codec does not recognize
    #[error("Malformed stream at offset {offset}: {detail}")]
    MalformedStream {
        /// Byte offset where decoding failed
        offset: usize,
        /// Human-readable description
        detail: String,
    },

    /// A custom value's type key has no registered decoder, or its decoder failed
    #[error("Cannot resolve custom type '{type_key}': {reason}")]
    CustomTypeResolutionFailure {
        /// Type key read from the stream
        type_key: String,
        /// Why instantiation failed
        reason: String,
    },

    /// Positional access past the end of a tracked list
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested position
        index: usize,
        /// Current length
        len: usize,
    },

    /// Codec configuration could not be read or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a `MalformedStream` error at the given offset.
    pub fn malformed(offset: usize, detail: impl Into<String>) -> Self {
        Error::MalformedStream {
            offset,
            detail: detail.into(),
        }
    }

    /// Create a `CustomTypeResolutionFailure` error.
    pub fn custom_type(type_key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::CustomTypeResolutionFailure {
            type_key: type_key.into(),
            reason: reason.into(),
        }
    }

    /// Create an `InconsistentTarget` error.
    pub fn inconsistent(detail: impl Into<String>) -> Self {
        Error::InconsistentTarget(detail.into())
    }
}
