//! Error types for wire transforms
//!
//! Decode is tolerant of section shapes, so these only cover payloads that
//! cannot be mapped to a frame at all.

use framer_core::UnknownVariant;

/// Wire payload could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Payload has no usable id
    #[error("frame payload has an empty id")]
    EmptyId,

    /// `type` is not a known frame type
    #[error("invalid frame type: {0}")]
    InvalidType(#[source] UnknownVariant),

    /// `status` is not a known frame status
    #[error("invalid frame status: {0}")]
    InvalidStatus(#[source] UnknownVariant),

    /// Timestamp field is not ISO 8601
    #[error("malformed timestamp in {field}: '{value}'")]
    Timestamp {
        /// Field name
        field: &'static str,
        /// Offending text
        value: String,
    },

    /// Body is not valid JSON for the expected shape
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransformError {
    /// Create timestamp error
    #[must_use]
    pub fn timestamp(field: &'static str, value: impl Into<String>) -> Self {
        Self::Timestamp {
            field,
            value: value.into(),
        }
    }
}

/// Result alias for transforms
pub type Result<T> = std::result::Result<T, TransformError>;
