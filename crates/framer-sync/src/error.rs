//! Error types for Framer Sync
//!
//! Provides error handling for:
//! - Lifecycle and schema validation (from `framer-core`)
//! - Remote HTTP failures and timeouts
//! - Undecodable wire payloads (from `framer-wire`)
//! - Best-effort enhancement calls that never touch core state
//! - Configuration loading

use framer_core::{FrameId, ValidationError};
use framer_wire::TransformError;
use std::path::PathBuf;
use std::time::Duration;

/// Main sync error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Precondition or schema check failed; nothing was mutated
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// HTTP-layer failure; `status` is `None` for transport errors
    #[error("remote error{}: {detail}", status_suffix(.status))]
    Remote {
        /// HTTP status code
        status: Option<u16>,
        /// Server-provided detail or transport message
        detail: String,
    },

    /// Remote call exceeded its bound
    #[error("{operation} timed out after {}s", .after.as_secs_f64())]
    Timeout {
        /// Backend operation name
        operation: &'static str,
        /// Configured bound
        after: Duration,
    },

    /// Wire payload could not be decoded
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    /// No frame with this id in the registry
    #[error("frame not found: {0}")]
    NotFound(FrameId),

    /// Enhancement call failed; core state is untouched
    #[error("{operation} unavailable: {reason}")]
    BestEffort {
        /// Enhancement name
        operation: &'static str,
        /// Why it failed
        reason: String,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl SyncError {
    /// Create remote error
    #[inline]
    pub fn remote(status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::Remote {
            status,
            detail: detail.into(),
        }
    }

    /// Create not-found error
    #[inline]
    pub fn not_found(id: impl Into<FrameId>) -> Self {
        Self::NotFound(id.into())
    }

    /// Wrap any failure of an enhancement call
    #[must_use]
    pub fn best_effort(operation: &'static str, cause: &SyncError) -> Self {
        Self::BestEffort {
            operation,
            reason: cause.to_string(),
        }
    }

    /// Check if error is a timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Check if error is a remote 404
    #[inline]
    #[must_use]
    pub fn is_remote_not_found(&self) -> bool {
        matches!(self, Self::Remote { status: Some(404), .. })
    }

    /// Check if a user-triggered retry could succeed
    ///
    /// The engine never retries on its own.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Remote { status, .. } => status.map_or(true, |s| s >= 500 || s == 429),
            _ => false,
        }
    }

    /// Check if the error belongs in the shared error slot
    #[inline]
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::BestEffort { .. })
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote {
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the config schema
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation
    #[error("invalid value for {key}: '{value}'")]
    Invalid {
        /// Setting name
        key: &'static str,
        /// Offending value
        value: String,
    },
}

impl ConfigError {
    /// Create invalid-value error
    #[inline]
    pub fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            value: value.into(),
        }
    }
}
