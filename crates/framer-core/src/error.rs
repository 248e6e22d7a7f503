//! Error types for Framer Core
//!
//! Provides error handling for:
//! - Lifecycle preconditions (wrong status for an action)
//! - Illegal or gated status transitions
//! - Partial updates that violate the frame schema
//! - Parsing of enum values from strings

use crate::types::{FrameId, FrameStatus, FrameType};

/// Rejected mutation. Raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Action attempted from the wrong status
    #[error("cannot {action} frame {id}: status is {actual}, expected {expected}")]
    Precondition {
        /// Target frame
        id: FrameId,
        /// Action name
        action: &'static str,
        /// Status the action requires
        expected: FrameStatus,
        /// Status the frame is in
        actual: FrameStatus,
    },

    /// Transition not in the lifecycle table
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: FrameStatus,
        /// Requested status
        to: FrameStatus,
    },

    /// Type change after the frame left draft
    #[error("frame type is fixed once the frame leaves draft (status {0})")]
    TypeLocked(FrameStatus),

    /// Root cause set on a non-bug frame
    #[error("root cause only applies to bug frames (type {0})")]
    RootCauseRequiresBug(FrameType),

    /// Reviewer gate on `in_review`
    #[error("a reviewer must be assigned before submitting for review")]
    ReviewerRequired,

    /// Approver gate on `ready`
    #[error("an approver must be assigned before marking as ready")]
    ApproverRequired,

    /// Entering `archived` without a feedback payload
    #[error("archiving a frame requires a feedback payload")]
    FeedbackRequired,
}

impl ValidationError {
    /// Create precondition error
    #[inline]
    #[must_use]
    pub fn precondition(
        id: &FrameId,
        action: &'static str,
        expected: FrameStatus,
        actual: FrameStatus,
    ) -> Self {
        Self::Precondition {
            id: id.clone(),
            action,
            expected,
            actual,
        }
    }

    /// Check if this is a status precondition failure
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. } | Self::IllegalTransition { .. })
    }
}

/// String did not name a known enum variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    /// Enum being parsed (e.g. "frame status")
    pub kind: &'static str,
    /// Offending input
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
