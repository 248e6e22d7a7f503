//! Frame lifecycle state machine
//!
//! ```text
//! draft -> in_review -> ready -> feedback -> archived
//! ```
//!
//! The guarded [`Action`]s only ever move forward. [`force_status`] is the
//! separate entry point for arbitrary moves; it keeps the feedback invariant
//! but reports when it breaks monotonicity.

use crate::error::ValidationError;
use crate::frame::{FeedbackInput, Frame};
use crate::types::{FrameId, FrameStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statuses reachable from `from` through guarded actions
#[must_use]
pub fn allowed_transitions(from: FrameStatus) -> Vec<FrameStatus> {
    use FrameStatus::*;
    match from {
        Draft => vec![InReview],
        InReview => vec![Ready],
        Ready => vec![Feedback],
        Feedback => vec![Archived],
        Archived => vec![],
    }
}

/// Validates a guarded transition.
///
/// # Errors
///
/// [`ValidationError::IllegalTransition`] if `to` is not the next status.
pub fn validate_transition(from: FrameStatus, to: FrameStatus) -> Result<(), ValidationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ValidationError::IllegalTransition { from, to })
    }
}

/// Guarded lifecycle action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `draft -> in_review`, optionally assigning a reviewer
    SubmitForReview {
        /// Reviewer to attach
        reviewer_id: Option<String>,
    },
    /// `in_review -> ready`
    MarkAsReady,
    /// `ready -> feedback`
    StartFeedback,
    /// `feedback -> archived`, attaching the retrospective
    SubmitFeedback(FeedbackInput),
}

impl Action {
    /// Status the action requires
    #[must_use]
    pub fn required_status(&self) -> FrameStatus {
        match self {
            Action::SubmitForReview { .. } => FrameStatus::Draft,
            Action::MarkAsReady => FrameStatus::InReview,
            Action::StartFeedback => FrameStatus::Ready,
            Action::SubmitFeedback(_) => FrameStatus::Feedback,
        }
    }

    /// Status the action produces
    #[must_use]
    pub fn target_status(&self) -> FrameStatus {
        match self {
            Action::SubmitForReview { .. } => FrameStatus::InReview,
            Action::MarkAsReady => FrameStatus::Ready,
            Action::StartFeedback => FrameStatus::Feedback,
            Action::SubmitFeedback(_) => FrameStatus::Archived,
        }
    }

    /// Action name for messages and logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Action::SubmitForReview { .. } => "submit for review",
            Action::MarkAsReady => "mark as ready",
            Action::StartFeedback => "start feedback",
            Action::SubmitFeedback(_) => "submit feedback",
        }
    }
}

/// Optional assignment gates on transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionPolicy {
    /// Require a reviewer before `in_review`
    pub require_reviewer: bool,
    /// Require an approver before `ready`
    pub require_approver: bool,
}

impl TransitionPolicy {
    /// Gates matching the backend's review workflow
    #[must_use]
    pub fn strict() -> Self {
        Self {
            require_reviewer: true,
            require_approver: true,
        }
    }
}

/// Record of an applied transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReceipt {
    /// Frame id
    pub id: FrameId,
    /// Previous status
    pub from: FrameStatus,
    /// New status
    pub to: FrameStatus,
    /// Transition time
    pub at: DateTime<Utc>,
}

/// Check an action against a frame without applying it
///
/// # Errors
///
/// - [`ValidationError::Precondition`] if the frame is in the wrong status
/// - [`ValidationError::ReviewerRequired`] / [`ValidationError::ApproverRequired`]
///   if a gate in `policy` is not met
pub fn check_action(
    frame: &Frame,
    action: &Action,
    policy: TransitionPolicy,
) -> Result<(), ValidationError> {
    let expected = action.required_status();
    if frame.status != expected {
        return Err(ValidationError::precondition(
            &frame.id,
            action.name(),
            expected,
            frame.status,
        ));
    }
    validate_transition(frame.status, action.target_status())?;
    match action {
        Action::SubmitForReview { reviewer_id } => {
            if policy.require_reviewer && reviewer_id.is_none() && frame.reviewer_id.is_none() {
                return Err(ValidationError::ReviewerRequired);
            }
        }
        Action::MarkAsReady => {
            if policy.require_approver && frame.approver_id.is_none() {
                return Err(ValidationError::ApproverRequired);
            }
        }
        Action::StartFeedback | Action::SubmitFeedback(_) => {}
    }
    Ok(())
}

/// Apply a guarded action; the frame is untouched on error
///
/// # Errors
///
/// See [`check_action`].
pub fn apply_action(
    frame: &mut Frame,
    action: Action,
    policy: TransitionPolicy,
    now: DateTime<Utc>,
) -> Result<TransitionReceipt, ValidationError> {
    check_action(frame, &action, policy)?;
    let from = frame.status;
    let to = action.target_status();
    match action {
        Action::SubmitForReview { reviewer_id } => {
            if reviewer_id.is_some() {
                frame.reviewer_id = reviewer_id;
            }
        }
        Action::SubmitFeedback(input) => {
            frame.feedback = Some(input.complete(now));
        }
        Action::MarkAsReady | Action::StartFeedback => {}
    }
    frame.status = to;
    frame.touch(now);
    tracing::debug!(frame_id = %frame.id, %from, %to, "Transition applied");
    Ok(TransitionReceipt {
        id: frame.id.clone(),
        from,
        to,
        at: now,
    })
}

/// Result of [`force_status`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedTransition {
    /// What changed
    pub receipt: TransitionReceipt,
    /// False if the move went backwards
    pub monotonic: bool,
}

/// Set any status directly
///
/// Entering `archived` requires `feedback`; leaving it drops the stored
/// feedback. Forcing the current status only bumps `updated_at`.
///
/// # Errors
///
/// [`ValidationError::FeedbackRequired`] when entering `archived` without
/// feedback.
pub fn force_status(
    frame: &mut Frame,
    to: FrameStatus,
    feedback: Option<FeedbackInput>,
    now: DateTime<Utc>,
) -> Result<ForcedTransition, ValidationError> {
    let from = frame.status;
    if to == FrameStatus::Archived && from != FrameStatus::Archived && feedback.is_none() {
        return Err(ValidationError::FeedbackRequired);
    }
    if to == FrameStatus::Archived {
        if let Some(input) = feedback {
            frame.feedback = Some(input.complete(now));
        }
    } else {
        frame.feedback = None;
    }
    frame.status = to;
    frame.touch(now);
    let monotonic = to >= from;
    if !monotonic {
        tracing::warn!(frame_id = %frame.id, %from, %to, "Forced status moved backwards");
    }
    Ok(ForcedTransition {
        receipt: TransitionReceipt {
            id: frame.id.clone(),
            from,
            to,
            at: now,
        },
        monotonic,
    })
}
