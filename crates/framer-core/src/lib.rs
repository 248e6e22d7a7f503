//! Framer Core - frame model and lifecycle
//!
//! The synchronous heart of the frame engine:
//! - The [`Frame`] record and its content sections
//! - The [`FrameRegistry`] with unsaved-draft tracking and selection
//! - The lifecycle state machine and its forced-transition escape hatch
//! - Typed partial updates validated before merge
//! - AI evaluation merging and local-only heuristics
//!
//! Nothing here performs I/O. Remote synchronization lives in `framer-sync`.
//!
//! # Example
//!
//! ```rust
//! use framer_core::prelude::*;
//! use chrono::Utc;
//!
//! let mut registry = FrameRegistry::new();
//! let frame = Frame::draft(FrameId::generate(), FrameType::Bug, "alice", Utc::now());
//! let id = frame.id.clone();
//! registry.insert_unsaved(frame);
//! assert!(!registry.is_saved(id.as_str()));
//!
//! let frame = registry.get_mut(id.as_str()).unwrap();
//! FrameUpdate::new()
//!     .with_problem_statement("Login fails on Safari")
//!     .apply_to(frame, Utc::now())
//!     .unwrap();
//! ```

#![warn(unreachable_pub)]

pub mod content;
pub mod error;
pub mod evaluation;
pub mod frame;
pub mod heuristics;
pub mod lang;
pub mod registry;
pub mod state_machine;
pub mod types;
pub mod unsaved;
pub mod update;

pub use content::{
    EngineeringFraming, FrameContent, StructuredSection, TestCase, UserPerspective,
    ValidationThinking,
};
pub use error::{UnknownVariant, ValidationError};
pub use evaluation::{merge_evaluation, AiEvaluation, AiIssue, Criterion, ScoreBreakdown};
pub use frame::{
    AssumptionResult, Comment, FeedbackInput, Frame, FrameFeedback, Outcome, ReviewComment,
};
pub use heuristics::{detect_issues, HeuristicEvaluator};
pub use lang::{pick_lang, Blank, Language, Localized};
pub use registry::FrameRegistry;
pub use state_machine::{
    allowed_transitions, apply_action, check_action, force_status, validate_transition, Action,
    ForcedTransition, TransitionPolicy, TransitionReceipt,
};
pub use types::{FrameId, FrameStatus, FrameType, SectionKey, Severity};
pub use unsaved::UnsavedDrafts;
pub use update::{Edit, FrameUpdate};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Framer Core
    pub use crate::{
        Action, AiEvaluation, Frame, FrameId, FrameRegistry, FrameStatus, FrameType,
        FrameUpdate, Language, TransitionPolicy, ValidationError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
