//! Typed partial updates
//!
//! A [`FrameUpdate`] names each field it sets. It is validated against the
//! frame as a whole before any field is written, so a rejected update leaves
//! the frame untouched.

use crate::content::{EngineeringFraming, UserPerspective, ValidationThinking};
use crate::error::ValidationError;
use crate::frame::{Frame, ReviewComment};
use crate::lang::{Language, Localized};
use crate::types::{FrameStatus, FrameType};
use chrono::{DateTime, Utc};

/// A section edit, optionally targeting one language variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit<T> {
    /// `None` writes the neutral value
    pub lang: Option<Language>,
    /// New value
    pub value: T,
}

impl<T> Edit<T> {
    /// Edit the neutral value
    #[inline]
    #[must_use]
    pub fn neutral(value: T) -> Self {
        Self { lang: None, value }
    }

    /// Edit one language variant
    #[inline]
    #[must_use]
    pub fn variant(lang: Language, value: T) -> Self {
        Self {
            lang: Some(lang),
            value,
        }
    }

    fn apply(self, target: &mut Localized<T>) {
        target.edit(self.lang, self.value);
    }
}

/// Set of optional field updates
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameUpdate {
    /// New frame type (draft only)
    pub frame_type: Option<FrameType>,
    /// Problem statement
    pub problem_statement: Option<Edit<String>>,
    /// Root cause (bug only)
    pub root_cause: Option<Edit<String>>,
    /// User perspective
    pub user_perspective: Option<Edit<UserPerspective>>,
    /// Engineering framing
    pub engineering_framing: Option<Edit<EngineeringFraming>>,
    /// Validation thinking
    pub validation_thinking: Option<Edit<ValidationThinking>>,
    /// Reviewer; `Some(None)` unassigns
    pub reviewer_id: Option<Option<String>>,
    /// Approver; `Some(None)` unassigns
    pub approver_id: Option<Option<String>>,
    /// Project; `Some(None)` unassigns
    pub project_id: Option<Option<String>>,
    /// Review summary
    pub review_summary: Option<String>,
    /// Review recommendation
    pub review_recommendation: Option<String>,
    /// Review comments (replaces the list)
    pub review_comments: Option<Vec<ReviewComment>>,
}

impl FrameUpdate {
    /// Create empty update
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set frame type
    #[must_use]
    pub fn with_type(mut self, frame_type: FrameType) -> Self {
        self.frame_type = Some(frame_type);
        self
    }

    /// Set neutral problem statement
    #[must_use]
    pub fn with_problem_statement(mut self, text: impl Into<String>) -> Self {
        self.problem_statement = Some(Edit::neutral(text.into()));
        self
    }

    /// Set problem statement in one language
    #[must_use]
    pub fn with_problem_statement_in(mut self, lang: Language, text: impl Into<String>) -> Self {
        self.problem_statement = Some(Edit::variant(lang, text.into()));
        self
    }

    /// Set neutral root cause
    #[must_use]
    pub fn with_root_cause(mut self, text: impl Into<String>) -> Self {
        self.root_cause = Some(Edit::neutral(text.into()));
        self
    }

    /// Set neutral user perspective
    #[must_use]
    pub fn with_user_perspective(mut self, section: UserPerspective) -> Self {
        self.user_perspective = Some(Edit::neutral(section));
        self
    }

    /// Set neutral engineering framing
    #[must_use]
    pub fn with_engineering_framing(mut self, section: EngineeringFraming) -> Self {
        self.engineering_framing = Some(Edit::neutral(section));
        self
    }

    /// Set neutral validation thinking
    #[must_use]
    pub fn with_validation_thinking(mut self, section: ValidationThinking) -> Self {
        self.validation_thinking = Some(Edit::neutral(section));
        self
    }

    /// Assign reviewer
    #[must_use]
    pub fn with_reviewer(mut self, reviewer_id: impl Into<String>) -> Self {
        self.reviewer_id = Some(Some(reviewer_id.into()));
        self
    }

    /// Assign approver
    #[must_use]
    pub fn with_approver(mut self, approver_id: impl Into<String>) -> Self {
        self.approver_id = Some(Some(approver_id.into()));
        self
    }

    /// Assign project
    #[must_use]
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(Some(project_id.into()));
        self
    }

    /// Check if the update sets nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check if any content section is set
    #[must_use]
    pub fn touches_content(&self) -> bool {
        self.problem_statement.is_some()
            || self.root_cause.is_some()
            || self.user_perspective.is_some()
            || self.engineering_framing.is_some()
            || self.validation_thinking.is_some()
    }

    /// Validate against `frame` without applying
    ///
    /// # Errors
    ///
    /// - [`ValidationError::TypeLocked`] if the type changes outside draft
    /// - [`ValidationError::RootCauseRequiresBug`] if a root cause is set on a
    ///   frame that is not (or will not be) a bug
    pub fn validate(&self, frame: &Frame) -> Result<(), ValidationError> {
        if let Some(new_type) = self.frame_type {
            if new_type != frame.frame_type && frame.status != FrameStatus::Draft {
                return Err(ValidationError::TypeLocked(frame.status));
            }
        }
        let effective_type = self.frame_type.unwrap_or(frame.frame_type);
        if self.root_cause.is_some() && !effective_type.has_root_cause() {
            return Err(ValidationError::RootCauseRequiresBug(effective_type));
        }
        Ok(())
    }

    /// Validate, then merge every set field onto `frame` and bump `updated_at`
    ///
    /// Changing the type away from bug clears the root cause.
    ///
    /// # Errors
    ///
    /// See [`FrameUpdate::validate`]. On error `frame` is unchanged.
    pub fn apply_to(self, frame: &mut Frame, now: DateTime<Utc>) -> Result<(), ValidationError> {
        self.validate(frame)?;

        if let Some(new_type) = self.frame_type {
            if !new_type.has_root_cause() {
                frame.content.clear_root_cause();
            }
            frame.frame_type = new_type;
        }
        if let Some(edit) = self.problem_statement {
            edit.apply(&mut frame.content.problem_statement);
        }
        if let Some(edit) = self.root_cause {
            edit.apply(&mut frame.content.root_cause);
        }
        if let Some(edit) = self.user_perspective {
            edit.apply(&mut frame.content.user_perspective);
        }
        if let Some(edit) = self.engineering_framing {
            edit.apply(&mut frame.content.engineering_framing);
        }
        if let Some(edit) = self.validation_thinking {
            edit.apply(&mut frame.content.validation_thinking);
        }
        if let Some(reviewer) = self.reviewer_id {
            frame.reviewer_id = reviewer;
        }
        if let Some(approver) = self.approver_id {
            frame.approver_id = approver;
        }
        if let Some(project) = self.project_id {
            frame.project_id = project;
        }
        if let Some(summary) = self.review_summary {
            frame.review_summary = Some(summary);
        }
        if let Some(recommendation) = self.review_recommendation {
            frame.review_recommendation = Some(recommendation);
        }
        if let Some(comments) = self.review_comments {
            frame.review_comments = comments;
        }

        frame.touch(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StructuredSection;
    use crate::types::FrameId;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    fn draft(frame_type: FrameType) -> Frame {
        Frame::draft(FrameId::new("f-2024-05-01-abcdef"), frame_type, "alice", t0())
    }

    #[test]
    fn merges_only_set_fields() {
        let mut frame = draft(FrameType::Feature);
        frame.content.problem_statement.neutral = "old".into();
        frame.reviewer_id = Some("bob".into());

        FrameUpdate::new()
            .with_engineering_framing(EngineeringFraming::from_text("use a queue"))
            .apply_to(&mut frame, t0() + Duration::seconds(1))
            .unwrap();

        assert_eq!(frame.content.problem_statement.neutral, "old");
        assert_eq!(frame.content.engineering_framing.neutral.approach, "use a queue");
        assert_eq!(frame.reviewer_id.as_deref(), Some("bob"));
        assert_eq!(frame.updated_at, t0() + Duration::seconds(1));
    }

    #[test]
    fn language_edit_keeps_neutral() {
        let mut frame = draft(FrameType::Feature);
        frame.content.problem_statement.neutral = "neutral".into();
        FrameUpdate::new()
            .with_problem_statement_in(Language::Zh, "中文")
            .apply_to(&mut frame, t0())
            .unwrap();
        assert_eq!(frame.content.problem_statement.neutral, "neutral");
        assert_eq!(frame.content.problem_statement.zh.as_deref(), Some("中文"));
    }

    #[test]
    fn root_cause_rejected_on_feature() {
        let mut frame = draft(FrameType::Feature);
        let before = frame.clone();
        let err = FrameUpdate::new()
            .with_problem_statement("changed")
            .with_root_cause("nope")
            .apply_to(&mut frame, t0() + Duration::seconds(1))
            .unwrap_err();
        assert_eq!(err, ValidationError::RootCauseRequiresBug(FrameType::Feature));
        assert_eq!(frame, before);
    }

    #[test]
    fn root_cause_allowed_when_switching_to_bug() {
        let mut frame = draft(FrameType::Feature);
        FrameUpdate::new()
            .with_type(FrameType::Bug)
            .with_root_cause("race in cache")
            .apply_to(&mut frame, t0())
            .unwrap();
        assert_eq!(frame.frame_type, FrameType::Bug);
        assert_eq!(frame.content.root_cause.neutral, "race in cache");
    }

    #[test]
    fn switching_away_from_bug_clears_root_cause() {
        let mut frame = draft(FrameType::Bug);
        frame.content.root_cause.neutral = "stale index".into();
        FrameUpdate::new()
            .with_type(FrameType::Exploration)
            .apply_to(&mut frame, t0())
            .unwrap();
        assert!(frame.content.root_cause.is_empty());
    }

    #[test]
    fn type_locked_after_draft() {
        let mut frame = draft(FrameType::Bug);
        frame.status = FrameStatus::InReview;
        let err = FrameUpdate::new()
            .with_type(FrameType::Feature)
            .apply_to(&mut frame, t0())
            .unwrap_err();
        assert_eq!(err, ValidationError::TypeLocked(FrameStatus::InReview));
        assert_eq!(frame.frame_type, FrameType::Bug);

        // same type is not a change
        FrameUpdate::new()
            .with_type(FrameType::Bug)
            .apply_to(&mut frame, t0())
            .unwrap();
    }

    #[test]
    fn unassign_reviewer() {
        let mut frame = draft(FrameType::Bug);
        frame.reviewer_id = Some("bob".into());
        let update = FrameUpdate {
            reviewer_id: Some(None),
            ..FrameUpdate::default()
        };
        assert!(!update.is_empty());
        assert!(!update.touches_content());
        update.apply_to(&mut frame, t0()).unwrap();
        assert!(frame.reviewer_id.is_none());
    }
}
