//! The frame record and its attached collections

use crate::content::FrameContent;
use crate::error::UnknownVariant;
use crate::evaluation::AiEvaluation;
use crate::types::{FrameId, FrameStatus, FrameType, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of planned work moving through review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier
    pub id: FrameId,
    /// Frame type
    pub frame_type: FrameType,
    /// Lifecycle status
    pub status: FrameStatus,
    /// Content sections
    pub content: FrameContent,
    /// Owning user id
    pub owner_id: String,
    /// Assigned reviewer
    pub reviewer_id: Option<String>,
    /// Assigned approver
    pub approver_id: Option<String>,
    /// Owning project
    pub project_id: Option<String>,
    /// Latest evaluation; `None` until first evaluated
    pub ai: Option<AiEvaluation>,
    /// Review summary text
    pub review_summary: Option<String>,
    /// Review recommendation (e.g. "approve", "revise")
    pub review_recommendation: Option<String>,
    /// Per-section review notes
    pub review_comments: Vec<ReviewComment>,
    /// Retrospective; present iff archived
    pub feedback: Option<FrameFeedback>,
    /// Discussion comments
    pub comments: Vec<Comment>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time (never decreases)
    pub updated_at: DateTime<Utc>,
}

impl Frame {
    /// Fresh draft with empty sections
    #[must_use]
    pub fn draft(
        id: FrameId,
        frame_type: FrameType,
        owner_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            frame_type,
            status: FrameStatus::Draft,
            content: FrameContent::default(),
            owner_id: owner_id.into(),
            reviewer_id: None,
            approver_id: None,
            project_id: None,
            ai: None,
            review_summary: None,
            review_recommendation: None,
            review_comments: Vec::new(),
            feedback: None,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at` to `max(now, updated_at)`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Check if the frame is still being worked on
    #[inline]
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.status != FrameStatus::Archived
    }

    /// AI score, if evaluated
    #[inline]
    #[must_use]
    pub fn ai_score(&self) -> Option<u8> {
        self.ai.as_ref().map(|ai| ai.score)
    }

    /// Next comment id for this frame (`c-001`, `c-002`, ...)
    #[must_use]
    pub fn next_comment_id(&self) -> String {
        let highest = self
            .comments
            .iter()
            .filter_map(|c| c.id.strip_prefix("c-").and_then(|n| n.parse::<u32>().ok()))
            .max()
            .unwrap_or(0);
        format!("c-{:03}", highest + 1)
    }
}

/// A discussion comment on one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id (`c-NNN`)
    pub id: String,
    /// Section name the comment refers to
    pub section: String,
    /// Author user id
    pub author_id: String,
    /// Markdown body
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Reviewer note attached during review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// Section name
    pub section: String,
    /// Severity
    #[serde(default)]
    pub severity: Severity,
    /// Note body
    pub content: String,
}

/// How delivery went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Met its goals
    #[default]
    Success,
    /// Met some goals
    Partial,
    /// Did not meet its goals
    Failed,
}

impl Outcome {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Partial => "partial",
            Outcome::Failed => "failed",
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "shipped" => Ok(Outcome::Success),
            "partial" | "partial_success" | "mixed" => Ok(Outcome::Partial),
            "failed" | "failure" | "cancelled" => Ok(Outcome::Failed),
            _ => Err(UnknownVariant::new("outcome", s)),
        }
    }
}

/// Whether an assumption held in practice
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssumptionResult {
    /// Assumption text
    pub assumption: String,
    /// Held true
    pub validated: bool,
    /// Supporting notes
    #[serde(default)]
    pub notes: String,
}

/// Retrospective attached when a frame is archived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFeedback {
    /// Outcome
    pub outcome: Outcome,
    /// Summary
    pub summary: String,
    /// Lessons learned
    #[serde(default)]
    pub lessons_learned: Vec<String>,
    /// Assumption checks
    #[serde(default)]
    pub assumption_results: Vec<AssumptionResult>,
    /// When feedback was submitted
    pub completed_at: DateTime<Utc>,
}

impl FrameFeedback {
    /// Plain-text rendering sent to knowledge distillation
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!("Outcome: {}\n\n{}\n", self.outcome.as_str(), self.summary);
        if !self.lessons_learned.is_empty() {
            out.push_str("\nLessons learned:\n");
            for lesson in &self.lessons_learned {
                out.push_str("- ");
                out.push_str(lesson);
                out.push('\n');
            }
        }
        if !self.assumption_results.is_empty() {
            out.push_str("\nAssumptions:\n");
            for a in &self.assumption_results {
                let mark = if a.validated { "held" } else { "failed" };
                out.push_str(&format!("- {} ({mark})", a.assumption));
                if !a.notes.is_empty() {
                    out.push_str(&format!(": {}", a.notes));
                }
                out.push('\n');
            }
        }
        out
    }
}

/// Feedback as submitted by the user, before `completed_at` is stamped
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedbackInput {
    /// Outcome
    pub outcome: Outcome,
    /// Summary
    pub summary: String,
    /// Lessons learned
    #[serde(default)]
    pub lessons_learned: Vec<String>,
    /// Assumption checks
    #[serde(default)]
    pub assumption_results: Vec<AssumptionResult>,
}

impl FeedbackInput {
    /// Create new feedback input
    #[must_use]
    pub fn new(outcome: Outcome, summary: impl Into<String>) -> Self {
        Self {
            outcome,
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Add a lesson
    #[must_use]
    pub fn with_lesson(mut self, lesson: impl Into<String>) -> Self {
        self.lessons_learned.push(lesson.into());
        self
    }

    /// Add an assumption check
    #[must_use]
    pub fn with_assumption(mut self, assumption: impl Into<String>, validated: bool) -> Self {
        self.assumption_results.push(AssumptionResult {
            assumption: assumption.into(),
            validated,
            notes: String::new(),
        });
        self
    }

    /// Stamp completion time
    #[must_use]
    pub fn complete(self, at: DateTime<Utc>) -> FrameFeedback {
        FrameFeedback {
            outcome: self.outcome,
            summary: self.summary,
            lessons_learned: self.lessons_learned,
            assumption_results: self.assumption_results,
            completed_at: at,
        }
    }
}
