//! AI evaluation results and merging
//!
//! An [`AiEvaluation`] is replaced on a frame as one value, so score,
//! breakdown and issues always come from the same evaluation.

use crate::error::UnknownVariant;
use crate::frame::Frame;
use crate::types::{SectionKey, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Highest possible score
pub const MAX_SCORE: u8 = 100;

/// Scored rubric criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Problem statement quality
    ProblemStatement,
    /// User perspective quality
    UserPerspective,
    /// Engineering framing quality
    EngineeringFraming,
    /// Validation thinking quality
    ValidationThinking,
}

impl Criterion {
    /// Every criterion in rubric order
    pub const ALL: [Criterion; 4] = [
        Criterion::ProblemStatement,
        Criterion::UserPerspective,
        Criterion::EngineeringFraming,
        Criterion::ValidationThinking,
    ];

    /// Maximum points for the criterion
    #[inline]
    #[must_use]
    pub fn weight(self) -> u8 {
        25
    }

    /// Breakdown key
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.section().as_str()
    }

    /// Section the criterion scores
    #[must_use]
    pub fn section(self) -> SectionKey {
        match self {
            Criterion::ProblemStatement => SectionKey::ProblemStatement,
            Criterion::UserPerspective => SectionKey::UserPerspective,
            Criterion::EngineeringFraming => SectionKey::EngineeringFraming,
            Criterion::ValidationThinking => SectionKey::ValidationThinking,
        }
    }

    /// Criterion scoring a section; root cause counts toward the problem statement
    #[must_use]
    pub fn for_section(section: SectionKey) -> Criterion {
        match section {
            SectionKey::ProblemStatement | SectionKey::RootCause => Criterion::ProblemStatement,
            SectionKey::UserPerspective => Criterion::UserPerspective,
            SectionKey::EngineeringFraming => Criterion::EngineeringFraming,
            SectionKey::ValidationThinking => Criterion::ValidationThinking,
        }
    }
}

impl FromStr for Criterion {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<SectionKey>() {
            Ok(SectionKey::RootCause) | Err(_) => Err(UnknownVariant::new("criterion", s)),
            Ok(section) => Ok(Criterion::for_section(section)),
        }
    }
}

/// Named sub-scores
///
/// Known criteria are capped at their weight; other names (remote rubrics
/// may add their own) are capped at [`MAX_SCORE`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreBreakdown(BTreeMap<String, u8>);

impl ScoreBreakdown {
    /// Create empty breakdown
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap for a sub-score name
    #[must_use]
    pub fn cap_for(name: &str) -> u8 {
        name.parse::<Criterion>()
            .map_or(MAX_SCORE, Criterion::weight)
    }

    /// Set a sub-score, clamped to `[0, cap]`
    pub fn set(&mut self, name: impl Into<String>, value: i64) {
        let name = name.into();
        let cap = Self::cap_for(&name);
        let clamped = u8::try_from(value.clamp(0, i64::from(cap))).unwrap_or(cap);
        self.0.insert(name, clamped);
    }

    /// Builder form of [`ScoreBreakdown::set`]
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: i64) -> Self {
        self.set(name, value);
        self
    }

    /// Sub-score by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u8> {
        self.0.get(name).copied()
    }

    /// Sum of sub-scores, capped at [`MAX_SCORE`]
    #[must_use]
    pub fn total(&self) -> u8 {
        let sum: u32 = self.0.values().map(|v| u32::from(*v)).sum();
        u8::try_from(sum.min(u32::from(MAX_SCORE))).unwrap_or(MAX_SCORE)
    }

    /// Iterate `(name, score)`
    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of sub-scores
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for ScoreBreakdown {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        let mut breakdown = Self::new();
        for (name, value) in iter {
            breakdown.set(name, value);
        }
        breakdown
    }
}

/// Problem found by an evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiIssue {
    /// Affected section; `None` for general issues
    pub section: Option<SectionKey>,
    /// Severity
    pub severity: Severity,
    /// Description
    pub message: String,
}

impl AiIssue {
    /// Create new issue
    #[must_use]
    pub fn new(section: Option<SectionKey>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            section,
            severity,
            message: message.into(),
        }
    }

    /// General warning with no section
    #[must_use]
    pub fn general(message: impl Into<String>) -> Self {
        Self::new(None, Severity::Warning, message)
    }
}

/// One complete evaluation of a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiEvaluation {
    /// Overall score (0-100)
    pub score: u8,
    /// Per-criterion sub-scores
    pub breakdown: Option<ScoreBreakdown>,
    /// Issues found
    pub issues: Vec<AiIssue>,
    /// Short summary
    pub summary: Option<String>,
    /// Longer feedback
    pub feedback: Option<String>,
    /// When the evaluation ran
    pub evaluated_at: DateTime<Utc>,
}

impl AiEvaluation {
    /// Evaluation with only a score
    #[must_use]
    pub fn scored(score: u8, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            score: score.min(MAX_SCORE),
            breakdown: None,
            issues: Vec::new(),
            summary: None,
            feedback: None,
            evaluated_at,
        }
    }

    /// Evaluation whose score is the breakdown total
    #[must_use]
    pub fn from_breakdown(
        breakdown: ScoreBreakdown,
        issues: Vec<AiIssue>,
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            score: 0,
            breakdown: Some(breakdown),
            issues,
            summary: None,
            feedback: None,
            evaluated_at,
        }
        .normalized()
    }

    /// Set summary
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set feedback
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// Enforce score invariants
    ///
    /// An empty breakdown becomes `None`; a present breakdown determines the
    /// score.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.breakdown.as_ref().is_some_and(ScoreBreakdown::is_empty) {
            self.breakdown = None;
        }
        self.score = match &self.breakdown {
            Some(breakdown) => breakdown.total(),
            None => self.score.min(MAX_SCORE),
        };
        self
    }

    /// Issues for one section
    pub fn issues_for(&self, section: SectionKey) -> impl Iterator<Item = &AiIssue> {
        self.issues
            .iter()
            .filter(move |issue| issue.section == Some(section))
    }
}

/// Replace the frame's evaluation in one assignment and bump `updated_at`
pub fn merge_evaluation(frame: &mut Frame, evaluation: AiEvaluation, now: DateTime<Utc>) {
    frame.ai = Some(evaluation.normalized());
    frame.touch(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FrameId, FrameType};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn breakdown_clamps_known_criteria() {
        let breakdown = ScoreBreakdown::new()
            .with("problem_statement", 40)
            .with("user_perspective", -3)
            .with("clarity", 250);
        assert_eq!(breakdown.get("problem_statement"), Some(25));
        assert_eq!(breakdown.get("user_perspective"), Some(0));
        assert_eq!(breakdown.get("clarity"), Some(100));
        assert_eq!(breakdown.total(), 100);
    }

    #[test]
    fn criterion_parse_aliases() {
        assert_eq!("problemStatement".parse::<Criterion>(), Ok(Criterion::ProblemStatement));
        assert!("root_cause".parse::<Criterion>().is_err());
        assert_eq!(Criterion::ALL.iter().map(|c| u32::from(c.weight())).sum::<u32>(), 100);
    }

    #[test]
    fn normalized_score_follows_breakdown() {
        let eval = AiEvaluation {
            score: 99,
            breakdown: Some(ScoreBreakdown::new().with("problem_statement", 20).with("user_perspective", 10)),
            issues: vec![],
            summary: None,
            feedback: None,
            evaluated_at: t0(),
        }
        .normalized();
        assert_eq!(eval.score, 30);

        let empty = AiEvaluation {
            breakdown: Some(ScoreBreakdown::new()),
            ..AiEvaluation::scored(42, t0())
        }
        .normalized();
        assert_eq!(empty.breakdown, None);
        assert_eq!(empty.score, 42);
    }

    #[test]
    fn zero_score_is_an_evaluation() {
        let mut frame = Frame::draft(FrameId::new("f-1"), FrameType::Bug, "alice", t0());
        assert_eq!(frame.ai_score(), None);
        merge_evaluation(&mut frame, AiEvaluation::scored(0, t0()), t0());
        assert_eq!(frame.ai_score(), Some(0));
    }

    #[test]
    fn merge_replaces_everything() {
        let mut frame = Frame::draft(FrameId::new("f-1"), FrameType::Bug, "alice", t0());
        let first = AiEvaluation::from_breakdown(
            ScoreBreakdown::new().with("problem_statement", 10),
            vec![AiIssue::general("old issue")],
            t0(),
        )
        .with_summary("old");
        merge_evaluation(&mut frame, first, t0());

        let later = t0() + chrono::Duration::minutes(3);
        let second = AiEvaluation::scored(77, later);
        merge_evaluation(&mut frame, second.clone(), later);

        let ai = frame.ai.as_ref().unwrap();
        assert_eq!(ai, &second);
        assert!(ai.issues.is_empty());
        assert!(ai.summary.is_none());
        assert_eq!(frame.updated_at, later);
    }

    #[test]
    fn issues_for_section() {
        let eval = AiEvaluation::from_breakdown(
            ScoreBreakdown::new(),
            vec![
                AiIssue::new(Some(SectionKey::UserPerspective), Severity::Warning, "a"),
                AiIssue::general("b"),
            ],
            t0(),
        );
        assert_eq!(eval.issues_for(SectionKey::UserPerspective).count(), 1);
    }
}
