//! Frame content sections
//!
//! Flat sections (problem statement, root cause) are markdown strings.
//! Structured sections have a designated free-text field that receives flat
//! markdown from older schema generations:
//!
//! | Section | Free-text field |
//! |---|---|
//! | [`UserPerspective`] | `context` |
//! | [`EngineeringFraming`] | `approach` |
//! | [`ValidationThinking`] | `summary` |

use crate::lang::{Blank, Language, Localized};
use crate::types::SectionKey;
use serde::{Deserialize, Serialize};

/// A structured section that can absorb flat markdown
pub trait StructuredSection: Blank + Default + Clone {
    /// Section this type represents
    const KEY: SectionKey;

    /// Build from flat markdown, stored in the free-text field
    fn from_text(text: impl Into<String>) -> Self;

    /// The free-text field
    fn text(&self) -> &str;
}

/// Who is affected and how
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserPerspective {
    /// Primary persona
    pub persona: String,
    /// Free-text context
    pub context: String,
    /// Ordered journey steps
    pub journey_steps: Vec<String>,
    /// Pain points (unordered)
    pub pain_points: Vec<String>,
}

impl Blank for UserPerspective {
    fn is_blank(&self) -> bool {
        self.persona.is_blank()
            && self.context.is_blank()
            && self.journey_steps.is_blank()
            && self.pain_points.is_blank()
    }
}

impl StructuredSection for UserPerspective {
    const KEY: SectionKey = SectionKey::UserPerspective;

    fn from_text(text: impl Into<String>) -> Self {
        Self {
            context: text.into(),
            ..Self::default()
        }
    }

    fn text(&self) -> &str {
        &self.context
    }
}

/// Technical approach and its boundaries
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineeringFraming {
    /// Free-text approach
    pub approach: String,
    /// Guiding principles and invariants
    pub principles: Vec<String>,
    /// Explicit non-goals
    pub non_goals: Vec<String>,
    /// Known risks and trade-offs
    pub risks: Vec<String>,
}

impl Blank for EngineeringFraming {
    fn is_blank(&self) -> bool {
        self.approach.is_blank()
            && self.principles.is_blank()
            && self.non_goals.is_blank()
            && self.risks.is_blank()
    }
}

impl StructuredSection for EngineeringFraming {
    const KEY: SectionKey = SectionKey::EngineeringFraming;

    fn from_text(text: impl Into<String>) -> Self {
        Self {
            approach: text.into(),
            ..Self::default()
        }
    }

    fn text(&self) -> &str {
        &self.approach
    }
}

/// One validation scenario
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestCase {
    /// What is exercised
    pub scenario: String,
    /// Expected outcome
    pub expected: String,
    /// Free-form priority label (e.g. "high", "p1")
    pub priority: String,
}

impl Blank for TestCase {
    fn is_blank(&self) -> bool {
        self.scenario.is_blank() && self.expected.is_blank() && self.priority.is_blank()
    }
}

/// How success is verified
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationThinking {
    /// Free-text summary
    pub summary: String,
    /// Measurable success criteria
    pub success_criteria: Vec<String>,
    /// Structured test cases
    pub test_cases: Vec<TestCase>,
    /// What happens if it goes wrong
    pub rollback_plan: String,
}

impl Blank for ValidationThinking {
    fn is_blank(&self) -> bool {
        self.summary.is_blank()
            && self.success_criteria.is_blank()
            && self.test_cases.is_blank()
            && self.rollback_plan.is_blank()
    }
}

impl StructuredSection for ValidationThinking {
    const KEY: SectionKey = SectionKey::ValidationThinking;

    fn from_text(text: impl Into<String>) -> Self {
        Self {
            summary: text.into(),
            ..Self::default()
        }
    }

    fn text(&self) -> &str {
        &self.summary
    }
}

/// All content sections of a frame
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameContent {
    /// Problem statement (markdown)
    pub problem_statement: Localized<String>,
    /// Root cause (markdown, bug frames only)
    pub root_cause: Localized<String>,
    /// User perspective
    pub user_perspective: Localized<UserPerspective>,
    /// Engineering framing
    pub engineering_framing: Localized<EngineeringFraming>,
    /// Validation thinking
    pub validation_thinking: Localized<ValidationThinking>,
}

impl FrameContent {
    /// Check if a section has any content in any language
    #[must_use]
    pub fn section_is_empty(&self, key: SectionKey) -> bool {
        match key {
            SectionKey::ProblemStatement => self.problem_statement.is_empty(),
            SectionKey::RootCause => self.root_cause.is_empty(),
            SectionKey::UserPerspective => self.user_perspective.is_empty(),
            SectionKey::EngineeringFraming => self.engineering_framing.is_empty(),
            SectionKey::ValidationThinking => self.validation_thinking.is_empty(),
        }
    }

    /// Problem statement as displayed in `lang`
    #[must_use]
    pub fn problem_statement_in(&self, lang: Language) -> &str {
        self.problem_statement.pick(lang)
    }

    /// Drop the root cause in every language
    pub fn clear_root_cause(&mut self) {
        self.root_cause = Localized::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_fills_free_text_field() {
        let up = UserPerspective::from_text("ad-hoc note");
        assert_eq!(up.context, "ad-hoc note");
        assert!(up.persona.is_empty());
        assert!(up.journey_steps.is_empty());
        assert_eq!(up.text(), "ad-hoc note");

        assert_eq!(EngineeringFraming::from_text("plan").approach, "plan");
        assert_eq!(ValidationThinking::from_text("check").summary, "check");
    }

    #[test]
    fn blank_sections() {
        assert!(UserPerspective::default().is_blank());
        let vt = ValidationThinking {
            test_cases: vec![TestCase::default()],
            ..Default::default()
        };
        assert!(vt.is_blank());
        let ef = EngineeringFraming {
            risks: vec!["latency".into()],
            ..Default::default()
        };
        assert!(!ef.is_blank());
    }

    #[test]
    fn section_emptiness_checks_variants() {
        let mut content = FrameContent::default();
        assert!(content.section_is_empty(SectionKey::ProblemStatement));
        content
            .problem_statement
            .edit(Some(Language::Zh), "问题".to_string());
        assert!(!content.section_is_empty(SectionKey::ProblemStatement));
        assert_eq!(content.problem_statement_in(Language::En), "问题");
    }
}
