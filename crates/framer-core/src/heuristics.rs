//! Local-only evaluation heuristics
//!
//! Issue detection is a pure function of frame content. Only the numeric
//! sub-scores pass through the random source, so [`detect_issues`] and
//! [`deterministic_breakdown`] can be tested without seeding anything.

use crate::content::{EngineeringFraming, UserPerspective, ValidationThinking};
use crate::evaluation::{AiEvaluation, AiIssue, Criterion, ScoreBreakdown};
use crate::frame::Frame;
use crate::lang::{Blank, Language};
use crate::types::{SectionKey, Severity};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Problem statements shorter than this are flagged as brief
pub const BRIEF_PROBLEM_CHARS: usize = 50;

/// Journey step count below which the user perspective is flagged
pub const MIN_JOURNEY_STEPS: usize = 3;

/// Points removed per warning
pub const WARNING_PENALTY: u8 = 7;

/// Points removed per info issue
pub const INFO_PENALTY: u8 = 3;

/// Default sub-score jitter (+/- points)
pub const DEFAULT_JITTER: u8 = 2;

/// Points an issue removes from its criterion
#[must_use]
pub fn penalty(severity: Severity, weight: u8) -> u8 {
    match severity {
        Severity::Critical => weight,
        Severity::Warning => WARNING_PENALTY,
        Severity::Info => INFO_PENALTY,
    }
}

fn issue(section: SectionKey, severity: Severity, message: &str) -> AiIssue {
    AiIssue::new(Some(section), severity, message)
}

/// Find content issues in the frame as displayed in `lang`
#[must_use]
pub fn detect_issues(frame: &Frame, lang: Language) -> Vec<AiIssue> {
    let content = &frame.content;
    let mut issues = Vec::new();

    let problem = content.problem_statement.pick(lang).trim();
    if problem.is_empty() {
        issues.push(issue(
            SectionKey::ProblemStatement,
            Severity::Critical,
            "Problem statement is missing",
        ));
    } else if problem.chars().count() < BRIEF_PROBLEM_CHARS {
        issues.push(issue(
            SectionKey::ProblemStatement,
            Severity::Warning,
            "Problem statement is too brief; describe the impact and who is affected",
        ));
    }

    if frame.frame_type.has_root_cause() && content.root_cause.pick(lang).is_blank() {
        issues.push(issue(
            SectionKey::RootCause,
            Severity::Warning,
            "Root cause is not identified for this bug",
        ));
    }

    user_perspective_issues(content.user_perspective.pick(lang), &mut issues);
    engineering_framing_issues(content.engineering_framing.pick(lang), &mut issues);
    validation_thinking_issues(content.validation_thinking.pick(lang), &mut issues);
    issues
}

fn user_perspective_issues(section: &UserPerspective, issues: &mut Vec<AiIssue>) {
    let key = SectionKey::UserPerspective;
    if section.is_blank() {
        issues.push(issue(key, Severity::Critical, "User perspective is missing"));
        return;
    }
    if section.persona.is_blank() {
        issues.push(issue(key, Severity::Warning, "No persona identified"));
    }
    let steps = section.journey_steps.iter().filter(|s| !s.is_blank()).count();
    if steps < MIN_JOURNEY_STEPS {
        issues.push(issue(
            key,
            Severity::Warning,
            "User journey has fewer than 3 journey steps",
        ));
    }
    if section.pain_points.is_blank() {
        issues.push(issue(key, Severity::Info, "No pain points listed"));
    }
}

fn engineering_framing_issues(section: &EngineeringFraming, issues: &mut Vec<AiIssue>) {
    let key = SectionKey::EngineeringFraming;
    if section.is_blank() {
        issues.push(issue(key, Severity::Critical, "Engineering framing is missing"));
        return;
    }
    if section.approach.is_blank() {
        issues.push(issue(key, Severity::Warning, "Technical approach is not described"));
    }
    if section.non_goals.is_blank() {
        issues.push(issue(key, Severity::Info, "No non-goals stated"));
    }
    if section.risks.is_blank() {
        issues.push(issue(key, Severity::Info, "No risks or trade-offs identified"));
    }
}

fn validation_thinking_issues(section: &ValidationThinking, issues: &mut Vec<AiIssue>) {
    let key = SectionKey::ValidationThinking;
    if section.is_blank() {
        issues.push(issue(key, Severity::Critical, "Validation thinking is missing"));
        return;
    }
    if section.success_criteria.is_blank() {
        issues.push(issue(key, Severity::Warning, "No success criteria defined"));
    }
    if section.test_cases.is_blank() {
        issues.push(issue(key, Severity::Warning, "No structured test cases"));
    }
    if section.rollback_plan.is_blank() {
        issues.push(issue(key, Severity::Info, "No rollback plan"));
    }
}

/// Sub-scores before jitter: each criterion's weight minus its penalties
#[must_use]
pub fn deterministic_breakdown(issues: &[AiIssue]) -> ScoreBreakdown {
    Criterion::ALL
        .iter()
        .map(|criterion| {
            let weight = criterion.weight();
            let lost: u32 = issues
                .iter()
                .filter(|i| i.section.map(Criterion::for_section) == Some(*criterion))
                .map(|i| u32::from(penalty(i.severity, weight)))
                .sum();
            let remaining = u32::from(weight).saturating_sub(lost);
            (criterion.as_str().to_string(), i64::from(remaining))
        })
        .collect()
}

fn summarize(issues: &[AiIssue]) -> String {
    let critical = issues.iter().filter(|i| i.severity == Severity::Critical).count();
    if issues.is_empty() {
        "All sections look complete".to_string()
    } else if critical > 0 {
        format!("{} issues found, {critical} critical", issues.len())
    } else {
        format!("{} issues found", issues.len())
    }
}

/// Synthesizes evaluations without a remote service
#[derive(Debug)]
pub struct HeuristicEvaluator<R = StdRng> {
    rng: R,
    jitter: u8,
}

impl HeuristicEvaluator<StdRng> {
    /// Evaluator seeded from the OS
    #[must_use]
    pub fn new(jitter: u8) -> Self {
        Self::with_rng(StdRng::from_entropy(), jitter)
    }

    /// Reproducible evaluator
    #[must_use]
    pub fn seeded(seed: u64, jitter: u8) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), jitter)
    }
}

impl Default for HeuristicEvaluator<StdRng> {
    fn default() -> Self {
        Self::new(DEFAULT_JITTER)
    }
}

impl<R: Rng> HeuristicEvaluator<R> {
    /// Evaluator over any random source
    #[must_use]
    pub fn with_rng(rng: R, jitter: u8) -> Self {
        Self { rng, jitter }
    }

    /// Evaluate the frame as displayed in `lang`
    pub fn evaluate(&mut self, frame: &Frame, lang: Language, now: DateTime<Utc>) -> AiEvaluation {
        let issues = detect_issues(frame, lang);
        let base = deterministic_breakdown(&issues);
        let jitter = i64::from(self.jitter);
        let mut breakdown = ScoreBreakdown::new();
        for (name, value) in base.iter() {
            let value = i64::from(value);
            let jittered = if value > 0 && jitter > 0 {
                value + self.rng.gen_range(-jitter..=jitter)
            } else {
                value
            };
            breakdown.set(name, jittered);
        }
        let summary = summarize(&issues);
        AiEvaluation::from_breakdown(breakdown, issues, now)
            .with_summary(summary)
            .with_feedback("Local heuristic review based on section completeness")
    }
}
