//! Core types for Framer
//!
//! Defines identifiers and the closed vocabularies of the frame model:
//! - Frame ids (`f-YYYY-MM-DD-xxxxxx`)
//! - Frame type and lifecycle status
//! - Section keys and issue severity

use crate::error::UnknownVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::str::FromStr;
use uuid::Uuid;

/// Length of the random suffix in generated frame ids
const ID_SUFFIX_LEN: usize = 6;

/// Unique frame identifier
///
/// Opaque to the engine; locally generated ids follow the backend's
/// `f-YYYY-MM-DD-xxxxxx` shape so they are indistinguishable from server ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generate new frame ID dated today
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate new frame ID for the given date
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "f-{}-{}",
            now.format("%Y-%m-%d"),
            &suffix[..ID_SUFFIX_LEN]
        ))
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the `f-YYYY-MM-DD-<alnum>` shape
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        let Some(rest) = self.0.strip_prefix("f-") else {
            return false;
        };
        let mut parts = rest.splitn(4, '-');
        let digits = |s: Option<&str>, len: usize| {
            s.is_some_and(|p| p.len() == len && p.bytes().all(|b| b.is_ascii_digit()))
        };
        digits(parts.next(), 4)
            && digits(parts.next(), 2)
            && digits(parts.next(), 2)
            && parts
                .next()
                .is_some_and(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric()))
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FrameId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for FrameId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FrameId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Type of frame (fixed at creation, editable while draft)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    /// Defect; the only type with a root cause section
    Bug,
    /// New capability
    Feature,
    /// Open-ended investigation
    Exploration,
}

impl FrameType {
    /// All frame types
    pub const ALL: [FrameType; 3] = [FrameType::Bug, FrameType::Feature, FrameType::Exploration];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Bug => "bug",
            FrameType::Feature => "feature",
            FrameType::Exploration => "exploration",
        }
    }

    /// Whether the root cause section applies
    #[inline]
    #[must_use]
    pub fn has_root_cause(&self) -> bool {
        matches!(self, FrameType::Bug)
    }
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bug" => Ok(FrameType::Bug),
            "feature" => Ok(FrameType::Feature),
            "exploration" => Ok(FrameType::Exploration),
            _ => Err(UnknownVariant::new("frame type", s)),
        }
    }
}

/// Lifecycle status of a frame
///
/// Ordered: `Draft < InReview < Ready < Feedback < Archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Being written; may be unsaved
    Draft,
    /// Submitted, awaiting review
    InReview,
    /// Approved for development
    Ready,
    /// Collecting post-delivery feedback
    Feedback,
    /// Terminal
    Archived,
}

impl FrameStatus {
    /// All statuses in lifecycle order
    pub const ALL: [FrameStatus; 5] = [
        FrameStatus::Draft,
        FrameStatus::InReview,
        FrameStatus::Ready,
        FrameStatus::Feedback,
        FrameStatus::Archived,
    ];

    /// Position in the lifecycle
    #[inline]
    #[must_use]
    pub fn ordinal(&self) -> u8 {
        match self {
            FrameStatus::Draft => 0,
            FrameStatus::InReview => 1,
            FrameStatus::Ready => 2,
            FrameStatus::Feedback => 3,
            FrameStatus::Archived => 4,
        }
    }

    /// Next status along the lifecycle, if any
    #[inline]
    #[must_use]
    pub fn next(&self) -> Option<FrameStatus> {
        Self::ALL.get(usize::from(self.ordinal()) + 1).copied()
    }

    /// Check if no further transition exists
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, FrameStatus::Archived)
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameStatus::Draft => "draft",
            FrameStatus::InReview => "in_review",
            FrameStatus::Ready => "ready",
            FrameStatus::Feedback => "feedback",
            FrameStatus::Archived => "archived",
        }
    }
}

impl std::fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "draft" => Ok(FrameStatus::Draft),
            "in_review" | "inreview" => Ok(FrameStatus::InReview),
            "ready" => Ok(FrameStatus::Ready),
            "feedback" => Ok(FrameStatus::Feedback),
            "archived" => Ok(FrameStatus::Archived),
            _ => Err(UnknownVariant::new("frame status", s)),
        }
    }
}

/// Content section of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    /// Problem statement
    ProblemStatement,
    /// Root cause (bug frames)
    RootCause,
    /// User perspective
    UserPerspective,
    /// Engineering framing
    EngineeringFraming,
    /// Validation thinking
    ValidationThinking,
}

impl SectionKey {
    /// All sections in document order
    pub const ALL: [SectionKey; 5] = [
        SectionKey::ProblemStatement,
        SectionKey::RootCause,
        SectionKey::UserPerspective,
        SectionKey::EngineeringFraming,
        SectionKey::ValidationThinking,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::ProblemStatement => "problem_statement",
            SectionKey::RootCause => "root_cause",
            SectionKey::UserPerspective => "user_perspective",
            SectionKey::EngineeringFraming => "engineering_framing",
            SectionKey::ValidationThinking => "validation_thinking",
        }
    }

    /// Human-readable heading
    #[inline]
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            SectionKey::ProblemStatement => "Problem Statement",
            SectionKey::RootCause => "Root Cause",
            SectionKey::UserPerspective => "User Perspective",
            SectionKey::EngineeringFraming => "Engineering Framing",
            SectionKey::ValidationThinking => "Validation Thinking",
        }
    }
}

impl std::fmt::Display for SectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = UnknownVariant;

    /// Accepts snake_case, camelCase and headings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "problemstatement" | "problem" => Ok(SectionKey::ProblemStatement),
            "rootcause" => Ok(SectionKey::RootCause),
            "userperspective" | "user" => Ok(SectionKey::UserPerspective),
            "engineeringframing" | "engineering" => Ok(SectionKey::EngineeringFraming),
            "validationthinking" | "validation" => Ok(SectionKey::ValidationThinking),
            _ => Err(UnknownVariant::new("section", s)),
        }
    }
}

/// Issue and review comment severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suggestion
    Info,
    /// Should be addressed
    #[default]
    Warning,
    /// Blocks a meaningful review
    Critical,
}

impl Severity {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UnknownVariant;

    /// Accepts the low/medium/high scale used by older reviews
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" | "low" | "minor" | "suggestion" => Ok(Severity::Info),
            "warning" | "warn" | "medium" | "major" => Ok(Severity::Warning),
            "critical" | "error" | "high" | "blocker" => Ok(Severity::Critical),
            _ => Err(UnknownVariant::new("severity", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn frame_id_generation() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let id = FrameId::generate_at(now);
        assert!(id.as_str().starts_with("f-2024-03-09-"));
        assert_eq!(id.as_str().len(), "f-2024-03-09-".len() + ID_SUFFIX_LEN);
        assert!(id.is_canonical());
        assert_ne!(FrameId::generate(), FrameId::generate());
    }

    #[test]
    fn frame_id_canonical_shape() {
        assert!(FrameId::new("f-2024-01-01-abc123").is_canonical());
        assert!(!FrameId::new("frame-1").is_canonical());
        assert!(!FrameId::new("f-24-01-01-abc").is_canonical());
        assert!(!FrameId::new("f-2024-01-01-").is_canonical());
    }

    #[test]
    fn status_ordering() {
        assert!(FrameStatus::Draft < FrameStatus::InReview);
        assert!(FrameStatus::Feedback < FrameStatus::Archived);
        assert_eq!(FrameStatus::Ready.next(), Some(FrameStatus::Feedback));
        assert_eq!(FrameStatus::Archived.next(), None);
        assert!(FrameStatus::Archived.is_terminal());
    }

    #[test]
    fn status_parse() {
        assert_eq!("in_review".parse::<FrameStatus>(), Ok(FrameStatus::InReview));
        assert_eq!("In-Review".parse::<FrameStatus>(), Ok(FrameStatus::InReview));
        assert!("done".parse::<FrameStatus>().is_err());
    }

    #[test]
    fn frame_type_root_cause() {
        assert!(FrameType::Bug.has_root_cause());
        assert!(!FrameType::Feature.has_root_cause());
        assert_eq!("Exploration".parse::<FrameType>(), Ok(FrameType::Exploration));
    }

    #[test]
    fn section_key_parse_variants() {
        assert_eq!("userPerspective".parse::<SectionKey>(), Ok(SectionKey::UserPerspective));
        assert_eq!("user_perspective".parse::<SectionKey>(), Ok(SectionKey::UserPerspective));
        assert_eq!("Root Cause".parse::<SectionKey>(), Ok(SectionKey::RootCause));
        assert!("appendix".parse::<SectionKey>().is_err());
    }

    #[test]
    fn severity_parse_legacy_scale() {
        assert_eq!("high".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!("medium".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("low".parse::<Severity>(), Ok(Severity::Info));
    }
}
