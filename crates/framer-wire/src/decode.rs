//! Wire → model
//!
//! Tolerant everywhere except the fields that identify a frame: an empty id,
//! an unknown type or status, or a malformed timestamp is a
//! [`TransformError`]. Content never fails to decode.

use crate::error::{Result, TransformError};
use crate::sections::{decode_flat, decode_section, list_value, value_text, WireSection};
use crate::wire::{CommentResponse, EvaluationResponse, FrameListItem, FrameResponse, WireContent, WireMeta};
use chrono::{DateTime, NaiveDateTime, Utc};
use framer_core::{
    AiEvaluation, AiIssue, AssumptionResult, Comment, FeedbackInput, Frame, FrameContent,
    FrameFeedback, FrameId, FrameStatus, FrameType, Language, Localized, Outcome, ReviewComment,
    ScoreBreakdown, SectionKey, Severity,
};
use serde_json::{Map, Value};

/// Parse an ISO 8601 timestamp; naive timestamps are taken as UTC
///
/// # Errors
///
/// [`TransformError::Timestamp`] if the text is not a timestamp.
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(TransformError::timestamp(field, raw))
}

fn timestamp_or(field: &'static str, raw: Option<&str>, default: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_timestamp(field, s),
        None => Ok(default),
    }
}

/// Lenient timestamp for nested records: malformed or absent → `default`
fn lenient_timestamp(raw: Option<&str>, default: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(|s| parse_timestamp("nested", s).ok())
        .unwrap_or(default)
}

fn frame_type(raw: &str) -> Result<FrameType> {
    raw.parse().map_err(TransformError::InvalidType)
}

fn frame_status(raw: &str) -> Result<FrameStatus> {
    raw.parse().map_err(TransformError::InvalidStatus)
}

fn localized_flat(content: &WireContent, key: SectionKey, neutral: &Value) -> Localized<String> {
    Localized {
        neutral: decode_flat(neutral),
        en: content.variant(key.as_str(), Language::En.code()).map(decode_flat),
        zh: content.variant(key.as_str(), Language::Zh.code()).map(decode_flat),
    }
}

fn localized_section<T: WireSection>(content: &WireContent, neutral: &Value) -> Localized<T> {
    let key = T::KEY.as_str();
    Localized {
        neutral: decode_section(neutral),
        en: content.variant(key, Language::En.code()).map(decode_section),
        zh: content.variant(key, Language::Zh.code()).map(decode_section),
    }
}

/// Decode content sections; the root cause is kept only for bug frames
#[must_use]
pub fn decode_content(content: &WireContent, frame_type: FrameType) -> FrameContent {
    let root_cause = if frame_type.has_root_cause() {
        localized_flat(content, SectionKey::RootCause, &content.root_cause)
    } else {
        Localized::default()
    };
    FrameContent {
        problem_statement: localized_flat(
            content,
            SectionKey::ProblemStatement,
            &content.problem_statement,
        ),
        root_cause,
        user_perspective: localized_section(content, &content.user_perspective),
        engineering_framing: localized_section(content, &content.engineering_framing),
        validation_thinking: localized_section(content, &content.validation_thinking),
    }
}

/// Parse a score from a number or numeric string; anything else is absent
fn score_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64),
        _ => None,
    }
}

fn breakdown(map: &Map<String, Value>) -> ScoreBreakdown {
    map.iter()
        .filter_map(|(name, value)| score_value(value).map(|v| (name.clone(), v)))
        .collect()
}

fn section_key(value: Option<&Value>) -> Option<SectionKey> {
    value.and_then(Value::as_str).and_then(|s| s.parse().ok())
}

fn severity(value: Option<&Value>) -> Severity {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Issue from a plain string or a `{section, severity, message}` object
fn issue(value: &Value) -> Option<AiIssue> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(AiIssue::new(
            section_key(map.get("section")),
            severity(map.get("severity")),
            ["message", "description", "text", "issue"]
                .iter()
                .find_map(|k| map.get(*k))
                .map(value_text)
                .unwrap_or_default(),
        )),
        other => Some(AiIssue::general(value_text(other))),
    }
}

fn evaluation(
    score: i64,
    breakdown_map: Option<&Map<String, Value>>,
    issues: &[Value],
    summary: Option<String>,
    feedback: Option<String>,
    evaluated_at: DateTime<Utc>,
) -> AiEvaluation {
    AiEvaluation {
        score: u8::try_from(score.clamp(0, 100)).unwrap_or(0),
        breakdown: breakdown_map.map(breakdown),
        issues: issues.iter().filter_map(issue).collect(),
        summary,
        feedback,
        evaluated_at,
    }
    .normalized()
}

impl EvaluationResponse {
    /// Convert to an evaluation stamped at `now`
    ///
    /// A missing or non-numeric score is treated as 0: the call succeeded,
    /// so the frame counts as evaluated.
    #[must_use]
    pub fn into_evaluation(self, now: DateTime<Utc>) -> AiEvaluation {
        let score = score_value(&self.score).unwrap_or(0);
        evaluation(
            score,
            Some(&self.breakdown),
            &self.issues,
            self.summary,
            self.feedback,
            now,
        )
    }
}

fn review_comment(value: &Value) -> Option<ReviewComment> {
    let map = value.as_object()?;
    Some(ReviewComment {
        section: map.get("section").map(value_text).unwrap_or_default(),
        severity: severity(map.get("severity")),
        content: ["content", "comment", "message"]
            .iter()
            .find_map(|k| map.get(*k))
            .map(value_text)
            .unwrap_or_default(),
    })
}

fn comment_from_map(map: &Map<String, Value>, default_time: DateTime<Utc>) -> Option<Comment> {
    let id = map.get("id").map(value_text).filter(|s| !s.is_empty())?;
    Some(Comment {
        id,
        section: map.get("section").map(value_text).unwrap_or_default(),
        author_id: map
            .get("author")
            .or_else(|| map.get("author_id"))
            .map(value_text)
            .unwrap_or_default(),
        content: map.get("content").map(value_text).unwrap_or_default(),
        created_at: lenient_timestamp(map.get("created_at").and_then(Value::as_str), default_time),
    })
}

/// Decode a comment
///
/// # Errors
///
/// [`TransformError::Timestamp`] on a malformed `created_at`.
pub fn decode_comment(resp: &CommentResponse, now: DateTime<Utc>) -> Result<Comment> {
    Ok(Comment {
        id: resp.id.clone(),
        section: resp.section.clone(),
        author_id: resp.author.clone(),
        content: resp.content.clone(),
        created_at: timestamp_or("created_at", resp.created_at.as_deref(), now)?,
    })
}

fn assumption(value: &Value) -> Option<AssumptionResult> {
    match value {
        Value::Object(map) => Some(AssumptionResult {
            assumption: map.get("assumption").map(value_text).unwrap_or_default(),
            validated: map.get("validated").and_then(Value::as_bool).unwrap_or(false),
            notes: map.get("notes").map(value_text).unwrap_or_default(),
        }),
        Value::Null => None,
        other => Some(AssumptionResult {
            assumption: value_text(other),
            ..AssumptionResult::default()
        }),
    }
}

/// Feedback for an archived frame; a missing payload yields an empty one
/// completed at `default_time` so the archived invariant holds
fn feedback(value: Option<&Value>, default_time: DateTime<Utc>) -> FrameFeedback {
    let Some(Value::Object(map)) = value else {
        return FeedbackInput::default().complete(default_time);
    };
    FrameFeedback {
        outcome: map
            .get("outcome")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(Outcome::Success),
        summary: map.get("summary").map(value_text).unwrap_or_default(),
        lessons_learned: map
            .get("lessons_learned")
            .or_else(|| map.get("lessonsLearned"))
            .map(list_value)
            .unwrap_or_default(),
        assumption_results: map
            .get("assumption_results")
            .or_else(|| map.get("assumptionResults"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(assumption).collect())
            .unwrap_or_default(),
        completed_at: lenient_timestamp(
            map.get("completed_at")
                .or_else(|| map.get("completedAt"))
                .and_then(Value::as_str),
            default_time,
        ),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).cloned()
}

fn decode_meta(frame: &mut Frame, meta: &WireMeta) {
    frame.reviewer_id = non_empty(meta.reviewer.as_ref());
    frame.approver_id = non_empty(meta.approver.as_ref());
    frame.project_id = non_empty(meta.project_id.as_ref());
    let evaluated_at = lenient_timestamp(meta.ai_evaluated_at.as_deref(), frame.updated_at);
    frame.ai = meta.ai_score.as_ref().and_then(score_value).map(|score| {
        evaluation(
            score,
            meta.ai_breakdown.as_ref(),
            meta.ai_issues.as_deref().unwrap_or_default(),
            meta.ai_summary.clone(),
            meta.ai_feedback.clone(),
            evaluated_at,
        )
    });
    frame.review_summary = meta.review_summary.clone();
    frame.review_recommendation = meta.review_recommendation.clone();
    frame.review_comments = meta
        .review_comments
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(review_comment)
        .collect();
    frame.feedback = (frame.status == FrameStatus::Archived)
        .then(|| feedback(meta.feedback.as_ref(), frame.updated_at));
    frame.comments = meta
        .comments
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|map| comment_from_map(map, frame.updated_at))
        .collect();
}

/// Decode a frame, defaulting absent timestamps to `now`
///
/// # Errors
///
/// - [`TransformError::EmptyId`] if `id` is blank
/// - [`TransformError::InvalidType`] / [`TransformError::InvalidStatus`]
/// - [`TransformError::Timestamp`] if `created_at` / `updated_at` are malformed
pub fn decode_frame_at(resp: &FrameResponse, now: DateTime<Utc>) -> Result<Frame> {
    let id = resp.id.trim();
    if id.is_empty() {
        return Err(TransformError::EmptyId);
    }
    let frame_type = frame_type(&resp.frame_type)?;
    let status = frame_status(&resp.status)?;
    let created_at = timestamp_or("meta.created_at", resp.meta.created_at.as_deref(), now)?;
    let updated_at = timestamp_or("meta.updated_at", resp.meta.updated_at.as_deref(), created_at)?
        .max(created_at);

    let mut frame = Frame::draft(FrameId::new(id), frame_type, resp.owner.clone(), created_at);
    frame.status = status;
    frame.updated_at = updated_at;
    frame.content = decode_content(&resp.content, frame_type);
    decode_meta(&mut frame, &resp.meta);
    Ok(frame)
}

/// Decode a frame, defaulting absent timestamps to the current time
///
/// # Errors
///
/// See [`decode_frame_at`].
pub fn decode_frame(resp: &FrameResponse) -> Result<Frame> {
    decode_frame_at(resp, Utc::now())
}

/// Decode a frame from a JSON body
///
/// # Errors
///
/// [`TransformError::Json`] if the body is not a frame object, otherwise see
/// [`decode_frame_at`].
pub fn decode_frame_json(body: &str) -> Result<Frame> {
    let resp: FrameResponse = serde_json::from_str(body)?;
    decode_frame(&resp)
}

/// Id, type and status of a list row
///
/// # Errors
///
/// As for [`decode_frame_at`].
pub fn decode_list_item(item: &FrameListItem) -> Result<(FrameId, FrameType, FrameStatus)> {
    if item.id.trim().is_empty() {
        return Err(TransformError::EmptyId);
    }
    Ok((
        FrameId::new(item.id.trim()),
        frame_type(&item.frame_type)?,
        frame_status(&item.status)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn response(value: Value) -> FrameResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_minimal_frame() {
        let frame = decode_frame_at(
            &response(json!({"id": "f-2024-09-01-abc123", "type": "feature", "status": "draft", "owner": "alice"})),
            now(),
        )
        .unwrap();
        assert_eq!(frame.status, FrameStatus::Draft);
        assert_eq!(frame.created_at, now());
        assert_eq!(frame.updated_at, now());
        assert!(frame.ai.is_none());
        assert!(frame.content.problem_statement.neutral.is_empty());
    }

    #[test]
    fn zero_score_is_present() {
        let frame = decode_frame_at(
            &response(json!({"id": "f-1", "type": "bug", "status": "in_review", "meta": {"ai_score": 0}})),
            now(),
        )
        .unwrap();
        assert_eq!(frame.ai_score(), Some(0));
    }

    #[test]
    fn string_issues_become_general_warnings() {
        let frame = decode_frame_at(
            &response(json!({
                "id": "f-1", "type": "bug", "status": "in_review",
                "meta": {
                    "ai_score": 72,
                    "ai_breakdown": {"problem_statement": 20, "user_perspective": "18"},
                    "ai_issues": ["Vague success criteria", {"section": "userPerspective", "severity": "high", "message": "No persona"}]
                }
            })),
            now(),
        )
        .unwrap();
        let ai = frame.ai.unwrap();
        assert_eq!(ai.score, 38);
        assert_eq!(ai.issues[0], AiIssue::general("Vague success criteria"));
        assert_eq!(ai.issues[1].section, Some(SectionKey::UserPerspective));
        assert_eq!(ai.issues[1].severity, Severity::Critical);
        assert_eq!(ai.evaluated_at, now());
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let frame = decode_frame_at(
            &response(json!({
                "id": "f-1", "type": "bug", "status": "draft",
                "meta": {"created_at": "2024-01-02T03:04:05.123456", "updated_at": "2024-01-02T03:04:06Z"}
            })),
            now(),
        )
        .unwrap();
        assert_eq!(frame.created_at.to_rfc3339(), "2024-01-02T03:04:05.123456+00:00");
    }

    #[test]
    fn malformed_timestamp_is_error() {
        let err = decode_frame_at(
            &response(json!({"id": "f-1", "type": "bug", "status": "draft", "meta": {"created_at": "last tuesday"}})),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, TransformError::Timestamp { field: "meta.created_at", .. }));
    }

    #[test]
    fn unknown_status_and_empty_id() {
        let err = decode_frame_at(&response(json!({"id": "f-1", "type": "bug", "status": "done"})), now())
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidStatus(_)));
        let err = decode_frame_at(&response(json!({"id": " ", "type": "bug", "status": "draft"})), now())
            .unwrap_err();
        assert!(matches!(err, TransformError::EmptyId));
    }

    #[test]
    fn root_cause_dropped_for_non_bug() {
        let frame = decode_frame_at(
            &response(json!({"id": "f-1", "type": "feature", "status": "draft", "content": {"root_cause": "x"}})),
            now(),
        )
        .unwrap();
        assert!(frame.content.root_cause.is_empty());
    }

    #[test]
    fn archived_without_feedback_gets_empty_feedback() {
        let frame = decode_frame_at(
            &response(json!({"id": "f-1", "type": "bug", "status": "archived"})),
            now(),
        )
        .unwrap();
        assert_eq!(frame.feedback.unwrap().completed_at, now());

        let frame = decode_frame_at(
            &response(json!({"id": "f-1", "type": "bug", "status": "ready", "meta": {"feedback": {"summary": "x"}}})),
            now(),
        )
        .unwrap();
        assert!(frame.feedback.is_none());
    }

    #[test]
    fn language_variants() {
        let frame = decode_frame_at(
            &response(json!({
                "id": "f-1", "type": "feature", "status": "draft",
                "content": {
                    "problem_statement": "neutral",
                    "problem_statement_zh": "中文",
                    "user_perspective_en": {"persona": "Admin"}
                }
            })),
            now(),
        )
        .unwrap();
        assert_eq!(frame.content.problem_statement.pick(Language::Zh), "中文");
        assert_eq!(frame.content.problem_statement.pick(Language::En), "中文");
        assert_eq!(
            frame.content.user_perspective.en.as_ref().map(|u| u.persona.as_str()),
            Some("Admin")
        );
    }

    #[test]
    fn evaluation_response_conversion() {
        let resp: EvaluationResponse = serde_json::from_value(json!({
            "score": 90,
            "breakdown": {"problem_statement": 25, "user_perspective": 20},
            "feedback": "Solid",
            "issues": ["Add rollback plan"]
        }))
        .unwrap();
        let eval = resp.into_evaluation(now());
        assert_eq!(eval.score, 45);
        assert_eq!(eval.feedback.as_deref(), Some("Solid"));
        assert_eq!(eval.issues.len(), 1);

        let eval = EvaluationResponse::default().into_evaluation(now());
        assert_eq!(eval.score, 0);
    }

    #[test]
    fn comments_decode() {
        let comment = decode_comment(
            &CommentResponse {
                id: "c-001".into(),
                section: "problem_statement".into(),
                author: "bob".into(),
                content: "Clarify".into(),
                created_at: Some("2024-01-01T00:00:00Z".into()),
            },
            now(),
        )
        .unwrap();
        assert_eq!(comment.author_id, "bob");
        assert_eq!(comment.created_at.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
