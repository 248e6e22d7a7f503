//! Model → wire
//!
//! Emits the canonical shape: structured sections as JSON-object strings
//! with snake_case keys, RFC 3339 timestamps, issues as objects. Decoding
//! the output reproduces the input frame exactly.

use crate::sections::{encode_section, WireSection};
use crate::wire::{
    CommentResponse, CreateCommentRequest, CreateFrameRequest, FrameResponse, UpdateFrameRequest,
    UpdateStatusRequest, WireContent, WireMeta,
};
use chrono::{DateTime, SecondsFormat, Utc};
use framer_core::{
    AiEvaluation, Comment, Frame, FrameContent, FrameFeedback, FrameStatus, FrameType, Language,
    Localized, SectionKey,
};
use serde_json::{json, Map, Value};

/// RFC 3339 with as many fractional digits as needed
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn put_flat_variants(variants: &mut Map<String, Value>, key: SectionKey, value: &Localized<String>) {
    for lang in [Language::En, Language::Zh] {
        if let Some(v) = value.variant(lang) {
            variants.insert(format!("{key}_{lang}"), Value::String(v.clone()));
        }
    }
}

fn put_section_variants<T: WireSection + PartialEq>(
    variants: &mut Map<String, Value>,
    value: &Localized<T>,
) {
    for lang in [Language::En, Language::Zh] {
        if let Some(v) = value.variant(lang) {
            variants.insert(format!("{}_{lang}", T::KEY), Value::String(encode_section(v)));
        }
    }
}

/// Encode content; the root cause is emitted only for bug frames
#[must_use]
pub fn encode_content(content: &FrameContent, frame_type: FrameType) -> WireContent {
    let mut variants = Map::new();
    put_flat_variants(&mut variants, SectionKey::ProblemStatement, &content.problem_statement);
    let root_cause = if frame_type.has_root_cause() {
        put_flat_variants(&mut variants, SectionKey::RootCause, &content.root_cause);
        Value::String(content.root_cause.neutral.clone())
    } else {
        Value::Null
    };
    put_section_variants(&mut variants, &content.user_perspective);
    put_section_variants(&mut variants, &content.engineering_framing);
    put_section_variants(&mut variants, &content.validation_thinking);

    WireContent {
        problem_statement: Value::String(content.problem_statement.neutral.clone()),
        root_cause,
        user_perspective: Value::String(encode_section(&content.user_perspective.neutral)),
        engineering_framing: Value::String(encode_section(&content.engineering_framing.neutral)),
        validation_thinking: Value::String(encode_section(&content.validation_thinking.neutral)),
        variants,
    }
}

fn encode_evaluation(meta: &mut WireMeta, ai: &AiEvaluation) {
    meta.ai_score = Some(Value::from(ai.score));
    meta.ai_breakdown = ai.breakdown.as_ref().map(|b| {
        b.iter()
            .map(|(name, score)| (name.to_string(), Value::from(score)))
            .collect()
    });
    meta.ai_issues = Some(
        ai.issues
            .iter()
            .map(|issue| {
                let mut obj = Map::new();
                if let Some(section) = issue.section {
                    obj.insert("section".into(), Value::String(section.as_str().into()));
                }
                obj.insert("severity".into(), Value::String(issue.severity.as_str().into()));
                obj.insert("message".into(), Value::String(issue.message.clone()));
                Value::Object(obj)
            })
            .collect(),
    );
    meta.ai_summary.clone_from(&ai.summary);
    meta.ai_feedback.clone_from(&ai.feedback);
    meta.ai_evaluated_at = Some(format_timestamp(ai.evaluated_at));
}

fn encode_feedback(feedback: &FrameFeedback) -> Value {
    json!({
        "outcome": feedback.outcome.as_str(),
        "summary": feedback.summary,
        "lessons_learned": feedback.lessons_learned,
        "assumption_results": feedback.assumption_results.iter().map(|a| json!({
            "assumption": a.assumption,
            "validated": a.validated,
            "notes": a.notes,
        })).collect::<Vec<_>>(),
        "completed_at": format_timestamp(feedback.completed_at),
    })
}

/// Encode a comment in the backend's response shape
#[must_use]
pub fn encode_comment(comment: &Comment) -> CommentResponse {
    CommentResponse {
        id: comment.id.clone(),
        section: comment.section.clone(),
        author: comment.author_id.clone(),
        content: comment.content.clone(),
        created_at: Some(format_timestamp(comment.created_at)),
    }
}

/// Encode a whole frame
#[must_use]
pub fn encode_frame(frame: &Frame) -> FrameResponse {
    let mut meta = WireMeta {
        created_at: Some(format_timestamp(frame.created_at)),
        updated_at: Some(format_timestamp(frame.updated_at)),
        reviewer: frame.reviewer_id.clone(),
        approver: frame.approver_id.clone(),
        project_id: frame.project_id.clone(),
        review_summary: frame.review_summary.clone(),
        review_recommendation: frame.review_recommendation.clone(),
        ..WireMeta::default()
    };
    if let Some(ai) = &frame.ai {
        encode_evaluation(&mut meta, ai);
    }
    if !frame.review_comments.is_empty() {
        meta.review_comments = Some(
            frame
                .review_comments
                .iter()
                .map(|c| json!({"section": c.section, "severity": c.severity.as_str(), "content": c.content}))
                .collect(),
        );
    }
    meta.feedback = frame.feedback.as_ref().map(encode_feedback);
    if !frame.comments.is_empty() {
        meta.comments = Some(
            frame
                .comments
                .iter()
                .map(|c| serde_json::to_value(encode_comment(c)).unwrap_or(Value::Null))
                .collect(),
        );
    }

    FrameResponse {
        id: frame.id.to_string(),
        frame_type: frame.frame_type.as_str().to_string(),
        status: frame.status.as_str().to_string(),
        owner: frame.owner_id.clone(),
        content: encode_content(&frame.content, frame.frame_type),
        meta,
    }
}

/// Encode a frame as a JSON body
///
/// # Errors
///
/// Only if serialization itself fails.
pub fn encode_frame_json(frame: &Frame) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&encode_frame(frame))
}

/// Body for `POST /api/frames`
#[must_use]
pub fn create_request(frame: &Frame) -> CreateFrameRequest {
    let content = encode_content(&frame.content, frame.frame_type);
    CreateFrameRequest {
        frame_type: frame.frame_type.as_str().to_string(),
        owner: frame.owner_id.clone(),
        content: (!is_empty_content(&frame.content)).then_some(content),
    }
}

fn is_empty_content(content: &FrameContent) -> bool {
    *content == FrameContent::default()
}

/// Body for `PUT /api/frames/{id}`
#[must_use]
pub fn update_request(frame: &Frame) -> UpdateFrameRequest {
    UpdateFrameRequest {
        content: encode_content(&frame.content, frame.frame_type),
    }
}

/// Body for `PATCH /api/frames/{id}/status`
#[must_use]
pub fn status_request(status: FrameStatus) -> UpdateStatusRequest {
    UpdateStatusRequest {
        status: status.as_str().to_string(),
    }
}

/// Body for `POST /api/frames/{id}/comments`
#[must_use]
pub fn comment_request(comment: &Comment) -> CreateCommentRequest {
    CreateCommentRequest {
        section: comment.section.clone(),
        author: comment.author_id.clone(),
        content: comment.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use framer_core::{FrameId, StructuredSection, UserPerspective};

    fn frame(frame_type: FrameType) -> Frame {
        let t = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        Frame::draft(FrameId::new("f-2024-10-01-abcdef"), frame_type, "alice", t)
    }

    #[test]
    fn empty_sections_encode_as_empty_strings() {
        let wire = encode_frame(&frame(FrameType::Bug));
        assert_eq!(wire.content.user_perspective, Value::String(String::new()));
        assert_eq!(wire.content.root_cause, Value::String(String::new()));
        assert!(wire.content.variants.is_empty());
        assert!(wire.meta.ai_score.is_none());
    }

    #[test]
    fn root_cause_omitted_for_non_bug() {
        let mut f = frame(FrameType::Feature);
        f.content.root_cause.neutral = "stale".into();
        let wire = encode_frame(&f);
        assert!(wire.content.root_cause.is_null());
        let body = serde_json::to_value(&wire).unwrap();
        assert!(body["content"].get("root_cause").is_none());
    }

    #[test]
    fn structured_sections_are_json_strings() {
        let mut f = frame(FrameType::Feature);
        f.content.user_perspective.neutral = UserPerspective::from_text("ad-hoc note");
        f.content
            .user_perspective
            .edit(Some(Language::Zh), UserPerspective::from_text("备注"));
        let wire = encode_frame(&f);
        let raw = wire.content.user_perspective.as_str().unwrap();
        let parsed: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed["context"], "ad-hoc note");
        assert!(wire.content.variants.contains_key("user_perspective_zh"));
    }

    #[test]
    fn timestamps_keep_subseconds() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_000_000).unwrap();
        assert_eq!(format_timestamp(at), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn create_request_skips_empty_content() {
        let req = create_request(&frame(FrameType::Exploration));
        assert_eq!(req.frame_type, "exploration");
        assert!(req.content.is_none());
    }
}
