//! Backend payload shapes
//!
//! Field names are the backend's snake_case. Anything whose shape varies
//! between backend versions is kept as a [`serde_json::Value`] and
//! interpreted by [`crate::decode`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Full frame as returned by `GET /api/frames/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResponse {
    /// Frame id
    #[serde(default)]
    pub id: String,
    /// Frame type
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Lifecycle status
    pub status: String,
    /// Owner user id
    #[serde(default)]
    pub owner: String,
    /// Content sections
    #[serde(default)]
    pub content: WireContent,
    /// Metadata
    #[serde(default)]
    pub meta: WireMeta,
}

/// Content sections; each may be a string, a JSON-encoded string or an object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireContent {
    /// Problem statement
    #[serde(default, alias = "problemStatement")]
    pub problem_statement: Value,
    /// Root cause (bug frames)
    #[serde(default, alias = "rootCause", skip_serializing_if = "Value::is_null")]
    pub root_cause: Value,
    /// User perspective
    #[serde(default, alias = "userPerspective")]
    pub user_perspective: Value,
    /// Engineering framing
    #[serde(default, alias = "engineeringFraming")]
    pub engineering_framing: Value,
    /// Validation thinking
    #[serde(default, alias = "validationThinking")]
    pub validation_thinking: Value,
    /// Language variants, keyed `<section>_en` / `<section>_zh`
    #[serde(flatten)]
    pub variants: Map<String, Value>,
}

impl WireContent {
    /// Variant for a section, if present and not null
    #[must_use]
    pub fn variant(&self, section: &str, lang: &str) -> Option<&Value> {
        self.variants
            .get(&format!("{section}_{lang}"))
            .filter(|v| !v.is_null())
    }
}

/// Frame metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMeta {
    /// Creation time (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last update time (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Overall AI score; absent until evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<Value>,
    /// Reviewer user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    /// Approver user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    /// Project id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Per-criterion sub-scores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_breakdown: Option<Map<String, Value>>,
    /// Evaluation feedback text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
    /// Evaluation summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    /// Issues: plain strings or `{section, severity, message}` objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_issues: Option<Vec<Value>>,
    /// Evaluation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_evaluated_at: Option<String>,
    /// Review summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_summary: Option<String>,
    /// Review comments: `{section, severity, content}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_comments: Option<Vec<Value>>,
    /// Review recommendation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_recommendation: Option<String>,
    /// Retrospective
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Value>,
    /// Discussion comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Value>>,
}

/// Summary row from `GET /api/frames`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameListItem {
    /// Frame id
    pub id: String,
    /// Frame type
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Status
    pub status: String,
    /// Owner
    #[serde(default)]
    pub owner: String,
    /// Last update
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Query filters for `GET /api/frames`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFilters {
    /// Only this status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Only this owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl FrameFilters {
    /// Filter by status
    #[must_use]
    pub fn with_status(mut self, status: framer_core::FrameStatus) -> Self {
        self.status = Some(status.as_str().to_string());
        self
    }

    /// Filter by owner
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// `POST /api/frames`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFrameRequest {
    /// Frame type
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Owner user id
    pub owner: String,
    /// Initial content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<WireContent>,
}

/// `PUT /api/frames/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateFrameRequest {
    /// Replacement content
    pub content: WireContent,
}

/// `PATCH /api/frames/{id}/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    /// New status
    pub status: String,
}

/// `POST /api/frames/{id}/comments`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCommentRequest {
    /// Section name
    pub section: String,
    /// Author user id
    pub author: String,
    /// Body
    pub content: String,
}

/// Comment as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentResponse {
    /// Comment id
    pub id: String,
    /// Section name
    #[serde(default)]
    pub section: String,
    /// Author user id
    #[serde(default)]
    pub author: String,
    /// Body
    #[serde(default)]
    pub content: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `POST /api/frames/{id}/ai/evaluate` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Overall score
    #[serde(default)]
    pub score: Value,
    /// Sub-scores
    #[serde(default)]
    pub breakdown: Map<String, Value>,
    /// Feedback text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Issues: plain strings or objects
    #[serde(default)]
    pub issues: Vec<Value>,
    /// Summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// One question/answer pair fed to content generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateAnswer {
    /// Prompting question
    #[serde(default)]
    pub question: String,
    /// User's answer
    pub answer: String,
}

impl GenerateAnswer {
    /// Create new answer
    #[must_use]
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// `POST /api/frames/{id}/ai/generate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Section to generate
    pub section: String,
    /// Answers to guiding questions
    pub answers: Vec<GenerateAnswer>,
}

/// Generated section content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Markdown
    pub content: String,
    /// Follow-up suggestions
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// `POST /api/ai/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User message
    pub message: String,
    /// Optional context (e.g. the current frame)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// Chat reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant message
    #[serde(alias = "response")]
    pub message: String,
    /// Optional suggested edit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// `POST /api/knowledge/distill`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistillRequest {
    /// Source frame
    pub frame_id: String,
    /// Feedback text
    pub feedback: String,
}

/// Kind of distilled knowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeCategory {
    /// Reusable pattern
    Pattern,
    /// Recorded decision
    Decision,
    /// Prediction to check later
    Prediction,
    /// Background context
    Context,
    /// Lesson learned
    #[default]
    #[serde(other)]
    Lesson,
}

/// Origin of a knowledge entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeSource {
    /// Entered by hand
    Manual,
    /// Distilled from a conversation
    Conversation,
    /// Imported
    Import,
    /// Distilled from frame feedback
    #[default]
    #[serde(other)]
    Feedback,
}

/// Knowledge produced by distillation (read-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Entry id (`k-YYYY-MM-DD-xxxxxx`)
    pub id: String,
    /// Title
    pub title: String,
    /// Body
    #[serde(default)]
    pub content: String,
    /// Category
    #[serde(default)]
    pub category: KnowledgeCategory,
    /// Origin
    #[serde(default)]
    pub source: KnowledgeSource,
    /// Origin id (frame or conversation)
    #[serde(default)]
    pub source_id: Option<String>,
    /// Owning team
    #[serde(default)]
    pub team_id: Option<String>,
    /// Author
    #[serde(default)]
    pub author: String,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<String>,
    /// Update time
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// User record from `GET /api/users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: String,
    /// Email
    #[serde(default)]
    pub email: String,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Role
    #[serde(default)]
    pub role: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    /// Name for display; falls back to email, then id
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(self.email.as_str()).filter(|e| !e.is_empty()))
            .unwrap_or(&self.id)
    }
}

/// Entry from `GET /api/templates`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateListItem {
    /// Template name (also its route segment)
    pub name: String,
    /// Frame type it serves
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Description
    #[serde(default)]
    pub description: String,
}

/// Section outline of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSection {
    /// Section title
    pub name: String,
    /// Guidance text
    #[serde(default)]
    pub description: String,
    /// Must be filled before review
    #[serde(default)]
    pub required: bool,
}

/// Guided question feeding [`GenerateRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateQuestion {
    /// Question id (`q1`, `q2`, ...)
    pub id: String,
    /// Target section key
    #[serde(default)]
    pub section: String,
    /// Question text
    pub text: String,
    /// Hint
    #[serde(default)]
    pub hint: Option<String>,
}

/// Questionnaire attached to a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questionnaire {
    /// Title
    #[serde(default)]
    pub title: String,
    /// Questions in order
    #[serde(default)]
    pub questions: Vec<TemplateQuestion>,
}

/// Full template from `GET /api/templates/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateResponse {
    /// Template name
    pub name: String,
    /// Frame type it serves
    #[serde(rename = "type")]
    pub frame_type: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Section outline
    #[serde(default)]
    pub sections: Vec<TemplateSection>,
    /// Guided questions, if any
    #[serde(default)]
    pub questionnaire: Option<Questionnaire>,
    /// Prompt names
    #[serde(default)]
    pub prompts: Vec<String>,
}

impl TemplateResponse {
    /// Questions targeting `section` (a [`framer_core::SectionKey`] string)
    #[must_use]
    pub fn questions_for(&self, section: &str) -> Vec<&TemplateQuestion> {
        self.questionnaire
            .iter()
            .flat_map(|q| &q.questions)
            .filter(|q| q.section == section)
            .collect()
    }
}

/// Error body returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Detail; usually a string, sometimes validation objects
    pub detail: Value,
}

impl ErrorBody {
    /// Detail as text
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frame_response_accepts_minimal_payload() {
        let resp: FrameResponse = serde_json::from_value(json!({
            "id": "f-2024-01-01-abc123",
            "type": "bug",
            "status": "draft"
        }))
        .unwrap();
        assert!(resp.content.problem_statement.is_null());
        assert!(resp.meta.ai_score.is_none());
    }

    #[test]
    fn content_collects_variants() {
        let content: WireContent = serde_json::from_value(json!({
            "problem_statement": "base",
            "problem_statement_zh": "中文",
            "problem_statement_en": null
        }))
        .unwrap();
        assert_eq!(content.variant("problem_statement", "zh"), Some(&json!("中文")));
        assert_eq!(content.variant("problem_statement", "en"), None);
    }

    #[test]
    fn chat_reply_accepts_response_key() {
        let reply: ChatReply = serde_json::from_value(json!({"response": "hello"})).unwrap();
        assert_eq!(reply.message, "hello");
        assert!(reply.suggestion.is_none());
    }

    #[test]
    fn knowledge_unknown_category_is_lesson() {
        let entry: KnowledgeEntry = serde_json::from_value(json!({
            "id": "k-2024-01-01-000001",
            "title": "Cache invalidation",
            "category": "folklore",
            "source": "feedback",
            "author": "ai"
        }))
        .unwrap();
        assert_eq!(entry.category, KnowledgeCategory::Lesson);
        assert_eq!(entry.source, KnowledgeSource::Feedback);
    }

    #[test]
    fn user_display_name_fallback() {
        let user = User {
            id: "u1".into(),
            email: "a@example.com".into(),
            name: Some(" ".into()),
            role: None,
            avatar: None,
        };
        assert_eq!(user.display_name(), "a@example.com");
    }

    #[test]
    fn template_questions_by_section() {
        let template: TemplateResponse = serde_json::from_value(json!({
            "name": "bug-report",
            "type": "bug",
            "description": "Bug frame",
            "sections": [{ "name": "Problem Statement", "description": "", "required": true }],
            "questionnaire": {
                "title": "Bug questions",
                "questions": [
                    { "id": "q1", "section": "problem_statement", "text": "What broke?", "hint": null },
                    { "id": "q2", "section": "user_perspective", "text": "Who noticed?" },
                    { "id": "q3", "section": "problem_statement", "text": "Since when?" }
                ]
            },
            "prompts": ["evaluate"]
        }))
        .unwrap();
        let ids: Vec<_> = template
            .questions_for("problem_statement")
            .into_iter()
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(ids, ["q1", "q3"]);
        assert!(template.sections[0].required);
    }

    #[test]
    fn template_without_questionnaire() {
        let template: TemplateResponse =
            serde_json::from_value(json!({ "name": "spike", "type": "exploration" })).unwrap();
        assert!(template.questions_for("problem_statement").is_empty());
    }

    #[test]
    fn error_body_message() {
        let body: ErrorBody = serde_json::from_value(json!({"detail": "Frame not found"})).unwrap();
        assert_eq!(body.message(), "Frame not found");
    }
}
