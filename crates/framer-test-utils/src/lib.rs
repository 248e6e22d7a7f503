//! Testing utilities for the framer workspace
//!
//! Frame fixtures, wire payload builders and a scriptable in-memory
//! [`FakeBackend`].

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use framer_core::{
    EngineeringFraming, FeedbackInput, Frame, FrameId, FrameStatus, FrameType, HeuristicEvaluator,
    Outcome, TestCase, UserPerspective, ValidationThinking,
};
use framer_sync::{BackendResult, FrameBackend, FrameStore, SyncConfig, SyncError};
use framer_wire::{
    encode_frame, format_timestamp, ChatReply, ChatRequest, CommentResponse, CreateCommentRequest,
    CreateFrameRequest, DistillRequest, EvaluationResponse, FrameFilters, FrameListItem,
    FrameResponse, GenerateRequest, GenerateResponse, KnowledgeEntry, TemplateListItem,
    TemplateResponse, UpdateFrameRequest, UpdateStatusRequest, User,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

pub fn draft(id: &str, frame_type: FrameType) -> Frame {
    Frame::draft(FrameId::new(id), frame_type, ALICE, fixed_now())
}

/// Bug frame with every section filled and three journey steps
pub fn complete_bug(id: &str) -> Frame {
    let mut frame = draft(id, FrameType::Bug);
    let content = &mut frame.content;
    content.problem_statement.neutral = "CSV export times out for large workspaces".into();
    content.root_cause.neutral = "Export query loads every row into memory".into();
    content.user_perspective.neutral = UserPerspective {
        persona: "Finance analyst".into(),
        context: "Month-end close".into(),
        journey_steps: vec!["Open reports".into(), "Click export".into(), "Wait".into()],
        pain_points: vec!["Export never finishes".into()],
    };
    content.engineering_framing.neutral = EngineeringFraming {
        approach: "Stream rows in pages".into(),
        principles: vec!["Bounded memory".into()],
        non_goals: vec!["New export formats".into()],
        risks: vec!["Slower small exports".into()],
    };
    content.validation_thinking.neutral = ValidationThinking {
        summary: "Export a 1M row workspace".into(),
        success_criteria: vec!["Finishes under 60s".into()],
        test_cases: vec![TestCase {
            scenario: "1M rows".into(),
            expected: "File downloads".into(),
            priority: "high".into(),
        }],
        rollback_plan: "Feature flag".into(),
    };
    frame
}

pub fn feedback() -> FeedbackInput {
    FeedbackInput::new(Outcome::Success, "Export streams now")
        .with_lesson("Page large queries")
        .with_assumption("Memory was the bottleneck", true)
}

pub fn frame_payload(id: &str, frame_type: &str, status: &str) -> FrameResponse {
    serde_json::from_value(json!({
        "id": id,
        "type": frame_type,
        "status": status,
        "owner": ALICE,
        "content": {
            "problem_statement": format!("Problem for {id}"),
            "user_perspective": { "persona": "Analyst", "context": "", "journey_steps": [], "pain_points": [] },
            "engineering_framing": "",
            "validation_thinking": ""
        },
        "meta": {
            "created_at": "2024-03-01T09:30:00Z",
            "updated_at": "2024-03-01T10:00:00Z"
        }
    }))
    .unwrap()
}

pub fn evaluation_payload(score: u8) -> EvaluationResponse {
    serde_json::from_value(json!({
        "score": score,
        "breakdown": {
            "problem_statement": 25,
            "user_perspective": 20,
            "engineering_framing": 15,
            "validation_thinking": i64::from(score).saturating_sub(60).max(0)
        },
        "issues": [
            "Validation criteria are vague",
            { "section": "engineering_framing", "severity": "info", "message": "List risks" }
        ],
        "feedback": "Solid problem statement"
    }))
    .unwrap()
}

pub fn knowledge(frame_id: &str, title: &str) -> KnowledgeEntry {
    serde_json::from_value(json!({
        "id": format!("k-{title}"),
        "title": title,
        "content": "Distilled",
        "category": "lesson",
        "source": "feedback",
        "source_id": frame_id,
    }))
    .unwrap()
}

/// Bug template with two problem-statement questions and one user-perspective question
pub fn bug_template() -> TemplateResponse {
    serde_json::from_value(json!({
        "name": "bug-report",
        "type": "bug",
        "description": "Frame a defect",
        "sections": [
            { "name": "Problem Statement", "description": "What is broken", "required": true },
            { "name": "User Perspective", "description": "Who is affected", "required": false }
        ],
        "questionnaire": {
            "title": "Bug questions",
            "questions": [
                { "id": "q1", "section": "problem_statement", "text": "What broke?" },
                { "id": "q2", "section": "problem_statement", "text": "Since when?", "hint": "Release or date" },
                { "id": "q3", "section": "user_perspective", "text": "Who noticed?" }
            ]
        },
        "prompts": ["evaluate", "generate"]
    }))
    .unwrap()
}

pub fn local_store() -> FrameStore {
    FrameStore::new(SyncConfig::local(ALICE), None, HeuristicEvaluator::seeded(7, 0))
}

pub fn remote_store(backend: &Arc<FakeBackend>) -> FrameStore {
    remote_store_with(SyncConfig::local(ALICE), backend)
}

pub fn remote_store_with(config: SyncConfig, backend: &Arc<FakeBackend>) -> FrameStore {
    FrameStore::remote(config, Arc::clone(backend) as Arc<dyn FrameBackend>)
}

#[derive(Debug, Default)]
struct Script {
    frames: Vec<FrameResponse>,
    comments: HashMap<String, Vec<CommentResponse>>,
    failures: HashMap<&'static str, Option<u16>>,
    delays: HashMap<&'static str, Duration>,
    calls: Vec<String>,
    evaluation: Option<EvaluationResponse>,
    knowledge: Vec<KnowledgeEntry>,
    users: Vec<User>,
    templates: Vec<TemplateResponse>,
    next_id: usize,
}

/// In-memory backend with per-operation failures and delays
///
/// Operation names match the [`FrameBackend`] method names.
#[derive(Debug, Default)]
pub struct FakeBackend {
    script: Mutex<Script>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_frames(frames: impl IntoIterator<Item = FrameResponse>) -> Arc<Self> {
        let backend = Self::new();
        backend.script.lock().frames.extend(frames);
        backend
    }

    /// Fail `operation` with this HTTP status (`None` for a transport error)
    pub fn fail(&self, operation: &'static str, status: Option<u16>) {
        self.script.lock().failures.insert(operation, status);
    }

    pub fn recover(&self, operation: &'static str) {
        self.script.lock().failures.remove(operation);
    }

    pub fn delay(&self, operation: &'static str, by: Duration) {
        self.script.lock().delays.insert(operation, by);
    }

    pub fn set_evaluation(&self, evaluation: EvaluationResponse) {
        self.script.lock().evaluation = Some(evaluation);
    }

    pub fn set_knowledge(&self, entries: Vec<KnowledgeEntry>) {
        self.script.lock().knowledge = entries;
    }

    pub fn set_users(&self, users: Vec<User>) {
        self.script.lock().users = users;
    }

    pub fn set_templates(&self, templates: Vec<TemplateResponse>) {
        self.script.lock().templates = templates;
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.script.lock().calls.iter().filter(|c| *c == operation).count()
    }

    pub fn stored(&self, id: &str) -> Option<FrameResponse> {
        self.script.lock().frames.iter().find(|f| f.id == id).cloned()
    }

    pub fn stored_ids(&self) -> Vec<String> {
        self.script.lock().frames.iter().map(|f| f.id.clone()).collect()
    }

    pub fn put(&self, frame: &Frame) {
        let payload = encode_frame(frame);
        let mut script = self.script.lock();
        script.frames.retain(|f| f.id != payload.id);
        script.frames.push(payload);
    }

    async fn enter(&self, operation: &'static str) -> BackendResult<()> {
        let (delay, failure) = {
            let mut script = self.script.lock();
            script.calls.push(operation.to_string());
            (
                script.delays.get(operation).copied(),
                script.failures.get(operation).copied(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(status) => Err(SyncError::remote(status, format!("{operation} failed"))),
            None => Ok(()),
        }
    }

    fn modify(&self, id: &str, f: impl FnOnce(&mut FrameResponse)) -> BackendResult<FrameResponse> {
        let mut script = self.script.lock();
        let frame = script
            .frames
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SyncError::remote(Some(404), "Frame not found"))?;
        f(frame);
        frame.meta.updated_at = Some(format_timestamp(Utc::now()));
        Ok(frame.clone())
    }
}

#[async_trait]
impl FrameBackend for FakeBackend {
    async fn list_frames(&self, filters: &FrameFilters) -> BackendResult<Vec<FrameListItem>> {
        self.enter("list_frames").await?;
        let script = self.script.lock();
        Ok(script
            .frames
            .iter()
            .filter(|f| filters.status.as_deref().map_or(true, |s| f.status == s))
            .filter(|f| filters.owner.as_deref().map_or(true, |o| f.owner == o))
            .map(|f| FrameListItem {
                id: f.id.clone(),
                frame_type: f.frame_type.clone(),
                status: f.status.clone(),
                owner: f.owner.clone(),
                updated_at: f.meta.updated_at.clone(),
            })
            .collect())
    }

    async fn get_frame(&self, id: &str) -> BackendResult<FrameResponse> {
        self.enter("get_frame").await?;
        self.stored(id)
            .ok_or_else(|| SyncError::remote(Some(404), "Frame not found"))
    }

    async fn create_frame(&self, request: &CreateFrameRequest) -> BackendResult<FrameResponse> {
        self.enter("create_frame").await?;
        let mut script = self.script.lock();
        script.next_id += 1;
        let now = format_timestamp(Utc::now());
        let mut payload = FrameResponse {
            id: format!("f-2024-03-01-srv{:03}", script.next_id),
            frame_type: request.frame_type.clone(),
            status: FrameStatus::Draft.as_str().to_string(),
            owner: request.owner.clone(),
            content: request.content.clone().unwrap_or_default(),
            meta: framer_wire::WireMeta::default(),
        };
        payload.meta.created_at = Some(now.clone());
        payload.meta.updated_at = Some(now);
        script.frames.push(payload.clone());
        Ok(payload)
    }

    async fn update_frame(
        &self,
        id: &str,
        request: &UpdateFrameRequest,
    ) -> BackendResult<FrameResponse> {
        self.enter("update_frame").await?;
        self.modify(id, |f| f.content = request.content.clone())
    }

    async fn update_frame_status(
        &self,
        id: &str,
        request: &UpdateStatusRequest,
    ) -> BackendResult<FrameResponse> {
        self.enter("update_frame_status").await?;
        self.modify(id, |f| f.status.clone_from(&request.status))
    }

    async fn delete_frame(&self, id: &str) -> BackendResult<()> {
        self.enter("delete_frame").await?;
        let mut script = self.script.lock();
        let before = script.frames.len();
        script.frames.retain(|f| f.id != id);
        if script.frames.len() == before {
            return Err(SyncError::remote(Some(404), "Frame not found"));
        }
        Ok(())
    }

    async fn add_comment(
        &self,
        frame_id: &str,
        request: &CreateCommentRequest,
    ) -> BackendResult<CommentResponse> {
        self.enter("add_comment").await?;
        let mut script = self.script.lock();
        let comments = script.comments.entry(frame_id.to_string()).or_default();
        let comment = CommentResponse {
            id: format!("srv-c-{}", comments.len() + 1),
            section: request.section.clone(),
            author: request.author.clone(),
            content: request.content.clone(),
            created_at: Some(format_timestamp(Utc::now())),
        };
        comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comments(&self, frame_id: &str) -> BackendResult<Vec<CommentResponse>> {
        self.enter("get_comments").await?;
        Ok(self
            .script
            .lock()
            .comments
            .get(frame_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn evaluate_frame(&self, frame_id: &str) -> BackendResult<EvaluationResponse> {
        self.enter("evaluate_frame").await?;
        let script = self.script.lock();
        if !script.frames.iter().any(|f| f.id == frame_id) {
            return Err(SyncError::remote(Some(404), "Frame not found"));
        }
        Ok(script.evaluation.clone().unwrap_or_else(|| evaluation_payload(80)))
    }

    async fn generate_content(
        &self,
        frame_id: &str,
        request: &GenerateRequest,
    ) -> BackendResult<GenerateResponse> {
        self.enter("generate_content").await?;
        Ok(GenerateResponse {
            content: format!(
                "Generated {} for {frame_id} from {} answers",
                request.section,
                request.answers.len()
            ),
            suggestions: Vec::new(),
        })
    }

    async fn chat(&self, request: &ChatRequest) -> BackendResult<ChatReply> {
        self.enter("chat").await?;
        Ok(ChatReply {
            message: format!("You said: {}", request.message),
            suggestion: request.context.as_ref().map(Value::to_string),
        })
    }

    async fn distill_knowledge(
        &self,
        request: &DistillRequest,
    ) -> BackendResult<Vec<KnowledgeEntry>> {
        self.enter("distill_knowledge").await?;
        let script = self.script.lock();
        if script.knowledge.is_empty() {
            return Ok(vec![knowledge(&request.frame_id, "default")]);
        }
        Ok(script.knowledge.clone())
    }

    async fn list_users(&self) -> BackendResult<Vec<User>> {
        self.enter("list_users").await?;
        Ok(self.script.lock().users.clone())
    }

    async fn list_templates(&self) -> BackendResult<Vec<TemplateListItem>> {
        self.enter("list_templates").await?;
        Ok(self
            .script
            .lock()
            .templates
            .iter()
            .map(|t| TemplateListItem {
                name: t.name.clone(),
                frame_type: t.frame_type.clone(),
                description: t.description.clone(),
            })
            .collect())
    }

    async fn get_template(&self, name: &str) -> BackendResult<TemplateResponse> {
        self.enter("get_template").await?;
        self.script
            .lock()
            .templates
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| SyncError::remote(Some(404), format!("Template not found: {name}")))
    }
}
