use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use framer_core::{FrameStatus, FrameType};
use framer_sync::{FrameBackend, FrameStore, HttpBackend, SyncConfig, SyncError};
use framer_wire::{
    ChatRequest, CreateFrameRequest, DistillRequest, FrameFilters, UpdateStatusRequest,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const TOKEN: &str = "secret";

fn frame_body(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "type": "bug",
        "status": status,
        "owner": "alice",
        "content": {
            "problem_statement": "Login fails",
            "user_perspective": "ad-hoc note",
            "engineering_framing": "",
            "validation_thinking": ""
        },
        "meta": { "created_at": "2024-03-01T09:30:00Z" }
    })
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Frame not found" }))).into_response()
}

async fn list(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let status = params.get("status").cloned().unwrap_or_else(|| "draft".into());
    Json(json!([{ "id": "f-2024-03-01-aaaaaa", "type": "bug", "status": status, "owner": "alice" }]))
}

async fn get_frame(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found();
    }
    Json(frame_body(&id, "in_review")).into_response()
}

async fn create(headers: HeaderMap, Json(req): Json<CreateFrameRequest>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"));
    if !authorized {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Not authenticated" })))
            .into_response();
    }
    let mut body = frame_body("f-2024-03-01-http01", "draft");
    body["type"] = json!(req.frame_type);
    body["owner"] = json!(req.owner);
    Json(body).into_response()
}

async fn delete_frame(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn set_status(Path(id): Path<String>, Json(req): Json<UpdateStatusRequest>) -> Json<Value> {
    Json(frame_body(&id, &req.status))
}

async fn comments() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn evaluate() -> Json<Value> {
    Json(json!({
        "score": "72",
        "breakdown": { "problem_statement": 22, "user_perspective": 18 },
        "issues": ["Too vague"]
    }))
}

async fn chat(Json(req): Json<ChatRequest>) -> Json<Value> {
    Json(json!({ "response": format!("echo {}", req.message) }))
}

async fn distill(Json(_): Json<DistillRequest>) -> &'static str {
    "not json"
}

async fn users() -> Json<Value> {
    Json(json!([{ "id": "alice", "email": "alice@example.com", "name": "Alice" }]))
}

async fn templates() -> Json<Value> {
    Json(json!([{ "name": "bug-report", "type": "bug", "description": "Frame a defect" }]))
}

async fn template(Path(name): Path<String>) -> Response {
    if name != "bug-report" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": format!("Template not found: {name}") })),
        )
            .into_response();
    }
    Json(json!({
        "name": name,
        "type": "bug",
        "description": "Frame a defect",
        "sections": [{ "name": "Problem Statement", "description": "", "required": true }],
        "questionnaire": {
            "title": "Bug questions",
            "questions": [{ "id": "q1", "section": "problem_statement", "text": "What broke?", "hint": null }]
        },
        "prompts": ["evaluate"]
    }))
    .into_response()
}

async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/api/frames", get(list).post(create))
        .route("/api/frames/:id", get(get_frame).delete(delete_frame))
        .route("/api/frames/:id/status", patch(set_status))
        .route("/api/frames/:id/comments", get(comments))
        .route("/api/frames/:id/ai/evaluate", post(evaluate))
        .route("/api/ai/chat", post(chat))
        .route("/api/knowledge/distill", post(distill))
        .route("/api/users", get(users))
        .route("/api/templates", get(templates))
        .route("/api/templates/:name", get(template));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn backend(token: Option<&str>) -> HttpBackend {
    HttpBackend::new(&spawn_stub().await, token.map(str::to_string)).unwrap()
}

#[tokio::test]
async fn test_list_passes_filters() {
    let backend = backend(None).await;
    let items = backend
        .list_frames(&FrameFilters::default().with_status(FrameStatus::Ready))
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, "ready");
}

#[tokio::test]
async fn test_error_detail_is_surfaced() {
    let backend = backend(None).await;
    let err = backend.get_frame("missing").await.unwrap_err();
    assert!(err.is_remote_not_found());
    assert_eq!(err.to_string(), "remote error (404): Frame not found");
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let backend = backend(None).await;
    let err = backend.get_comments("f-1").await.unwrap_err();
    assert!(matches!(err, SyncError::Remote { status: Some(500), ref detail } if detail == "boom"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let request = CreateFrameRequest {
        frame_type: "feature".into(),
        owner: "alice".into(),
        content: None,
    };

    let anonymous = backend(None).await.create_frame(&request).await.unwrap_err();
    assert!(matches!(anonymous, SyncError::Remote { status: Some(401), .. }));

    let created = backend(Some(TOKEN)).await.create_frame(&request).await.unwrap();
    assert_eq!(created.id, "f-2024-03-01-http01");
    assert_eq!(created.frame_type, "feature");
}

#[tokio::test]
async fn test_delete_and_status_routes() {
    let backend = backend(None).await;
    backend.delete_frame("f-1").await.unwrap();
    assert!(backend.delete_frame("missing").await.unwrap_err().is_remote_not_found());

    let updated = backend
        .update_frame_status("f-1", &UpdateStatusRequest { status: "ready".into() })
        .await
        .unwrap();
    assert_eq!(updated.status, "ready");
}

#[tokio::test]
async fn test_chat_accepts_response_alias() {
    let backend = backend(None).await;
    let reply = backend
        .chat(&ChatRequest { message: "hi".into(), context: None })
        .await
        .unwrap();
    assert_eq!(reply.message, "echo hi");
    assert!(reply.suggestion.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_transform_error() {
    let backend = backend(None).await;
    let err = backend
        .distill_knowledge(&DistillRequest { frame_id: "f-1".into(), feedback: "ok".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Transform(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_users_route() {
    let users = backend(None).await.list_users().await.unwrap();
    assert_eq!(users[0].display_name(), "Alice");
}

#[tokio::test]
async fn test_template_routes() {
    let backend = backend(None).await;
    let listed = backend.list_templates().await.unwrap();
    assert_eq!(listed[0].frame_type, "bug");

    let template = backend.get_template("bug-report").await.unwrap();
    assert_eq!(template.questions_for("problem_statement")[0].text, "What broke?");

    let err = backend.get_template("nope").await.unwrap_err();
    assert_eq!(err.to_string(), "remote error (404): Template not found: nope");
}

#[tokio::test]
async fn test_store_over_http() {
    let base_url = spawn_stub().await;
    let config = SyncConfig::local("alice").with_base_url(&base_url);
    let backend = Arc::new(HttpBackend::from_config(&config).unwrap());
    let store = FrameStore::remote(config, backend);

    let count = store.load_frames(FrameFilters::default()).await.unwrap();
    assert_eq!(count, 1);
    let frame = store.get_frame("f-2024-03-01-aaaaaa").unwrap();
    assert_eq!(frame.frame_type, FrameType::Bug);
    assert_eq!(frame.status, FrameStatus::InReview);
    assert_eq!(frame.content.user_perspective.neutral.context, "ad-hoc note");

    let evaluated = store.evaluate_frame("f-2024-03-01-aaaaaa").await.unwrap();
    let ai = evaluated.ai.unwrap();
    assert_eq!(ai.score, 40);
    assert_eq!(ai.issues.len(), 1);

    let users = store.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
}
