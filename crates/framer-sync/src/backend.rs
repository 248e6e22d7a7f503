//! Remote persistence/evaluation seam
//!
//! The store talks to the backend only through [`FrameBackend`]. Requests and
//! responses are wire DTOs; decoding into the frame model happens in the
//! store so every backend gets the same tolerant transforms.

use crate::error::SyncError;
use async_trait::async_trait;
use framer_wire::{
    ChatReply, ChatRequest, CommentResponse, CreateCommentRequest, CreateFrameRequest,
    DistillRequest, EvaluationResponse, FrameFilters, FrameListItem, FrameResponse,
    GenerateRequest, GenerateResponse, KnowledgeEntry, TemplateListItem, TemplateResponse,
    UpdateFrameRequest, UpdateStatusRequest, User,
};

/// Result alias for backend calls
pub type BackendResult<T> = Result<T, SyncError>;

/// Remote frame service
///
/// Implementations report HTTP-level failures as [`SyncError::Remote`]. The
/// store bounds every call with its configured timeout, so implementations
/// need not enforce one.
#[async_trait]
pub trait FrameBackend: Send + Sync + std::fmt::Debug {
    /// `GET /frames`
    async fn list_frames(&self, filters: &FrameFilters) -> BackendResult<Vec<FrameListItem>>;

    /// `GET /frames/{id}`
    async fn get_frame(&self, id: &str) -> BackendResult<FrameResponse>;

    /// `POST /frames`
    async fn create_frame(&self, request: &CreateFrameRequest) -> BackendResult<FrameResponse>;

    /// `PUT /frames/{id}`
    async fn update_frame(
        &self,
        id: &str,
        request: &UpdateFrameRequest,
    ) -> BackendResult<FrameResponse>;

    /// `PATCH /frames/{id}/status`
    async fn update_frame_status(
        &self,
        id: &str,
        request: &UpdateStatusRequest,
    ) -> BackendResult<FrameResponse>;

    /// `DELETE /frames/{id}`
    async fn delete_frame(&self, id: &str) -> BackendResult<()>;

    /// `POST /frames/{id}/comments`
    async fn add_comment(
        &self,
        frame_id: &str,
        request: &CreateCommentRequest,
    ) -> BackendResult<CommentResponse>;

    /// `GET /frames/{id}/comments`
    async fn get_comments(&self, frame_id: &str) -> BackendResult<Vec<CommentResponse>>;

    /// `POST /frames/{id}/ai/evaluate`
    async fn evaluate_frame(&self, frame_id: &str) -> BackendResult<EvaluationResponse>;

    /// `POST /frames/{id}/ai/generate`
    async fn generate_content(
        &self,
        frame_id: &str,
        request: &GenerateRequest,
    ) -> BackendResult<GenerateResponse>;

    /// `POST /ai/chat`
    async fn chat(&self, request: &ChatRequest) -> BackendResult<ChatReply>;

    /// `POST /knowledge/distill`
    async fn distill_knowledge(&self, request: &DistillRequest)
        -> BackendResult<Vec<KnowledgeEntry>>;

    /// `GET /users`
    async fn list_users(&self) -> BackendResult<Vec<User>>;

    /// `GET /templates`
    async fn list_templates(&self) -> BackendResult<Vec<TemplateListItem>>;

    /// `GET /templates/{name}`
    async fn get_template(&self, name: &str) -> BackendResult<TemplateResponse>;
}
