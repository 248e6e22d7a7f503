//! HTTP backend over reqwest
//!
//! Routes live under `{base_url}/api`. Error bodies carry `{"detail": ...}`;
//! the detail is surfaced in [`SyncError::Remote`].

use crate::backend::{BackendResult, FrameBackend};
use crate::config::SyncConfig;
use crate::error::SyncError;
use async_trait::async_trait;
use framer_wire::{
    ChatReply, ChatRequest, CommentResponse, CreateCommentRequest, CreateFrameRequest,
    DistillRequest, ErrorBody, EvaluationResponse, FrameFilters, FrameListItem, FrameResponse,
    GenerateRequest, GenerateResponse, KnowledgeEntry, TemplateListItem, TemplateResponse,
    TransformError, UpdateFrameRequest, UpdateStatusRequest, User,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

const USER_AGENT: &str = concat!("framer-sync/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed [`FrameBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_root: String,
    auth_token: Option<String>,
}

impl HttpBackend {
    /// Create backend for `{base_url}/api`
    ///
    /// # Errors
    ///
    /// [`SyncError::Remote`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, auth_token: Option<String>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_root: format!("{}/api", base_url.trim_end_matches('/')),
            auth_token,
        })
    }

    /// Create backend from configuration
    ///
    /// # Errors
    ///
    /// See [`HttpBackend::new`].
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        Self::new(&config.base_url, config.auth_token.clone())
    }

    /// API root URL
    #[inline]
    #[must_use]
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.api_root);
        tracing::debug!(%method, %url, "HTTP request");
        let builder = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message())
            .ok()
            .filter(|m| !m.is_empty())
            .or_else(|| Some(body).filter(|b| !b.trim().is_empty()))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        Err(SyncError::remote(Some(status.as_u16()), detail))
    }

    async fn json<T: DeserializeOwned>(builder: RequestBuilder) -> BackendResult<T> {
        let body = Self::send(builder).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| SyncError::Transform(TransformError::from(e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> BackendResult<T> {
        Self::json(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> BackendResult<T> {
        Self::json(self.request(Method::POST, path).json(body)).await
    }
}

#[async_trait]
impl FrameBackend for HttpBackend {
    async fn list_frames(&self, filters: &FrameFilters) -> BackendResult<Vec<FrameListItem>> {
        Self::json(self.request(Method::GET, "/frames").query(filters)).await
    }

    async fn get_frame(&self, id: &str) -> BackendResult<FrameResponse> {
        self.get(&format!("/frames/{id}")).await
    }

    async fn create_frame(&self, request: &CreateFrameRequest) -> BackendResult<FrameResponse> {
        self.post("/frames", request).await
    }

    async fn update_frame(
        &self,
        id: &str,
        request: &UpdateFrameRequest,
    ) -> BackendResult<FrameResponse> {
        Self::json(self.request(Method::PUT, &format!("/frames/{id}")).json(request)).await
    }

    async fn update_frame_status(
        &self,
        id: &str,
        request: &UpdateStatusRequest,
    ) -> BackendResult<FrameResponse> {
        Self::json(
            self.request(Method::PATCH, &format!("/frames/{id}/status"))
                .json(request),
        )
        .await
    }

    async fn delete_frame(&self, id: &str) -> BackendResult<()> {
        Self::send(self.request(Method::DELETE, &format!("/frames/{id}"))).await?;
        Ok(())
    }

    async fn add_comment(
        &self,
        frame_id: &str,
        request: &CreateCommentRequest,
    ) -> BackendResult<CommentResponse> {
        self.post(&format!("/frames/{frame_id}/comments"), request).await
    }

    async fn get_comments(&self, frame_id: &str) -> BackendResult<Vec<CommentResponse>> {
        self.get(&format!("/frames/{frame_id}/comments")).await
    }

    async fn evaluate_frame(&self, frame_id: &str) -> BackendResult<EvaluationResponse> {
        Self::json(self.request(Method::POST, &format!("/frames/{frame_id}/ai/evaluate"))).await
    }

    async fn generate_content(
        &self,
        frame_id: &str,
        request: &GenerateRequest,
    ) -> BackendResult<GenerateResponse> {
        self.post(&format!("/frames/{frame_id}/ai/generate"), request).await
    }

    async fn chat(&self, request: &ChatRequest) -> BackendResult<ChatReply> {
        self.post("/ai/chat", request).await
    }

    async fn distill_knowledge(
        &self,
        request: &DistillRequest,
    ) -> BackendResult<Vec<KnowledgeEntry>> {
        self.post("/knowledge/distill", request).await
    }

    async fn list_users(&self) -> BackendResult<Vec<User>> {
        self.get("/users").await
    }

    async fn list_templates(&self) -> BackendResult<Vec<TemplateListItem>> {
        self.get("/templates").await
    }

    async fn get_template(&self, name: &str) -> BackendResult<TemplateResponse> {
        self.get(&format!("/templates/{name}")).await
    }
}
