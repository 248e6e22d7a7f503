//! Frame store
//!
//! The constructed service that owns the [`FrameRegistry`], the knowledge
//! cache and the shared loading/error slot. UI code holds a cloned handle;
//! nothing here is global.
//!
//! # Failure policies
//!
//! | Operation | Order | On remote failure |
//! |---|---|---|
//! | create | local, then remote | error reported, draft kept (still unsaved, unconfirmed) |
//! | update, status, comment | local, then remote | error reported, change kept (`retain-on-failure`) |
//! | delete | remote, then local | nothing changes (`abort-on-failure`) |
//! | evaluate | remote, then merge | nothing changes, slot untouched |
//! | chat, generate, distill | remote only | [`SyncError::BestEffort`], slot untouched |
//!
//! Registry locks are never held across an `.await`; each partial update
//! merges onto whatever the registry holds when it is applied.
//!
//! # Unconfirmed drafts
//!
//! A draft whose create has not succeeded has no server record. The next
//! content, status or comment persist (or [`FrameStore::retry_create`])
//! sends the create again first. Deleting one is local only. While a create
//! is in flight, remote operations on the draft wait for it and then use
//! the server's id.

use crate::backend::{BackendResult, FrameBackend};
use crate::config::{SyncConfig, SyncMode};
use crate::error::SyncError;
use crate::http::HttpBackend;
use crate::status::{StatusSlot, SyncStatus};
use chrono::Utc;
use framer_core::{
    apply_action, check_action, merge_evaluation, Action, Comment, FeedbackInput, Frame, FrameId,
    FrameRegistry, FrameStatus, FrameType, FrameUpdate, HeuristicEvaluator, SectionKey,
};
use framer_wire::{
    comment_request, create_request, decode_comment, decode_frame_at, decode_list_item,
    status_request, update_request, ChatReply, ChatRequest, DistillRequest, FrameFilters,
    GenerateAnswer, GenerateRequest, KnowledgeEntry, TemplateResponse, User,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct Inner {
    config: SyncConfig,
    backend: Option<Arc<dyn FrameBackend>>,
    registry: RwLock<FrameRegistry>,
    knowledge: RwLock<HashMap<FrameId, Vec<KnowledgeEntry>>>,
    evaluator: Mutex<HeuristicEvaluator>,
    status: StatusSlot,
    background: Mutex<Vec<JoinHandle<()>>>,
    /// Frames the server does not yet know by their registry id
    remote: Mutex<HashMap<FrameId, RemoteRecord>>,
}

#[derive(Debug)]
enum RemoteRecord {
    /// Create in flight; resolves to the server id
    Creating(watch::Receiver<Option<FrameId>>),
    /// No create has succeeded
    Unconfirmed,
}

/// Where a frame stands once any in-flight create has settled
enum Presence {
    Confirmed(FrameId),
    Unconfirmed,
}

/// Server id of a frame, and whether it was created just now
enum RemoteId {
    Existing(FrameId),
    Created(Frame),
}

impl RemoteId {
    fn into_id(self) -> FrameId {
        match self {
            Self::Existing(id) => id,
            Self::Created(frame) => frame.id,
        }
    }
}

/// Claim on a draft's create; dropped unconfirmed, the draft becomes
/// [`RemoteRecord::Unconfirmed`] and waiters are released
struct CreateTicket {
    inner: Arc<Inner>,
    local_id: FrameId,
    tx: Option<watch::Sender<Option<FrameId>>>,
}

impl CreateTicket {
    fn confirm(mut self, server_id: &FrameId) {
        let mut remote = self.inner.remote.lock();
        remote.remove(&self.local_id);
        if let Some(tx) = self.tx.take() {
            tx.send_replace(Some(server_id.clone()));
        }
    }
}

impl Drop for CreateTicket {
    fn drop(&mut self) {
        if self.tx.is_none() {
            return;
        }
        let mut remote = self.inner.remote.lock();
        if self.inner.registry.read().contains(self.local_id.as_str()) {
            remote.insert(self.local_id.clone(), RemoteRecord::Unconfirmed);
        } else {
            remote.remove(&self.local_id);
        }
    }
}

/// Handle to the frame store; clones share state
#[derive(Debug, Clone)]
pub struct FrameStore {
    inner: Arc<Inner>,
}

/// Run `call` under `after`, mapping expiry to [`SyncError::Timeout`]
async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    call: impl Future<Output = BackendResult<T>>,
) -> BackendResult<T> {
    tracing::debug!(operation, "Remote call");
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::Timeout { operation, after }),
    }
}

async fn fetch_template(
    backend: &dyn FrameBackend,
    frame_type: FrameType,
    after: Duration,
) -> BackendResult<Option<TemplateResponse>> {
    let listed = bounded("list_templates", after, backend.list_templates()).await?;
    let Some(item) = listed
        .into_iter()
        .find(|t| t.frame_type == frame_type.as_str())
    else {
        return Ok(None);
    };
    bounded("get_template", after, backend.get_template(&item.name))
        .await
        .map(Some)
}

/// Markdown bullet list built from wizard answers
fn compose_from_answers(section: SectionKey, answers: &[GenerateAnswer]) -> String {
    let mut out = format!("## {}\n\n", section.title());
    for answer in answers.iter().filter(|a| !a.answer.trim().is_empty()) {
        let question = answer.question.trim();
        if question.is_empty() {
            let _ = writeln!(out, "- {}", answer.answer.trim());
        } else {
            let _ = writeln!(out, "- **{question}** {}", answer.answer.trim());
        }
    }
    out
}

impl FrameStore {
    /// Create store; remote-backed iff `backend` is given
    #[must_use]
    pub fn new(
        mut config: SyncConfig,
        backend: Option<Arc<dyn FrameBackend>>,
        evaluator: HeuristicEvaluator,
    ) -> Self {
        config.mode = if backend.is_some() {
            SyncMode::Remote
        } else {
            SyncMode::LocalOnly
        };
        tracing::info!(mode = %config.mode, user = %config.current_user, "Frame store started");
        Self {
            inner: Arc::new(Inner {
                config,
                backend,
                registry: RwLock::new(FrameRegistry::new()),
                knowledge: RwLock::new(HashMap::new()),
                evaluator: Mutex::new(evaluator),
                status: StatusSlot::new(),
                background: Mutex::new(Vec::new()),
                remote: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Local-only store
    #[must_use]
    pub fn local(config: SyncConfig) -> Self {
        let evaluator = HeuristicEvaluator::new(config.heuristic_jitter);
        Self::new(config, None, evaluator)
    }

    /// Remote-backed store
    #[must_use]
    pub fn remote(config: SyncConfig, backend: Arc<dyn FrameBackend>) -> Self {
        let evaluator = HeuristicEvaluator::new(config.heuristic_jitter);
        Self::new(config, Some(backend), evaluator)
    }

    /// Store for the configured mode; remote mode uses [`HttpBackend`]
    ///
    /// # Errors
    ///
    /// [`SyncError::Remote`] if the HTTP client cannot be built.
    pub fn from_config(config: SyncConfig) -> Result<Self, SyncError> {
        match config.mode {
            SyncMode::LocalOnly => Ok(Self::local(config)),
            SyncMode::Remote => {
                let backend = HttpBackend::from_config(&config)?;
                Ok(Self::remote(config, Arc::new(backend)))
            }
        }
    }

    /// Configuration in effect
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Mode in effect
    #[inline]
    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.inner.config.mode
    }

    fn backend(&self) -> Option<Arc<dyn FrameBackend>> {
        self.inner.backend.clone()
    }

    fn timeout(&self) -> Duration {
        self.inner.config.request_timeout()
    }

    /// Record in the shared slot and hand the error back
    fn report(&self, err: SyncError) -> SyncError {
        self.inner.status.record(&err);
        err
    }

    /// Bounded remote call whose failure is reported
    async fn remote_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = BackendResult<T>>,
    ) -> BackendResult<T> {
        bounded(operation, self.timeout(), call)
            .await
            .map_err(|err| self.report(err))
    }

    fn require(&self, id: &str) -> Result<(), SyncError> {
        if self.inner.registry.read().contains(id) {
            Ok(())
        } else {
            Err(SyncError::not_found(id))
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Frame by id
    #[must_use]
    pub fn get_frame(&self, id: &str) -> Option<Frame> {
        self.inner.registry.read().get(id).cloned()
    }

    /// Every frame in insertion order
    #[must_use]
    pub fn frames(&self) -> Vec<Frame> {
        self.inner.registry.read().iter().cloned().collect()
    }

    /// Frames with `status`
    #[must_use]
    pub fn frames_by_status(&self, status: FrameStatus) -> Vec<Frame> {
        self.inner
            .registry
            .read()
            .by_status(status)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Frames owned by `owner_id`
    #[must_use]
    pub fn frames_by_owner(&self, owner_id: &str) -> Vec<Frame> {
        self.inner
            .registry
            .read()
            .by_owner(owner_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Frames not yet archived
    #[must_use]
    pub fn working_frames(&self) -> Vec<Frame> {
        self.inner
            .registry
            .read()
            .working()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Archived frames
    #[must_use]
    pub fn archived_frames(&self) -> Vec<Frame> {
        self.inner
            .registry
            .read()
            .archived()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Currently selected frame
    #[must_use]
    pub fn selected_frame(&self) -> Option<Frame> {
        self.inner.registry.read().selected().cloned()
    }

    /// Select a frame; `None` or an unknown id clears the selection
    pub fn select_frame(&self, id: Option<&str>) {
        self.inner.registry.write().select(id);
    }

    /// True iff `id` is not an unsaved draft
    #[must_use]
    pub fn is_frame_saved(&self, id: &str) -> bool {
        self.inner.registry.read().is_saved(id)
    }

    /// Ids of unsaved drafts
    #[must_use]
    pub fn unsaved_ids(&self) -> Vec<FrameId> {
        self.inner.registry.read().unsaved().iter().cloned().collect()
    }

    /// Knowledge distilled from this frame's feedback
    #[must_use]
    pub fn knowledge_for(&self, id: &str) -> Vec<KnowledgeEntry> {
        self.inner
            .knowledge
            .read()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Status slot
    // ------------------------------------------------------------------

    /// Current loading/error state
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        self.inner.status.current()
    }

    /// Watch loading/error changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.inner.status.subscribe()
    }

    /// Dismiss the visible error
    pub fn clear_error(&self) {
        self.inner.status.clear_error();
    }

    // ------------------------------------------------------------------
    // Registry actions
    // ------------------------------------------------------------------

    /// Create a draft owned by the current user and select it
    ///
    /// The draft is in the registry and the unsaved set before the first
    /// `.await`. In remote mode the server's id, owner and timestamps are
    /// reconciled onto it.
    ///
    /// # Errors
    ///
    /// Remote, timeout or transform errors from the create call. The local
    /// draft is kept either way and remains unsaved; see
    /// [`FrameStore::retry_create`].
    pub async fn create_frame(&self, frame_type: FrameType) -> Result<Frame, SyncError> {
        let now = Utc::now();
        let frame = Frame::draft(
            FrameId::generate_at(now),
            frame_type,
            self.inner.config.current_user.clone(),
            now,
        );
        let backend = self.backend();
        let ticket = backend.as_ref().map(|_| self.begin_create(&frame.id));
        self.inner.registry.write().insert_unsaved(frame.clone());
        tracing::info!(frame_id = %frame.id, %frame_type, "Frame created");

        let (Some(backend), Some(ticket)) = (backend, ticket) else {
            return Ok(frame);
        };
        self.push_create(&backend, ticket).await
    }

    /// Send the create again for a draft the server has no record of
    ///
    /// Returns the frame under its server id. Confirmed frames, and every
    /// frame in local-only mode, are returned unchanged.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`], or the create's remote, timeout or transform
    /// error (the draft stays unconfirmed).
    pub async fn retry_create(&self, id: &str) -> Result<Frame, SyncError> {
        self.require(id)?;
        let Some(backend) = self.backend() else {
            return self.get_frame(id).ok_or_else(|| SyncError::not_found(id));
        };
        match self.ensure_created(&backend, id).await? {
            RemoteId::Created(frame) => Ok(frame),
            RemoteId::Existing(server_id) => self
                .get_frame(server_id.as_str())
                .ok_or_else(|| SyncError::not_found(server_id)),
        }
    }

    /// Ids of drafts the server has no record of
    #[must_use]
    pub fn unconfirmed_ids(&self) -> Vec<FrameId> {
        self.inner
            .remote
            .lock()
            .iter()
            .filter(|(_, record)| matches!(record, RemoteRecord::Unconfirmed))
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn begin_create(&self, local_id: &FrameId) -> CreateTicket {
        let (tx, rx) = watch::channel(None);
        self.inner
            .remote
            .lock()
            .insert(local_id.clone(), RemoteRecord::Creating(rx));
        CreateTicket {
            inner: Arc::clone(&self.inner),
            local_id: local_id.clone(),
            tx: Some(tx),
        }
    }

    /// Wait out any in-flight create for `id`
    async fn settle(&self, id: &FrameId) -> Presence {
        loop {
            let mut rx = match self.inner.remote.lock().get(id) {
                None => return Presence::Confirmed(id.clone()),
                Some(RemoteRecord::Unconfirmed) => return Presence::Unconfirmed,
                Some(RemoteRecord::Creating(rx)) => rx.clone(),
            };
            tracing::debug!(frame_id = %id, "Waiting for in-flight create");
            let _ = rx.changed().await;
            let resolved = rx.borrow().clone();
            if let Some(server_id) = resolved {
                return Presence::Confirmed(server_id);
            }
        }
    }

    /// Id to address `id` by remotely; unconfirmed drafts fall back to it
    async fn resolve(&self, id: &str) -> FrameId {
        let id = FrameId::new(id);
        match self.settle(&id).await {
            Presence::Confirmed(server_id) => server_id,
            Presence::Unconfirmed => id,
        }
    }

    /// Server id for `id`, sending the create first if none has succeeded
    async fn ensure_created(
        &self,
        backend: &Arc<dyn FrameBackend>,
        id: &str,
    ) -> Result<RemoteId, SyncError> {
        let id = FrameId::new(id);
        loop {
            if let Presence::Confirmed(server_id) = self.settle(&id).await {
                return Ok(RemoteId::Existing(server_id));
            }
            let ticket = {
                let mut remote = self.inner.remote.lock();
                if !matches!(remote.get(&id), Some(RemoteRecord::Unconfirmed)) {
                    continue;
                }
                let (tx, rx) = watch::channel(None);
                remote.insert(id.clone(), RemoteRecord::Creating(rx));
                CreateTicket {
                    inner: Arc::clone(&self.inner),
                    local_id: id.clone(),
                    tx: Some(tx),
                }
            };
            tracing::info!(frame_id = %id, "Retrying remote create");
            return self.push_create(backend, ticket).await.map(RemoteId::Created);
        }
    }

    async fn push_create(
        &self,
        backend: &Arc<dyn FrameBackend>,
        ticket: CreateTicket,
    ) -> Result<Frame, SyncError> {
        let local_id = ticket.local_id.clone();
        let request = self
            .inner
            .registry
            .read()
            .get(local_id.as_str())
            .map(create_request)
            .ok_or_else(|| SyncError::not_found(local_id.clone()))?;
        let _loading = self.inner.status.begin();
        let response = self
            .remote_call("create_frame", backend.create_frame(&request))
            .await
            .map_err(|err| {
                tracing::warn!(frame_id = %local_id, "Remote create failed, draft kept locally");
                err
            })?;
        let server =
            decode_frame_at(&response, Utc::now()).map_err(|err| self.report(err.into()))?;
        let server_id = server.id.clone();
        if let Some(frame) =
            self.reconcile_created(&local_id, server, response.meta.created_at.is_some())
        {
            ticket.confirm(&frame.id);
            return Ok(frame);
        }
        drop(ticket);
        tracing::warn!(
            local_id = %local_id,
            frame_id = %server_id,
            "Draft gone before create returned, deleting remote copy"
        );
        if let Err(err) = bounded(
            "delete_frame",
            self.timeout(),
            backend.delete_frame(server_id.as_str()),
        )
        .await
        {
            tracing::warn!(frame_id = %server_id, error = %err, "Orphaned remote frame not deleted");
        }
        Err(SyncError::not_found(local_id))
    }

    /// Move the draft under the server id and adopt its owner and timestamps;
    /// `None` if the draft is gone
    fn reconcile_created(
        &self,
        local_id: &FrameId,
        server: Frame,
        stamped: bool,
    ) -> Option<Frame> {
        let mut registry = self.inner.registry.write();
        if !registry.contains(local_id.as_str()) {
            return None;
        }
        if server.id != *local_id {
            if registry.remove(server.id.as_str()).is_some() {
                tracing::debug!(frame_id = %server.id, "Fetched copy replaced by local draft");
            }
            if !registry.rekey(local_id.as_str(), server.id.clone()) {
                return None;
            }
        }
        let frame = registry.get_mut(server.id.as_str())?;
        if !server.owner_id.is_empty() {
            frame.owner_id = server.owner_id;
        }
        if stamped {
            frame.created_at = server.created_at;
        }
        frame.touch(server.updated_at);
        tracing::debug!(local_id = %local_id, frame_id = %frame.id, "Create reconciled");
        Some(frame.clone())
    }

    /// Validate and merge `update` onto the frame, then persist the content
    ///
    /// Does not touch the unsaved set. Only content and type changes are sent
    /// to the backend, as the whole content snapshot taken when the update is
    /// applied. Overlapping updates to one frame are not serialized: the
    /// server keeps whichever request completes last. An unconfirmed draft is
    /// created with its current content instead.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotFound`] / [`SyncError::Validation`]: nothing changed
    /// - remote or timeout errors: the local change is kept (`retain-on-failure`)
    pub async fn update_frame(&self, id: &str, update: FrameUpdate) -> Result<Frame, SyncError> {
        let persist = update.touches_content() || update.frame_type.is_some();
        let frame = {
            let mut registry = self.inner.registry.write();
            let frame = registry
                .get_mut(id)
                .ok_or_else(|| SyncError::not_found(id))?;
            update.apply_to(frame, Utc::now())?;
            frame.clone()
        };
        tracing::debug!(frame_id = %frame.id, "Frame updated");

        let Some(backend) = self.backend().filter(|_| persist) else {
            return Ok(frame);
        };
        let _loading = self.inner.status.begin();
        let server_id = match self.ensure_created(&backend, id).await? {
            RemoteId::Created(created) => return Ok(created),
            RemoteId::Existing(server_id) => server_id,
        };
        let request = update_request(&frame);
        self.remote_call(
            "update_frame",
            backend.update_frame(server_id.as_str(), &request),
        )
        .await
        .map_err(|err| {
            tracing::warn!(frame_id = %server_id, "Remote update failed, local edit retained");
            err
        })?;
        Ok(self.get_frame(server_id.as_str()).unwrap_or(frame))
    }

    /// Remove `id` from the unsaved set; returns whether it was unsaved
    pub fn save_frame(&self, id: &str) -> bool {
        let was_unsaved = self.inner.registry.write().mark_saved(id);
        if was_unsaved {
            tracing::debug!(frame_id = %id, "Frame saved");
        }
        was_unsaved
    }

    /// Delete `id` iff it is an unsaved draft; returns whether it was deleted
    ///
    /// # Errors
    ///
    /// As for [`FrameStore::delete_frame`].
    pub async fn discard_unsaved_frame(&self, id: &str) -> Result<bool, SyncError> {
        if self.is_frame_saved(id) {
            tracing::debug!(frame_id = %id, "Discard ignored for saved frame");
            return Ok(false);
        }
        self.delete_frame(id).await?;
        Ok(true)
    }

    /// Delete remotely first, then locally (`abort-on-failure`)
    ///
    /// A draft with a create in flight is deleted under its server id once
    /// the create returns. An unconfirmed draft is deleted locally only.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] if absent locally. Remote and timeout errors,
    /// a 404 included, leave the frame untouched and visible.
    pub async fn delete_frame(&self, id: &str) -> Result<Frame, SyncError> {
        self.require(id)?;
        let id = match self.backend() {
            None => FrameId::new(id),
            Some(backend) => {
                let _loading = self.inner.status.begin();
                match self.settle(&FrameId::new(id)).await {
                    Presence::Unconfirmed => {
                        tracing::debug!(frame_id = %id, "Draft never reached the server");
                        FrameId::new(id)
                    }
                    Presence::Confirmed(server_id) => {
                        bounded(
                            "delete_frame",
                            self.timeout(),
                            backend.delete_frame(server_id.as_str()),
                        )
                        .await
                        .map_err(|err| {
                            tracing::warn!(frame_id = %server_id, "Remote delete failed, frame kept");
                            self.report(err)
                        })?;
                        server_id
                    }
                }
            }
        };
        let removed = self
            .inner
            .registry
            .write()
            .remove(id.as_str())
            .ok_or_else(|| SyncError::not_found(id.clone()))?;
        self.inner.remote.lock().remove(&id);
        self.inner.knowledge.write().remove(id.as_str());
        tracing::info!(frame_id = %id, "Frame deleted");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Check, save, apply: nothing changes if the check fails
    fn transition_local(&self, id: &str, action: Action) -> Result<Frame, SyncError> {
        let policy = self.inner.config.policy;
        let mut registry = self.inner.registry.write();
        let frame = registry.get(id).ok_or_else(|| SyncError::not_found(id))?;
        check_action(frame, &action, policy)?;
        registry.mark_saved(id);
        let frame = registry
            .get_mut(id)
            .ok_or_else(|| SyncError::not_found(id))?;
        let receipt = apply_action(frame, action, policy, Utc::now())?;
        tracing::info!(
            frame_id = %receipt.id,
            from = %receipt.from,
            to = %receipt.to,
            "Status changed"
        );
        Ok(frame.clone())
    }

    /// Send `frame.status`; `frame.id` follows the server id
    async fn persist_status(&self, frame: &mut Frame) -> Result<(), SyncError> {
        let Some(backend) = self.backend() else {
            return Ok(());
        };
        let _loading = self.inner.status.begin();
        frame.id = self
            .ensure_created(&backend, frame.id.as_str())
            .await?
            .into_id();
        let request = status_request(frame.status);
        self.remote_call(
            "update_frame_status",
            backend.update_frame_status(frame.id.as_str(), &request),
        )
        .await
        .map_err(|err| {
            tracing::warn!(frame_id = %frame.id, status = %frame.status, "Remote status update failed, local status retained");
            err
        })?;
        Ok(())
    }

    /// `draft -> in_review`: save, attach the reviewer, persist, then evaluate
    ///
    /// The evaluation is best-effort; its failure is logged and leaves the
    /// previous evaluation in place.
    ///
    /// # Errors
    ///
    /// Validation errors change nothing. Remote or timeout errors from the
    /// status update keep the transition.
    pub async fn submit_for_review(
        &self,
        id: &str,
        reviewer_id: Option<String>,
    ) -> Result<Frame, SyncError> {
        let mut frame = self.transition_local(id, Action::SubmitForReview { reviewer_id })?;
        let persisted = self.persist_status(&mut frame).await;
        if let Err(err) = self.evaluate_frame(frame.id.as_str()).await {
            let err = SyncError::best_effort("evaluate_frame", &err);
            tracing::warn!(frame_id = %frame.id, error = %err, "Evaluation after submit skipped");
        }
        persisted?;
        self.get_frame(frame.id.as_str())
            .ok_or_else(|| SyncError::not_found(frame.id))
    }

    /// `in_review -> ready`
    ///
    /// # Errors
    ///
    /// As for [`FrameStore::submit_for_review`].
    pub async fn mark_as_ready(&self, id: &str) -> Result<Frame, SyncError> {
        let mut frame = self.transition_local(id, Action::MarkAsReady)?;
        self.persist_status(&mut frame).await?;
        Ok(frame)
    }

    /// `ready -> feedback`
    ///
    /// # Errors
    ///
    /// As for [`FrameStore::submit_for_review`].
    pub async fn start_feedback(&self, id: &str) -> Result<Frame, SyncError> {
        let mut frame = self.transition_local(id, Action::StartFeedback)?;
        self.persist_status(&mut frame).await?;
        Ok(frame)
    }

    /// `feedback -> archived` with the retrospective stamped now
    ///
    /// In remote mode knowledge distillation runs in the background; see
    /// [`FrameStore::knowledge_for`] and [`FrameStore::wait_for_background`].
    ///
    /// # Errors
    ///
    /// As for [`FrameStore::submit_for_review`].
    pub async fn submit_feedback(
        &self,
        id: &str,
        feedback: FeedbackInput,
    ) -> Result<Frame, SyncError> {
        let mut frame = self.transition_local(id, Action::SubmitFeedback(feedback))?;
        let persisted = self.persist_status(&mut frame).await;
        self.spawn_distillation(&frame);
        persisted?;
        Ok(frame)
    }

    fn spawn_distillation(&self, frame: &Frame) {
        let Some(backend) = self.backend() else {
            tracing::debug!(frame_id = %frame.id, "Knowledge distillation skipped in local-only mode");
            return;
        };
        let Some(feedback) = frame.feedback.as_ref() else {
            return;
        };
        let request = DistillRequest {
            frame_id: frame.id.to_string(),
            feedback: feedback.to_text(),
        };
        let id = frame.id.clone();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let after = inner.config.request_timeout();
            match bounded("distill_knowledge", after, backend.distill_knowledge(&request)).await {
                Ok(entries) => {
                    if inner.registry.read().contains(id.as_str()) {
                        tracing::info!(frame_id = %id, count = entries.len(), "Knowledge distilled");
                        inner.knowledge.write().insert(id, entries);
                    }
                }
                Err(err) => {
                    let err = SyncError::best_effort("distill_knowledge", &err);
                    tracing::warn!(frame_id = %id, error = %err, "Knowledge distillation failed");
                }
            }
        });
        self.inner.background.lock().push(handle);
    }

    /// Await spawned best-effort tasks
    pub async fn wait_for_background(&self) {
        let handles = std::mem::take(&mut *self.inner.background.lock());
        for result in futures::future::join_all(handles).await {
            if let Err(err) = result {
                tracing::warn!(error = %err, "Background task ended abnormally");
            }
        }
    }

    /// Re-evaluate and merge atomically; status is unchanged
    ///
    /// Local-only mode runs the heuristic evaluator over the current content.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`], or the remote/timeout error. On error no
    /// frame field changes and the shared error slot is untouched.
    pub async fn evaluate_frame(&self, id: &str) -> Result<Frame, SyncError> {
        let (id, evaluation) = match self.backend() {
            None => {
                let snapshot = self.get_frame(id).ok_or_else(|| SyncError::not_found(id))?;
                let mut evaluator = self.inner.evaluator.lock();
                let evaluation =
                    evaluator.evaluate(&snapshot, self.inner.config.language, Utc::now());
                drop(evaluator);
                (snapshot.id, evaluation)
            }
            Some(backend) => {
                self.require(id)?;
                let _loading = self.inner.status.begin();
                let server_id = self.resolve(id).await;
                let response = bounded(
                    "evaluate_frame",
                    self.timeout(),
                    backend.evaluate_frame(server_id.as_str()),
                )
                .await
                .map_err(|err| {
                    tracing::warn!(frame_id = %server_id, error = %err, "Evaluation failed");
                    err
                })?;
                (server_id, response.into_evaluation(Utc::now()))
            }
        };

        let mut registry = self.inner.registry.write();
        let frame = registry
            .get_mut(id.as_str())
            .ok_or_else(|| SyncError::not_found(id.clone()))?;
        let score = evaluation.score;
        let issues = evaluation.issues.len();
        merge_evaluation(frame, evaluation, Utc::now());
        tracing::debug!(frame_id = %id, score, issues, "Evaluation merged");
        Ok(frame.clone())
    }

    /// Set any status directly, bypassing the action guards
    ///
    /// Entering `archived` requires `feedback`; leaving it clears the
    /// feedback. Backward moves are allowed but logged at `warn`, since they
    /// break lifecycle monotonicity. Leaving `draft` saves the frame.
    ///
    /// # Errors
    ///
    /// [`SyncError::Validation`] if archiving without feedback. Remote or
    /// timeout errors keep the local change.
    pub async fn force_status(
        &self,
        id: &str,
        status: FrameStatus,
        feedback: Option<FeedbackInput>,
    ) -> Result<Frame, SyncError> {
        let mut frame = {
            let mut registry = self.inner.registry.write();
            let frame = registry
                .get_mut(id)
                .ok_or_else(|| SyncError::not_found(id))?;
            let forced = framer_core::force_status(frame, status, feedback, Utc::now())?;
            let snapshot = frame.clone();
            if status != FrameStatus::Draft {
                registry.mark_saved(id);
            }
            tracing::info!(
                frame_id = %forced.receipt.id,
                from = %forced.receipt.from,
                to = %forced.receipt.to,
                monotonic = forced.monotonic,
                "Status forced"
            );
            snapshot
        };
        self.persist_status(&mut frame).await?;
        Ok(frame)
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    /// Append a comment by the current user, then persist it
    ///
    /// Local ids are `c-NNN`; a server-assigned id replaces it on success.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`] changes nothing. Remote, timeout and transform
    /// errors keep the local comment.
    pub async fn add_comment(
        &self,
        id: &str,
        section: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Comment, SyncError> {
        let comment = {
            let mut registry = self.inner.registry.write();
            let frame = registry
                .get_mut(id)
                .ok_or_else(|| SyncError::not_found(id))?;
            let now = Utc::now();
            let comment = Comment {
                id: frame.next_comment_id(),
                section: section.into(),
                author_id: self.inner.config.current_user.clone(),
                content: content.into(),
                created_at: now,
            };
            frame.comments.push(comment.clone());
            frame.touch(now);
            comment
        };
        tracing::debug!(frame_id = %id, comment_id = %comment.id, "Comment added");

        let Some(backend) = self.backend() else {
            return Ok(comment);
        };
        let _loading = self.inner.status.begin();
        let id = self.ensure_created(&backend, id).await?.into_id();
        let request = comment_request(&comment);
        let response = self
            .remote_call("add_comment", backend.add_comment(id.as_str(), &request))
            .await
            .map_err(|err| {
                tracing::warn!(frame_id = %id, "Remote comment failed, local comment retained");
                err
            })?;
        let server = decode_comment(&response, comment.created_at)
            .map_err(|err| self.report(err.into()))?;
        if server.id.is_empty() || server.id == comment.id {
            return Ok(comment);
        }
        if let Some(frame) = self.inner.registry.write().get_mut(id.as_str()) {
            if let Some(local) = frame.comments.iter_mut().find(|c| c.id == comment.id) {
                local.id.clone_from(&server.id);
            }
        }
        Ok(Comment {
            id: server.id,
            ..comment
        })
    }

    /// Refresh a frame's comments from the backend
    ///
    /// Local-only mode returns the local comments.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`], or remote/timeout/transform errors (comments
    /// unchanged).
    pub async fn load_comments(&self, id: &str) -> Result<Vec<Comment>, SyncError> {
        let Some(backend) = self.backend() else {
            return self
                .get_frame(id)
                .map(|f| f.comments)
                .ok_or_else(|| SyncError::not_found(id));
        };
        self.require(id)?;
        let _loading = self.inner.status.begin();
        let id = self.resolve(id).await;
        let responses = self
            .remote_call("get_comments", backend.get_comments(id.as_str()))
            .await?;
        let now = Utc::now();
        let comments = responses
            .iter()
            .map(|r| decode_comment(r, now))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.report(err.into()))?;

        let mut registry = self.inner.registry.write();
        let frame = registry
            .get_mut(id.as_str())
            .ok_or_else(|| SyncError::not_found(id.clone()))?;
        frame.comments.clone_from(&comments);
        Ok(comments)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Fetch the frame list, then every frame concurrently, and replace the
    /// saved records; unsaved and unconfirmed drafts are kept
    ///
    /// Local-only mode has nothing to fetch and returns the current count.
    ///
    /// # Errors
    ///
    /// Remote, timeout or transform errors; the registry is unchanged.
    pub async fn load_frames(&self, filters: FrameFilters) -> Result<usize, SyncError> {
        let Some(backend) = self.backend() else {
            return Ok(self.inner.registry.read().len());
        };
        let _loading = self.inner.status.begin();
        let items = self
            .remote_call("list_frames", backend.list_frames(&filters))
            .await?;
        let ids = items
            .iter()
            .map(decode_list_item)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.report(err.into()))?;

        let after = self.timeout();
        let fetches = ids.iter().map(|(id, _, _)| {
            let backend = Arc::clone(&backend);
            async move { bounded("get_frame", after, backend.get_frame(id.as_str())).await }
        });
        let responses = futures::future::try_join_all(fetches)
            .await
            .map_err(|err| self.report(err))?;

        let now = Utc::now();
        let frames = responses
            .iter()
            .map(|r| decode_frame_at(r, now))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| self.report(err.into()))?;
        let count = frames.len();
        let local_only: HashSet<FrameId> = self.unconfirmed_ids().into_iter().collect();
        self.inner
            .registry
            .write()
            .replace_saved_keeping(frames, |id| local_only.contains(id));
        tracing::info!(count, "Frames loaded");
        Ok(count)
    }

    /// Users for owner/reviewer display names
    ///
    /// Local-only mode knows only the current user.
    ///
    /// # Errors
    ///
    /// Remote or timeout errors.
    pub async fn list_users(&self) -> Result<Vec<User>, SyncError> {
        let Some(backend) = self.backend() else {
            return Ok(vec![User {
                id: self.inner.config.current_user.clone(),
                email: String::new(),
                name: None,
                role: None,
                avatar: None,
            }]);
        };
        let _loading = self.inner.status.begin();
        self.remote_call("list_users", backend.list_users()).await
    }

    /// Template for `frame_type`: section outline and the guided questions
    /// whose answers feed [`FrameStore::generate_content`]
    ///
    /// `None` in local-only mode or when the backend has no template for the
    /// type.
    ///
    /// # Errors
    ///
    /// [`SyncError::BestEffort`] wrapping the remote failure.
    pub async fn template_for(
        &self,
        frame_type: FrameType,
    ) -> Result<Option<TemplateResponse>, SyncError> {
        let Some(backend) = self.backend() else {
            return Ok(None);
        };
        fetch_template(backend.as_ref(), frame_type, self.timeout())
            .await
            .map_err(|err| {
                let err = SyncError::best_effort("template_for", &err);
                tracing::warn!(%frame_type, error = %err, "Template lookup failed");
                err
            })
    }

    // ------------------------------------------------------------------
    // Best-effort enhancements
    // ------------------------------------------------------------------

    /// Draft markdown for a section from wizard answers; the frame is not
    /// modified
    ///
    /// Local-only mode composes a bullet list from the answers.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotFound`], or [`SyncError::BestEffort`] wrapping the
    /// remote failure.
    pub async fn generate_content(
        &self,
        id: &str,
        section: SectionKey,
        answers: Vec<GenerateAnswer>,
    ) -> Result<String, SyncError> {
        self.require(id)?;
        let Some(backend) = self.backend() else {
            return Ok(compose_from_answers(section, &answers));
        };
        let request = GenerateRequest {
            section: section.as_str().to_string(),
            answers,
        };
        let server_id = self.resolve(id).await;
        bounded(
            "generate_content",
            self.timeout(),
            backend.generate_content(server_id.as_str(), &request),
        )
        .await
        .map(|r| r.content)
        .map_err(|err| {
            let err = SyncError::best_effort("generate_content", &err);
            tracing::warn!(frame_id = %id, error = %err, "Generation failed");
            err
        })
    }

    /// Ask the assistant
    ///
    /// # Errors
    ///
    /// Always [`SyncError::BestEffort`] in local-only mode; otherwise wraps
    /// the remote failure.
    pub async fn chat(
        &self,
        message: impl Into<String>,
        context: Option<serde_json::Value>,
    ) -> Result<ChatReply, SyncError> {
        let Some(backend) = self.backend() else {
            return Err(SyncError::BestEffort {
                operation: "chat",
                reason: "no assistant in local-only mode".to_string(),
            });
        };
        let request = ChatRequest {
            message: message.into(),
            context,
        };
        bounded("chat", self.timeout(), backend.chat(&request))
            .await
            .map_err(|err| {
                let err = SyncError::best_effort("chat", &err);
                tracing::warn!(error = %err, "Chat failed");
                err
            })
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Drop all state: frames, drafts, selection, knowledge, status
    ///
    /// Pending background tasks are aborted.
    pub fn logout(&self) {
        for handle in std::mem::take(&mut *self.inner.background.lock()) {
            handle.abort();
        }
        self.inner.registry.write().clear();
        self.inner.remote.lock().clear();
        self.inner.knowledge.write().clear();
        self.inner.status.reset();
        tracing::info!("Frame store cleared");
    }
}
