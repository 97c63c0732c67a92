//! Diagram sessions: one user request, from first byte to final frame.
//!
//! ARCHITECTURE
//! ============
//! A [`DiagramSession`] owns the element list for one request and redraws the
//! whole diagram after every `NodeBatch`:
//!
//! ```text
//!   EventStream ──▶ DiagramSession::apply ──▶ LayoutEngine ──▶ AnchorAssigner
//!                        │                                          │
//!                        └──────────── SceneReconciler ◀────────────┘
//!                                           │
//!                                     CanvasBackend
//! ```
//!
//! LIFECYCLE
//! =========
//! `Idle -> Generating -> {Completed | Cancelled | Failed}`. Terminal states
//! are final: later events are ignored.
//!
//! CANCELLATION
//! ============
//! Each session carries a [`CancelToken`] backed by a `watch` channel. The run
//! loop races the next event against the token, and `apply` re-checks the
//! token after the canvas lock is taken, so once `cancel` returns no further
//! canvas write happens for that session. [`SessionManager`] cancels the
//! active session whenever a new one begins.

use std::fmt;
use std::sync::Arc;

use canvas::CanvasBackend;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::anchor::{AnchorAssigner, AnchorPolicy};
use crate::client::{Credentials, GenerateRequest, ModifyRequest, RequestPayload};
use crate::error::ErrorCode;
use crate::layout::{LayoutConfig, LayoutEngine, LayoutError};
use crate::model::{DiagramElement, Orientation};
use crate::scene::{DrawReport, SceneError, SceneReconciler, StoredDiagram};
use crate::stream::{ChunkSource, EventStream, StreamEvent};

/// Shown when a request is submitted with nothing to send.
pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a description.";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{}", EMPTY_INPUT_MESSAGE)]
    EmptyInput,

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "E_EMPTY_INPUT",
            Self::Layout(err) => err.error_code(),
            Self::Scene(err) => err.error_code(),
        }
    }
}

impl SessionError {
    /// Draw problems caught before the first canvas write. The frame is
    /// skipped and the session keeps streaming.
    #[must_use]
    pub fn skips_frame(&self) -> bool {
        matches!(self, Self::Scene(SceneError::MissingPosition(_) | SceneError::AnchorMismatch { .. }))
    }
}

// =============================================================================
// IDENTITY AND CANCELLATION
// =============================================================================

/// Time-ordered session id; doubles as the `diagramId` tag value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`Self::cancel`] has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // The sender lives as long as `self`; a closed channel never cancels.
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Generating,
    Completed,
    Cancelled,
    Failed,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub orientation: Orientation,
    pub anchor_policy: AnchorPolicy,
    pub layout: LayoutConfig,
}

/// Summary of a finished (or abandoned) session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    pub id: SessionId,
    pub state: SessionState,
    pub elements: usize,
    pub draws: usize,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub skipped_fragments: usize,
}

pub struct DiagramSession {
    id: SessionId,
    tag: String,
    options: SessionOptions,
    engine: LayoutEngine,
    reconciler: SceneReconciler,
    cancel: CancelToken,
    state: SessionState,
    edges: Vec<DiagramElement>,
    status: String,
    error: Option<String>,
    draws: usize,
    /// Diagram being rewritten by a modify request, and whether its
    /// primitives are gone yet.
    source: Option<StoredDiagram>,
    source_cleared: bool,
}

impl DiagramSession {
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self::with_token(SessionId::new(), options, CancelToken::new())
    }

    #[must_use]
    pub fn with_token(id: SessionId, options: SessionOptions, cancel: CancelToken) -> Self {
        Self {
            tag: id.to_string(),
            id,
            options,
            engine: LayoutEngine::new(options.layout),
            reconciler: SceneReconciler::default(),
            cancel,
            state: SessionState::Idle,
            edges: Vec::new(),
            status: String::new(),
            error: None,
            draws: 0,
            source: None,
            source_cleared: false,
        }
    }

    /// Turn this into a modify session for `source`. The element list starts
    /// as the source's elements and streamed batches are appended to it, so
    /// every frame this session draws contains the whole source diagram. The
    /// source's own primitives are removed after the first successful draw.
    #[must_use]
    pub fn modifying(mut self, source: StoredDiagram) -> Self {
        self.edges.clone_from(&source.edges);
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn edges(&self) -> &[DiagramElement] {
        &self.edges
    }

    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn draws(&self) -> usize {
        self.draws
    }

    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Build the upstream request for `input`: a description for a new
    /// diagram, or instructions when modifying. A modify request names the
    /// source diagram; this session's own id only tags what it draws.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyInput`] when `input` is blank.
    pub fn request(&self, input: &str, credentials: &Credentials) -> Result<RequestPayload, SessionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let payload = match &self.source {
            None => RequestPayload::Generate(GenerateRequest {
                diagram_id: self.tag.clone(),
                diagram_description: input.to_owned(),
                license_key: credentials.license_key.clone(),
                model: credentials.model,
            }),
            Some(source) => RequestPayload::Modify(ModifyRequest {
                diagram_id: source.diagram_id.clone(),
                diagram_node_id: source.node_id.clone().unwrap_or_default(),
                diagram_data: source.edges.clone(),
                instructions: input.to_owned(),
                license_key: credentials.license_key.clone(),
                model: credentials.model,
            }),
        };
        Ok(payload)
    }

    /// Move from `Idle` to `Generating`. No effect in any other state.
    pub fn start(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Generating;
            info!(session_id = %self.id, "session: generating");
        }
    }

    /// Stop the session. Idempotent; a finished session keeps its state.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if !self.state.is_terminal() {
            self.state = SessionState::Cancelled;
            info!(session_id = %self.id, draws = self.draws, "session: cancelled");
        }
    }

    /// Apply one event. Returns `false` once the session will accept no more.
    pub fn apply<C: CanvasBackend + ?Sized>(&mut self, event: StreamEvent, canvas: &mut C) -> bool {
        if self.cancel.is_cancelled() {
            if !self.state.is_terminal() {
                self.state = SessionState::Cancelled;
            }
            debug!(session_id = %self.id, event = event.kind(), "session: event after cancel ignored");
            return false;
        }
        if self.state != SessionState::Generating {
            debug!(session_id = %self.id, state = ?self.state, event = event.kind(), "session: event ignored");
            return false;
        }

        match event {
            StreamEvent::Message(text) => {
                self.status.push_str(&text);
                true
            }
            StreamEvent::NodeBatch(batch) => {
                self.edges.extend(batch);
                match self.redraw(canvas) {
                    Ok(report) => {
                        debug!(session_id = %self.id, nodes = report.nodes.len(), deleted = report.deleted, "session: redrawn");
                        true
                    }
                    Err(err) if err.skips_frame() => {
                        error!(session_id = %self.id, error = %err, code = err.error_code(), "session: frame skipped");
                        self.status = err.to_string();
                        true
                    }
                    Err(err) => {
                        error!(session_id = %self.id, error = %err, code = err.error_code(), "session: draw failed");
                        self.error = Some(err.to_string());
                        self.state = SessionState::Failed;
                        false
                    }
                }
            }
            StreamEvent::End => {
                self.state = SessionState::Completed;
                info!(session_id = %self.id, elements = self.edges.len(), draws = self.draws, "session: completed");
                false
            }
            StreamEvent::Error(message) => {
                warn!(session_id = %self.id, %message, "session: upstream failed");
                self.status.clone_from(&message);
                self.error = Some(message);
                self.state = SessionState::Failed;
                false
            }
        }
    }

    /// Lay out and draw the current element list.
    ///
    /// # Errors
    ///
    /// Layout or scene failure; the canvas may hold a partial frame after a
    /// backend error.
    pub fn redraw<C: CanvasBackend + ?Sized>(&mut self, canvas: &mut C) -> Result<DrawReport, SessionError> {
        let orientation = self.options.orientation;
        let layout = self.engine.layout(&self.edges, orientation)?;
        let anchors = AnchorAssigner::new(orientation, self.options.anchor_policy).assign(&self.edges, &layout);
        let report = self.reconciler.draw(canvas, &self.tag, &self.edges, &layout, &anchors)?;
        self.draws += 1;

        if let Some(source) = self.source.as_ref().filter(|_| !self.source_cleared) {
            let removed = self.reconciler.clear(canvas, &source.diagram_id)?;
            self.source_cleared = true;
            info!(session_id = %self.id, replaced = %source.diagram_id, removed, "session: replaced source diagram");
        }
        Ok(report)
    }

    /// Drive the session from `events` until it ends or is cancelled.
    pub async fn run<S, C>(&mut self, events: &mut EventStream<S>, canvas: &Mutex<C>) -> SessionOutcome
    where
        S: ChunkSource,
        C: CanvasBackend + Send,
    {
        self.start();
        let cancel = self.cancel.clone();
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                event = events.next_event() => event,
            };
            let Some(event) = next else { break };
            let mut guard = canvas.lock().await;
            if !self.apply(event, &mut *guard) {
                break;
            }
        }
        if !self.state.is_terminal() {
            // Cancelled, or the transport went away without a terminal event.
            self.state = SessionState::Cancelled;
            info!(session_id = %self.id, draws = self.draws, "session: stopped without completion");
        }
        self.outcome(events.skipped_fragments())
    }

    #[must_use]
    pub fn outcome(&self, skipped_fragments: usize) -> SessionOutcome {
        SessionOutcome {
            id: self.id.clone(),
            state: self.state,
            elements: self.edges.len(),
            draws: self.draws,
            status: self.status.clone(),
            error: self.error.clone(),
            skipped_fragments,
        }
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Ensures at most one session is generating at a time.
#[derive(Debug, Default)]
pub struct SessionManager {
    options: SessionOptions,
    active: Option<(SessionId, CancelToken)>,
}

impl SessionManager {
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self { options, active: None }
    }

    /// Start a new generate session, cancelling whichever one was active.
    pub fn begin(&mut self) -> DiagramSession {
        self.cancel_active();
        let session = DiagramSession::with_token(SessionId::new(), self.options, CancelToken::new());
        self.active = Some((session.id().clone(), session.cancel_token()));
        session
    }

    /// Start a modify session for `source`, cancelling whichever one was active.
    pub fn begin_modify(&mut self, source: StoredDiagram) -> DiagramSession {
        self.begin().modifying(source)
    }

    /// Cancel the active session, if any, and return its id.
    pub fn cancel_active(&mut self) -> Option<SessionId> {
        let (id, token) = self.active.take()?;
        token.cancel();
        info!(session_id = %id, "session manager: superseded");
        Some(id)
    }

    /// Forget `id` if it is still the active session.
    pub fn finish(&mut self, id: &SessionId) {
        if self.active.as_ref().is_some_and(|(active, _)| active == id) {
            self.active = None;
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<&SessionId> {
        self.active.as_ref().map(|(id, _)| id)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
