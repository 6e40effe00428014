//! Editor Session Management
//!
//! One [`EditorSession`] exists per open project. It owns the canvas surface,
//! the undo history and the autosave scheduler, and remembers which tool
//! panel is active. Tool operations borrow the session; nothing outlives it.

use chrono::{DateTime, Utc};
use pixel_core::access::{PlanAccess, ToolId};
use pixel_core::geometry::ResizePlan;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::autosave::{AutosaveScheduler, CanvasChange, ProjectSink, SaveOutcome};
use crate::document::{CanvasDocument, CanvasSurface, DocumentSurface};
use crate::error::Result;
use crate::history::{HistoryManager, HistoryState, SharedHistory, DEFAULT_HISTORY_CAPACITY};
use crate::store::Project;

/// Editor tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSettings {
    /// Snapshots kept per session
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Quiet period before an autosave (milliseconds)
    #[serde(default = "default_autosave_quiet_ms")]
    pub autosave_quiet_ms: u64,

    /// Idle time before a session is swept (seconds)
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: i64,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_autosave_quiet_ms() -> u64 {
    2000
}

fn default_session_idle_secs() -> i64 {
    3600
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            autosave_quiet_ms: default_autosave_quiet_ms(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl EditorSettings {
    /// Autosave quiet period
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave_quiet_ms)
    }
}

/// Snapshot of a session for clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Project being edited
    pub project_id: Uuid,
    /// Active tool panel
    pub active_tool: ToolId,
    /// Message shown while a long operation runs
    pub processing_message: Option<String>,
    /// Undo/redo position
    pub history: HistoryState,
    /// Whether an autosave is scheduled
    pub autosave_pending: bool,
    /// Outcome of the most recent save
    pub last_save: Option<SaveOutcome>,
    /// Tools the plan does not include
    pub restricted_tools: Vec<ToolId>,
}

/// An open editor
pub struct EditorSession {
    project_id: Uuid,
    user_id: Uuid,
    surface: Arc<DocumentSurface>,
    history: SharedHistory,
    autosave: AutosaveScheduler,
    active_tool: RwLock<ToolId>,
    processing_message: RwLock<Option<String>>,
    access: RwLock<PlanAccess>,
    created_at: DateTime<Utc>,
    last_accessed_at: RwLock<DateTime<Utc>>,
}

impl EditorSession {
    /// Open a session over a stored project.
    ///
    /// The stored canvas becomes the first history entry.
    pub async fn open(
        project: &Project,
        access: PlanAccess,
        sink: Arc<dyn ProjectSink>,
        settings: EditorSettings,
    ) -> Result<Self> {
        let document = CanvasDocument::from_state(&project.canvas_state, project.size())?;
        let surface = Arc::new(DocumentSurface::new(document));
        let initial = surface.snapshot().await?;

        let autosave = AutosaveScheduler::new(
            project.id,
            surface.clone(),
            sink,
            settings.quiet_period(),
            project.canvas_version,
        );
        let now = Utc::now();

        Ok(Self {
            project_id: project.id,
            user_id: project.user_id,
            surface,
            history: SharedHistory::new(HistoryManager::with_initial(
                settings.history_capacity,
                initial,
            )),
            autosave,
            active_tool: RwLock::new(ToolId::default()),
            processing_message: RwLock::new(None),
            access: RwLock::new(access),
            created_at: now,
            last_accessed_at: RwLock::new(now),
        })
    }

    /// Project being edited
    #[must_use]
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// User editing the project
    #[must_use]
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// When the session was opened
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Plan access for this session
    pub async fn access(&self) -> PlanAccess {
        *self.access.read().await
    }

    /// Apply a plan change to the open session.
    ///
    /// An active tool the new plan does not include falls back to the
    /// default tool.
    pub async fn set_access(&self, access: PlanAccess) {
        *self.access.write().await = access;
        let mut active = self.active_tool.write().await;
        if !access.has_access(*active) {
            info!(project_id = %self.project_id, tool = %active.as_str(), "Active tool no longer in plan");
            *active = ToolId::default();
        }
    }

    /// Current canvas document
    pub async fn document(&self) -> CanvasDocument {
        self.surface.document().await
    }

    /// Replace the canvas with an edited document.
    ///
    /// Returns whether the edit was recorded in the history; edits landing
    /// while a snapshot is being restored are not.
    pub async fn apply_change(&self, document: CanvasDocument, change: CanvasChange) -> Result<bool> {
        self.touch().await;
        self.surface.replace(document).await;

        let snapshot = self.surface.snapshot().await?;
        let recorded = self.history.push(snapshot).await;
        self.autosave.notify(change).await;

        debug!(project_id = %self.project_id, ?change, recorded, "Applied canvas change");
        Ok(recorded)
    }

    /// Step back one history entry
    pub async fn undo(&self) -> Result<bool> {
        self.touch().await;
        let restored = self.history.undo(self.surface.as_ref()).await?;
        if restored {
            self.autosave.notify(CanvasChange::Restored).await;
        }
        Ok(restored)
    }

    /// Step forward one history entry
    pub async fn redo(&self) -> Result<bool> {
        self.touch().await;
        let restored = self.history.redo(self.surface.as_ref()).await?;
        if restored {
            self.autosave.notify(CanvasChange::Restored).await;
        }
        Ok(restored)
    }

    /// Switch the active tool panel; tools outside the plan are refused
    pub async fn set_active_tool(&self, tool: ToolId) -> Result<()> {
        self.touch().await;
        self.access.read().await.check_tool(tool)?;
        *self.active_tool.write().await = tool;
        Ok(())
    }

    /// Active tool panel
    pub async fn active_tool(&self) -> ToolId {
        *self.active_tool.read().await
    }

    /// Set or clear the processing message
    pub async fn set_processing(&self, message: Option<String>) {
        *self.processing_message.write().await = message;
    }

    /// Run a long operation with `message` shown, clearing it afterwards
    pub async fn processing<F, T>(&self, message: &str, work: F) -> T
    where
        F: Future<Output = T>,
    {
        self.touch().await;
        self.set_processing(Some(message.to_string())).await;
        let result = work.await;
        self.set_processing(None).await;
        result
    }

    /// Resize the canvas and save immediately.
    ///
    /// Returns `None` when the size is unchanged.
    pub async fn resize(&self, plan: ResizePlan) -> Result<Option<SaveOutcome>> {
        if plan.is_noop() {
            return Ok(None);
        }

        let mut document = self.surface.document().await;
        document.set_size(plan.to);
        self.apply_change(document, CanvasChange::ObjectModified).await?;

        info!(project_id = %self.project_id, from = %plan.from, to = %plan.to, "Canvas resized");
        Ok(Some(self.autosave.save_now().await))
    }

    /// Save immediately, bypassing the quiet period
    pub async fn save_now(&self) -> SaveOutcome {
        self.touch().await;
        self.autosave.save_now().await
    }

    /// Summarize the session
    pub async fn state(&self) -> SessionState {
        SessionState {
            project_id: self.project_id,
            active_tool: self.active_tool().await,
            processing_message: self.processing_message.read().await.clone(),
            history: self.history.state().await,
            autosave_pending: self.autosave.is_pending().await,
            last_save: self.autosave.last_outcome().await,
            restricted_tools: self.access().await.restricted_tools(),
        }
    }

    /// Drop any pending autosave
    pub async fn close(&self) {
        self.autosave.cancel().await;
    }

    /// Update last accessed timestamp
    pub async fn touch(&self) {
        *self.last_accessed_at.write().await = Utc::now();
    }

    /// Check if the session has been idle longer than `max_idle_secs`
    pub async fn is_expired(&self, max_idle_secs: i64) -> bool {
        let idle = Utc::now() - *self.last_accessed_at.read().await;
        idle.num_seconds() > max_idle_secs
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("project_id", &self.project_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Open editor sessions keyed by project
pub struct EditorSessionManager {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<EditorSession>>>>,
    settings: EditorSettings,
}

impl EditorSessionManager {
    /// Create a new session manager
    #[must_use]
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            settings,
        }
    }

    /// Settings applied to new sessions
    #[must_use]
    pub fn settings(&self) -> EditorSettings {
        self.settings
    }

    /// Open the editor for a project.
    ///
    /// An open session of the same user is reused; one left by another
    /// user is closed and replaced.
    pub async fn open(
        &self,
        project: &Project,
        access: PlanAccess,
        sink: Arc<dyn ProjectSink>,
    ) -> Result<Arc<EditorSession>> {
        let mut sessions = self.sessions.write().await;

        if let Some(existing) = sessions.get(&project.id) {
            if existing.user_id == project.user_id && existing.access().await == access {
                existing.touch().await;
                return Ok(existing.clone());
            }
            existing.close().await;
        }

        let session = Arc::new(EditorSession::open(project, access, sink, self.settings).await?);
        sessions.insert(project.id, session.clone());

        info!(project_id = %project.id, user_id = %project.user_id, "Editor session opened");
        Ok(session)
    }

    /// Get an open session
    pub async fn get(&self, project_id: Uuid) -> Option<Arc<EditorSession>> {
        let session = self.sessions.read().await.get(&project_id).cloned()?;
        session.touch().await;
        Some(session)
    }

    /// Close a session, cancelling its pending autosave
    pub async fn close(&self, project_id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&project_id);
        match removed {
            Some(session) => {
                session.close().await;
                info!(project_id = %project_id, "Editor session closed");
                true
            }
            None => false,
        }
    }

    /// Apply a user's new plan to every session they have open
    pub async fn refresh_access(&self, user_id: Uuid, access: PlanAccess) -> usize {
        let sessions = self.sessions.read().await;
        let mut refreshed = 0;
        for session in sessions.values().filter(|s| s.user_id == user_id) {
            session.set_access(access).await;
            refreshed += 1;
        }
        if refreshed > 0 {
            info!(user_id = %user_id, plan = %access.plan(), sessions = refreshed, "Refreshed session plan");
        }
        refreshed
    }

    /// Close sessions idle longer than the configured idle time
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;

        let mut expired = Vec::new();
        for (id, session) in sessions.iter() {
            if session.is_expired(self.settings.session_idle_secs).await {
                expired.push(*id);
            }
        }

        for id in &expired {
            if let Some(session) = sessions.remove(id) {
                session.close().await;
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Swept idle editor sessions");
        }
        expired.len()
    }

    /// Get the number of open sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for EditorSessionManager {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

#[cfg(test)]
mod tests;
