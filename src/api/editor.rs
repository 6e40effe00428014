//! Editor API endpoints
//!
//! POST   /api/v1/editor/:id/open    - Open an editor session for a project
//! POST   /api/v1/editor/:id/changes - Apply a canvas change
//! POST   /api/v1/editor/:id/undo    - Step back in the history
//! POST   /api/v1/editor/:id/redo    - Step forward in the history
//! POST   /api/v1/editor/:id/save    - Save immediately
//! POST   /api/v1/editor/:id/tool    - Switch the active tool
//! GET    /api/v1/editor/:id         - Session state, with the viewport zoom when
//!                                      the container size is given
//! DELETE /api/v1/editor/:id         - Close the session

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use pixel_canvas::{
    CanvasChange, CanvasDocument, EditorSession, Error as CanvasError, SaveOutcome, SessionState,
    StoreSink, User,
};
use pixel_core::geometry::viewport_scale;
use pixel_core::ToolId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::error::{ok, ApiResult};
use super::identity::CurrentUser;
use super::AppState;

/// Canvas change submitted by the editor
#[derive(Debug, Deserialize)]
pub struct ChangeRequest {
    pub change: CanvasChange,
    /// Full canvas document after the change
    pub document: serde_json::Value,
}

/// Result of a canvas change
#[derive(Debug, Serialize)]
pub struct ChangeResponse {
    /// False when the change landed during a restore and was not recorded
    pub recorded: bool,
    pub state: SessionState,
}

/// Result of undo or redo
#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored: bool,
    pub state: SessionState,
    pub document: CanvasDocument,
}

/// Tool switch request
#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
}

/// Editor container size in CSS pixels
#[derive(Debug, Default, Deserialize)]
pub struct ViewportQuery {
    pub container_width: Option<f64>,
    pub container_height: Option<f64>,
}

/// Session state with the zoom that shows the whole canvas
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

/// Result of closing a session
#[derive(Debug, Serialize)]
pub struct CloseResponse {
    pub closed: bool,
}

/// Open session owned by `user`
async fn owned_session(
    state: &AppState,
    user: &User,
    project_id: Uuid,
) -> Result<Arc<EditorSession>, CanvasError> {
    let session = state
        .sessions
        .get(project_id)
        .await
        .ok_or(CanvasError::SessionNotFound(project_id))?;
    if session.user_id() != user.id {
        return Err(CanvasError::AccessDenied(project_id));
    }
    Ok(session)
}

/// Open the editor for a project.
///
/// A canvas without an image starts with the project image fitted onto it.
pub async fn open_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionState> {
    let mut project = state.store.get_project(&user, id).await?;
    let mut document = CanvasDocument::from_state(&project.canvas_state, project.size())?;
    if document.place_main_image(&project.current_image_url, project.size()) {
        project.canvas_state = document.to_value()?;
    }

    let sink = Arc::new(StoreSink::new(state.store.clone(), user.clone()));
    let session = state
        .sessions
        .open(&project, user.access(state.limits()), sink)
        .await?;
    ok(session.state().await)
}

/// Apply a canvas change
pub async fn apply_change(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangeRequest>,
) -> ApiResult<ChangeResponse> {
    let session = owned_session(&state, &user, id).await?;
    let current = session.document().await;
    let document = CanvasDocument::from_state(&request.document, current.size())?;

    let recorded = session.apply_change(document, request.change).await?;
    ok(ChangeResponse {
        recorded,
        state: session.state().await,
    })
}

/// Step back one history entry
pub async fn undo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RestoreResponse> {
    let session = owned_session(&state, &user, id).await?;
    let restored = session.undo().await?;
    ok(RestoreResponse {
        restored,
        state: session.state().await,
        document: session.document().await,
    })
}

/// Step forward one history entry
pub async fn redo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<RestoreResponse> {
    let session = owned_session(&state, &user, id).await?;
    let restored = session.redo().await?;
    ok(RestoreResponse {
        restored,
        state: session.state().await,
        document: session.document().await,
    })
}

/// Save immediately
pub async fn save(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<SaveOutcome> {
    let session = owned_session(&state, &user, id).await?;
    ok(session.save_now().await)
}

/// Switch the active tool panel
pub async fn set_tool(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ToolRequest>,
) -> ApiResult<SessionState> {
    let session = owned_session(&state, &user, id).await?;
    let tool: ToolId = request.tool.parse()?;
    session.set_active_tool(tool).await?;
    ok(session.state().await)
}

/// Session state
pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Query(viewport): Query<ViewportQuery>,
) -> ApiResult<SessionView> {
    let session = owned_session(&state, &user, id).await?;
    let zoom = match (viewport.container_width, viewport.container_height) {
        (Some(width), Some(height)) => {
            Some(viewport_scale((width, height), session.document().await.size()))
        }
        _ => None,
    };
    ok(SessionView {
        state: session.state().await,
        zoom,
    })
}

/// Close the session, dropping any pending autosave
pub async fn close_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<CloseResponse> {
    owned_session(&state, &user, id).await?;
    let closed = state.sessions.close(id).await;
    ok(CloseResponse { closed })
}

/// Create editor routes
pub fn editor_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/editor/:id", get(get_session).delete(close_session))
        .route("/api/v1/editor/:id/open", post(open_session))
        .route("/api/v1/editor/:id/changes", post(apply_change))
        .route("/api/v1/editor/:id/undo", post(undo))
        .route("/api/v1/editor/:id/redo", post(redo))
        .route("/api/v1/editor/:id/save", post(save))
        .route("/api/v1/editor/:id/tool", post(set_tool))
}
