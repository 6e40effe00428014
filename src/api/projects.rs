//! Projects API endpoints
//!
//! GET    /api/v1/projects                 - List projects (most recent first)
//! POST   /api/v1/projects                 - Create a project
//! GET    /api/v1/projects/:id             - Get a project
//! PATCH  /api/v1/projects/:id             - Partial update
//! DELETE /api/v1/projects/:id             - Delete a project
//! POST   /api/v1/projects/:id/export      - Count an export against the quota
//! GET    /api/v1/projects/:id/adjustments - Load adjustment values
//! PUT    /api/v1/projects/:id/adjustments - Save adjustment values
//! DELETE /api/v1/projects/:id/adjustments - Reset adjustment values
//! POST   /api/v1/projects/:id/resize      - Resize the canvas
//! POST   /api/v1/projects/:id/crop        - Crop the main image
//! PUT    /api/v1/projects/:id/background-image - Cover the canvas with an image
//! POST   /api/v1/projects/:id/extend      - AI generative extension
//! POST   /api/v1/projects/:id/background  - AI background removal
//!
//! Canvas edits go through the caller's open editor session when there is
//! one, so its history and the stored project agree.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use pixel_canvas::{
    CanvasChange, CanvasDocument, EditorSession, NewProject, PatchOutcome, Project, ProjectPatch,
    SaveOutcome, User,
};
use pixel_core::geometry::{
    extended_size, extension_fit_scale, initial_crop_rect, map_crop,
};
use pixel_core::{
    aspect_locked, AdjustmentValues, AspectPreset, CropPreset, CropRegion, Direction, Rect,
    ResizePlan, Size, ToolId,
};
use pixel_media::has_background_removal;
use pixel_media::transform::BACKGROUND_REMOVAL;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::{ok, ApiError, ApiResult};
use super::identity::CurrentUser;
use super::AppState;

const EXTENDING: &str = "Extending image with AI...";
const REMOVING_BACKGROUND: &str = "Removing background...";

/// Result of a partial update
#[derive(Debug, Serialize)]
pub struct PatchResponse {
    pub outcome: PatchOutcome,
    pub project: Project,
}

/// Export quota after recording an export
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub exports_this_month: u32,
    /// `None` on unlimited plans
    pub remaining: Option<u32>,
}

/// Result of clearing adjustments
#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: bool,
}

/// Requested canvas size
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResizeRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Resize preset name or label; the canvas keeps its area
    pub preset: Option<String>,
    /// Derive the missing edge from the current aspect ratio
    pub lock_aspect: bool,
}

impl ResizeRequest {
    /// Resolve the requested size against the current canvas
    pub fn target(&self, current: Size) -> Result<Size, ApiError> {
        if let Some(name) = &self.preset {
            return AspectPreset::find(name)
                .map(|preset| preset.dimensions_for(current))
                .ok_or_else(|| ApiError::invalid_input(format!("unknown resize preset: {name}")));
        }
        let missing = || ApiError::invalid_input("width or height is required");
        if self.lock_aspect {
            return aspect_locked(current, self.width, self.height).ok_or_else(missing);
        }
        match (self.width, self.height) {
            (None, None) => Err(missing()),
            (width, height) => Ok(Size::new(
                width.unwrap_or(current.width),
                height.unwrap_or(current.height),
            )),
        }
    }
}

/// Result of a resize
#[derive(Debug, Serialize)]
pub struct ResizeResponse {
    pub plan: ResizePlan,
    pub changed: bool,
    /// True when an edge grows, false when the canvas is cropped
    pub expands: bool,
    /// Present when an open editor session saved the resized canvas
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveOutcome>,
    pub project: Project,
}

/// Crop request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CropRequest {
    /// On-canvas crop rectangle; defaults to the image bounds inset on every side
    pub rect: Option<Rect>,
    /// Crop preset label constraining the aspect ratio
    pub preset: Option<String>,
}

/// Result of a crop
#[derive(Debug, Serialize)]
pub struct CropResponse {
    /// Crop rectangle on the canvas
    pub rect: Rect,
    /// Crop window in source image pixels
    pub region: CropRegion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveOutcome>,
    pub project: Project,
}

/// Background image request; `width`/`height` are the image's own pixels
#[derive(Debug, Deserialize)]
pub struct BackgroundImageRequest {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Result of setting a background image
#[derive(Debug, Serialize)]
pub struct BackgroundImageResponse {
    /// Scale covering the canvas
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save: Option<SaveOutcome>,
    pub project: Project,
}

/// Generative extension request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendRequest {
    pub direction: Direction,
    pub amount: u32,
    /// Image width on the canvas after scaling; defaults to the canvas width
    #[serde(default)]
    pub scaled_width: Option<f64>,
    /// Image height on the canvas after scaling; defaults to the canvas height
    #[serde(default)]
    pub scaled_height: Option<f64>,
}

/// Result of a generative extension
#[derive(Debug, Serialize)]
pub struct ExtendResponse {
    pub url: String,
    pub size: Size,
    /// Scale fitting the extended image back onto the canvas
    pub fit_scale: f64,
    pub project: Project,
}

/// Result of a background removal
#[derive(Debug, Serialize)]
pub struct BackgroundResponse {
    pub url: String,
    /// False when the image is not served by the transform CDN
    pub applied: bool,
    pub project: Project,
}

/// Open editor session on `project_id` owned by `user`
async fn user_session(state: &AppState, user: &User, project_id: Uuid) -> Option<Arc<EditorSession>> {
    state
        .sessions
        .get(project_id)
        .await
        .filter(|session| session.user_id() == user.id)
}

/// Canvas as the caller currently sees it
async fn current_document(
    session: Option<&EditorSession>,
    project: &Project,
) -> Result<CanvasDocument, ApiError> {
    match session {
        Some(session) => Ok(session.document().await),
        None => Ok(CanvasDocument::from_state(&project.canvas_state, project.size())?),
    }
}

/// Write an edited canvas through the session and save it, or patch the store
async fn commit_document(
    state: &AppState,
    user: &User,
    project_id: Uuid,
    session: Option<&EditorSession>,
    document: CanvasDocument,
) -> Result<Option<SaveOutcome>, ApiError> {
    match session {
        Some(session) => {
            session
                .apply_change(document, CanvasChange::ObjectModified)
                .await?;
            Ok(Some(session.save_now().await))
        }
        None => {
            let patch = ProjectPatch {
                canvas_state: Some(document.to_value()?),
                ..Default::default()
            };
            state.store.update_project(user, project_id, patch).await?;
            Ok(None)
        }
    }
}

/// Point the open session's main image at a transformed URL
async fn swap_session_image(session: Option<&EditorSession>, url: &str) -> Result<(), ApiError> {
    if let Some(session) = session {
        let mut document = session.document().await;
        if document.set_main_image_src(url) {
            session
                .apply_change(document, CanvasChange::ObjectModified)
                .await?;
        }
    }
    Ok(())
}

/// List the caller's projects
pub async fn list_projects(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Vec<Project>> {
    ok(state.store.list_projects(&user).await?)
}

/// Create a project
pub async fn create_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<NewProject>,
) -> ApiResult<Project> {
    ok(state.store.create_project(&user, request).await?)
}

/// Get a project
pub async fn get_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Project> {
    ok(state.store.get_project(&user, id).await?)
}

/// Apply a partial update
pub async fn update_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(patch): Json<ProjectPatch>,
) -> ApiResult<PatchResponse> {
    let outcome = state.store.update_project(&user, id, patch).await?;
    let project = state.store.get_project(&user, id).await?;
    ok(PatchResponse { outcome, project })
}

/// Delete a project, closing its editor session
pub async fn delete_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    state.store.delete_project(&user, id).await?;
    state.sessions.close(id).await;
    ok(())
}

/// Count an export against the monthly quota
pub async fn export_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ExportResponse> {
    state.store.get_project(&user, id).await?;
    let user = state.store.record_export(&user).await?;

    let remaining = (!user.plan.is_pro()).then(|| {
        state
            .limits()
            .free_export_limit
            .saturating_sub(user.exports_this_month)
    });
    info!(project_id = %id, user_id = %user.id, exports = user.exports_this_month, "Export recorded");
    ok(ExportResponse {
        exports_this_month: user.exports_this_month,
        remaining,
    })
}

/// Load adjustment values.
///
/// With nothing saved the values are read back from the filters on the
/// canvas image.
pub async fn get_adjustments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<AdjustmentValues> {
    let values = state.store.load_adjustments(&user, id).await?;
    if !values.is_default() {
        return ok(values);
    }

    let project = state.store.get_project(&user, id).await?;
    let session = user_session(&state, &user, id).await;
    let document = current_document(session.as_deref(), &project).await?;
    ok(AdjustmentValues::from_filters(&document.main_image_filters()))
}

/// Save adjustment values; out-of-range values are clamped.
///
/// An open editor applies them to its image as canvas filters.
pub async fn put_adjustments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(values): Json<AdjustmentValues>,
) -> ApiResult<AdjustmentValues> {
    let values = state.store.save_adjustments(&user, id, &values).await?;
    apply_filters(user_session(&state, &user, id).await.as_deref(), &values).await?;
    ok(values)
}

/// Reset adjustment values
pub async fn delete_adjustments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<ClearedResponse> {
    let cleared = state.store.clear_adjustments(&user, id).await?;
    apply_filters(
        user_session(&state, &user, id).await.as_deref(),
        &AdjustmentValues::default(),
    )
    .await?;
    ok(ClearedResponse { cleared })
}

async fn apply_filters(
    session: Option<&EditorSession>,
    values: &AdjustmentValues,
) -> Result<(), ApiError> {
    let Some(session) = session else {
        return Ok(());
    };
    let mut document = session.document().await;
    let filters = values.to_filters();
    if document.main_image_filters() != filters && document.set_main_image_filters(filters) {
        session
            .apply_change(document, CanvasChange::ObjectModified)
            .await?;
    }
    Ok(())
}

/// Resize the canvas.
///
/// With an editor session open the session's document is resized and saved
/// so the history and the stored project agree; otherwise the project is
/// patched directly.
pub async fn resize_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ResizeRequest>,
) -> ApiResult<ResizeResponse> {
    let project = state.store.get_project(&user, id).await?;
    user.access(state.limits()).check_tool(ToolId::Resize)?;
    let plan = ResizePlan::new(project.size(), request.target(project.size())?)?;

    let save = match user_session(&state, &user, id).await {
        Some(session) => session.resize(plan).await?,
        None => {
            if !plan.is_noop() {
                let patch = ProjectPatch {
                    width: Some(plan.to.width),
                    height: Some(plan.to.height),
                    ..Default::default()
                };
                state.store.update_project(&user, id, patch).await?;
            }
            None
        }
    };

    let changed = !plan.is_noop() && save.as_ref().map_or(true, SaveOutcome::is_saved);
    let project = state.store.get_project(&user, id).await?;
    ok(ResizeResponse {
        plan,
        changed,
        expands: plan.expands(),
        save,
        project,
    })
}

/// Crop the main image.
///
/// The crop rectangle is mapped back into the image's source pixels and
/// stored on the image object.
pub async fn crop_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CropRequest>,
) -> ApiResult<CropResponse> {
    let project = state.store.get_project(&user, id).await?;
    user.access(state.limits()).check_tool(ToolId::Crop)?;

    let ratio = match &request.preset {
        Some(label) => CropPreset::find(label)
            .ok_or_else(|| ApiError::invalid_input(format!("unknown crop preset: {label}")))?
            .ratio,
        None => None,
    };

    let session = user_session(&state, &user, id).await;
    let mut document = current_document(session.as_deref(), &project).await?;
    document.place_main_image(&project.current_image_url, project.size());
    let (bounds, scale) = document
        .main_image_bounds()
        .ok_or_else(|| ApiError::invalid_input("canvas has no image to crop"))?;

    let mut rect = request.rect.unwrap_or_else(|| initial_crop_rect(&bounds));
    if let Some(ratio) = ratio {
        rect = rect.with_aspect_ratio(ratio);
    }
    let region = map_crop(&rect, &bounds, scale);
    if !(region.width > 0.0 && region.height > 0.0) {
        return Err(ApiError::invalid_input("crop rectangle does not overlap the image"));
    }

    document.crop_main_image(&region);
    let save = commit_document(&state, &user, id, session.as_deref(), document).await?;
    let project = state.store.get_project(&user, id).await?;

    info!(project_id = %id, x = region.x, y = region.y, width = region.width, height = region.height, "Image cropped");
    ok(CropResponse {
        rect,
        region,
        save,
        project,
    })
}

/// Cover the canvas with a background image
pub async fn set_background_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<BackgroundImageRequest>,
) -> ApiResult<BackgroundImageResponse> {
    let project = state.store.get_project(&user, id).await?;
    user.access(state.limits()).check_tool(ToolId::Background)?;

    let natural = Size::new(request.width, request.height);
    if request.url.trim().is_empty() || natural.is_empty() {
        return Err(ApiError::invalid_input("background image needs a url and a size"));
    }

    let session = user_session(&state, &user, id).await;
    let mut document = current_document(session.as_deref(), &project).await?;
    let scale = document.set_background_image(&request.url, natural);
    let save = commit_document(&state, &user, id, session.as_deref(), document).await?;
    let project = state.store.get_project(&user, id).await?;

    ok(BackgroundImageResponse {
        scale,
        save,
        project,
    })
}

/// Extend the image with generative fill
pub async fn extend_project(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ExtendRequest>,
) -> ApiResult<ExtendResponse> {
    let project = state.store.get_project(&user, id).await?;
    user.access(state.limits()).check_tool(ToolId::AiExtender)?;

    if request.amount == 0 {
        return Err(ApiError::invalid_input("extension amount must be positive"));
    }
    if has_background_removal(&project.current_image_url) {
        return Err(ApiError::invalid_input(
            "cannot extend an image with its background removed",
        ));
    }

    let scaled = (
        request.scaled_width.unwrap_or(f64::from(project.width)),
        request.scaled_height.unwrap_or(f64::from(project.height)),
    );
    if !(scaled.0 > 0.0 && scaled.1 > 0.0) {
        return Err(ApiError::invalid_input("scaled image size must be positive"));
    }

    let size = extended_size(scaled, request.direction, request.amount);
    let url = state.transformer.generative_fill(
        &project.current_image_url,
        size,
        Some(request.direction),
    );
    let fit_scale = extension_fit_scale(size, project.size());

    let patch = ProjectPatch {
        current_image_url: Some(url.clone()),
        active_transformation: Some("bg-genfill".to_string()),
        ..Default::default()
    };
    let session = user_session(&state, &user, id).await;
    let work = async {
        state.store.update_project(&user, id, patch).await?;
        swap_session_image(session.as_deref(), &url).await?;
        Ok::<_, ApiError>(())
    };
    match session.as_deref() {
        Some(session) => session.processing(EXTENDING, work).await?,
        None => work.await?,
    }
    let project = state.store.get_project(&user, id).await?;

    info!(project_id = %id, size = %size, direction = ?request.direction, "Image extended");
    ok(ExtendResponse {
        url,
        size,
        fit_scale,
        project,
    })
}

/// Remove the image background
pub async fn remove_background(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<BackgroundResponse> {
    let project = state.store.get_project(&user, id).await?;
    user.access(state.limits()).check_tool(ToolId::Background)?;

    let url = state
        .transformer
        .remove_background(&project.current_image_url);
    let applied = url != project.current_image_url;

    let project = if applied {
        let patch = ProjectPatch {
            current_image_url: Some(url.clone()),
            active_transformation: Some(BACKGROUND_REMOVAL.to_string()),
            background_removed: Some(true),
            ..Default::default()
        };
        let session = user_session(&state, &user, id).await;
        let work = async {
            state.store.update_project(&user, id, patch).await?;
            swap_session_image(session.as_deref(), &url).await?;
            Ok::<_, ApiError>(())
        };
        match session.as_deref() {
            Some(session) => session.processing(REMOVING_BACKGROUND, work).await?,
            None => work.await?,
        }
        state.store.get_project(&user, id).await?
    } else {
        project
    };

    ok(BackgroundResponse {
        url,
        applied,
        project,
    })
}

/// Create projects routes
pub fn projects_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/projects", get(list_projects).post(create_project))
        .route(
            "/api/v1/projects/:id",
            get(get_project)
                .patch(update_project)
                .delete(delete_project),
        )
        .route("/api/v1/projects/:id/export", post(export_project))
        .route(
            "/api/v1/projects/:id/adjustments",
            get(get_adjustments)
                .put(put_adjustments)
                .delete(delete_adjustments),
        )
        .route("/api/v1/projects/:id/resize", post(resize_project))
        .route("/api/v1/projects/:id/crop", post(crop_project))
        .route(
            "/api/v1/projects/:id/background-image",
            put(set_background_image),
        )
        .route("/api/v1/projects/:id/extend", post(extend_project))
        .route("/api/v1/projects/:id/background", post(remove_background))
}
