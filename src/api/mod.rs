//! Web API module for Pixel
//!
//! Provides REST API endpoints for:
//! - Users and plan access
//! - Projects, exports, adjustments and image transforms
//! - Editor sessions (history, autosave, active tool)
//! - Uploads and stock photos
//! - Tool presets

pub mod editor;
pub mod error;
pub mod health;
pub mod identity;
pub mod media;
pub mod presets;
pub mod projects;
pub mod users;

use axum::Router;
use pixel_canvas::{EditorSessionManager, ProjectStore};
use pixel_core::PlanLimits;
use pixel_media::{MediaStore, StockPhotoClient, Transformer};
use std::sync::Arc;

pub use editor::editor_routes;
pub use health::health_routes;
pub use media::media_routes;
pub use presets::presets_routes;
pub use projects::projects_routes;
pub use users::users_routes;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProjectStore>,
    pub sessions: Arc<EditorSessionManager>,
    pub media: Arc<MediaStore>,
    pub stock: Arc<StockPhotoClient>,
    pub transformer: Transformer,
}

impl AppState {
    /// Plan limits in effect
    pub fn limits(&self) -> PlanLimits {
        self.store.limits()
    }
}

/// Create the API router with all endpoints
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(users_routes())
        .merge(projects_routes())
        .merge(editor_routes())
        .merge(media_routes())
        .merge(presets_routes())
        .with_state(state)
}
