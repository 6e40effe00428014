//! Editor presets endpoint
//!
//! GET /api/v1/presets - Resize presets, crop presets and adjustment sliders

use axum::{routing::get, Router};
use pixel_core::{AspectPreset, CropPreset, FilterConfig, CROP_PRESETS, FILTER_CONFIGS, RESIZE_PRESETS};
use serde::Serialize;

use super::error::{ok, ApiResult};
use super::AppState;

/// Choices the tool panels offer
#[derive(Debug, Serialize)]
pub struct PresetsResponse {
    pub resize: &'static [AspectPreset],
    pub crop: &'static [CropPreset],
    pub filters: &'static [FilterConfig],
}

/// List editor presets
pub async fn presets() -> ApiResult<PresetsResponse> {
    ok(PresetsResponse {
        resize: &RESIZE_PRESETS,
        crop: &CROP_PRESETS,
        filters: &FILTER_CONFIGS,
    })
}

/// Create presets routes
pub fn presets_routes() -> Router<AppState> {
    Router::new().route("/api/v1/presets", get(presets))
}
