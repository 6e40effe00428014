//! Media API endpoints
//!
//! POST /api/v1/upload                     - Multipart image upload (`file`, `fileName`)
//! GET  /api/v1/stock/search               - Stock photo search
//! POST /api/v1/stock/:photo_id/download   - Report a stock photo as used

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use pixel_media::upload::MAX_UPLOAD_BYTES;
use pixel_media::{StockSearch, UploadResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{ok, ApiResult};
use super::identity::CurrentUser;
use super::AppState;

/// Stock search query parameters
#[derive(Debug, Deserialize)]
pub struct StockQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

/// Download ping acknowledgement
#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub tracked: bool,
}

/// Store an uploaded image.
///
/// Responds with the upload contract `{success, url, width, height}` or
/// `{success: false, error}` rather than the API envelope.
pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    mut multipart: Multipart,
) -> (StatusCode, Json<UploadResponse>) {
    let mut bytes = None;
    let mut file_name = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Malformed upload");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(UploadResponse::failure(format!("malformed upload: {e}"))),
                );
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                if file_name.is_none() {
                    file_name = field.file_name().map(str::to_string);
                }
                match field.bytes().await {
                    Ok(data) => bytes = Some(data),
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(UploadResponse::failure(format!("failed to read file: {e}"))),
                        );
                    }
                }
            }
            Some("fileName") => {
                if let Ok(name) = field.text().await {
                    if !name.trim().is_empty() {
                        file_name = Some(name);
                    }
                }
            }
            _ => {}
        }
    }

    let Some(bytes) = bytes else {
        return (
            StatusCode::BAD_REQUEST,
            Json(UploadResponse::failure("missing file field")),
        );
    };
    let file_name = file_name.unwrap_or_else(|| "upload".to_string());

    match state.media.save(&file_name, &bytes).await {
        Ok(stored) => (StatusCode::OK, Json(UploadResponse::from(stored))),
        Err(e) => {
            let status = if e.is_recoverable() {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::BAD_REQUEST
            };
            warn!(error = %e, file_name = %file_name, "Upload rejected");
            (status, Json(UploadResponse::failure(e.to_string())))
        }
    }
}

/// Search stock photos
pub async fn search_stock(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<StockQuery>,
) -> ApiResult<StockSearch> {
    ok(state.stock.search(&query.query, query.page).await?)
}

/// Report a stock photo as used.
///
/// The ping runs in the background; its failures never reach the caller.
pub async fn track_download(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(photo_id): Path<String>,
) -> ApiResult<TrackResponse> {
    let stock = state.stock.clone();
    tokio::spawn(async move {
        stock.track_download(&photo_id).await;
    });
    ok(TrackResponse { tracked: true })
}

/// Create media routes
pub fn media_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 1024 * 1024)),
        )
        .route("/api/v1/stock/search", get(search_stock))
        .route("/api/v1/stock/:photo_id/download", post(track_download))
}
