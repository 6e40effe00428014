//! Uploads
//!
//! Uploaded images are written under the media directory with a unique name
//! and served from `public_base_url`. The image header is probed for its
//! dimensions so the project can be sized before the canvas loads it.

use pixel_core::geometry::Size;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Size assumed when the image header cannot be read
pub const FALLBACK_SIZE: Size = Size::new(800, 600);

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Media storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSettings {
    /// Directory uploads are written to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// URL prefix the upload directory is served under
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Host of the image transform CDN
    #[serde(default = "default_transform_host")]
    pub transform_host: String,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_public_base_url() -> String {
    "/media".to_string()
}

fn default_transform_host() -> String {
    crate::transform::DEFAULT_TRANSFORM_HOST.to_string()
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            public_base_url: default_public_base_url(),
            transform_host: default_transform_host(),
        }
    }
}

/// Upload endpoint response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Whether the upload was stored
    pub success: bool,
    /// Public URL of the stored file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Image width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Image height
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResponse {
    /// Failed upload
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            width: None,
            height: None,
            error: Some(error.into()),
        }
    }
}

impl From<StoredMedia> for UploadResponse {
    fn from(media: StoredMedia) -> Self {
        Self {
            success: true,
            url: Some(media.url),
            width: Some(media.size.width),
            height: Some(media.size.height),
            error: None,
        }
    }
}

/// A stored upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Public URL
    pub url: String,
    /// Path on disk
    pub path: PathBuf,
    /// Probed or fallback dimensions
    pub size: Size,
}

/// Read image dimensions from the header, if the format is recognized
#[must_use]
pub fn probe_dimensions(bytes: &[u8]) -> Option<Size> {
    let reader = image::io::Reader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    (width > 0 && height > 0).then(|| Size::new(width, height))
}

/// File name safe to place on disk: ASCII alphanumerics, `-`, `_` and `.`
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(['.', '-']);

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Writes uploads to the media directory
#[derive(Debug, Clone)]
pub struct MediaStore {
    settings: MediaSettings,
}

impl MediaStore {
    /// Create a media store
    #[must_use]
    pub fn new(settings: MediaSettings) -> Self {
        Self { settings }
    }

    /// Directory uploads are written to
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.settings.upload_dir
    }

    /// Store an uploaded image
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<StoredMedia> {
        if bytes.is_empty() {
            return Err(Error::invalid_input("file is empty"));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(Error::invalid_input(format!(
                "file exceeds {} MB",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }

        let size = probe_dimensions(bytes).unwrap_or_else(|| {
            debug!(file_name, "Could not read image dimensions, using fallback");
            FALLBACK_SIZE
        });

        let stored_name = format!("{}-{}", Uuid::new_v4().simple(), sanitize_file_name(file_name));
        let path = self.settings.upload_dir.join(&stored_name);

        tokio::fs::create_dir_all(&self.settings.upload_dir).await?;
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Failed to write upload");
            Error::from(e)
        })?;

        let url = format!(
            "{}/{}",
            self.settings.public_base_url.trim_end_matches('/'),
            stored_name
        );
        info!(url = %url, bytes = bytes.len(), size = %size, "Stored upload");

        Ok(StoredMedia { url, path, size })
    }
}
