//! Stock Photo Search
//!
//! Keyed client for an Unsplash-compatible photo API. The API terms require
//! a download ping whenever a photo is actually used, see
//! [`StockPhotoClient::track_download`].

use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Stock photo API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSettings {
    /// API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Access key sent as `Client-ID`
    #[serde(default)]
    pub access_key: Option<String>,

    /// Results per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_api_url() -> String {
    "https://api.unsplash.com".to_string()
}

fn default_per_page() -> u32 {
    12
}

impl Default for StockSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_key: None,
            per_page: default_per_page(),
        }
    }
}

/// Image renditions of a photo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoUrls {
    /// Full resolution
    pub full: String,
    /// Rendition used as a canvas background
    pub regular: String,
    /// Grid preview
    pub small: String,
    /// Thumbnail
    pub thumb: String,
}

/// Photo author, shown as attribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Photographer {
    /// Display name
    pub name: String,
    /// Profile handle
    pub username: String,
}

/// A search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPhoto {
    /// Photo ID
    pub id: String,
    /// Width of the original
    #[serde(default)]
    pub width: u32,
    /// Height of the original
    #[serde(default)]
    pub height: u32,
    /// Caption
    #[serde(default)]
    pub description: Option<String>,
    /// Alt text
    #[serde(default)]
    pub alt_description: Option<String>,
    /// Renditions
    #[serde(default)]
    pub urls: PhotoUrls,
    /// Author
    #[serde(default)]
    pub user: Photographer,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSearch {
    /// Total matches
    #[serde(default)]
    pub total: u64,
    /// Total pages
    #[serde(default)]
    pub total_pages: u64,
    /// Photos on this page
    #[serde(default)]
    pub results: Vec<StockPhoto>,
}

/// Stock photo API client
#[derive(Debug, Clone)]
pub struct StockPhotoClient {
    http: reqwest::Client,
    settings: StockSettings,
}

impl StockPhotoClient {
    /// Create a client
    pub fn new(settings: StockSettings) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, settings })
    }

    /// Check if an access key is configured
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.access_key().is_some()
    }

    fn access_key(&self) -> Option<&str> {
        self.settings
            .access_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_url.trim_end_matches('/'), path)
    }

    /// Search photos.
    ///
    /// A blank query returns an empty page without calling the API.
    pub async fn search(&self, query: &str, page: u32) -> Result<StockSearch> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(StockSearch::default());
        }
        let key = self
            .access_key()
            .ok_or_else(|| Error::Config("stock photo access key is not set".to_string()))?;

        let response = self
            .http
            .get(self.endpoint("search/photos"))
            .header(AUTHORIZATION, format!("Client-ID {key}"))
            .query(&[
                ("query", query.to_string()),
                ("per_page", self.settings.per_page.to_string()),
                ("page", page.max(1).to_string()),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to send request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %message, "Stock photo search failed");
            return Err(Error::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let search: StockSearch = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("Failed to parse response: {e}")))?;
        debug!(query, page, results = search.results.len(), "Stock photo search");
        Ok(search)
    }

    /// Report that a photo was used.
    ///
    /// Failures are logged and otherwise ignored.
    pub async fn track_download(&self, photo_id: &str) {
        let Some(key) = self.access_key() else {
            debug!(photo_id, "Skipping download ping without access key");
            return;
        };
        if !is_photo_id(photo_id) {
            warn!(photo_id, "Refusing download ping for malformed photo id");
            return;
        }

        let result = self
            .http
            .get(self.endpoint(&format!("photos/{photo_id}/download")))
            .header(AUTHORIZATION, format!("Client-ID {key}"))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(photo_id, "Recorded stock photo download");
            }
            Ok(response) => {
                warn!(photo_id, status = %response.status(), "Download ping rejected");
            }
            Err(e) => {
                warn!(photo_id, error = %e, "Download ping failed");
            }
        }
    }
}

/// Check that an id is safe as a single URL path segment
fn is_photo_id(id: &str) -> bool {
    !id.is_empty()
        && !id.chars().all(|c| c == '.')
        && !id.contains(['/', '\\', '?', '#', '%'])
}
