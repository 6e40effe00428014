//! Autosave
//!
//! Debounced persistence of the canvas. Every qualifying change restarts a
//! single quiet-period timer; when the timer expires without another change
//! the current document is written through a [`ProjectSink`].
//!
//! Each save carries a version taken from a per-session counter at the moment
//! the document is captured. The sink only applies a save whose version is
//! newer than the stored one, so a slow early save can never overwrite a
//! later one. When the stored version was not issued by the session, the
//! canvas was written elsewhere; the counter jumps past it and the current
//! document is saved again.

use async_trait::async_trait;
use pixel_core::geometry::Size;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::document::DocumentSurface;
use crate::error::Result;
use crate::store::PatchOutcome;

/// Default quiet period before an autosave fires
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(2000);

/// Canvas events that schedule an autosave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasChange {
    /// An object was added
    ObjectAdded,
    /// An object was moved, scaled or restyled
    ObjectModified,
    /// An object was removed
    ObjectRemoved,
    /// A snapshot was pushed onto the history
    HistoryPushed,
    /// A history snapshot was loaded
    Restored,
}

/// Canvas write handed to a [`ProjectSink`]
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    /// Project being saved
    pub project_id: Uuid,
    /// Serialized canvas
    pub canvas_state: serde_json::Value,
    /// Canvas dimensions at capture time
    pub size: Size,
    /// Monotonic save version
    pub version: u64,
}

/// Result of one save attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// The canvas was written
    Saved {
        /// Version written
        version: u64,
    },
    /// A newer version was already stored
    Stale {
        /// Version discarded
        version: u64,
    },
    /// The write failed; the next change retries
    Failed {
        /// Version attempted
        version: u64,
        /// Failure description
        error: String,
    },
}

impl SaveOutcome {
    /// Version this outcome refers to
    #[must_use]
    pub fn version(&self) -> u64 {
        match self {
            Self::Saved { version } | Self::Stale { version } | Self::Failed { version, .. } => {
                *version
            }
        }
    }

    /// Check if the canvas was written
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// Destination of canvas saves
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectSink: Send + Sync {
    /// Persist a canvas state if its version is newer than the stored one
    async fn save_canvas(&self, request: SaveRequest) -> Result<PatchOutcome>;
}

struct AutosaveInner {
    project_id: Uuid,
    surface: Arc<DocumentSurface>,
    sink: Arc<dyn ProjectSink>,
    quiet: Duration,
    generation: AtomicU64,
    versions: AtomicU64,
    pending: Mutex<Option<JoinHandle<()>>>,
    last_outcome: RwLock<Option<SaveOutcome>>,
}

impl AutosaveInner {
    async fn save(&self) -> SaveOutcome {
        let (mut outcome, stored) = self.write().await;

        if let Some(stored) = stored {
            // the stored canvas is this attempt's own number or above every
            // number issued here, so it was written outside the session;
            // renumber past it and write again
            let version = outcome.version();
            let issued = self.versions.fetch_max(stored, Ordering::SeqCst);
            if stored == version || stored > issued {
                info!(
                    project_id = %self.project_id,
                    stored,
                    issued,
                    "Canvas changed outside the session, resaving"
                );
                outcome = self.write().await.0;
            }
        }

        *self.last_outcome.write().await = Some(outcome.clone());
        outcome
    }

    /// One save attempt; also returns the stored version when it was stale
    async fn write(&self) -> (SaveOutcome, Option<u64>) {
        // version and capture happen under the document write lock
        let (version, document) = self
            .surface
            .update(|doc| (self.versions.fetch_add(1, Ordering::SeqCst) + 1, doc.clone()))
            .await;

        let canvas_state = match document.to_value() {
            Ok(canvas_state) => canvas_state,
            Err(e) => {
                warn!(project_id = %self.project_id, error = %e, "Failed to serialize canvas");
                let outcome = SaveOutcome::Failed {
                    version,
                    error: e.to_string(),
                };
                return (outcome, None);
            }
        };

        let request = SaveRequest {
            project_id: self.project_id,
            canvas_state,
            size: document.size(),
            version,
        };
        match self.sink.save_canvas(request).await {
            Ok(PatchOutcome::Applied) => {
                info!(project_id = %self.project_id, version, "Canvas saved");
                (SaveOutcome::Saved { version }, None)
            }
            Ok(PatchOutcome::Stale { stored }) => {
                debug!(project_id = %self.project_id, version, stored, "Discarded stale canvas save");
                (SaveOutcome::Stale { version }, Some(stored))
            }
            Err(e) => {
                warn!(project_id = %self.project_id, version, error = %e, "Canvas save failed");
                let outcome = SaveOutcome::Failed {
                    version,
                    error: e.to_string(),
                };
                (outcome, None)
            }
        }
    }
}

/// Single-slot debounced autosave for one editor session
pub struct AutosaveScheduler {
    inner: Arc<AutosaveInner>,
}

impl AutosaveScheduler {
    /// Create a scheduler.
    ///
    /// `stored_version` is the canvas version already persisted; new saves
    /// are numbered above it.
    pub fn new(
        project_id: Uuid,
        surface: Arc<DocumentSurface>,
        sink: Arc<dyn ProjectSink>,
        quiet: Duration,
        stored_version: u64,
    ) -> Self {
        Self {
            inner: Arc::new(AutosaveInner {
                project_id,
                surface,
                sink,
                quiet,
                generation: AtomicU64::new(0),
                versions: AtomicU64::new(stored_version),
                pending: Mutex::new(None),
                last_outcome: RwLock::new(None),
            }),
        }
    }

    /// Record a change and restart the quiet-period timer
    pub async fn notify(&self, change: CanvasChange) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pending = self.inner.pending.lock().await;
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        debug!(project_id = %self.inner.project_id, ?change, "Autosave scheduled");

        let inner = self.inner.clone();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.quiet).await;
            {
                let mut pending = inner.pending.lock().await;
                if inner.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                // detach; a running save is never aborted
                pending.take();
            }
            inner.save().await;
        }));
    }

    /// Cancel any pending save and write immediately
    pub async fn save_now(&self) -> SaveOutcome {
        self.cancel().await;
        self.inner.save().await
    }

    /// Drop a pending save without writing
    pub async fn cancel(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.inner.pending.lock().await.take() {
            handle.abort();
        }
    }

    /// Check if a save is scheduled
    pub async fn is_pending(&self) -> bool {
        self.inner.pending.lock().await.is_some()
    }

    /// Outcome of the most recent save
    pub async fn last_outcome(&self) -> Option<SaveOutcome> {
        self.inner.last_outcome.read().await.clone()
    }

    /// Highest version issued so far
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.versions.load(Ordering::SeqCst)
    }

    /// Quiet period
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        self.inner.quiet
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        // a timer that outlives a contended lock sees the new generation and exits
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut pending) = self.inner.pending.try_lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for AutosaveScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveScheduler")
            .field("project_id", &self.inner.project_id)
            .field("quiet", &self.inner.quiet)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
