//! Pixel Canvas - Editor Session System
//!
//! This crate provides the stateful half of the Pixel editor:
//! - Document: canvas document and the surface a session renders into
//! - History: bounded linear undo/redo of canvas snapshots
//! - Autosave: debounced, versioned persistence of the canvas
//! - Session: per-project editor session and session manager
//! - Store: SQLite project, user and adjustment storage
//! - Error: Error types for canvas operations
//!
//! ## Usage
//!
//! ```ignore
//! use pixel_canvas::{EditorSessionManager, EditorSettings, ProjectStore, StoreSink};
//! use std::sync::Arc;
//!
//! let store = Arc::new(ProjectStore::new(pool, limits));
//! store.init().await?;
//!
//! let user = store.get_or_create_user(&identity).await?;
//! let project = store.get_project(&user, project_id).await?;
//!
//! let sessions = EditorSessionManager::new(EditorSettings::default());
//! let sink = Arc::new(StoreSink::new(store.clone(), user.clone()));
//! let session = sessions.open(&project, user.access(limits), sink).await;
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [editor]
//! autosave_quiet_ms = 2000
//! history_capacity = 50
//! session_idle_secs = 3600
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod autosave;
pub mod document;
pub mod error;
pub mod history;
pub mod session;
pub mod store;

// Re-export main types
pub use autosave::{AutosaveScheduler, CanvasChange, ProjectSink, SaveOutcome, SaveRequest};
pub use document::{CanvasDocument, CanvasSurface, DocumentSurface};
pub use error::{Error, Result};
pub use history::{HistoryManager, HistoryState, SharedHistory};
pub use session::{EditorSession, EditorSessionManager, EditorSettings, SessionState};
pub use store::{
    Identity, NewProject, PatchOutcome, Project, ProjectPatch, ProjectStore, StoreSink, User,
};
