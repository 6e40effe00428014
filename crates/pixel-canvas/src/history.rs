//! Canvas History
//!
//! Linear undo/redo over full canvas snapshots.
//!
//! The history is an index into an ordered sequence of snapshots:
//! - pushing truncates everything after the index, then appends
//! - undo/redo move the index and load that snapshot into the canvas
//! - pushes are refused while a snapshot is being loaded, so the programmatic
//!   load is never recorded as a user edit
//!
//! The sequence is a ring buffer: once `capacity` is reached the oldest
//! snapshot is evicted.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::document::CanvasSurface;
use crate::error::Result;

/// Default number of snapshots kept per session
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Point-in-time view of a history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryState {
    /// Number of snapshots held
    pub len: usize,
    /// Index of the current snapshot
    pub index: usize,
    /// Whether an undo is possible
    pub can_undo: bool,
    /// Whether a redo is possible
    pub can_redo: bool,
    /// Whether a snapshot is being loaded
    pub restoring: bool,
}

/// Bounded undo/redo stack of serialized canvas snapshots
#[derive(Debug)]
pub struct HistoryManager {
    entries: VecDeque<String>,
    index: usize,
    capacity: usize,
    restoring: bool,
}

impl HistoryManager {
    /// Create an empty history with the given capacity (at least 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            index: 0,
            capacity,
            restoring: false,
        }
    }

    /// Create a history seeded with the initial canvas state
    #[must_use]
    pub fn with_initial(capacity: usize, snapshot: impl Into<String>) -> Self {
        let mut history = Self::new(capacity);
        history.push(snapshot);
        history
    }

    /// Record a snapshot as the new tail.
    ///
    /// Returns `false` (and records nothing) while a restore is in progress.
    pub fn push(&mut self, snapshot: impl Into<String>) -> bool {
        if self.restoring {
            debug!("History push ignored during restore");
            return false;
        }

        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push_back(snapshot.into());

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
        true
    }

    /// Step back and mark a restore as started.
    ///
    /// Returns the snapshot to load, or `None` at the head of the history or
    /// when another restore is still running.
    pub fn begin_undo(&mut self) -> Option<String> {
        if self.restoring || !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.restoring = true;
        self.entries.get(self.index).cloned()
    }

    /// Step forward and mark a restore as started.
    ///
    /// Returns the snapshot to load, or `None` at the tail of the history or
    /// when another restore is still running.
    pub fn begin_redo(&mut self) -> Option<String> {
        if self.restoring || !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.restoring = true;
        self.entries.get(self.index).cloned()
    }

    /// Clear the restoring flag
    pub fn finish_restore(&mut self) {
        self.restoring = false;
    }

    /// Drop all snapshots and start over from `snapshot`
    pub fn reset(&mut self, snapshot: impl Into<String>) {
        self.entries.clear();
        self.index = 0;
        self.restoring = false;
        self.entries.push_back(snapshot.into());
    }

    /// Check if an undo is possible
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Check if a redo is possible
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    /// Check if a restore is in progress
    #[must_use]
    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Index of the current snapshot
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of snapshots held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no snapshot has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of snapshots held
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot at the current index
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.entries.get(self.index).map(String::as_str)
    }

    /// Summarize the history
    #[must_use]
    pub fn state(&self) -> HistoryState {
        HistoryState {
            len: self.len(),
            index: self.index,
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            restoring: self.restoring,
        }
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// History shared between a session's request handlers.
///
/// The lock is released while a snapshot loads, so edits arriving during the
/// load reach the history and are refused by the restoring flag.
#[derive(Debug, Clone)]
pub struct SharedHistory {
    inner: Arc<Mutex<HistoryManager>>,
}

impl SharedHistory {
    /// Wrap a history
    #[must_use]
    pub fn new(history: HistoryManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(history)),
        }
    }

    /// Record a snapshot; `false` while a restore is in progress
    pub async fn push(&self, snapshot: impl Into<String>) -> bool {
        self.inner.lock().await.push(snapshot)
    }

    /// Undo into `surface`; `Ok(false)` when there is nothing to undo
    pub async fn undo(&self, surface: &dyn CanvasSurface) -> Result<bool> {
        let snapshot = self.inner.lock().await.begin_undo();
        self.restore(snapshot, surface).await
    }

    /// Redo into `surface`; `Ok(false)` when there is nothing to redo
    pub async fn redo(&self, surface: &dyn CanvasSurface) -> Result<bool> {
        let snapshot = self.inner.lock().await.begin_redo();
        self.restore(snapshot, surface).await
    }

    async fn restore(&self, snapshot: Option<String>, surface: &dyn CanvasSurface) -> Result<bool> {
        let Some(snapshot) = snapshot else {
            return Ok(false);
        };

        let loaded = surface.load_snapshot(&snapshot).await;
        self.inner.lock().await.finish_restore();

        if let Err(e) = &loaded {
            warn!(error = %e, "Failed to load history snapshot");
        }
        loaded.map(|()| true)
    }

    /// Reset to a single snapshot
    pub async fn reset(&self, snapshot: impl Into<String>) {
        self.inner.lock().await.reset(snapshot);
    }

    /// Summarize the history
    pub async fn state(&self) -> HistoryState {
        self.inner.lock().await.state()
    }
}
