//! Background tasks
//!
//! Long-running tasks spawned at server startup.

use pixel_canvas::EditorSessionManager;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Periodically close editor sessions that have gone idle
pub fn start_session_sweeper(
    sessions: &Arc<EditorSessionManager>,
    interval_secs: u64,
    shutdown: CancellationToken,
) {
    let sessions = sessions.clone();
    let interval = tokio::time::Duration::from_secs(interval_secs.max(1));
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    sessions.cleanup_expired().await;
                }
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    break;
                }
            }
        }
    });
    info!("Session sweeper started (interval: {}s)", interval.as_secs());
}
