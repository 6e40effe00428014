use super::*;
use crate::autosave::SaveRequest;
use crate::store::PatchOutcome;
use async_trait::async_trait;
use pixel_core::access::{AccessDenial, Plan};
use pixel_core::geometry::Size;
use tokio::sync::Mutex;

#[derive(Default)]
struct MemorySink {
    saved: Mutex<Vec<SaveRequest>>,
}

#[async_trait]
impl ProjectSink for MemorySink {
    async fn save_canvas(&self, request: SaveRequest) -> Result<PatchOutcome> {
        self.saved.lock().await.push(request);
        Ok(PatchOutcome::Applied)
    }
}

fn project() -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::new_v4(),
        title: "Beach".to_string(),
        user_id: Uuid::new_v4(),
        canvas_state: serde_json::json!({}),
        width: 800,
        height: 600,
        original_image_url: "https://ik.imagekit.io/demo/photo.jpg".to_string(),
        current_image_url: "https://ik.imagekit.io/demo/photo.jpg".to_string(),
        thumbnail_url: None,
        active_transformation: None,
        background_removed: None,
        canvas_version: 4,
        created_at: now,
        updated_at: now,
    }
}

async fn open(plan: Plan) -> (EditorSession, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::default());
    let session = EditorSession::open(
        &project(),
        PlanAccess::new(plan),
        sink.clone(),
        EditorSettings::default(),
    )
    .await
    .unwrap();
    (session, sink)
}

fn with_objects(mut document: CanvasDocument, n: usize) -> CanvasDocument {
    for i in 0..n {
        document
            .objects
            .push(serde_json::json!({"type": "rect", "left": i}));
    }
    document
}

#[tokio::test(start_paused = true)]
async fn test_open_uses_project_size() {
    let (session, _) = open(Plan::Free).await;
    let document = session.document().await;
    assert_eq!(document.size(), Size::new(800, 600));

    let state = session.state().await;
    assert_eq!(state.active_tool, ToolId::Resize);
    assert_eq!(state.history.len, 1);
    assert!(!state.history.can_undo);
    assert!(state.processing_message.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_changes_undo_and_redo() {
    let (session, _) = open(Plan::Free).await;

    let base = session.document().await;
    for n in 1..=3 {
        let recorded = session
            .apply_change(with_objects(base.clone(), n), CanvasChange::ObjectAdded)
            .await
            .unwrap();
        assert!(recorded);
    }
    assert_eq!(session.state().await.history.index, 3);

    assert!(session.undo().await.unwrap());
    assert!(session.undo().await.unwrap());
    assert_eq!(session.document().await.object_count(), 1);

    assert!(session.redo().await.unwrap());
    assert_eq!(session.document().await.object_count(), 2);

    let state = session.state().await;
    assert!(state.history.can_undo);
    assert!(state.history.can_redo);
    assert!(state.autosave_pending);
}

#[tokio::test(start_paused = true)]
async fn test_undo_at_start_is_noop() {
    let (session, _) = open(Plan::Free).await;
    assert!(!session.undo().await.unwrap());
    assert!(!session.redo().await.unwrap());
    assert!(!session.state().await.autosave_pending);
}

#[tokio::test(start_paused = true)]
async fn test_changes_are_autosaved_after_quiet_period() {
    let (session, sink) = open(Plan::Free).await;

    let base = session.document().await;
    session
        .apply_change(with_objects(base.clone(), 1), CanvasChange::ObjectAdded)
        .await
        .unwrap();
    session
        .apply_change(with_objects(base, 2), CanvasChange::ObjectModified)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let saved = sink.saved.lock().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].version, 5);
    assert_eq!(saved[0].canvas_state["objects"].as_array().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pro_tools_refused_on_free_plan() {
    let (session, _) = open(Plan::Free).await;

    session.set_active_tool(ToolId::Crop).await.unwrap();
    let err = session.set_active_tool(ToolId::Background).await.unwrap_err();
    assert!(matches!(
        err,
        crate::error::Error::Plan(AccessDenial::ProOnly(ToolId::Background))
    ));
    assert_eq!(session.active_tool().await, ToolId::Crop);

    let state = session.state().await;
    assert_eq!(state.restricted_tools.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_pro_tools_allowed_on_pro_plan() {
    let (session, _) = open(Plan::Pro).await;
    session.set_active_tool(ToolId::AiExtender).await.unwrap();
    assert_eq!(session.active_tool().await, ToolId::AiExtender);
    assert!(session.state().await.restricted_tools.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_resize_saves_immediately() {
    let (session, sink) = open(Plan::Free).await;

    let plan = ResizePlan::new(Size::new(800, 600), Size::new(1080, 1080)).unwrap();
    let outcome = session.resize(plan).await.unwrap();
    assert_eq!(outcome, Some(SaveOutcome::Saved { version: 5 }));
    assert_eq!(session.document().await.size(), Size::new(1080, 1080));

    let saved = sink.saved.lock().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].size, Size::new(1080, 1080));
    drop(saved);

    assert!(!session.state().await.autosave_pending);
    assert!(session.undo().await.unwrap());
    assert_eq!(session.document().await.size(), Size::new(800, 600));
}

#[tokio::test(start_paused = true)]
async fn test_resize_to_same_size_is_noop() {
    let (session, sink) = open(Plan::Free).await;

    let plan = ResizePlan::new(Size::new(800, 600), Size::new(800, 600)).unwrap();
    assert!(session.resize(plan).await.unwrap().is_none());
    assert!(sink.saved.lock().await.is_empty());
    assert_eq!(session.state().await.history.len, 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_autosave() {
    let (session, sink) = open(Plan::Free).await;

    let base = session.document().await;
    session
        .apply_change(with_objects(base, 1), CanvasChange::ObjectAdded)
        .await
        .unwrap();
    session.close().await;

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(sink.saved.lock().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_processing_message() {
    let (session, _) = open(Plan::Pro).await;
    session
        .set_processing(Some("Removing background...".to_string()))
        .await;
    assert_eq!(
        session.state().await.processing_message.as_deref(),
        Some("Removing background...")
    );
    session.set_processing(None).await;
    assert!(session.state().await.processing_message.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_processing_clears_after_work() {
    let (session, _) = open(Plan::Pro).await;

    let during = session
        .processing("Extending image with AI...", async {
            session.state().await.processing_message
        })
        .await;
    assert_eq!(during.as_deref(), Some("Extending image with AI..."));
    assert!(session.state().await.processing_message.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_downgrade_restricts_open_session() {
    let (session, _) = open(Plan::Pro).await;
    session.set_active_tool(ToolId::AiExtender).await.unwrap();

    session.set_access(PlanAccess::new(Plan::Free)).await;

    assert_eq!(session.active_tool().await, ToolId::Resize);
    assert_eq!(session.state().await.restricted_tools.len(), 3);
    let err = session.set_active_tool(ToolId::AiExtender).await.unwrap_err();
    assert_eq!(err.code(), "upgrade_required");
}

#[tokio::test(start_paused = true)]
async fn test_manager_refreshes_user_sessions() {
    let manager = EditorSessionManager::default();
    let sink: Arc<dyn ProjectSink> = Arc::new(MemorySink::default());
    let mine = project();
    let theirs = project();

    manager
        .open(&mine, PlanAccess::new(Plan::Pro), sink.clone())
        .await
        .unwrap();
    manager
        .open(&theirs, PlanAccess::new(Plan::Pro), sink)
        .await
        .unwrap();

    let refreshed = manager
        .refresh_access(mine.user_id, PlanAccess::new(Plan::Free))
        .await;
    assert_eq!(refreshed, 1);

    let session = manager.get(mine.id).await.unwrap();
    assert_eq!(session.access().await.plan(), Plan::Free);
    let other = manager.get(theirs.id).await.unwrap();
    assert_eq!(other.access().await.plan(), Plan::Pro);
}

#[tokio::test(start_paused = true)]
async fn test_manager_reuses_open_session() {
    let manager = EditorSessionManager::default();
    let project = project();
    let sink: Arc<dyn ProjectSink> = Arc::new(MemorySink::default());
    let access = PlanAccess::new(Plan::Free);

    let first = manager.open(&project, access, sink.clone()).await.unwrap();
    let second = manager.open(&project, access, sink.clone()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(manager.session_count().await, 1);

    let upgraded = manager
        .open(&project, PlanAccess::new(Plan::Pro), sink)
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &upgraded));
    assert_eq!(upgraded.access().await.plan(), Plan::Pro);

    assert!(manager.get(project.id).await.is_some());
    assert!(manager.close(project.id).await);
    assert!(!manager.close(project.id).await);
    assert!(manager.get(project.id).await.is_none());
}

#[tokio::test]
async fn test_manager_cleanup_expired() {
    let manager = EditorSessionManager::new(EditorSettings {
        session_idle_secs: -1,
        ..Default::default()
    });
    let sink: Arc<dyn ProjectSink> = Arc::new(MemorySink::default());

    manager
        .open(&project(), PlanAccess::new(Plan::Free), sink.clone())
        .await
        .unwrap();
    manager
        .open(&project(), PlanAccess::new(Plan::Free), sink)
        .await
        .unwrap();
    assert_eq!(manager.session_count().await, 2);

    assert_eq!(manager.cleanup_expired().await, 2);
    assert_eq!(manager.session_count().await, 0);
}

#[test]
fn test_settings_defaults() {
    let settings: EditorSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, EditorSettings::default());
    assert_eq!(settings.quiet_period(), Duration::from_millis(2000));
    assert_eq!(settings.history_capacity, 50);
}
