use super::*;
use pixel_core::access::AccessDenial;
use pixel_core::adjust::FilterKey;
use sqlx::sqlite::SqlitePoolOptions;

async fn setup_test_db() -> ProjectStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let store = ProjectStore::new(pool, PlanLimits::default());
    store.init().await.unwrap();
    store
}

fn identity(token: &str) -> Identity {
    Identity {
        token: token.to_string(),
        name: format!("User {token}"),
        email: format!("{token}@example.com"),
        image_url: None,
    }
}

fn new_project(title: &str) -> NewProject {
    NewProject {
        title: title.to_string(),
        original_image_url: "https://ik.imagekit.io/demo/photo.jpg".to_string(),
        current_image_url: None,
        thumbnail_url: None,
        width: 800,
        height: 600,
    }
}

async fn tick() {
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
}

#[tokio::test]
async fn test_get_or_create_user() {
    let store = setup_test_db().await;

    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    assert_eq!(user.plan, Plan::Free);
    assert_eq!(user.projects_used, 0);

    let again = store.get_or_create_user(&identity("alice")).await.unwrap();
    assert_eq!(again.id, user.id);

    let mut renamed = identity("alice");
    renamed.name = "Alice Liddell".to_string();
    let refreshed = store.get_or_create_user(&renamed).await.unwrap();
    assert_eq!(refreshed.id, user.id);
    assert_eq!(refreshed.name, "Alice Liddell");
}

#[tokio::test]
async fn test_current_user_missing() {
    let store = setup_test_db().await;
    let err = store.current_user("nobody").await.unwrap_err();
    assert_eq!(err.code(), "user_not_found");
}

#[tokio::test]
async fn test_create_project_defaults() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();

    let project = store.create_project(&user, new_project("Beach")).await.unwrap();
    assert_eq!(project.title, "Beach");
    assert_eq!(project.user_id, user.id);
    assert_eq!(project.canvas_state, serde_json::json!({}));
    assert_eq!(project.canvas_version, 0);
    assert_eq!(project.current_image_url, project.original_image_url);
    assert_eq!(project.size(), Size::new(800, 600));

    let user = store.current_user("alice").await.unwrap();
    assert_eq!(user.projects_used, 1);
}

#[tokio::test]
async fn test_create_project_requires_title() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();

    let err = store.create_project(&user, new_project("   ")).await.unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[tokio::test]
async fn test_free_project_limit() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();

    for i in 0..3 {
        store.create_project(&user, new_project(&format!("p{i}"))).await.unwrap();
    }
    let err = store.create_project(&user, new_project("p3")).await.unwrap_err();
    assert!(matches!(err, Error::Plan(AccessDenial::ProjectLimit { limit: 3 })));

    let pro = store.set_plan(user.id, Plan::Pro).await.unwrap();
    store.create_project(&pro, new_project("p3")).await.unwrap();
    assert_eq!(store.list_projects(&pro).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_list_projects_most_recent_first() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let other = store.get_or_create_user(&identity("bob")).await.unwrap();

    let first = store.create_project(&user, new_project("first")).await.unwrap();
    tick().await;
    store.create_project(&user, new_project("second")).await.unwrap();
    store.create_project(&other, new_project("bob's")).await.unwrap();
    tick().await;

    let patch = ProjectPatch {
        title: Some("first, renamed".to_string()),
        ..Default::default()
    };
    store.update_project(&user, first.id, patch).await.unwrap();

    let titles: Vec<_> = store
        .list_projects(&user)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["first, renamed", "second"]);
}

#[tokio::test]
async fn test_ownership_enforced() {
    let store = setup_test_db().await;
    let alice = store.get_or_create_user(&identity("alice")).await.unwrap();
    let mallory = store.get_or_create_user(&identity("mallory")).await.unwrap();
    let project = store.create_project(&alice, new_project("mine")).await.unwrap();

    let err = store.get_project(&mallory, project.id).await.unwrap_err();
    assert_eq!(err.code(), "access_denied");
    assert_eq!(err.to_string(), "access denied");

    let err = store
        .update_project(&mallory, project.id, ProjectPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "access_denied");

    let err = store.delete_project(&mallory, project.id).await.unwrap_err();
    assert_eq!(err.code(), "access_denied");

    let err = store.get_project(&alice, Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code(), "project_not_found");
}

#[tokio::test]
async fn test_partial_patch_changes_only_given_fields() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();
    tick().await;

    let patch = ProjectPatch {
        current_image_url: Some("https://ik.imagekit.io/demo/photo.jpg?tr=e-bgremove".to_string()),
        background_removed: Some(true),
        active_transformation: Some("e-bgremove".to_string()),
        ..Default::default()
    };
    let outcome = store.update_project(&user, project.id, patch).await.unwrap();
    assert_eq!(outcome, PatchOutcome::Applied);

    let updated = store.get_project(&user, project.id).await.unwrap();
    assert_eq!(updated.title, "Beach");
    assert_eq!(updated.background_removed, Some(true));
    assert!(updated.current_image_url.ends_with("e-bgremove"));
    assert_eq!(updated.original_image_url, project.original_image_url);
    assert_eq!(updated.size(), project.size());
    assert!(updated.updated_at > project.updated_at);
}

#[tokio::test]
async fn test_stale_canvas_write_is_skipped() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();
    let size = project.size();

    let newer = serde_json::json!({"objects": [{"type": "rect"}, {"type": "text"}]});
    let older = serde_json::json!({"objects": [{"type": "rect"}]});

    let outcome = store
        .update_project(&user, project.id, ProjectPatch::canvas(newer, size, 2))
        .await
        .unwrap();
    assert_eq!(outcome, PatchOutcome::Applied);

    let mut late = ProjectPatch::canvas(older, size, 1);
    late.title = Some("Renamed".to_string());
    let outcome = store.update_project(&user, project.id, late).await.unwrap();
    assert_eq!(outcome, PatchOutcome::Stale { stored: 2 });

    let stored = store.get_project(&user, project.id).await.unwrap();
    assert_eq!(stored.canvas_version, 2);
    assert_eq!(stored.canvas_state["objects"].as_array().unwrap().len(), 2);
    assert_eq!(stored.title, "Renamed");
}

#[tokio::test]
async fn test_unversioned_canvas_write_applies() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();

    let patch = ProjectPatch {
        canvas_state: Some(serde_json::json!({"objects": []})),
        ..Default::default()
    };
    store.update_project(&user, project.id, patch.clone()).await.unwrap();
    store.update_project(&user, project.id, patch).await.unwrap();

    let stored = store.get_project(&user, project.id).await.unwrap();
    assert_eq!(stored.canvas_version, 2);
}

#[tokio::test]
async fn test_dimension_patch_rewrites_canvas_size() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();

    let state = serde_json::json!({"width": 800, "height": 600, "objects": []});
    store
        .update_project(&user, project.id, ProjectPatch::canvas(state, project.size(), 1))
        .await
        .unwrap();

    let patch = ProjectPatch {
        width: Some(1080),
        height: Some(1920),
        ..Default::default()
    };
    store.update_project(&user, project.id, patch).await.unwrap();

    let stored = store.get_project(&user, project.id).await.unwrap();
    assert_eq!(stored.size(), Size::new(1080, 1920));
    assert_eq!(stored.canvas_state["width"], 1080);
    assert_eq!(stored.canvas_state["height"], 1920);
    assert_eq!(stored.canvas_version, 1);
}

#[tokio::test]
async fn test_zero_dimension_patch_rejected() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();

    let patch = ProjectPatch {
        width: Some(0),
        ..Default::default()
    };
    let err = store.update_project(&user, project.id, patch).await.unwrap_err();
    assert_eq!(err.code(), "invalid_input");
}

#[tokio::test]
async fn test_delete_project_decrements_usage() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();

    store.delete_project(&user, project.id).await.unwrap();
    assert!(store.list_projects(&user).await.unwrap().is_empty());
    assert_eq!(store.current_user("alice").await.unwrap().projects_used, 0);

    let err = store.delete_project(&user, project.id).await.unwrap_err();
    assert_eq!(err.code(), "project_not_found");
}

#[tokio::test]
async fn test_export_quota() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();

    for _ in 0..19 {
        store.record_export(&user).await.unwrap();
    }
    let latest = store.record_export(&user).await.unwrap();
    assert_eq!(latest.exports_this_month, 20);

    let err = store.record_export(&user).await.unwrap_err();
    assert_eq!(err.code(), "plan_limit");

    store.set_plan(user.id, Plan::Pro).await.unwrap();
    let pro = store.record_export(&user).await.unwrap();
    assert_eq!(pro.exports_this_month, 21);
}

#[tokio::test]
async fn test_export_counter_resets_on_new_period() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();

    sqlx::query("UPDATE users SET exports_this_month = 20, export_period = '1999-12' WHERE id = ?")
        .bind(user.id.to_string())
        .execute(&store.pool)
        .await
        .unwrap();

    let stale = store.current_user("alice").await.unwrap();
    assert_eq!(stale.exports_this_month, 20);
    assert_eq!(stale.exports_in("1999-12"), 20);
    assert_eq!(stale.exports_used(), 0);
    assert!(stale.access(store.limits()).can_export(stale.exports_used()));

    let updated = store.record_export(&user).await.unwrap();
    assert_eq!(updated.exports_this_month, 1);
    assert_eq!(updated.export_period, current_period());
}

#[tokio::test]
async fn test_adjustments_round_trip() {
    let store = setup_test_db().await;
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();

    let loaded = store.load_adjustments(&user, project.id).await.unwrap();
    assert!(loaded.is_default());

    let mut values = AdjustmentValues::default();
    values.set(FilterKey::Brightness, 40);
    values.set(FilterKey::Hue, 500);
    store.save_adjustments(&user, project.id, &values).await.unwrap();

    let loaded = store.load_adjustments(&user, project.id).await.unwrap();
    assert_eq!(loaded.get(FilterKey::Brightness), 40);
    assert_eq!(loaded.get(FilterKey::Hue), 180);

    assert!(store.clear_adjustments(&user, project.id).await.unwrap());
    assert!(store.load_adjustments(&user, project.id).await.unwrap().is_default());
}

#[tokio::test]
async fn test_store_sink_applies_versions() {
    let store = Arc::new(setup_test_db().await);
    let user = store.get_or_create_user(&identity("alice")).await.unwrap();
    let project = store.create_project(&user, new_project("Beach")).await.unwrap();
    let sink = StoreSink::new(store.clone(), user.clone());

    let request = SaveRequest {
        project_id: project.id,
        canvas_state: serde_json::json!({"objects": []}),
        size: Size::new(1000, 500),
        version: 3,
    };
    assert_eq!(sink.save_canvas(request.clone()).await.unwrap(), PatchOutcome::Applied);
    assert_eq!(
        sink.save_canvas(request).await.unwrap(),
        PatchOutcome::Stale { stored: 3 }
    );

    let stored = store.get_project(&user, project.id).await.unwrap();
    assert_eq!(stored.size(), Size::new(1000, 500));
    assert_eq!(stored.canvas_state["width"], 1000);
}
