//! Users API endpoints
//!
//! GET /api/v1/users/me      - Current user and plan access summary
//! PUT /api/v1/users/me/plan - Change plan

use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use pixel_canvas::User;
use pixel_core::{Plan, PlanLimits, ToolId};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ok, ApiResult};
use super::identity::CurrentUser;
use super::AppState;

/// Current user with what their plan allows
#[derive(Debug, Serialize)]
pub struct UserView {
    pub user: User,
    pub restricted_tools: Vec<ToolId>,
    pub limits: PlanLimits,
    pub can_create_project: bool,
    /// Exports counted this calendar month
    pub exports_used: u32,
    pub can_export: bool,
}

impl UserView {
    pub fn new(user: User, limits: PlanLimits) -> Self {
        let access = user.access(limits);
        let exports_used = user.exports_used();
        Self {
            restricted_tools: access.restricted_tools(),
            can_create_project: access.can_create_project(user.projects_used),
            exports_used,
            can_export: access.can_export(exports_used),
            limits,
            user,
        }
    }
}

/// Request to change plan
#[derive(Debug, Deserialize)]
pub struct SetPlanRequest {
    pub plan: String,
}

/// Get or create the calling user
pub async fn me(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> ApiResult<UserView> {
    ok(UserView::new(user, state.limits()))
}

/// Change the calling user's plan.
///
/// Stands in for the billing provider's webhook. Open editor sessions take
/// the new plan at once.
pub async fn set_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SetPlanRequest>,
) -> ApiResult<UserView> {
    let plan: Plan = request.plan.parse()?;
    let user = state.store.set_plan(user.id, plan).await?;
    state
        .sessions
        .refresh_access(user.id, user.access(state.limits()))
        .await;
    info!(user_id = %user.id, plan = %plan, "Plan updated via API");
    ok(UserView::new(user, state.limits()))
}

/// Create users routes
pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users/me", get(me))
        .route("/api/v1/users/me/plan", put(set_plan))
}
