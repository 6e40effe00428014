//! Project Store
//!
//! Persistent storage for users, projects and adjustment values using SQLite.
//!
//! Every project operation takes the calling [`User`] and enforces ownership.
//! Quotas from [`PlanLimits`] are checked here as well, so a client that skips
//! its own pre-check still hits the limit.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pixel_core::access::{Plan, PlanAccess, PlanLimits};
use pixel_core::adjust::AdjustmentValues;
use pixel_core::geometry::Size;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::autosave::{ProjectSink, SaveRequest};
use crate::document::with_dimensions;
use crate::error::{Error, Result};

const PROJECT_COLUMNS: &str = "id, title, user_id, canvas_state, width, height, \
    original_image_url, current_image_url, thumbnail_url, active_transformation, \
    background_removed, canvas_version, created_at, updated_at";

const USER_COLUMNS: &str = "id, token_identifier, name, email, image_url, plan, \
    projects_used, exports_this_month, export_period, created_at, last_active";

/// Identity asserted by the auth layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable token identifier from the auth provider
    pub token: String,
    /// Display name
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Avatar URL
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Stored user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// User ID
    pub id: Uuid,
    /// Auth provider identity
    pub token_identifier: String,
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// Avatar URL
    pub image_url: Option<String>,
    /// Subscription tier
    pub plan: Plan,
    /// Number of projects owned
    pub projects_used: u32,
    /// Exports in the current period
    pub exports_this_month: u32,
    /// Month (`YYYY-MM`) the export counter belongs to
    pub export_period: String,
    /// When the user was created
    pub created_at: DateTime<Utc>,
    /// Last activity
    pub last_active: DateTime<Utc>,
}

impl User {
    /// Access gate for this user's plan
    #[must_use]
    pub fn access(&self, limits: PlanLimits) -> PlanAccess {
        PlanAccess::with_limits(self.plan, limits)
    }

    /// Exports counted in `period`; the counter restarts each month
    #[must_use]
    pub fn exports_in(&self, period: &str) -> u32 {
        if self.export_period == period {
            self.exports_this_month
        } else {
            0
        }
    }

    /// Exports counted in the current calendar month
    #[must_use]
    pub fn exports_used(&self) -> u32 {
        self.exports_in(&current_period())
    }
}

/// Stored project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    /// Project ID
    pub id: Uuid,
    /// Title
    pub title: String,
    /// Owning user
    pub user_id: Uuid,
    /// Serialized canvas document
    pub canvas_state: serde_json::Value,
    /// Canvas width
    pub width: u32,
    /// Canvas height
    pub height: u32,
    /// Uploaded image
    pub original_image_url: String,
    /// Image after transforms
    pub current_image_url: String,
    /// Thumbnail
    pub thumbnail_url: Option<String>,
    /// Last transform applied
    pub active_transformation: Option<String>,
    /// Whether the background has been removed
    pub background_removed: Option<bool>,
    /// Version of the stored canvas state
    pub canvas_version: u64,
    /// When the project was created
    pub created_at: DateTime<Utc>,
    /// Last modification
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Canvas dimensions
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Fields of a new project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    /// Title
    pub title: String,
    /// Uploaded image URL
    pub original_image_url: String,
    /// Current image URL, defaults to the original
    #[serde(default)]
    pub current_image_url: Option<String>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Canvas width
    pub width: u32,
    /// Canvas height
    pub height: u32,
}

/// Partial project update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPatch {
    /// Title
    pub title: Option<String>,
    /// Canvas document
    pub canvas_state: Option<serde_json::Value>,
    /// Version of `canvas_state`; unversioned writes always apply
    pub canvas_version: Option<u64>,
    /// Canvas width
    pub width: Option<u32>,
    /// Canvas height
    pub height: Option<u32>,
    /// Uploaded image URL
    pub original_image_url: Option<String>,
    /// Current image URL
    pub current_image_url: Option<String>,
    /// Thumbnail URL
    pub thumbnail_url: Option<String>,
    /// Last transform applied
    pub active_transformation: Option<String>,
    /// Background removal flag
    pub background_removed: Option<bool>,
}

impl ProjectPatch {
    /// Patch carrying a versioned canvas write
    #[must_use]
    pub fn canvas(state: serde_json::Value, size: Size, version: u64) -> Self {
        Self {
            canvas_state: Some(state),
            canvas_version: Some(version),
            width: Some(size.width),
            height: Some(size.height),
            ..Default::default()
        }
    }
}

/// Whether a patch's canvas write was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PatchOutcome {
    /// All fields were written
    Applied,
    /// A newer canvas version was stored; only non-canvas fields were written
    Stale {
        /// Canvas version already stored
        stored: u64,
    },
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::database(format!("invalid id {value}: {e}")))
}

fn current_period() -> String {
    Utc::now().format("%Y-%m").to_string()
}

fn count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let plan: String = row.try_get("plan")?;
    let created_at: String = row.try_get("created_at")?;
    let last_active: String = row.try_get("last_active")?;

    Ok(User {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        token_identifier: row.try_get("token_identifier")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        image_url: row.try_get("image_url")?,
        plan: plan.parse().unwrap_or_default(),
        projects_used: count(row.try_get("projects_used")?),
        exports_this_month: count(row.try_get("exports_this_month")?),
        export_period: row.try_get("export_period")?,
        created_at: parse_timestamp(&created_at),
        last_active: parse_timestamp(&last_active),
    })
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    let canvas_state: String = row.try_get("canvas_state")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Project {
        id: parse_id(&row.try_get::<String, _>("id")?)?,
        title: row.try_get("title")?,
        user_id: parse_id(&row.try_get::<String, _>("user_id")?)?,
        canvas_state: serde_json::from_str(&canvas_state)?,
        width: count(row.try_get("width")?),
        height: count(row.try_get("height")?),
        original_image_url: row.try_get("original_image_url")?,
        current_image_url: row.try_get("current_image_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        active_transformation: row.try_get("active_transformation")?,
        background_removed: row.try_get("background_removed")?,
        canvas_version: u64::try_from(row.try_get::<i64, _>("canvas_version")?).unwrap_or(0),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn version_param(version: u64) -> Result<i64> {
    i64::try_from(version).map_err(|_| Error::invalid_input("canvas version out of range"))
}

/// SQLite-backed project store
pub struct ProjectStore {
    pool: SqlitePool,
    limits: PlanLimits,
}

impl ProjectStore {
    /// Create a new store with the given database pool and plan limits
    #[must_use]
    pub fn new(pool: SqlitePool, limits: PlanLimits) -> Self {
        Self { pool, limits }
    }

    /// Plan limits enforced by this store
    #[must_use]
    pub fn limits(&self) -> PlanLimits {
        self.limits
    }

    /// Initialize the database schema
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                token_identifier TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                image_url TEXT,
                plan TEXT NOT NULL DEFAULT 'free',
                projects_used INTEGER NOT NULL DEFAULT 0,
                exports_this_month INTEGER NOT NULL DEFAULT 0,
                export_period TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_active TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                user_id TEXT NOT NULL,
                canvas_state TEXT NOT NULL DEFAULT '{}',
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                original_image_url TEXT NOT NULL,
                current_image_url TEXT NOT NULL,
                thumbnail_url TEXT,
                active_transformation TEXT,
                background_removed INTEGER,
                canvas_version INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_projects_user_id ON projects(user_id);
            CREATE INDEX IF NOT EXISTS idx_projects_updated_at ON projects(updated_at);

            CREATE TABLE IF NOT EXISTS adjustments (
                project_id TEXT PRIMARY KEY,
                values_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Get the user for an identity, creating it on first access.
    ///
    /// Name and email are refreshed when the identity changed them.
    pub async fn get_or_create_user(&self, identity: &Identity) -> Result<User> {
        if identity.token.trim().is_empty() {
            return Err(Error::invalid_input("identity token is empty"));
        }

        if let Some(user) = self.find_user(&identity.token).await? {
            if user.name == identity.name && user.email == identity.email {
                return Ok(user);
            }
            sqlx::query("UPDATE users SET name = ?, email = ?, last_active = ? WHERE id = ?")
                .bind(&identity.name)
                .bind(&identity.email)
                .bind(timestamp(Utc::now()))
                .bind(user.id.to_string())
                .execute(&self.pool)
                .await?;
            debug!(user_id = %user.id, "Refreshed user profile");
            return self.user_by_id(user.id).await;
        }

        let now = timestamp(Utc::now());
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO users
            (id, token_identifier, name, email, image_url, plan, projects_used,
             exports_this_month, export_period, created_at, last_active)
            VALUES (?, ?, ?, ?, ?, 'free', 0, 0, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&identity.token)
        .bind(&identity.name)
        .bind(&identity.email)
        .bind(&identity.image_url)
        .bind(current_period())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let user = self.current_user(&identity.token).await?;
        info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    /// Get the user for a token identifier
    pub async fn current_user(&self, token: &str) -> Result<User> {
        self.find_user(token)
            .await?
            .ok_or_else(|| Error::UserNotFound(token.to_string()))
    }

    async fn find_user(&self, token: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE token_identifier = ?"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_id(&self, user_id: Uuid) -> Result<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => user_from_row(&row),
            None => Err(Error::UserNotFound(user_id.to_string())),
        }
    }

    /// Change a user's plan
    pub async fn set_plan(&self, user_id: Uuid, plan: Plan) -> Result<User> {
        let result = sqlx::query("UPDATE users SET plan = ? WHERE id = ?")
            .bind(plan.as_str())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        info!(user_id = %user_id, plan = %plan, "Plan changed");
        self.user_by_id(user_id).await
    }

    /// Count an export against the monthly quota.
    ///
    /// The counter restarts when the calendar month changed since the last
    /// export.
    pub async fn record_export(&self, user: &User) -> Result<User> {
        let user = self.user_by_id(user.id).await?;
        let period = current_period();
        let used = user.exports_in(&period);

        user.access(self.limits).check_export(used)?;

        sqlx::query(
            "UPDATE users SET exports_this_month = ?, export_period = ?, last_active = ? WHERE id = ?",
        )
        .bind(i64::from(used) + 1)
        .bind(&period)
        .bind(timestamp(Utc::now()))
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await?;

        self.user_by_id(user.id).await
    }

    // ========================================================================
    // Projects
    // ========================================================================

    /// Create a project owned by `user`
    pub async fn create_project(&self, user: &User, project: NewProject) -> Result<Project> {
        let title = project.title.trim();
        if title.is_empty() {
            return Err(Error::invalid_input("title is required"));
        }
        if project.width == 0 || project.height == 0 {
            return Err(Error::invalid_input("project dimensions must be positive"));
        }

        let owner = self.user_by_id(user.id).await?;
        let owned: i64 = sqlx::query("SELECT COUNT(*) AS count FROM projects WHERE user_id = ?")
            .bind(owner.id.to_string())
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        owner.access(self.limits).check_create_project(count(owned))?;

        let id = Uuid::new_v4();
        let now = timestamp(Utc::now());
        let current_image_url = project
            .current_image_url
            .clone()
            .unwrap_or_else(|| project.original_image_url.clone());

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO projects
            (id, title, user_id, canvas_state, width, height, original_image_url,
             current_image_url, thumbnail_url, canvas_version, created_at, updated_at)
            VALUES (?, ?, ?, '{}', ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(title)
        .bind(owner.id.to_string())
        .bind(i64::from(project.width))
        .bind(i64::from(project.height))
        .bind(&project.original_image_url)
        .bind(&current_image_url)
        .bind(&project.thumbnail_url)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET projects_used = projects_used + 1, last_active = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(owner.id.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(project_id = %id, user_id = %owner.id, "Created project");
        self.get_project(&owner, id).await
    }

    /// List a user's projects, most recently updated first
    pub async fn list_projects(&self, user: &User) -> Result<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = ? ORDER BY updated_at DESC"
        ))
        .bind(user.id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(project_from_row).collect()
    }

    /// Get a project owned by `user`
    pub async fn get_project(&self, user: &User, project_id: Uuid) -> Result<Project> {
        let row = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
            .bind(project_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::ProjectNotFound(project_id))?;

        let project = project_from_row(&row)?;
        if project.user_id != user.id {
            return Err(Error::AccessDenied(project_id));
        }
        Ok(project)
    }

    /// Apply a partial update.
    ///
    /// A canvas write is only applied when its version is newer than the
    /// stored one; the other fields of the patch are written either way.
    /// Changing the dimensions rewrites the canvas document's own size.
    pub async fn update_project(
        &self,
        user: &User,
        project_id: Uuid,
        patch: ProjectPatch,
    ) -> Result<PatchOutcome> {
        if matches!(patch.width, Some(0)) || matches!(patch.height, Some(0)) {
            return Err(Error::invalid_input("project dimensions must be positive"));
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"))
            .bind(project_id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::ProjectNotFound(project_id))?;
        let project = project_from_row(&row)?;
        if project.user_id != user.id {
            return Err(Error::AccessDenied(project_id));
        }

        let size = Size::new(
            patch.width.unwrap_or(project.width),
            patch.height.unwrap_or(project.height),
        );
        let now = timestamp(Utc::now());

        sqlx::query(
            r#"
            UPDATE projects SET
                title = COALESCE(?, title),
                original_image_url = COALESCE(?, original_image_url),
                current_image_url = COALESCE(?, current_image_url),
                thumbnail_url = COALESCE(?, thumbnail_url),
                active_transformation = COALESCE(?, active_transformation),
                background_removed = COALESCE(?, background_removed),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(patch.title.as_deref().map(str::trim))
        .bind(&patch.original_image_url)
        .bind(&patch.current_image_url)
        .bind(&patch.thumbnail_url)
        .bind(&patch.active_transformation)
        .bind(patch.background_removed)
        .bind(&now)
        .bind(project_id.to_string())
        .execute(&mut *tx)
        .await?;

        let outcome = match patch.canvas_state {
            Some(state) => {
                let version = patch
                    .canvas_version
                    .unwrap_or(project.canvas_version.saturating_add(1));
                let state = serde_json::to_string(&with_dimensions(state, size))?;

                let result = sqlx::query(
                    r#"
                    UPDATE projects
                    SET canvas_state = ?, canvas_version = ?, width = ?, height = ?
                    WHERE id = ? AND canvas_version < ?
                    "#,
                )
                .bind(&state)
                .bind(version_param(version)?)
                .bind(i64::from(size.width))
                .bind(i64::from(size.height))
                .bind(project_id.to_string())
                .bind(version_param(version)?)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    debug!(
                        project_id = %project_id,
                        version,
                        stored = project.canvas_version,
                        "Skipped stale canvas write"
                    );
                    PatchOutcome::Stale {
                        stored: project.canvas_version,
                    }
                } else {
                    PatchOutcome::Applied
                }
            }
            None if size != project.size() => {
                let state =
                    serde_json::to_string(&with_dimensions(project.canvas_state.clone(), size))?;
                sqlx::query("UPDATE projects SET canvas_state = ?, width = ?, height = ? WHERE id = ?")
                    .bind(&state)
                    .bind(i64::from(size.width))
                    .bind(i64::from(size.height))
                    .bind(project_id.to_string())
                    .execute(&mut *tx)
                    .await?;
                PatchOutcome::Applied
            }
            None => PatchOutcome::Applied,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Delete a project owned by `user`
    pub async fn delete_project(&self, user: &User, project_id: Uuid) -> Result<()> {
        self.get_project(user, project_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM adjustments WHERE project_id = ?")
            .bind(project_id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE users SET projects_used = MAX(projects_used - 1, 0), last_active = ? WHERE id = ?",
        )
        .bind(timestamp(Utc::now()))
        .bind(user.id.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(project_id = %project_id, user_id = %user.id, "Deleted project");
        Ok(())
    }

    // ========================================================================
    // Adjustments
    // ========================================================================

    /// Store adjustment values for a project; values are clamped first
    pub async fn save_adjustments(
        &self,
        user: &User,
        project_id: Uuid,
        values: &AdjustmentValues,
    ) -> Result<AdjustmentValues> {
        self.get_project(user, project_id).await?;
        let values = values.clone().normalized();

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO adjustments (project_id, values_json, updated_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(project_id.to_string())
        .bind(serde_json::to_string(&values)?)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(values)
    }

    /// Load adjustment values; defaults when none were saved
    pub async fn load_adjustments(&self, user: &User, project_id: Uuid) -> Result<AdjustmentValues> {
        self.get_project(user, project_id).await?;

        let row = sqlx::query("SELECT values_json FROM adjustments WHERE project_id = ?")
            .bind(project_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let json: String = row.try_get("values_json")?;
                let values: AdjustmentValues = serde_json::from_str(&json)?;
                Ok(values.normalized())
            }
            None => Ok(AdjustmentValues::default()),
        }
    }

    /// Forget saved adjustment values
    pub async fn clear_adjustments(&self, user: &User, project_id: Uuid) -> Result<bool> {
        self.get_project(user, project_id).await?;

        let result = sqlx::query("DELETE FROM adjustments WHERE project_id = ?")
            .bind(project_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Autosave sink writing through a [`ProjectStore`] on behalf of a user
pub struct StoreSink {
    store: Arc<ProjectStore>,
    user: User,
}

impl StoreSink {
    /// Create a sink for `user`
    #[must_use]
    pub fn new(store: Arc<ProjectStore>, user: User) -> Self {
        Self { store, user }
    }
}

#[async_trait]
impl ProjectSink for StoreSink {
    async fn save_canvas(&self, request: SaveRequest) -> Result<PatchOutcome> {
        let patch = ProjectPatch::canvas(request.canvas_state, request.size, request.version);
        self.store
            .update_project(&self.user, request.project_id, patch)
            .await
    }
}

#[cfg(test)]
mod tests;
