//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use overlink_core::domain::{NewProject, Project, SyncStatus, SyncTarget, Tier};
use overlink_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const PROJECT_COLUMNS: &str = "id, user_id, filename, overleaf_project, overleaf_email_enc, \
     overleaf_password_enc, view_count, last_sync_status, last_sync_at, created_at, updated_at";

/// Postgres error code for a unique-constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    user_id: Uuid,
    filename: String,
    overleaf_project: String,
    overleaf_email_enc: Option<String>,
    overleaf_password_enc: Option<String>,
    view_count: i64,
    last_sync_status: Option<String>,
    last_sync_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProjectRecord {
    fn to_domain(self) -> Project {
        Project {
            id: self.id,
            user_id: self.user_id,
            filename: self.filename,
            overleaf_project: self.overleaf_project,
            email_enc: self.overleaf_email_enc,
            password_enc: self.overleaf_password_enc,
            view_count: self.view_count,
            last_sync_status: self.last_sync_status,
            last_sync_at: self.last_sync_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct SyncTargetRecord {
    filename: String,
    overleaf_project: String,
    overleaf_email_enc: Option<String>,
    overleaf_password_enc: Option<String>,
}
impl SyncTargetRecord {
    fn to_domain(self) -> SyncTarget {
        SyncTarget {
            filename: self.filename,
            overleaf_project: self.overleaf_project,
            email_enc: self.overleaf_email_enc,
            password_enc: self.overleaf_password_enc,
        }
    }
}

/// Maps write errors, turning a filename unique violation into a conflict.
fn map_write_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            PortError::Conflict("Filename is already taken".to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn map_lookup_error(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_user_tier(&self, user_id: Uuid) -> PortResult<Tier> {
        let tier: Option<String> = sqlx::query_scalar("SELECT tier FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(tier.as_deref().map(Tier::from_db).unwrap_or(Tier::Free))
    }

    async fn count_projects_for_user(&self, user_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn filename_taken(&self, filename: &str, excluding: Option<Uuid>) -> PortResult<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE filename = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(filename)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    async fn create_project(&self, project: NewProject) -> PortResult<Project> {
        let sql = format!(
            "INSERT INTO projects (id, user_id, filename, overleaf_project, overleaf_email_enc, overleaf_password_enc) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PROJECT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(project.user_id)
            .bind(&project.filename)
            .bind(&project.overleaf_project)
            .bind(&project.email_enc)
            .bind(&project.password_enc)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(record.to_domain())
    }

    async fn update_project(
        &self,
        id: Uuid,
        user_id: Uuid,
        filename: &str,
        overleaf_project: &str,
    ) -> PortResult<Project> {
        let sql = format!(
            "UPDATE projects SET filename = $1, overleaf_project = $2, updated_at = now() \
             WHERE id = $3 AND user_id = $4 RETURNING {PROJECT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(filename)
            .bind(overleaf_project)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn delete_project(&self, id: Uuid, user_id: Uuid) -> PortResult<Project> {
        let sql = format!(
            "DELETE FROM projects WHERE id = $1 AND user_id = $2 RETURNING {PROJECT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_lookup_error(e, format!("Project {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn get_project(&self, id: Uuid, user_id: Uuid) -> PortResult<Project> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND user_id = $2");
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_lookup_error(e, format!("Project {} not found", id)))?;
        Ok(record.to_domain())
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_sync_targets(&self) -> PortResult<Vec<SyncTarget>> {
        let records = sqlx::query_as::<_, SyncTargetRecord>(
            "SELECT filename, overleaf_project, overleaf_email_enc, overleaf_password_enc \
             FROM projects ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn record_sync_status(&self, id: Uuid, status: SyncStatus) -> PortResult<()> {
        sqlx::query("UPDATE projects SET last_sync_status = $1, last_sync_at = now() WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn record_view(&self, filename: &str) -> PortResult<Project> {
        let sql = format!(
            "UPDATE projects SET view_count = view_count + 1 WHERE filename = $1 RETURNING {PROJECT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(filename)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_lookup_error(e, format!("No project published as {}", filename)))?;
        Ok(record.to_domain())
    }
}
