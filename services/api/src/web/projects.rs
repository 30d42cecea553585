//! services/api/src/web/projects.rs
//!
//! Project management endpoints used by the dashboard.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use overlink_core::domain::{NewProject, Project};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ErrorBody, RouteError};
use crate::web::extract::{JsonBody, QueryParams};
use crate::web::state::AppState;

const FREE_TIER_MESSAGE: &str = "Free tier is limited to 1 project. Upgrade to Pro for unlimited!";
const FILENAME_TAKEN_MESSAGE: &str = "Filename is already taken";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub user_id: Option<String>,
    pub filename: Option<String>,
    /// Overleaf project URL or ID.
    pub project_id: Option<String>,
    /// Dedicated Overleaf login. Without both halves the shared login is used.
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub filename: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeleteProjectParams {
    pub id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListProjectsParams {
    pub user_id: Option<String>,
}

/// A project as shown to its owner. Credential envelopes are never returned.
#[derive(Serialize, ToSchema)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub project_id: String,
    pub public_url: String,
    pub has_credentials: bool,
    pub view_count: i64,
    pub last_sync_status: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectResponse {
    pub fn from_project(project: Project, config: &Config) -> Self {
        Self {
            public_url: config.public_url(&project.filename),
            has_credentials: project.has_credentials(),
            id: project.id,
            user_id: project.user_id,
            filename: project.filename,
            project_id: project.overleaf_project,
            view_count: project.view_count,
            last_sync_status: project.last_sync_status,
            last_sync_at: project.last_sync_at,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ProjectEnvelope {
    pub success: bool,
    pub data: ProjectResponse,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

//=========================================================================================
// Input Helpers
//=========================================================================================

/// A present, non-blank string field.
pub(crate) fn require_text(field: &str, value: Option<String>) -> Result<String, RouteError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RouteError::Validation(format!("Missing {}", field)))
}

/// A present field holding a UUID.
pub(crate) fn require_uuid(field: &str, value: Option<&str>) -> Result<Uuid, RouteError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RouteError::Validation(format!("Missing {}", field)))?;
    Uuid::parse_str(raw).map_err(|_| RouteError::Validation(format!("Invalid {}", field)))
}

/// Filenames become object keys and URL path segments, so only
/// `[A-Za-z0-9._-]` is accepted.
fn validate_filename(filename: &str) -> Result<(), RouteError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if !filename.chars().all(allowed) {
        return Err(RouteError::Validation(
            "Filename may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

/// A secret the user actually filled in. Passwords are kept byte-for-byte.
fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /projects - List the caller's projects, newest first
#[utoipa::path(
    get,
    path = "/projects",
    params(ListProjectsParams),
    responses(
        (status = 200, description = "The user's projects", body = [ProjectResponse]),
        (status = 400, description = "Missing or invalid userId", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_projects_handler(
    State(app_state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<ListProjectsParams>,
) -> Result<Json<Vec<ProjectResponse>>, RouteError> {
    let user_id = require_uuid("userId", params.user_id.as_deref())?;
    let projects = app_state.db.list_projects_for_user(user_id).await?;
    Ok(Json(
        projects
            .into_iter()
            .map(|p| ProjectResponse::from_project(p, &app_state.config))
            .collect(),
    ))
}

/// POST /projects - Link a new Overleaf project
#[utoipa::path(
    post,
    path = "/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 200, description = "Project created", body = ProjectEnvelope),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 403, description = "Tier quota exceeded", body = ErrorBody),
        (status = 409, description = "Filename already taken", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn create_project_handler(
    State(app_state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateProjectRequest>,
) -> Result<Json<ProjectEnvelope>, RouteError> {
    // 1. Validate input
    let user_id = require_uuid("userId", req.user_id.as_deref())?;
    let filename = require_text("filename", req.filename)?;
    let overleaf_project = require_text("projectId", req.project_id)?;
    validate_filename(&filename)?;

    // 2. Enforce the tier quota
    let db = &app_state.db;
    let tier = db.get_user_tier(user_id).await?;
    let existing = db.count_projects_for_user(user_id).await?;
    if !tier.allows_another_project(existing) {
        return Err(RouteError::QuotaExceeded(FREE_TIER_MESSAGE.to_string()));
    }

    // 3. Filenames share one public namespace
    if db.filename_taken(&filename, None).await? {
        return Err(RouteError::Conflict(FILENAME_TAKEN_MESSAGE.to_string()));
    }

    // 4. Encrypt whichever secrets were provided
    let cipher = &app_state.cipher;
    let email_enc = provided(req.email)
        .map(|email| cipher.encrypt_to_string(email.trim()))
        .transpose()?;
    let password_enc = provided(req.password)
        .map(|password| cipher.encrypt_to_string(&password))
        .transpose()?;

    // 5. Persist
    let project = db
        .create_project(NewProject {
            user_id,
            filename,
            overleaf_project,
            email_enc,
            password_enc,
        })
        .await?;
    info!("Created project {} ({}) for user {}", project.id, project.filename, user_id);

    Ok(Json(ProjectEnvelope {
        success: true,
        data: ProjectResponse::from_project(project, &app_state.config),
    }))
}

/// PATCH /projects - Rename a project or point it at another Overleaf project
///
/// Stored credentials are left untouched.
#[utoipa::path(
    patch,
    path = "/projects",
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectEnvelope),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
        (status = 404, description = "No such project for this user", body = ErrorBody),
        (status = 409, description = "Filename already taken", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn update_project_handler(
    State(app_state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<UpdateProjectRequest>,
) -> Result<Json<ProjectEnvelope>, RouteError> {
    if req.id.is_none() || req.user_id.is_none() {
        return Err(RouteError::Validation("Missing id or userId".to_string()));
    }
    let id = require_uuid("id", req.id.as_deref())?;
    let user_id = require_uuid("userId", req.user_id.as_deref())?;
    let filename = require_text("filename", req.filename)?;
    let overleaf_project = require_text("projectId", req.project_id)?;
    validate_filename(&filename)?;

    // Ownership before uniqueness: a foreign id is a 404 whatever the name
    let db = &app_state.db;
    db.get_project(id, user_id).await?;
    if db.filename_taken(&filename, Some(id)).await? {
        return Err(RouteError::Conflict(FILENAME_TAKEN_MESSAGE.to_string()));
    }

    let project = db
        .update_project(id, user_id, &filename, &overleaf_project)
        .await?;
    info!("Updated project {} for user {}", project.id, user_id);

    Ok(Json(ProjectEnvelope {
        success: true,
        data: ProjectResponse::from_project(project, &app_state.config),
    }))
}

/// DELETE /projects - Unlink a project and drop its published PDF
///
/// Removing the PDF from storage happens in the background; its failure is
/// logged and does not affect the response.
#[utoipa::path(
    delete,
    path = "/projects",
    params(DeleteProjectParams),
    responses(
        (status = 200, description = "Project deleted", body = SuccessResponse),
        (status = 400, description = "Missing or invalid id/userId", body = ErrorBody),
        (status = 404, description = "No such project for this user", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn delete_project_handler(
    State(app_state): State<Arc<AppState>>,
    QueryParams(params): QueryParams<DeleteProjectParams>,
) -> Result<Json<SuccessResponse>, RouteError> {
    if params.id.is_none() || params.user_id.is_none() {
        return Err(RouteError::Validation("Missing id or userId".to_string()));
    }
    let id = require_uuid("id", params.id.as_deref())?;
    let user_id = require_uuid("userId", params.user_id.as_deref())?;

    let project = app_state.db.delete_project(id, user_id).await?;
    info!("Deleted project {} for user {}", id, user_id);

    if let Some(storage) = app_state.storage.clone() {
        let key = project.object_key();
        tokio::spawn(async move {
            if let Err(e) = storage.delete_object(&key).await {
                warn!("Failed to delete {} from storage: {}", key, e);
            }
        });
    }

    Ok(Json(SuccessResponse { success: true }))
}
