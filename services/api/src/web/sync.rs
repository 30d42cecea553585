//! services/api/src/web/sync.rs
//!
//! Build triggers: the on-demand single-project sync and the scheduler's
//! nightly fan-out.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use overlink_core::domain::{DispatchPayload, SyncStatus};
use overlink_core::ports::PortError;
use overlink_core::sync::run_daily_sync;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{ErrorBody, RouteError};
use crate::web::extract::JsonBody;
use crate::web::projects::require_uuid;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// The OverLink project row id.
    pub project_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct DailySyncResponse {
    pub success: bool,
    /// Credential groups found, one build job each.
    pub total_users: usize,
    /// Build jobs the dispatch endpoint accepted.
    pub jobs_dispatched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /sync - Trigger a build of one project now
#[utoipa::path(
    post,
    path = "/sync",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Build job accepted", body = SyncResponse),
        (status = 400, description = "Missing projectId or userId", body = ErrorBody),
        (status = 404, description = "Project not found", body = ErrorBody),
        (status = 500, description = "Dispatch endpoint rejected the job", body = ErrorBody)
    )
)]
pub async fn sync_project_handler(
    State(app_state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<SyncRequest>,
) -> Result<Json<SyncResponse>, RouteError> {
    if req.project_id.is_none() || req.user_id.is_none() {
        return Err(RouteError::Validation("Missing projectId or userId".to_string()));
    }
    let id = require_uuid("projectId", req.project_id.as_deref())?;
    let user_id = require_uuid("userId", req.user_id.as_deref())?;

    // 1. Ownership check
    let project = app_state
        .db
        .get_project(id, user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => RouteError::NotFound("Project not found".to_string()),
            other => other.into(),
        })?;

    // 2. Hand the stored envelopes to the worker as-is
    let payload = DispatchPayload::for_project(&project, &app_state.config.shared_worker_config());
    let outcome = app_state.dispatcher.dispatch(&payload).await;

    let status = if outcome.is_ok() {
        SyncStatus::Queued
    } else {
        SyncStatus::Failed
    };
    if let Err(e) = app_state.db.record_sync_status(project.id, status).await {
        warn!("Failed to record sync status for {}: {}", project.id, e);
    }

    outcome.map_err(|e| match e {
        PortError::Upstream { body, .. } => RouteError::UpstreamDispatch(body),
        other => RouteError::UpstreamDispatch(other.to_string()),
    })?;
    info!("Sync job triggered for project {}", project.id);

    Ok(Json(SyncResponse {
        success: true,
        message: "Sync job triggered".to_string(),
    }))
}

/// GET /cron/daily-sync - Rebuild every project, one job per credential group
///
/// Called by the scheduler with `Authorization: Bearer <CRON_SECRET>`.
#[utoipa::path(
    get,
    path = "/cron/daily-sync",
    responses(
        (status = 200, description = "Jobs dispatched", body = DailySyncResponse),
        (status = 401, description = "Missing or wrong cron secret", body = ErrorBody),
        (status = 500, description = "Projects could not be listed", body = ErrorBody)
    )
)]
pub async fn daily_sync_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DailySyncResponse>, RouteError> {
    let expected = format!("Bearer {}", app_state.config.cron_secret);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .map(|v| bool::from(v.as_bytes().ct_eq(expected.as_bytes())))
        .unwrap_or(false);
    if !authorized {
        warn!("Rejected daily sync call with bad credentials");
        return Err(RouteError::Unauthorized);
    }

    let summary = run_daily_sync(
        app_state.db.as_ref(),
        app_state.dispatcher.as_ref(),
        &app_state.config.shared_worker_config(),
    )
    .await?;

    let message = (summary.total_groups == 0).then(|| "No projects to sync.".to_string());
    Ok(Json(DailySyncResponse {
        success: true,
        total_users: summary.total_groups,
        jobs_dispatched: summary.dispatched,
        message,
    }))
}
