//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification.

use utoipa::OpenApi;

use crate::error::ErrorBody;
use crate::web::projects::{
    CreateProjectRequest, ProjectEnvelope, ProjectResponse, SuccessResponse, UpdateProjectRequest,
};
use crate::web::sync::{DailySyncResponse, SyncRequest, SyncResponse};
use crate::web::{projects, public, sync};

#[derive(OpenApi)]
#[openapi(
    paths(
        projects::list_projects_handler,
        projects::create_project_handler,
        projects::update_project_handler,
        projects::delete_project_handler,
        sync::sync_project_handler,
        sync::daily_sync_handler,
        public::public_pdf_handler,
    ),
    components(
        schemas(
            CreateProjectRequest,
            UpdateProjectRequest,
            ProjectResponse,
            ProjectEnvelope,
            SuccessResponse,
            SyncRequest,
            SyncResponse,
            DailySyncResponse,
            ErrorBody,
        )
    ),
    tags(
        (name = "OverLink API", description = "Link Overleaf projects to permanent, auto-synced PDF URLs.")
    )
)]
pub struct ApiDoc;
