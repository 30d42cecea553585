//! services/api/src/web/public.rs
//!
//! The shareable link for a project's PDF. Each hit is counted before the
//! visitor is sent on to the CDN copy.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use std::sync::Arc;

use crate::error::{ErrorBody, RouteError};
use crate::web::state::AppState;

/// GET /p/{filename} - Count a view and redirect to the published PDF
#[utoipa::path(
    get,
    path = "/p/{filename}",
    params(
        ("filename" = String, Path, description = "The project's public filename, with or without `.pdf`.")
    ),
    responses(
        (status = 307, description = "Redirect to the PDF on the CDN"),
        (status = 404, description = "No project is published under this name", body = ErrorBody)
    )
)]
pub async fn public_pdf_handler(
    State(app_state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Redirect, RouteError> {
    let filename = filename.strip_suffix(".pdf").unwrap_or(&filename);
    let project = app_state.db.record_view(filename).await?;
    Ok(Redirect::temporary(&app_state.config.public_url(&project.filename)))
}
