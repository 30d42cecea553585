pub mod extract;
pub mod projects;
pub mod public;
pub mod rest;
pub mod state;
pub mod sync;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use state::AppState;

pub use projects::{
    create_project_handler, delete_project_handler, list_projects_handler, update_project_handler,
};
pub use public::public_pdf_handler;
pub use sync::{daily_sync_handler, sync_project_handler};

/// Builds the API routes over the shared state.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/projects",
            get(list_projects_handler)
                .post(create_project_handler)
                .patch(update_project_handler)
                .delete(delete_project_handler),
        )
        .route("/sync", post(sync_project_handler))
        .route("/cron/daily-sync", get(daily_sync_handler))
        .route("/p/{filename}", get(public_pdf_handler))
        .with_state(app_state)
}
