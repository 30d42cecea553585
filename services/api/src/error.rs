//! services/api/src/error.rs
//!
//! Defines the startup error type for the API service and the error type
//! every HTTP handler returns.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use overlink_core::{CipherError, PortError, SyncError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The credential cipher could not be built from the configured key.
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The outbound HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

//=========================================================================================
// Route Errors
//=========================================================================================

/// The JSON body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors a route handler can return, each mapped to one status code.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("{0}")]
    Validation(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    QuotaExceeded(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// The build trigger answered with a non-success status.
    #[error("GitHub API Error: {0}")]
    UpstreamDispatch(String),
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::Validation(_) => StatusCode::BAD_REQUEST,
            RouteError::Unauthorized => StatusCode::UNAUTHORIZED,
            RouteError::QuotaExceeded(_) => StatusCode::FORBIDDEN,
            RouteError::NotFound(_) => StatusCode::NOT_FOUND,
            RouteError::Conflict(_) => StatusCode::CONFLICT,
            RouteError::UpstreamDispatch(_)
            | RouteError::Cipher(_)
            | RouteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PortError> for RouteError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::NotFound(msg) => RouteError::NotFound(msg),
            PortError::Conflict(msg) => RouteError::Conflict(msg),
            PortError::Upstream { body, .. } => RouteError::UpstreamDispatch(body),
            PortError::Unexpected(msg) => RouteError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for RouteError {
    fn from(rejection: JsonRejection) -> Self {
        RouteError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for RouteError {
    fn from(rejection: QueryRejection) -> Self {
        RouteError::Validation(format!("Invalid query string: {}", rejection.body_text()))
    }
}

impl From<SyncError> for RouteError {
    fn from(e: SyncError) -> Self {
        RouteError::Internal(e.to_string())
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal details stay in the logs.
        let message = match &self {
            RouteError::Cipher(_) | RouteError::Internal(_) => {
                error!("Request failed: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
