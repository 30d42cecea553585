//! crates/overlink_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{DispatchPayload, NewProject, Project, SyncStatus, SyncTarget, Tier};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Profiles ---
    /// The user's tier; a user without a profile row is on the free tier.
    async fn get_user_tier(&self, user_id: Uuid) -> PortResult<Tier>;

    // --- Project Management ---
    async fn count_projects_for_user(&self, user_id: Uuid) -> PortResult<i64>;

    /// Whether `filename` is used by any project other than `excluding`.
    async fn filename_taken(&self, filename: &str, excluding: Option<Uuid>) -> PortResult<bool>;

    async fn create_project(&self, project: NewProject) -> PortResult<Project>;

    async fn update_project(
        &self,
        id: Uuid,
        user_id: Uuid,
        filename: &str,
        overleaf_project: &str,
    ) -> PortResult<Project>;

    /// Deletes the row and returns it, so callers can clean up derived assets.
    async fn delete_project(&self, id: Uuid, user_id: Uuid) -> PortResult<Project>;

    async fn get_project(&self, id: Uuid, user_id: Uuid) -> PortResult<Project>;

    /// Newest first.
    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>>;

    // --- Sync ---
    /// Every project in the system, oldest first.
    async fn list_sync_targets(&self) -> PortResult<Vec<SyncTarget>>;

    async fn record_sync_status(&self, id: Uuid, status: SyncStatus) -> PortResult<()>;

    // --- Public Links ---
    /// Bumps the view counter of the project published under `filename`.
    async fn record_view(&self, filename: &str) -> PortResult<Project>;
}

#[async_trait]
pub trait BuildDispatcher: Send + Sync {
    /// Hands one payload to the external build worker.
    async fn dispatch(&self, payload: &DispatchPayload) -> PortResult<()>;
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn delete_object(&self, key: &str) -> PortResult<()>;
}
