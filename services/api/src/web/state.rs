//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use overlink_core::crypto::CredentialCipher;
use overlink_core::ports::{BuildDispatcher, DatabaseService, ObjectStorage};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub cipher: Arc<CredentialCipher>,
    pub dispatcher: Arc<dyn BuildDispatcher>,
    /// `None` when no storage endpoint is configured; PDFs are then left in place.
    pub storage: Option<Arc<dyn ObjectStorage>>,
}
