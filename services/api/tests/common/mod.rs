//! Shared fakes and helpers for the API integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::config::Config;
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use overlink_core::crypto::CredentialCipher;
use overlink_core::domain::{
    DispatchPayload, NewProject, Project, SyncStatus, SyncTarget, Tier,
};
use overlink_core::ports::{
    BuildDispatcher, DatabaseService, ObjectStorage, PortError, PortResult,
};
use tokio::sync::Notify;
use tower::ServiceExt;
use uuid::Uuid;

pub const ENCRYPTION_KEY: &str = "0123456789abcdef0123456789abcdef";
pub const CRON_SECRET: &str = "cron-secret";

//=========================================================================================
// In-memory Database
//=========================================================================================

#[derive(Default)]
pub struct InMemoryDb {
    /// Insertion order, oldest first.
    pub projects: Mutex<Vec<Project>>,
    pub tiers: Mutex<HashMap<Uuid, Tier>>,
    pub fail_listing: AtomicBool,
}

impl InMemoryDb {
    pub fn set_tier(&self, user_id: Uuid, tier: Tier) {
        self.tiers.lock().unwrap().insert(user_id, tier);
    }

    pub fn project_named(&self, filename: &str) -> Option<Project> {
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.filename == filename)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.projects.lock().unwrap().len()
    }

    /// Inserts a row directly, bypassing the API.
    pub fn seed(
        &self,
        user_id: Uuid,
        filename: &str,
        email_enc: Option<&str>,
        password_enc: Option<&str>,
    ) -> Project {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            user_id,
            filename: filename.to_string(),
            overleaf_project: format!("https://www.overleaf.com/project/{filename}"),
            email_enc: email_enc.map(str::to_string),
            password_enc: password_enc.map(str::to_string),
            view_count: 0,
            last_sync_status: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        };
        self.projects.lock().unwrap().push(project.clone());
        project
    }

    fn find_owned(&self, id: Uuid, user_id: Uuid) -> PortResult<Project> {
        self.projects
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id && p.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", id)))
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn get_user_tier(&self, user_id: Uuid) -> PortResult<Tier> {
        Ok(self
            .tiers
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(Tier::Free))
    }

    async fn count_projects_for_user(&self, user_id: Uuid) -> PortResult<i64> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .count() as i64)
    }

    async fn filename_taken(&self, filename: &str, excluding: Option<Uuid>) -> PortResult<bool> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.filename == filename && Some(p.id) != excluding))
    }

    async fn create_project(&self, new: NewProject) -> PortResult<Project> {
        let mut projects = self.projects.lock().unwrap();
        if projects.iter().any(|p| p.filename == new.filename) {
            return Err(PortError::Conflict("Filename is already taken".to_string()));
        }
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            filename: new.filename,
            overleaf_project: new.overleaf_project,
            email_enc: new.email_enc,
            password_enc: new.password_enc,
            view_count: 0,
            last_sync_status: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        };
        projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: Uuid,
        user_id: Uuid,
        filename: &str,
        overleaf_project: &str,
    ) -> PortResult<Project> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .iter_mut()
            .find(|p| p.id == id && p.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", id)))?;
        project.filename = filename.to_string();
        project.overleaf_project = overleaf_project.to_string();
        project.updated_at = Utc::now();
        Ok(project.clone())
    }

    async fn delete_project(&self, id: Uuid, user_id: Uuid) -> PortResult<Project> {
        let mut projects = self.projects.lock().unwrap();
        let index = projects
            .iter()
            .position(|p| p.id == id && p.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Project {} not found", id)))?;
        Ok(projects.remove(index))
    }

    async fn get_project(&self, id: Uuid, user_id: Uuid) -> PortResult<Project> {
        self.find_owned(id, user_id)
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> PortResult<Vec<Project>> {
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_sync_targets(&self) -> PortResult<Vec<SyncTarget>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .map(SyncTarget::from)
            .collect())
    }

    async fn record_sync_status(&self, id: Uuid, status: SyncStatus) -> PortResult<()> {
        let mut projects = self.projects.lock().unwrap();
        if let Some(p) = projects.iter_mut().find(|p| p.id == id) {
            p.last_sync_status = Some(status.as_str().to_string());
            p.last_sync_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_view(&self, filename: &str) -> PortResult<Project> {
        let mut projects = self.projects.lock().unwrap();
        let project = projects
            .iter_mut()
            .find(|p| p.filename == filename)
            .ok_or_else(|| PortError::NotFound(format!("No project published as {}", filename)))?;
        project.view_count += 1;
        Ok(project.clone())
    }
}

//=========================================================================================
// Fake Dispatcher and Storage
//=========================================================================================

/// Records every payload; rejects those whose first filename is listed.
#[derive(Default)]
pub struct FakeDispatcher {
    pub sent: Mutex<Vec<DispatchPayload>>,
    pub reject: Mutex<Vec<String>>,
}

impl FakeDispatcher {
    pub fn reject_filename(&self, filename: &str) {
        self.reject.lock().unwrap().push(filename.to_string());
    }

    pub fn sent(&self) -> Vec<DispatchPayload> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildDispatcher for FakeDispatcher {
    async fn dispatch(&self, payload: &DispatchPayload) -> PortResult<()> {
        self.sent.lock().unwrap().push(payload.clone());
        let rejected = payload
            .projects
            .first()
            .map(|p| self.reject.lock().unwrap().contains(&p.filename))
            .unwrap_or(false);
        if rejected {
            return Err(PortError::Upstream {
                status: 422,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub deleted: Mutex<Vec<String>>,
    pub fail: AtomicBool,
    pub called: Notify,
}

impl FakeStorage {
    /// Waits until a deletion has been attempted.
    pub async fn wait_for_call(&self) {
        tokio::time::timeout(Duration::from_secs(2), self.called.notified())
            .await
            .expect("storage deletion was never attempted");
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn delete_object(&self, key: &str) -> PortResult<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        self.called.notify_one();
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("bucket unavailable".to_string()));
        }
        Ok(())
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<InMemoryDb>,
    pub dispatcher: Arc<FakeDispatcher>,
    pub storage: Arc<FakeStorage>,
    pub cipher: CredentialCipher,
}

pub fn test_config() -> Config {
    let env = HashMap::from([
        ("DATABASE_URL", "postgres://localhost/overlink_test"),
        ("ENCRYPTION_KEY", ENCRYPTION_KEY),
        ("CRON_SECRET", CRON_SECRET),
        ("GITHUB_OWNER", "overlink"),
        ("GITHUB_REPO", "worker"),
        ("GITHUB_TOKEN", "ghp_test"),
        ("AUTH_JSON_BASE64", "e30="),
        ("CDN_BASE_URL", "https://cdn.example.com"),
    ]);
    Config::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(InMemoryDb::default());
        let dispatcher = Arc::new(FakeDispatcher::default());
        let storage = Arc::new(FakeStorage::default());
        let cipher = CredentialCipher::new(ENCRYPTION_KEY.as_bytes()).unwrap();

        let state = Arc::new(AppState {
            db: db.clone(),
            config: Arc::new(test_config()),
            cipher: Arc::new(cipher.clone()),
            dispatcher: dispatcher.clone(),
            storage: Some(storage.clone()),
        });

        Self {
            router: web::router(state),
            db,
            dispatcher,
            storage,
            cipher,
        }
    }

    /// Sends a request and returns the status and the JSON body (`Null` if empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn send_json(
        &self,
        method: Method,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send_empty(&self, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}
