//! crates/overlink_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Only the dispatch wire types carry serde derives; everything else is
//! independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Projects a free-tier user may own.
pub const FREE_TIER_PROJECT_LIMIT: i64 = 1;

/// A linked Overleaf project, as persisted.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Globally unique; doubles as the object-storage key stem.
    pub filename: String,
    /// Overleaf project URL or ID.
    pub overleaf_project: String,
    pub email_enc: Option<String>,
    pub password_enc: Option<String>,
    pub view_count: i64,
    pub last_sync_status: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether this project carries its own (non-shared) Overleaf login.
    pub fn has_credentials(&self) -> bool {
        credential_pair(self.email_enc.as_deref(), self.password_enc.as_deref()).is_some()
    }

    /// The key of the compiled PDF in object storage.
    pub fn object_key(&self) -> String {
        format!("{}.pdf", self.filename)
    }
}

/// Fields required to insert a new project. Secrets are already encrypted.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: Uuid,
    pub filename: String,
    pub overleaf_project: String,
    pub email_enc: Option<String>,
    pub password_enc: Option<String>,
}

/// The projection of a project that the nightly sync needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub filename: String,
    pub overleaf_project: String,
    pub email_enc: Option<String>,
    pub password_enc: Option<String>,
}

impl From<&Project> for SyncTarget {
    fn from(project: &Project) -> Self {
        Self {
            filename: project.filename.clone(),
            overleaf_project: project.overleaf_project.clone(),
            email_enc: project.email_enc.clone(),
            password_enc: project.password_enc.clone(),
        }
    }
}

/// Subscription tier of a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    /// Parses the stored tier. Only `free` is limited; every other value is paid.
    pub fn from_db(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("free") {
            Tier::Free
        } else {
            Tier::Pro
        }
    }

    /// Whether a user already owning `existing` projects may create another.
    pub fn allows_another_project(self, existing: i64) -> bool {
        match self {
            Tier::Free => existing < FREE_TIER_PROJECT_LIMIT,
            Tier::Pro => true,
        }
    }
}

/// Outcome recorded on a project when a build is requested for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Queued,
    Failed,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Queued => "queued",
            SyncStatus::Failed => "failed",
        }
    }
}

//=========================================================================================
// Dispatch Wire Types
//=========================================================================================

/// One project entry in a dispatch payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    /// The Overleaf locator; the worker calls it `project_id`.
    pub project_id: String,
    pub filename: String,
}

/// Server-side settings forwarded untouched to the build worker.
#[derive(Debug, Clone, Default)]
pub struct SharedWorkerConfig {
    pub auth_json_base64: Option<String>,
}

/// The `client_payload` handed to the external build worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchPayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub projects: Vec<ProjectRef>,
    /// Always true: credentials leave this service only as envelopes.
    pub is_encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_json_base64: Option<String>,
}

impl DispatchPayload {
    pub fn new(
        credentials: Option<(String, String)>,
        projects: Vec<ProjectRef>,
        shared: &SharedWorkerConfig,
    ) -> Self {
        let (email, password) = match credentials {
            Some((email, password)) => (Some(email), Some(password)),
            None => (None, None),
        };
        Self {
            email,
            password,
            projects,
            is_encrypted: true,
            auth_json_base64: shared.auth_json_base64.clone(),
        }
    }

    /// A single-project payload for an on-demand sync.
    pub fn for_project(project: &Project, shared: &SharedWorkerConfig) -> Self {
        let credentials =
            credential_pair(project.email_enc.as_deref(), project.password_enc.as_deref())
                .map(|(e, p)| (e.to_string(), p.to_string()));
        let projects = vec![ProjectRef {
            project_id: project.overleaf_project.clone(),
            filename: project.filename.clone(),
        }];
        Self::new(credentials, projects, shared)
    }
}

/// Both envelopes, if both are present and non-empty.
pub(crate) fn credential_pair<'a>(
    email: Option<&'a str>,
    password: Option<&'a str>,
) -> Option<(&'a str, &'a str)> {
    match (email, password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => Some((e, p)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(email: Option<&str>, password: Option<&str>) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            filename: "thesis".to_string(),
            overleaf_project: "https://www.overleaf.com/project/abc".to_string(),
            email_enc: email.map(str::to_string),
            password_enc: password.map(str::to_string),
            view_count: 0,
            last_sync_status: None,
            last_sync_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn free_tier_allows_exactly_one_project() {
        assert!(Tier::Free.allows_another_project(0));
        assert!(!Tier::Free.allows_another_project(1));
        assert!(Tier::Pro.allows_another_project(50));
    }

    #[test]
    fn unknown_tiers_are_unlimited() {
        assert_eq!(Tier::from_db("free"), Tier::Free);
        assert_eq!(Tier::from_db(" FREE "), Tier::Free);
        assert_eq!(Tier::from_db("pro"), Tier::Pro);
        assert_eq!(Tier::from_db("team"), Tier::Pro);
    }

    #[test]
    fn single_project_payload_uses_own_credentials() {
        let p = project(Some("e:e:e"), Some("p:p:p"));
        let payload = DispatchPayload::for_project(&p, &SharedWorkerConfig::default());
        assert_eq!(payload.email.as_deref(), Some("e:e:e"));
        assert_eq!(payload.password.as_deref(), Some("p:p:p"));
        assert!(payload.is_encrypted);
        assert_eq!(payload.projects.len(), 1);
        assert_eq!(payload.projects[0].filename, "thesis");
        assert!(p.has_credentials());
    }

    #[test]
    fn half_configured_credentials_fall_back_to_shared() {
        let p = project(Some("e:e:e"), Some(""));
        let payload = DispatchPayload::for_project(&p, &SharedWorkerConfig::default());
        assert_eq!(payload.email, None);
        assert_eq!(payload.password, None);
        assert!(!p.has_credentials());
    }

    #[test]
    fn payload_serializes_to_worker_shape() {
        let p = project(None, None);
        let shared = SharedWorkerConfig {
            auth_json_base64: Some("e30=".to_string()),
        };
        let json = serde_json::to_value(DispatchPayload::for_project(&p, &shared)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "email": null,
                "password": null,
                "projects": [{
                    "project_id": "https://www.overleaf.com/project/abc",
                    "filename": "thesis"
                }],
                "is_encrypted": true,
                "auth_json_base64": "e30="
            })
        );

        let bare = serde_json::to_value(DispatchPayload::for_project(
            &p,
            &SharedWorkerConfig::default(),
        ))
        .unwrap();
        assert!(bare.get("auth_json_base64").is_none());
    }

    #[test]
    fn object_key_appends_pdf_extension() {
        assert_eq!(project(None, None).object_key(), "thesis.pdf");
    }
}
