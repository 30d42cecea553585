//! crates/overlink_core/src/sync.rs
//!
//! The nightly fan-out: every project in the system is grouped by the
//! credentials that log it into Overleaf, and one build job is dispatched per
//! group so the worker logs in once per account.

use std::collections::HashMap;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::{credential_pair, DispatchPayload, ProjectRef, SharedWorkerConfig, SyncTarget};
use crate::ports::{BuildDispatcher, DatabaseService, PortError};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to list projects: {0}")]
    DataSource(#[source] PortError),
}

/// Grouping key. Envelopes are compared as stored, so the same plaintext
/// encrypted twice lands in two groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Shared,
    Credentials(String, String),
}

/// Projects that authenticate with the same credential pair.
/// `credentials` is `None` for the group that uses the worker's shared login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialGroup {
    pub credentials: Option<(String, String)>,
    pub projects: Vec<ProjectRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub total_groups: usize,
    pub dispatched: usize,
}

/// Partitions `targets` by credential envelope pair.
///
/// Groups come out in first-seen order and keep the input order of their
/// projects. A project missing either envelope joins the shared group.
pub fn group_by_credentials(targets: Vec<SyncTarget>) -> Vec<CredentialGroup> {
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<CredentialGroup> = Vec::new();

    for target in targets {
        let credentials = credential_pair(target.email_enc.as_deref(), target.password_enc.as_deref())
            .map(|(e, p)| (e.to_string(), p.to_string()));
        let key = match &credentials {
            Some((e, p)) => GroupKey::Credentials(e.clone(), p.clone()),
            None => GroupKey::Shared,
        };

        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(CredentialGroup {
                credentials,
                projects: Vec::new(),
            });
            groups.len() - 1
        });

        groups[slot].projects.push(ProjectRef {
            project_id: target.overleaf_project,
            filename: target.filename,
        });
    }

    groups
}

/// Lists every project, groups them and dispatches one build per group.
///
/// All dispatches run concurrently; a failed dispatch is logged and counted
/// out of `dispatched` but never aborts the others.
pub async fn run_daily_sync(
    db: &dyn DatabaseService,
    dispatcher: &dyn BuildDispatcher,
    shared: &SharedWorkerConfig,
) -> Result<SyncSummary, SyncError> {
    let targets = db.list_sync_targets().await.map_err(SyncError::DataSource)?;
    if targets.is_empty() {
        info!("Daily sync: no projects to sync.");
        return Ok(SyncSummary {
            total_groups: 0,
            dispatched: 0,
        });
    }

    let project_count = targets.len();
    let groups = group_by_credentials(targets);
    info!(
        "Daily sync: {} projects in {} credential groups.",
        project_count,
        groups.len()
    );

    let dispatches = groups.into_iter().enumerate().map(move |(index, group)| async move {
        let payload = DispatchPayload::new(group.credentials, group.projects, shared);
        match dispatcher.dispatch(&payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Dispatch for credential group {} failed: {}", index, e);
                false
            }
        }
    });

    let results = join_all(dispatches).await;
    let summary = SyncSummary {
        total_groups: results.len(),
        dispatched: results.iter().filter(|ok| **ok).count(),
    };
    info!(
        "Daily sync dispatched {}/{} jobs.",
        summary.dispatched, summary.total_groups
    );
    Ok(summary)
}
