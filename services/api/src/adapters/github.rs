//! services/api/src/adapters/github.rs
//!
//! Triggers the external PDF build worker through a GitHub
//! `repository_dispatch` event. Implements the `BuildDispatcher` port.

use async_trait::async_trait;
use overlink_core::domain::DispatchPayload;
use overlink_core::ports::{BuildDispatcher, PortError, PortResult};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::GithubConfig;

const DISPATCH_ACCEPT: &str = "application/vnd.github.everest-preview+json";
const EVENT_TYPE: &str = "sync_job";

#[derive(Serialize)]
struct DispatchRequest<'a> {
    event_type: &'a str,
    client_payload: &'a DispatchPayload,
}

/// An adapter that implements the `BuildDispatcher` port using the GitHub REST API.
#[derive(Clone)]
pub struct GithubDispatchAdapter {
    client: reqwest::Client,
    config: GithubConfig,
}

impl GithubDispatchAdapter {
    pub fn new(client: reqwest::Client, config: GithubConfig) -> Self {
        Self { client, config }
    }

    fn dispatch_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/dispatches",
            self.config.api_url, self.config.owner, self.config.repo
        )
    }
}

#[async_trait]
impl BuildDispatcher for GithubDispatchAdapter {
    async fn dispatch(&self, payload: &DispatchPayload) -> PortResult<()> {
        let body = DispatchRequest {
            event_type: EVENT_TYPE,
            client_payload: payload,
        };

        let response = self
            .client
            .post(self.dispatch_url())
            .header(ACCEPT, DISPATCH_ACCEPT)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
            .header(USER_AGENT, "overlink")
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Dispatch request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            debug!("Dispatched build for {} project(s).", payload.projects.len());
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Dispatch rejected with {}: {}", status, body);
        Err(PortError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}
