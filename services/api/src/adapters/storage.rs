//! services/api/src/adapters/storage.rs
//!
//! Deletes compiled PDFs from the public bucket through its HTTP endpoint.

use async_trait::async_trait;
use overlink_core::ports::{ObjectStorage, PortError, PortResult};
use reqwest::{StatusCode, Url};

use crate::config::StorageConfig;

/// An adapter that implements the `ObjectStorage` port with plain HTTP `DELETE`s.
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: reqwest::Client,
    config: StorageConfig,
}

impl HttpObjectStorage {
    pub fn new(client: reqwest::Client, config: StorageConfig) -> Self {
        Self { client, config }
    }

    /// `{endpoint}/{key}` with the key percent-encoded as one path segment.
    fn object_url(&self, key: &str) -> PortResult<Url> {
        let mut url = Url::parse(&self.config.endpoint)
            .map_err(|e| PortError::Unexpected(format!("Invalid storage endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected("Storage endpoint cannot take a path".to_string()))?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn delete_object(&self, key: &str) -> PortResult<()> {
        let url = self.object_url(key)?;
        let mut request = self.client.delete(url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            // Already gone counts as deleted.
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(PortError::Upstream {
                status: s.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
