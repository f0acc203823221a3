//! S3-style HTTP object store client.

use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use tracing::info;

/// A client for an S3-compatible object store (MinIO and friends) addressed
/// as `{endpoint}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
}

impl HttpStore {
    pub fn new(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.object_url(key);
        info!("[store] GET {url}");
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(url));
        }
        if !response.status().is_success() {
            return Err(StoreError::Http(format!(
                "GET {url} failed with status {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let url = self.object_url(key);
        info!("[store] PUT {url} ({} bytes)", bytes.len());
        let response = self.client.put(&url).body(bytes.to_vec()).send().await?;
        if !response.status().is_success() {
            return Err(StoreError::Http(format!(
                "PUT {url} failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}
