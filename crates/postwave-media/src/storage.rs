//! Object-storage collaborator for temporary image hosting.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use postwave_core::config::{StorageConfig, HTTP_TIMEOUT_SECS};

use crate::error::{MediaError, Result};

/// A hosted object: public URL plus the key needed for later deletion.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

/// Temporary image hosting. Deletion and cleanup are maintenance
/// operations — never on a job's critical path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>, content_type: &str) -> Result<StoredObject>;

    /// Best-effort delete: failures are logged, never returned.
    async fn delete(&self, key: &str);

    /// Delete objects older than `max_age_hours`. Returns the count.
    async fn cleanup_older_than(&self, max_age_hours: u32) -> Result<u64>;
}

/// HTTP object-storage client (`POST /objects`, `DELETE /objects/{key}`,
/// `POST /cleanup`), optionally bearer-authenticated.
pub struct HttpObjectStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl HttpObjectStore {
    pub fn new(config: StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, bytes: Vec<u8>, content_type: &str) -> Result<StoredObject> {
        let url = format!("{}/objects", self.config.endpoint.trim_end_matches('/'));
        let resp = self
            .authed(self.client.post(&url))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MediaError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let stored: StoredObject = resp
            .json()
            .await
            .map_err(|e| MediaError::UnexpectedResponse(e.to_string()))?;
        info!(key = %stored.key, "image uploaded");
        Ok(stored)
    }

    async fn delete(&self, key: &str) {
        let url = format!(
            "{}/objects/{}",
            self.config.endpoint.trim_end_matches('/'),
            key
        );
        match self.authed(self.client.delete(&url)).send().await {
            Ok(resp) if resp.status().is_success() => info!(key, "image deleted"),
            Ok(resp) => warn!(key, status = resp.status().as_u16(), "image delete rejected"),
            Err(e) => warn!(key, error = %e, "image delete failed"),
        }
    }

    async fn cleanup_older_than(&self, max_age_hours: u32) -> Result<u64> {
        #[derive(Deserialize)]
        struct CleanupResponse {
            deleted: u64,
        }

        let url = format!("{}/cleanup", self.config.endpoint.trim_end_matches('/'));
        let resp = self
            .authed(self.client.post(&url))
            .json(&serde_json::json!({ "max_age_hours": max_age_hours }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MediaError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let parsed: CleanupResponse = resp
            .json()
            .await
            .map_err(|e| MediaError::UnexpectedResponse(e.to_string()))?;
        info!(deleted = parsed.deleted, max_age_hours, "storage cleanup complete");
        Ok(parsed.deleted)
    }
}

/// Cap error bodies so job records stay readable.
pub(crate) fn truncate(body: &str) -> String {
    const MAX: usize = 300;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}
