//! Cover-image composition via the external switchboard service.
//!
//! The service answers either with a JSON envelope carrying the hosted
//! URL of the rendered image, or with raw image bytes. In the latter
//! case the bytes are pushed to object storage to obtain a URL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use postwave_core::config::{CompositorConfig, HTTP_TIMEOUT_SECS};

use crate::error::{MediaError, Result};
use crate::storage::{truncate, ObjectStore};

/// One composition: a base image framed by an overlay, with an optional
/// title rendered on top.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    pub base_image_url: String,
    pub overlay_url: String,
    pub title_text: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait Compose: Send + Sync {
    /// Returns the public URL of the composed image.
    async fn compose(&self, req: &ComposeRequest) -> Result<String>;
}

pub struct SwitchboardCompositor {
    client: reqwest::Client,
    config: CompositorConfig,
    storage: Option<Arc<dyn ObjectStore>>,
}

impl SwitchboardCompositor {
    pub fn new(config: CompositorConfig, storage: Option<Arc<dyn ObjectStore>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            config,
            storage,
        })
    }

    fn body(&self, req: &ComposeRequest) -> serde_json::Value {
        let mut elements = serde_json::json!({
            "product-image": { "url": req.base_image_url },
            "cover-frame": { "url": req.overlay_url },
        });
        if let Some(title) = &req.title_text {
            elements["product-title"] = serde_json::json!({ "text": title });
        }
        serde_json::json!({
            "template": "product-cover",
            "sizes": [{ "width": req.width, "height": req.height }],
            "elements": elements,
        })
    }
}

#[async_trait]
impl Compose for SwitchboardCompositor {
    async fn compose(&self, req: &ComposeRequest) -> Result<String> {
        debug!(base = %req.base_image_url, "composing cover image");

        let mut builder = self
            .client
            .post(&self.config.endpoint)
            .json(&self.body(req));
        if let Some(key) = &self.config.api_key {
            builder = builder.header("X-API-Key", key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MediaError::Status {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("application/json") {
            let value: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| MediaError::UnexpectedResponse(e.to_string()))?;
            let url = extract_envelope_url(&value).ok_or_else(|| {
                MediaError::UnexpectedResponse("envelope carries no image url".into())
            })?;
            info!(url = %url, "cover composed");
            Ok(url)
        } else if content_type.starts_with("image/") {
            let storage = self
                .storage
                .as_ref()
                .ok_or(MediaError::StorageUnavailable)?;
            let bytes = resp.bytes().await?.to_vec();
            let stored = storage.put(bytes, &content_type).await?;
            info!(url = %stored.url, "cover composed and hosted");
            Ok(stored.url)
        } else {
            Err(MediaError::UnexpectedResponse(format!(
                "unexpected content type `{content_type}`"
            )))
        }
    }
}

/// Pull the hosted-image URL out of a compositor envelope. Known shapes
/// are tried most-specific first.
fn extract_envelope_url(value: &serde_json::Value) -> Option<String> {
    let as_url = |v: &serde_json::Value| v.as_str().map(str::to_string);

    if let Some(url) = value
        .pointer("/sizes/0/url")
        .and_then(as_url)
        .filter(|u| !u.is_empty())
    {
        return Some(url);
    }
    if let Some(url) = value
        .pointer("/results/0/url")
        .and_then(as_url)
        .filter(|u| !u.is_empty())
    {
        return Some(url);
    }
    if let Some(url) = value
        .pointer("/results/0/assets/0/url")
        .and_then(as_url)
        .filter(|u| !u.is_empty())
    {
        return Some(url);
    }
    value
        .get("url")
        .and_then(as_url)
        .filter(|u| !u.is_empty())
}
