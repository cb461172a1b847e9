//! Webhook delivery. Payloads are routed to the standard or video
//! endpoint by variant; a non-success acknowledgement is an error.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use postwave_core::config::{WebhooksConfig, HTTP_TIMEOUT_SECS};

use crate::error::{ChannelError, Result};
use crate::payload::{Ack, WirePayload};

#[async_trait]
pub trait Channel: Send + Sync {
    async fn deliver(&self, payload: &WirePayload) -> Result<Ack>;
}

pub struct WebhookChannel {
    client: reqwest::Client,
    config: WebhooksConfig,
}

impl WebhookChannel {
    pub fn new(config: WebhooksConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    async fn deliver(&self, payload: &WirePayload) -> Result<Ack> {
        let url = if payload.is_video() {
            &self.config.video_url
        } else {
            &self.config.standard_url
        };
        debug!(video = payload.is_video(), "delivering payload");

        let resp = self.client.post(url).json(payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Keep the raw body in the error when the ack is not JSON.
        let body = resp.text().await?;
        let ack: Ack = serde_json::from_str(&body)
            .map_err(|_| ChannelError::UnexpectedResponse(body.trim().to_string()))?;
        if !ack.is_success() {
            return Err(ChannelError::Rejected {
                response: ack.body.to_string(),
            });
        }
        info!(video = payload.is_video(), "payload acknowledged");
        Ok(ack)
    }
}
