use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Cover images are composed square by default.
pub const DEFAULT_COVER_SIZE: u32 = 1080;
/// Timeout applied to every outbound HTTP call (compositor, storage, webhooks).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Top-level config (postwave.toml + POSTWAVE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostwaveConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub webhooks: WebhooksConfig,
    pub compositor: CompositorConfig,
    /// Optional object-storage service. Only needed when the compositor
    /// returns raw image bytes instead of a hosted URL.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub posting: PostingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Downstream publishing pipeline endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhooksConfig {
    /// Standard image-post webhook.
    pub standard_url: String,
    /// Video-post webhook.
    pub video_url: String,
    /// When false, single-item posts are assembled but not dispatched —
    /// the job records a synthetic success ack instead.
    #[serde(default = "bool_true")]
    pub send_single: bool,
}

/// Image-compositing collaborator (base image + overlay + title → cover URL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositorConfig {
    pub endpoint: String,
    /// Sent as X-API-Key when present (hosted deployments; self-hosted
    /// instances typically leave this unset).
    pub api_key: Option<String>,
    /// Overlay frame applied to single-product covers.
    pub product_overlay_url: String,
    /// Overlay frame applied to collection covers.
    pub collection_overlay_url: String,
    #[serde(default = "default_cover_size")]
    pub cover_width: u32,
    #[serde(default = "default_cover_size")]
    pub cover_height: u32,
}

/// Object-storage collaborator for compositors that return raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    /// Bearer token, when the service requires one.
    pub token: Option<String>,
}

/// Post-assembly knobs: footer message, closing-image pool, video host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingConfig {
    /// Appended to whichever of paragraph/footer is the last rendered
    /// block of a post. Leading newlines are part of the value.
    #[serde(default)]
    pub footer_message: String,
    /// Pool of closing images; one is chosen at random and appended to
    /// multi-image posts.
    #[serde(default)]
    pub closing_image_urls: Vec<String>,
    /// Video posts link to `{video_base_url}/{sku}.mp4`.
    #[serde(default = "default_video_base_url")]
    pub video_base_url: String,
}

impl Default for PostingConfig {
    fn default() -> Self {
        Self {
            footer_message: String::new(),
            closing_image_urls: Vec::new(),
            video_base_url: default_video_base_url(),
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_cover_size() -> u32 {
    DEFAULT_COVER_SIZE
}
fn default_video_base_url() -> String {
    "https://video.example.com".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.postwave/postwave.db", home)
}

impl PostwaveConfig {
    /// Load config from a TOML file with POSTWAVE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. POSTWAVE_CONFIG env var
    ///   3. ~/.postwave/postwave.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("POSTWAVE_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        let config: PostwaveConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("POSTWAVE_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.postwave/postwave.toml", home)
}
