//! Payload assembly: decide which covers to compose, in what order,
//! and wrap the result with the resolved content text.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::debug;

use postwave_catalog::{Product, MAX_IMAGE_SLOTS};
use postwave_channels::WirePayload;
use postwave_content::{ContentRecord, ContentStore};
use postwave_core::config::{CompositorConfig, PostingConfig};
use postwave_keys::KeyToken;
use postwave_media::{Compose, ComposeRequest};
use postwave_registry::Resolution;

use crate::error::{EngineError, Result};

/// Which assembly branch produced a post. Drives webhook routing and
/// the single-post dispatch switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Manual,
    Single,
    Multi,
    Video,
}

#[derive(Debug, Clone)]
pub struct AssembledPost {
    pub kind: PostKind,
    pub payload: WirePayload,
}

/// Builds outbound payloads. Composition is delegated to the
/// compositor; this type only decides bases, overlays and order.
pub struct Assembler {
    compositor: Arc<dyn Compose>,
    content: Arc<dyn ContentStore>,
    compositor_cfg: CompositorConfig,
    posting: PostingConfig,
}

impl Assembler {
    pub fn new(
        compositor: Arc<dyn Compose>,
        content: Arc<dyn ContentStore>,
        compositor_cfg: CompositorConfig,
        posting: PostingConfig,
    ) -> Self {
        Self {
            compositor,
            content,
            compositor_cfg,
            posting,
        }
    }

    pub async fn assemble(
        &self,
        token: &KeyToken,
        resolution: &Resolution,
        record: &ContentRecord,
    ) -> Result<AssembledPost> {
        let kind = branch(token, resolution);
        debug!(key = %token.key_raw, ?kind, "assembling payload");

        let payload = match kind {
            PostKind::Manual => self.assemble_manual(token, record)?,
            PostKind::Video => self.assemble_video(resolution, record)?,
            PostKind::Single => self.assemble_single(token, resolution, record).await?,
            PostKind::Multi => self.assemble_multi(resolution, record).await?,
        };
        Ok(AssembledPost { kind, payload })
    }

    /// A manual post has nothing but its content row, so a missing
    /// cover override is fatal rather than an empty image field.
    fn assemble_manual(&self, token: &KeyToken, record: &ContentRecord) -> Result<WirePayload> {
        let images = record
            .any_cover_override()
            .map(split_urls)
            .unwrap_or_default();
        if images.is_empty() {
            return Err(EngineError::NoManualCover {
                key: token.key_raw.clone(),
            });
        }
        Ok(self.standard(record, images))
    }

    fn assemble_video(
        &self,
        resolution: &Resolution,
        record: &ContentRecord,
    ) -> Result<WirePayload> {
        let product = first_product(resolution)?;
        let sku = postwave_catalog::group::extract_sku_from_title(&product.title).ok_or_else(
            || EngineError::MissingSku {
                title: product.title.clone(),
            },
        )?;
        let video_url = format!(
            "{}/{}.mp4",
            self.posting.video_base_url.trim_end_matches('/'),
            sku
        );
        Ok(WirePayload::video(
            self.with_footer_message(&record.promotional_paragraph),
            &[video_url],
            self.with_footer_message(&record.footer),
        ))
    }

    async fn assemble_single(
        &self,
        token: &KeyToken,
        resolution: &Resolution,
        record: &ContentRecord,
    ) -> Result<WirePayload> {
        let product = first_product(resolution)?;

        if let Some(override_urls) = record.any_cover_override() {
            return Ok(self.standard(record, split_urls(override_urls)));
        }

        if truthy(token.param("multipleImages")) {
            let mut images = Vec::new();
            for slot in 0..MAX_IMAGE_SLOTS {
                let Some(base) = product.image_slot(slot) else {
                    break;
                };
                images.push(
                    self.compose(base, &self.compositor_cfg.product_overlay_url, product)
                        .await?,
                );
            }
            if images.is_empty() {
                return Err(EngineError::NoImage {
                    title: product.title.clone(),
                });
            }
            if images.len() > 1 {
                if let Some(closing) = self.closing_image() {
                    images.push(closing);
                }
            }
            return Ok(self.standard(record, images));
        }

        let base = product.best_image().ok_or_else(|| EngineError::NoImage {
            title: product.title.clone(),
        })?;
        let cover = self
            .compose(base, &self.compositor_cfg.product_overlay_url, product)
            .await?;
        Ok(self.standard(record, vec![cover]))
    }

    async fn assemble_multi(
        &self,
        resolution: &Resolution,
        record: &ContentRecord,
    ) -> Result<WirePayload> {
        let mut images = Vec::new();
        for product in &resolution.products {
            let item_override = self.item_cover_override(product)?;
            let base = match item_override.as_deref() {
                Some(url) => url.to_string(),
                None => match product.best_image() {
                    Some(url) => url.to_string(),
                    None => {
                        debug!(title = %product.title, "no image, skipping product");
                        continue;
                    }
                },
            };
            images.push(
                self.compose(&base, &self.compositor_cfg.collection_overlay_url, product)
                    .await?,
            );
        }
        if !images.is_empty() {
            if let Some(closing) = self.closing_image() {
                images.push(closing);
            }
        }
        // A row-level cover override replaces the first computed image.
        if let Some(override_urls) = record.any_cover_override() {
            if let Some(first) = split_urls(override_urls).into_iter().next() {
                if images.is_empty() {
                    images.push(first);
                } else {
                    images[0] = first;
                }
            }
        }
        if images.is_empty() {
            return Err(EngineError::NoCovers {
                count: resolution.products.len(),
            });
        }
        Ok(self.standard(record, images))
    }

    /// Per-item cover override from the product's own content row.
    fn item_cover_override(&self, product: &Product) -> Result<Option<String>> {
        let record = self.content.find_active("product", &product.title)?;
        Ok(record
            .and_then(|r| {
                let url = r.product_cover_override.trim().to_string();
                (!url.is_empty()).then_some(url)
            })
            .map(|url| split_urls(&url).into_iter().next().unwrap_or(url)))
    }

    async fn compose(&self, base: &str, overlay: &str, product: &Product) -> Result<String> {
        let req = ComposeRequest {
            base_image_url: base.to_string(),
            overlay_url: overlay.to_string(),
            title_text: Some(product.title.clone()),
            width: self.compositor_cfg.cover_width,
            height: self.compositor_cfg.cover_height,
        };
        Ok(self.compositor.compose(&req).await?)
    }

    fn standard(&self, record: &ContentRecord, images: Vec<String>) -> WirePayload {
        WirePayload::standard(
            self.with_footer_message(&record.promotional_paragraph),
            &images,
            self.with_footer_message(&record.footer),
        )
    }

    /// The footer message is appended to non-empty text; an empty block
    /// renders as the trimmed footer message alone.
    fn with_footer_message(&self, text: &str) -> String {
        if text.trim().is_empty() {
            self.posting.footer_message.trim().to_string()
        } else {
            format!("{text}{}", self.posting.footer_message)
        }
    }

    fn closing_image(&self) -> Option<String> {
        self.posting
            .closing_image_urls
            .choose(&mut rand::thread_rng())
            .cloned()
    }
}

/// A resolution with exactly one product is a single post even without
/// the flag; there is nothing to carousel.
fn branch(token: &KeyToken, resolution: &Resolution) -> PostKind {
    if token.is_manual() {
        PostKind::Manual
    } else if token.is_video {
        PostKind::Video
    } else if token.is_single || resolution.products.len() == 1 {
        PostKind::Single
    } else {
        PostKind::Multi
    }
}

fn first_product(resolution: &Resolution) -> Result<&Product> {
    resolution
        .products
        .first()
        .ok_or_else(|| EngineError::NoProducts {
            directive: "single-item payload".to_string(),
        })
}

fn split_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(str::to_lowercase).as_deref(),
        Some("true") | Some("1") | Some("yes")
    )
}
