use postwave_catalog::Product;
use postwave_keys::KeyToken;
use serde::{Deserialize, Serialize};

/// Category of a content lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKeyType {
    /// Operator-authored post keyed by an explicit name.
    Manual,
    /// Per-product content keyed by product title.
    Product,
    /// Per-product content for a video post.
    Video,
    /// Per-collection content keyed by collection name.
    Collection,
    /// Content tied to a directive name.
    Function,
    /// The table's default fallback row.
    Default,
}

impl ContentKeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Product => "product",
            Self::Video => "video",
            Self::Collection => "collection",
            Self::Function => "function",
            Self::Default => "default",
        }
    }

    /// Per-item types are eligible for the product-title fallback.
    pub fn is_per_item(&self) -> bool {
        matches!(self, Self::Product | Self::Video)
    }
}

/// `(type, key)` pair addressing the content table. Key matching is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentKey {
    pub key_type: ContentKeyType,
    pub key: String,
}

impl ContentKey {
    pub fn new(key_type: ContentKeyType, key: impl Into<String>) -> Self {
        Self {
            key_type,
            key: key.into(),
        }
    }
}

/// A resolved content template. Ephemeral — recomputed per job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentRecord {
    pub key_type: String,
    pub key: String,
    pub promotional_paragraph: String,
    pub promotional_text: String,
    pub footer: String,
    /// Comma-separated cover URLs that replace composed covers entirely.
    pub collection_cover_override: String,
    /// Cover URL override; meaning depends on the payload branch.
    pub product_cover_override: String,
    pub active: bool,
}

impl ContentRecord {
    /// First non-empty cover override, collection-level first.
    pub fn any_cover_override(&self) -> Option<&str> {
        [&self.collection_cover_override, &self.product_cover_override]
            .into_iter()
            .find(|v| !v.trim().is_empty())
            .map(String::as_str)
    }
}

/// Decide where in the content table a token's post should look.
///
/// Priority: explicit `key` param for manual posts; `productTitle`
/// param; `collectionName` param; the single resolved product's title;
/// otherwise the directive name itself.
pub fn derive_lookup_key(token: &KeyToken, first_product: Option<&Product>) -> ContentKey {
    let per_item_type = if token.is_video {
        ContentKeyType::Video
    } else {
        ContentKeyType::Product
    };

    if token.is_manual() {
        let key = token
            .param("key")
            .or_else(|| token.param("postName"))
            .unwrap_or("default");
        return ContentKey::new(ContentKeyType::Manual, key.trim());
    }

    if let Some(title) = token.param("productTitle") {
        return ContentKey::new(per_item_type, title.trim());
    }

    if let Some(name) = token.param("collectionName") {
        return ContentKey::new(ContentKeyType::Collection, name.trim());
    }

    if token.is_single {
        if let Some(product) = first_product {
            if !product.title.trim().is_empty() {
                return ContentKey::new(per_item_type, product.title.trim());
            }
        }
    }

    ContentKey::new(ContentKeyType::Function, token.name.clone())
}
