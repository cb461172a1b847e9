//! Collection grouping, ranking, and title-derived codes.
//!
//! Collections are not a stored entity: every product carries a
//! comma-separated `keywords` field, and each distinct tag becomes a
//! collection containing the products that carry it. Grouping is
//! case-insensitive; the first-seen spelling of a tag wins.

use chrono::{DateTime, Utc};

use crate::types::{Collection, Product};

/// Metric used to rank derived collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMetric {
    /// Total units sold across members in the last 7 days.
    Sales7d,
    /// Total units sold across members in the last 30 days.
    Sales30d,
    /// Most recently created member.
    Recency,
}

impl CollectionMetric {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sales7" | "sales_7d" => Some(Self::Sales7d),
            "sales30" | "sales_30d" => Some(Self::Sales30d),
            "recency" | "newest" => Some(Self::Recency),
            _ => None,
        }
    }
}

/// Derive collections from product keyword tags, in first-appearance order.
pub fn collections_from_products(products: &[Product]) -> Vec<Collection> {
    let mut collections: Vec<Collection> = Vec::new();

    for product in products {
        for tag in product.keywords.split(',') {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            let needle = tag.to_lowercase();
            match collections
                .iter_mut()
                .find(|c| c.name.to_lowercase() == needle)
            {
                Some(c) => c.products.push(product.clone()),
                None => collections.push(Collection {
                    name: tag.to_string(),
                    products: vec![product.clone()],
                }),
            }
        }
    }

    collections
}

/// Rank collections by `metric`, best first. Stable for equal scores.
pub fn rank_collections(collections: &[Collection], metric: CollectionMetric) -> Vec<&Collection> {
    let mut ranked: Vec<&Collection> = collections.iter().collect();
    ranked.sort_by_key(|c| std::cmp::Reverse(collection_score(c, metric)));
    ranked
}

fn collection_score(collection: &Collection, metric: CollectionMetric) -> i64 {
    match metric {
        CollectionMetric::Sales7d => collection.products.iter().map(|p| p.sales_7d).sum(),
        CollectionMetric::Sales30d => collection.products.iter().map(|p| p.sales_30d).sum(),
        CollectionMetric::Recency => collection
            .products
            .iter()
            .filter_map(|p| p.created_at)
            .max()
            .map(|dt: DateTime<Utc>| dt.timestamp())
            .unwrap_or(0),
    }
}

/// Extract a stock code from a product title.
///
/// Titles carry codes like `AB123` — one run of ASCII uppercase letters
/// followed by one run of digits, standing alone as a token. Returns the
/// first such token.
pub fn extract_sku_from_title(title: &str) -> Option<String> {
    title
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '【' | '】'))
        .find(|token| is_sku_token(token))
        .map(str::to_string)
}

fn is_sku_token(token: &str) -> bool {
    let letters = token.chars().take_while(|c| c.is_ascii_uppercase()).count();
    if letters == 0 {
        return false;
    }
    let rest = &token[letters..];
    rest.len() >= 2 && rest.chars().all(|c| c.is_ascii_digit())
}
