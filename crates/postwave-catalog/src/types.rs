use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::group;

/// How many gallery image slots a product carries.
pub const MAX_IMAGE_SLOTS: usize = 4;

/// One catalog product. Supplied wholesale by the catalog source at the
/// start of a run; never mutated by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier — jobs deduplicate resolved products on this.
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Current selling price, if known.
    pub selling_price: Option<f64>,

    /// Pre-discount price, if known.
    pub original_price: Option<f64>,

    #[serde(default)]
    pub vendor: String,

    /// Public product page URL.
    #[serde(default)]
    pub url: String,

    /// Pre-made cover image, when a designer supplied one.
    #[serde(default)]
    pub cover_url: String,

    /// Up to four gallery image slots, in display order.
    #[serde(default)]
    pub image_urls: Vec<String>,

    /// Comma-separated tags. Collections are derived from these.
    #[serde(default)]
    pub keywords: String,

    /// Free-text promotional message attached to the product row.
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub sku: String,

    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub sales_7d: i64,
    #[serde(default)]
    pub sales_30d: i64,

    /// Human-readable variant summary ("Colour: red / blue …").
    #[serde(default)]
    pub variant_options: String,
}

impl Product {
    /// Best available base image: explicit cover first, then gallery slots.
    pub fn best_image(&self) -> Option<&str> {
        if !self.cover_url.is_empty() {
            return Some(&self.cover_url);
        }
        self.image_urls
            .iter()
            .find(|u| !u.is_empty())
            .map(String::as_str)
    }

    /// Gallery slot by zero-based index, empty slots skipped at the caller.
    pub fn image_slot(&self, idx: usize) -> Option<&str> {
        self.image_urls
            .get(idx)
            .filter(|u| !u.is_empty())
            .map(String::as_str)
    }
}

/// A named product grouping derived from keyword tags.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Tag text as first seen (matching is case-insensitive).
    pub name: String,
    pub products: Vec<Product>,
}

/// Immutable per-run snapshot: all products plus derived groupings.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    by_id: HashMap<String, usize>,
    collections: Vec<Collection>,
}

impl Catalog {
    /// Build the snapshot: id index plus keyword-derived collections.
    pub fn build(products: Vec<Product>) -> Self {
        let by_id = products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        let collections = group::collections_from_products(&products);
        Self {
            products,
            by_id,
            collections,
        }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product_by_id(&self, id: &str) -> Option<&Product> {
        self.by_id.get(id).map(|&i| &self.products[i])
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Case-insensitive collection lookup by name.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        let needle = name.trim().to_lowercase();
        self.collections
            .iter()
            .find(|c| c.name.to_lowercase() == needle)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }
}
