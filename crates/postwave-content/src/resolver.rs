//! The cascading content lookup.
//!
//! Priority order for a `(key_type, key)` lookup:
//!   1. active content-table row (key matched case-insensitively)
//!   2. per-item types only: synthesis from a catalog product matching
//!      the key against product titles
//!   3. the content table's `(default, default)` row
//!   4. a message-only record, when a `message` variable is present
//!   5. nothing — `Ok(None)`; the caller decides whether that is fatal.
//!
//! An inactive content row neither matches step 1 nor vetoes step 2:
//! the Active flag gates authored content only.

use std::sync::Arc;

use tracing::{debug, warn};

use postwave_catalog::{group, Catalog};

use crate::error::Result;
use crate::record::{ContentKey, ContentRecord};
use crate::subst::{substitute, VarMap};

/// The authored content table.
pub trait ContentStore: Send + Sync {
    /// Active row matching `(key_type, key)`, key case-insensitive.
    fn find_active(&self, key_type: &str, key: &str) -> Result<Option<ContentRecord>>;
}

/// Cascading lookup over a [`ContentStore`] and the catalog snapshot.
pub struct ContentResolver {
    store: Arc<dyn ContentStore>,
}

impl ContentResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Run the cascade. Every textual field of the returned record has
    /// already passed `{{var}}` substitution and message prefixing.
    pub fn resolve(
        &self,
        key: &ContentKey,
        vars: &VarMap,
        catalog: &Catalog,
    ) -> Result<Option<ContentRecord>> {
        let key_type = key.key_type.as_str();

        if let Some(record) = self.store.find_active(key_type, &key.key)? {
            debug!(key_type, key = %key.key, "content: matched authored row");
            return Ok(Some(finish(record, vars)));
        }

        if key.key_type.is_per_item() {
            if let Some(record) = synthesize_from_catalog(&key.key, catalog, vars) {
                debug!(key_type, key = %key.key, "content: synthesized from product");
                return Ok(Some(finish(record, vars)));
            }
        }

        if let Some(record) = self.store.find_active("default", "default")? {
            debug!(key_type, key = %key.key, "content: using default row");
            return Ok(Some(finish(record, vars)));
        }

        if let Some(message) = vars.get("message").map(|m| m.trim()).filter(|m| !m.is_empty()) {
            debug!(key_type, key = %key.key, "content: message-only fallback");
            return Ok(Some(ContentRecord {
                key_type: "fallback".to_string(),
                key: "none".to_string(),
                promotional_paragraph: message.to_string(),
                active: true,
                ..Default::default()
            }));
        }

        warn!(key_type, key = %key.key, "content: no record found anywhere");
        Ok(None)
    }
}

/// Substitute all textual fields and prefix the `message` variable onto
/// the promotional paragraph.
fn finish(record: ContentRecord, vars: &VarMap) -> ContentRecord {
    let paragraph = substitute(&record.promotional_paragraph, vars);
    ContentRecord {
        promotional_paragraph: prefix_message(paragraph, vars),
        promotional_text: substitute(&record.promotional_text, vars),
        footer: substitute(&record.footer, vars),
        collection_cover_override: substitute(&record.collection_cover_override, vars),
        product_cover_override: substitute(&record.product_cover_override, vars),
        ..record
    }
}

fn prefix_message(paragraph: String, vars: &VarMap) -> String {
    let Some(message) = vars.get("message").map(|m| m.trim()).filter(|m| !m.is_empty()) else {
        return paragraph;
    };
    if paragraph.is_empty() {
        message.to_string()
    } else {
        format!("{message}\n{paragraph}")
    }
}

/// Build a per-item record from catalog product fields when no authored
/// row exists for the title.
fn synthesize_from_catalog(title: &str, catalog: &Catalog, vars: &VarMap) -> Option<ContentRecord> {
    let needle = title.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let product = catalog
        .products()
        .iter()
        .find(|p| p.title.trim().to_lowercase() == needle)?;

    let description = if product.description.is_empty() {
        product.title.as_str()
    } else {
        product.description.as_str()
    };
    let paragraph = format!(
        "{}\n\n{}\n\n{}",
        product.title, product.variant_options, description
    );

    let code = vars
        .get("sku_code")
        .cloned()
        .or_else(|| group::extract_sku_from_title(&product.title));
    let footer = match code {
        Some(code) => format!("Comment {code} for an auto-reply with the order link."),
        None => String::new(),
    };

    Some(ContentRecord {
        key_type: "product".to_string(),
        key: product.title.clone(),
        promotional_paragraph: paragraph,
        promotional_text: product.title.clone(),
        footer,
        active: true,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use postwave_catalog::Product;

    use super::*;
    use crate::record::ContentKeyType;

    /// In-memory store: `(key_type, key_lowercase) → record`.
    struct FakeStore {
        rows: Mutex<Vec<ContentRecord>>,
    }

    impl FakeStore {
        fn new(rows: Vec<ContentRecord>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
            })
        }
    }

    impl ContentStore for FakeStore {
        fn find_active(&self, key_type: &str, key: &str) -> Result<Option<ContentRecord>> {
            let rows = self.rows.lock().expect("fake store poisoned");
            Ok(rows
                .iter()
                .find(|r| {
                    r.active
                        && r.key_type == key_type
                        && r.key.to_lowercase() == key.to_lowercase()
                })
                .cloned())
        }
    }

    fn row(key_type: &str, key: &str, paragraph: &str, active: bool) -> ContentRecord {
        ContentRecord {
            key_type: key_type.into(),
            key: key.into(),
            promotional_paragraph: paragraph.into(),
            footer: "visit {{product_url}}".into(),
            active,
            ..Default::default()
        }
    }

    fn catalog_with_product(title: &str) -> Catalog {
        Catalog::build(vec![Product {
            id: "p1".into(),
            title: title.into(),
            description: "Deep clean".into(),
            variant_options: "120ml / 200ml".into(),
            ..Default::default()
        }])
    }

    #[test]
    fn authored_row_wins_and_substitutes() {
        let store = FakeStore::new(vec![row("function", "latest", "New in: {{n}} picks", true)]);
        let resolver = ContentResolver::new(store);
        let vars = VarMap::from([("n".to_string(), "5".to_string())]);

        let record = resolver
            .resolve(
                &ContentKey::new(ContentKeyType::Function, "LATEST"),
                &vars,
                &Catalog::default(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(record.promotional_paragraph, "New in: 5 picks");
    }

    #[test]
    fn message_is_prefixed_onto_paragraph() {
        let store = FakeStore::new(vec![row("function", "latest", "Body", true)]);
        let resolver = ContentResolver::new(store);
        let vars = VarMap::from([("message".to_string(), " Flash sale! ".to_string())]);

        let record = resolver
            .resolve(
                &ContentKey::new(ContentKeyType::Function, "latest"),
                &vars,
                &Catalog::default(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(record.promotional_paragraph, "Flash sale!\nBody");
    }

    #[test]
    fn per_item_miss_synthesizes_from_product() {
        let store = FakeStore::new(vec![]);
        let resolver = ContentResolver::new(store);
        let catalog = catalog_with_product("Foam Cleanser AB123");

        let record = resolver
            .resolve(
                &ContentKey::new(ContentKeyType::Product, "foam cleanser ab123"),
                &VarMap::new(),
                &catalog,
            )
            .unwrap()
            .unwrap();
        assert!(record.promotional_paragraph.contains("Foam Cleanser AB123"));
        assert!(record.promotional_paragraph.contains("120ml / 200ml"));
        assert!(record.footer.contains("AB123"));
    }

    #[test]
    fn inactive_row_does_not_block_title_fallback() {
        let store = FakeStore::new(vec![row("product", "Foam Cleanser AB123", "hidden", false)]);
        let resolver = ContentResolver::new(store);
        let catalog = catalog_with_product("Foam Cleanser AB123");

        let record = resolver
            .resolve(
                &ContentKey::new(ContentKeyType::Product, "Foam Cleanser AB123"),
                &VarMap::new(),
                &catalog,
            )
            .unwrap()
            .unwrap();
        // The inactive authored row is invisible; synthesis runs instead.
        assert_ne!(record.promotional_paragraph, "hidden");
        assert!(record.promotional_paragraph.contains("Deep clean"));
    }

    #[test]
    fn default_row_fallback_is_substituted() {
        let store = FakeStore::new(vec![row("default", "default", "Check out {{function_name}}", true)]);
        let resolver = ContentResolver::new(store);
        let vars = VarMap::from([("function_name".to_string(), "latest".to_string())]);

        let record = resolver
            .resolve(
                &ContentKey::new(ContentKeyType::Function, "missing"),
                &vars,
                &Catalog::default(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(record.promotional_paragraph, "Check out latest");
    }

    #[test]
    fn message_only_fallback_when_everything_misses() {
        let store = FakeStore::new(vec![]);
        let resolver = ContentResolver::new(store);
        let vars = VarMap::from([("message".to_string(), "  Just this.  ".to_string())]);

        let record = resolver
            .resolve(
                &ContentKey::new(ContentKeyType::Function, "missing"),
                &vars,
                &Catalog::default(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(record.promotional_paragraph, "Just this.");
        assert!(record.footer.is_empty());
        assert!(record.promotional_text.is_empty());
    }

    #[test]
    fn total_miss_returns_none() {
        let store = FakeStore::new(vec![]);
        let resolver = ContentResolver::new(store);

        let record = resolver
            .resolve(
                &ContentKey::new(ContentKeyType::Function, "missing"),
                &VarMap::new(),
                &Catalog::default(),
            )
            .unwrap();
        assert!(record.is_none());
    }
}
