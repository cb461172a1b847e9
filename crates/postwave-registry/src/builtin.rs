//! Built-in directive resolvers.
//!
//! Parameter vocabulary: `days`, `limit`, `topN`, `sampleK`, `index`,
//! `metric`, `collectionName`, `productTitle`, `vendorName`, `minPrice`,
//! `maxPrice`, `keywords`. Unlisted parameters are ignored by resolvers
//! but still flow into content variables downstream.

use chrono::Duration;
use rand::seq::SliceRandom;

use postwave_catalog::group::{rank_collections, CollectionMetric};
use postwave_catalog::Product;

use crate::{RegistryError, Resolution, Resolve, ResolveContext, Result};

/// Every built-in, ready for [`Registry::with_builtins`](crate::Registry::with_builtins).
pub fn all() -> Vec<Box<dyn Resolve>> {
    vec![
        Box::new(Latest),
        Box::new(Collection),
        Box::new(TopCollection),
        Box::new(ByTitle),
        Box::new(Vendor),
        Box::new(PriceRange),
        Box::new(TopSellers),
        Box::new(Keyword),
        Box::new(Random),
    ]
}

fn truncated(mut products: Vec<Product>, limit: usize) -> Vec<Product> {
    products.truncate(limit);
    products
}

/// `latest(days=7, limit=10)` — products created in the last N days, newest first.
struct Latest;

impl Resolve for Latest {
    fn name(&self) -> &'static str {
        "latest"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let days: i64 = ctx.numeric(self.name(), "days", 7)?;
        let limit: usize = ctx.numeric(self.name(), "limit", 10)?;
        let cutoff = ctx.now - Duration::days(days);

        let mut products: Vec<Product> = ctx
            .catalog
            .products()
            .iter()
            .filter(|p| p.created_at.is_some_and(|dt| dt >= cutoff))
            .cloned()
            .collect();
        products.sort_by_key(|p| std::cmp::Reverse(p.created_at));

        Ok(Resolution::products(truncated(products, limit)))
    }
}

/// `collection(collectionName=…, limit=0)` — members of a named collection.
struct Collection;

impl Resolve for Collection {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let name = ctx.require(self.name(), "collectionName")?;
        let limit: usize = ctx.numeric(self.name(), "limit", usize::MAX)?;

        let collection =
            ctx.catalog
                .collection(name)
                .ok_or_else(|| RegistryError::CollectionNotFound {
                    name: name.to_string(),
                })?;

        Ok(Resolution::collection(
            collection.name.clone(),
            truncated(collection.products.clone(), limit),
        ))
    }
}

/// `top_collection(metric=sales30, index=0, limit=0)` — the Nth-ranked collection.
struct TopCollection;

impl Resolve for TopCollection {
    fn name(&self) -> &'static str {
        "top_collection"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let metric = match ctx.param("metric") {
            None => CollectionMetric::Sales30d,
            Some(raw) => {
                CollectionMetric::parse(raw).ok_or_else(|| RegistryError::InvalidParam {
                    directive: self.name(),
                    param: "metric",
                    value: raw.to_string(),
                })?
            }
        };
        let index: usize = ctx.numeric(self.name(), "index", 0)?;
        let limit: usize = ctx.numeric(self.name(), "limit", usize::MAX)?;

        let ranked = rank_collections(ctx.catalog.collections(), metric);
        let collection = ranked
            .get(index)
            .ok_or_else(|| RegistryError::CollectionNotFound {
                name: format!("rank #{index}"),
            })?;

        Ok(Resolution::collection(
            collection.name.clone(),
            truncated(collection.products.clone(), limit),
        ))
    }
}

/// `product(productTitle=…)` — exact title match, case-insensitive.
struct ByTitle;

impl Resolve for ByTitle {
    fn name(&self) -> &'static str {
        "product"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let title = ctx.require(self.name(), "productTitle")?;
        let needle = title.trim().to_lowercase();

        let products: Vec<Product> = ctx
            .catalog
            .products()
            .iter()
            .filter(|p| p.title.trim().to_lowercase() == needle)
            .cloned()
            .collect();

        Ok(Resolution::products(products))
    }
}

/// `vendor(vendorName=…, limit=10)` — products from one vendor.
struct Vendor;

impl Resolve for Vendor {
    fn name(&self) -> &'static str {
        "vendor"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let vendor = ctx.require(self.name(), "vendorName")?;
        let limit: usize = ctx.numeric(self.name(), "limit", 10)?;
        let needle = vendor.trim().to_lowercase();

        let products: Vec<Product> = ctx
            .catalog
            .products()
            .iter()
            .filter(|p| p.vendor.trim().to_lowercase() == needle)
            .cloned()
            .collect();

        Ok(Resolution::products(truncated(products, limit)))
    }
}

/// `price_range(minPrice=…, maxPrice=…, limit=10)` — selling price within bounds.
struct PriceRange;

impl Resolve for PriceRange {
    fn name(&self) -> &'static str {
        "price_range"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let min: f64 = ctx.numeric(self.name(), "minPrice", 0.0)?;
        let max: f64 = ctx.numeric(self.name(), "maxPrice", f64::MAX)?;
        let limit: usize = ctx.numeric(self.name(), "limit", 10)?;

        let products: Vec<Product> = ctx
            .catalog
            .products()
            .iter()
            .filter(|p| {
                p.selling_price
                    .is_some_and(|price| price >= min && price <= max)
            })
            .cloned()
            .collect();

        Ok(Resolution::products(truncated(products, limit)))
    }
}

/// `top_sellers(days=30, topN=5)` — best sellers over a 7- or 30-day window.
struct TopSellers;

impl Resolve for TopSellers {
    fn name(&self) -> &'static str {
        "top_sellers"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let days: u32 = ctx.numeric(self.name(), "days", 30)?;
        let top_n: usize = ctx.numeric(self.name(), "topN", 5)?;

        let sales = |p: &Product| match days {
            0..=7 => p.sales_7d,
            _ => p.sales_30d,
        };

        let mut products: Vec<Product> = ctx
            .catalog
            .products()
            .iter()
            .filter(|p| sales(p) > 0)
            .cloned()
            .collect();
        products.sort_by_key(|p| std::cmp::Reverse(sales(p)));

        Ok(Resolution::products(truncated(products, top_n)))
    }
}

/// `keyword(keywords="a, b", limit=10)` — products sharing any listed tag.
struct Keyword;

impl Resolve for Keyword {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let raw = ctx.require(self.name(), "keywords")?;
        let limit: usize = ctx.numeric(self.name(), "limit", 10)?;

        let wanted: Vec<String> = raw
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        let products: Vec<Product> = ctx
            .catalog
            .products()
            .iter()
            .filter(|p| {
                p.keywords
                    .split(',')
                    .map(|t| t.trim().to_lowercase())
                    .any(|tag| wanted.contains(&tag))
            })
            .cloned()
            .collect();

        Ok(Resolution::products(truncated(products, limit)))
    }
}

/// `random(sampleK=1)` — a uniform sample of the whole catalog.
struct Random;

impl Resolve for Random {
    fn name(&self) -> &'static str {
        "random"
    }

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution> {
        let k: usize = ctx.numeric(self.name(), "sampleK", 1)?;
        let mut rng = rand::thread_rng();

        let products: Vec<Product> = ctx
            .catalog
            .products()
            .choose_multiple(&mut rng, k)
            .cloned()
            .collect();

        Ok(Resolution::products(products))
    }
}
