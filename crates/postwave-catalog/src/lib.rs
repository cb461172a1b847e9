//! `postwave-catalog` — the read-only product/collection snapshot.
//!
//! A [`Catalog`] is loaded once at the start of an engine run and treated
//! as immutable for the whole run. Collections are not stored anywhere —
//! they are derived from each product's keyword tags, and can be re-derived
//! and ranked on demand (directive resolvers use this).

pub mod db;
pub mod error;
pub mod group;
pub mod types;

pub use db::{CatalogSource, SqliteCatalog};
pub use error::{CatalogError, Result};
pub use types::{Catalog, Collection, Product, MAX_IMAGE_SLOTS};
