//! `postwave-registry` — the name-indexed directive catalog.
//!
//! Each directive implements [`Resolve`]: given the immutable
//! [`ResolveContext`] (catalog snapshot, now-timestamp, parsed
//! parameters) it returns a [`Resolution`] — candidate products plus an
//! optional resolved collection title for variable substitution.
//! Execution is read-only with respect to the context; a resolver never
//! performs I/O of its own.

pub mod builtin;
pub mod error;

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use postwave_catalog::{Catalog, Product};

pub use error::{RegistryError, Result};

/// Everything a resolver may read while executing.
pub struct ResolveContext<'a> {
    pub catalog: &'a Catalog,
    pub now: DateTime<Utc>,
    /// Parameters from the parsed key token (flags already stripped).
    pub params: &'a BTreeMap<String, String>,
}

impl<'a> ResolveContext<'a> {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Required string parameter.
    pub fn require(&self, directive: &'static str, key: &'static str) -> Result<&str> {
        self.param(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or(RegistryError::MissingParam {
                directive,
                param: key,
            })
    }

    /// Optional numeric parameter with a default.
    pub fn numeric<T: std::str::FromStr>(
        &self,
        directive: &'static str,
        key: &'static str,
        default: T,
    ) -> Result<T> {
        match self.param(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| RegistryError::InvalidParam {
                    directive,
                    param: key,
                    value: raw.to_string(),
                }),
        }
    }
}

/// What a directive resolved to.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub products: Vec<Product>,
    /// Set when the directive resolved a concrete collection; feeds the
    /// `collection_name` substitution variable.
    pub collection_title: Option<String>,
}

impl Resolution {
    pub fn products(products: Vec<Product>) -> Self {
        Self {
            products,
            collection_title: None,
        }
    }

    pub fn collection(title: impl Into<String>, products: Vec<Product>) -> Self {
        Self {
            products,
            collection_title: Some(title.into()),
        }
    }
}

/// A named directive resolver.
pub trait Resolve: Send + Sync {
    /// Unique registry key (the directive name in key cells).
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &ResolveContext) -> Result<Resolution>;
}

/// Name-indexed directive catalog. Built once per process, read-only
/// during execution.
pub struct Registry {
    entries: HashMap<&'static str, Box<dyn Resolve>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// All built-in directives registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for entry in builtin::all() {
            registry.register(entry);
        }
        registry
    }

    /// Register a resolver. Last registration wins on a name collision.
    pub fn register(&mut self, entry: Box<dyn Resolve>) {
        debug!(directive = entry.name(), "directive registered");
        self.entries.insert(entry.name(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Resolve> {
        self.entries.get(name).map(Box::as_ref)
    }

    /// Dispatch by name. Unknown names are a per-key dispatch error.
    pub fn dispatch(&self, name: &str, ctx: &ResolveContext) -> Result<Resolution> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::UnknownDirective {
                name: name.to_string(),
            })?;
        let mut resolution = entry.execute(ctx)?;
        resolution.products = dedupe_products(resolution.products);
        Ok(resolution)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Drop duplicate products by id, preserving first-seen order.
pub fn dedupe_products(products: Vec<Product>) -> Vec<Product> {
    let mut seen = HashSet::new();
    products
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .collect()
}
