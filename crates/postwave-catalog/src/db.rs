use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;
use crate::types::{Catalog, Product};

/// Initialise the catalog schema in `conn`. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS products (
            id              TEXT    NOT NULL PRIMARY KEY,
            title           TEXT    NOT NULL,
            description     TEXT    NOT NULL DEFAULT '',
            selling_price   REAL,
            original_price  REAL,
            vendor          TEXT    NOT NULL DEFAULT '',
            url             TEXT    NOT NULL DEFAULT '',
            cover_url       TEXT    NOT NULL DEFAULT '',
            image_urls      TEXT    NOT NULL DEFAULT '[]',  -- JSON array of slot URLs
            keywords        TEXT    NOT NULL DEFAULT '',
            message         TEXT    NOT NULL DEFAULT '',
            sku             TEXT    NOT NULL DEFAULT '',
            created_at      TEXT,               -- ISO-8601 or NULL
            updated_at      TEXT,               -- ISO-8601 or NULL
            sales_7d        INTEGER NOT NULL DEFAULT 0,
            sales_30d       INTEGER NOT NULL DEFAULT 0,
            variant_options TEXT    NOT NULL DEFAULT ''
        ) STRICT;
        ",
    )?;
    Ok(())
}

/// Anything that can produce the per-run catalog snapshot.
pub trait CatalogSource: Send + Sync {
    fn load(&self) -> Result<Catalog>;
}

/// SQLite-backed catalog source reading the `products` table.
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl CatalogSource for SqliteCatalog {
    fn load(&self) -> Result<Catalog> {
        let conn = self.conn.lock().expect("catalog connection poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, description, selling_price, original_price, vendor, url,
                    cover_url, image_urls, keywords, message, sku,
                    created_at, updated_at, sales_7d, sales_30d, variant_options
             FROM products ORDER BY created_at DESC",
        )?;

        let products: Vec<Product> = stmt
            .query_map([], |row| {
                let image_urls_json: String = row.get(8)?;
                Ok(Product {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    selling_price: row.get(3)?,
                    original_price: row.get(4)?,
                    vendor: row.get(5)?,
                    url: row.get(6)?,
                    cover_url: row.get(7)?,
                    image_urls: serde_json::from_str(&image_urls_json).unwrap_or_default(),
                    keywords: row.get(9)?,
                    message: row.get(10)?,
                    sku: row.get(11)?,
                    created_at: row
                        .get::<_, Option<String>>(12)?
                        .and_then(|s| s.parse().ok()),
                    updated_at: row
                        .get::<_, Option<String>>(13)?
                        .and_then(|s| s.parse().ok()),
                    sales_7d: row.get(14)?,
                    sales_30d: row.get(15)?,
                    variant_options: row.get(16)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        info!(count = products.len(), "catalog snapshot loaded");
        Ok(Catalog::build(products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO products (id, title, keywords, image_urls, sales_30d, created_at)
             VALUES ('p1', 'Cleanser AB123', 'skincare', '[\"https://img/1.png\"]', 7,
                     '2026-08-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let source = SqliteCatalog::new(conn).unwrap();
        let catalog = source.load().unwrap();

        assert_eq!(catalog.len(), 1);
        let p = catalog.product_by_id("p1").unwrap();
        assert_eq!(p.sales_30d, 7);
        assert_eq!(p.best_image(), Some("https://img/1.png"));
        assert_eq!(catalog.collection("SKINCARE").unwrap().products.len(), 1);
    }
}
