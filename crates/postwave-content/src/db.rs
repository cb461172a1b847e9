use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::error::Result;
use crate::record::ContentRecord;
use crate::resolver::ContentStore;

/// Initialise the content schema in `conn`. Safe to call on every startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS content (
            key_type                  TEXT    NOT NULL,
            key                       TEXT    NOT NULL,
            promotional_paragraph     TEXT    NOT NULL DEFAULT '',
            promotional_text          TEXT    NOT NULL DEFAULT '',
            footer                    TEXT    NOT NULL DEFAULT '',
            collection_cover_override TEXT    NOT NULL DEFAULT '',
            product_cover_override    TEXT    NOT NULL DEFAULT '',
            active                    INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (key_type, key)
        ) STRICT;
        ",
    )?;
    Ok(())
}

/// SQLite-backed [`ContentStore`] over the `content` table.
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl ContentStore for SqliteContentStore {
    fn find_active(&self, key_type: &str, key: &str) -> Result<Option<ContentRecord>> {
        let conn = self.conn.lock().expect("content connection poisoned");
        let mut stmt = conn.prepare_cached(
            "SELECT key_type, key, promotional_paragraph, promotional_text, footer,
                    collection_cover_override, product_cover_override, active
             FROM content
             WHERE active = 1 AND key_type = ?1 AND lower(key) = lower(?2)
             LIMIT 1",
        )?;

        let record = stmt
            .query_map([key_type, key.trim()], |row| {
                Ok(ContentRecord {
                    key_type: row.get(0)?,
                    key: row.get(1)?,
                    promotional_paragraph: row.get(2)?,
                    promotional_text: row.get(3)?,
                    footer: row.get(4)?,
                    collection_cover_override: row.get(5)?,
                    product_cover_override: row.get(6)?,
                    active: row.get::<_, i64>(7)? != 0,
                })
            })?
            .filter_map(|r| r.ok())
            .next();

        Ok(record)
    }
}
