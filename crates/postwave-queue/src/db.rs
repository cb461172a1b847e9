use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::store::{QueueStore, ScheduleRow};

/// Idempotent schema setup for the schedule queue.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schedule (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            due_at      TEXT,
            key_string  TEXT,
            status      TEXT,
            notes       TEXT,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_schedule_due ON schedule(due_at);",
    )?;
    Ok(())
}

pub struct SqliteQueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQueueStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Add a row to the queue. Rows are normally created upstream;
    /// this exists for the runner's scheduling command.
    pub fn insert(&self, due_at: &str, key_string: &str) -> Result<i64> {
        let conn = self.conn.lock().expect("queue connection poisoned");
        conn.execute(
            "INSERT INTO schedule (due_at, key_string) VALUES (?1, ?2)",
            (due_at, key_string),
        )?;
        Ok(conn.last_insert_rowid())
    }
}

impl QueueStore for SqliteQueueStore {
    fn list_rows(&self) -> Result<Vec<ScheduleRow>> {
        let conn = self.conn.lock().expect("queue connection poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, due_at, key_string, status, notes FROM schedule ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ScheduleRow {
                    id: row.get(0)?,
                    due_at: row.get(1)?,
                    key_string: row.get(2)?,
                    status: row.get(3)?,
                    notes: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(count = rows.len(), "loaded schedule rows");
        Ok(rows)
    }

    fn write_status(&self, row_id: i64, status: &str) -> Result<()> {
        let conn = self.conn.lock().expect("queue connection poisoned");
        conn.execute(
            "UPDATE schedule SET status = ?1 WHERE id = ?2",
            (status, row_id),
        )?;
        Ok(())
    }

    fn write_notes(&self, row_id: i64, notes: &str) -> Result<()> {
        let conn = self.conn.lock().expect("queue connection poisoned");
        conn.execute(
            "UPDATE schedule SET notes = ?1 WHERE id = ?2",
            (notes, row_id),
        )?;
        Ok(())
    }
}
