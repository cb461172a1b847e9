use crate::error::Result;

/// One queue entry as stored. Timestamp and keys arrive as raw text
/// from upstream; the engine decides what malformed values mean.
#[derive(Debug, Clone)]
pub struct ScheduleRow {
    pub id: i64,
    pub due_at: Option<String>,
    pub key_string: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Queue access used by the engine: read everything, write back the
/// status and notes cells of one row at a time. Each write commits
/// before returning so an interrupted run loses at most one key.
pub trait QueueStore: Send + Sync {
    fn list_rows(&self) -> Result<Vec<ScheduleRow>>;

    fn write_status(&self, row_id: i64, status: &str) -> Result<()>;

    fn write_notes(&self, row_id: i64, notes: &str) -> Result<()>;
}
