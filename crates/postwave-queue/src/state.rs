//! Per-row job state: one record per key, serialized into the row's
//! notes column as versioned JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};

pub const NOTES_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

/// Durable record of one key's execution within a row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub key_raw: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
}

impl JobRecord {
    pub fn pending(key_raw: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            key_raw: key_raw.into(),
            status: JobStatus::Pending,
            started_at: now,
            completed_at: None,
            failed_at: None,
            error: None,
            payload: None,
            response: None,
        }
    }

    pub fn complete(
        &mut self,
        now: DateTime<Utc>,
        payload: serde_json::Value,
        response: serde_json::Value,
    ) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(now);
        self.failed_at = None;
        self.error = None;
        self.payload = Some(payload);
        self.response = Some(response);
    }

    pub fn fail(&mut self, now: DateTime<Utc>, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.failed_at = Some(now);
        self.error = Some(error.into());
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}

/// The full ordered job-record collection for one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowState {
    pub version: u32,
    pub per_key: Vec<JobRecord>,
}

impl Default for RowState {
    fn default() -> Self {
        Self {
            version: NOTES_SCHEMA_VERSION,
            per_key: Vec::new(),
        }
    }
}

impl RowState {
    /// Parse a notes cell. An empty cell means no prior run; anything
    /// present must be a valid blob of a known schema version.
    pub fn parse(notes: Option<&str>) -> Result<Self> {
        let raw = match notes {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Ok(Self::default()),
        };
        let state: RowState =
            serde_json::from_str(raw).map_err(|e| QueueError::CorruptNotes {
                reason: e.to_string(),
            })?;
        if state.version != NOTES_SCHEMA_VERSION {
            return Err(QueueError::CorruptNotes {
                reason: format!("unknown schema version {}", state.version),
            });
        }
        Ok(state)
    }

    pub fn to_notes(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn record_for(&self, key_raw: &str) -> Option<&JobRecord> {
        self.per_key.iter().find(|r| r.key_raw == key_raw)
    }

    /// Insert or replace a record, keeping first-seen key order.
    pub fn upsert(&mut self, record: JobRecord) {
        match self
            .per_key
            .iter_mut()
            .find(|r| r.key_raw == record.key_raw)
        {
            Some(slot) => *slot = record,
            None => self.per_key.push(record),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.per_key.iter().filter(|r| r.is_completed()).count()
    }
}
