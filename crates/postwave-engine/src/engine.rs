//! The run loop: row gating, per-key execution, durable checkpoints.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use postwave_catalog::{Catalog, CatalogSource};
use postwave_channels::{Ack, Channel};
use postwave_content::{build_vars, derive_lookup_key, ContentRecord, ContentResolver};
use postwave_keys::{parse_token, split_keys};
use postwave_queue::{JobRecord, QueueStore, RowState, ScheduleRow};
use postwave_registry::{Registry, ResolveContext, Resolution};

use crate::assemble::{Assembler, PostKind};
use crate::error::{EngineError, Result};

/// Row status written when the due-time is still in the future.
const STATUS_PENDING: &str = "Scheduled (pending)";
/// Row status written when an error escapes per-key handling.
const STATUS_ROW_FAILED: &str = "Row Failed";

/// What happened to one row during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Missing due-time or key cell: not even marked pending.
    Skipped,
    /// Due-time in the future.
    Pending,
    /// Keys were executed (some may have failed).
    Processed { completed: usize, total: usize },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunReport {
    pub rows_scanned: usize,
    pub rows_skipped: usize,
    pub rows_pending: usize,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub keys_completed: usize,
    pub keys_failed: usize,
}

pub struct Engine {
    catalog: Arc<dyn CatalogSource>,
    queue: Arc<dyn QueueStore>,
    registry: Registry,
    content: ContentResolver,
    assembler: Assembler,
    channel: Arc<dyn Channel>,
    send_single: bool,
}

impl Engine {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        queue: Arc<dyn QueueStore>,
        registry: Registry,
        content: ContentResolver,
        assembler: Assembler,
        channel: Arc<dyn Channel>,
        send_single: bool,
    ) -> Self {
        Self {
            catalog,
            queue,
            registry,
            content,
            assembler,
            channel,
            send_single,
        }
    }

    /// One full pass over the queue. The catalog is loaded once and
    /// treated as an immutable snapshot for the whole run.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let catalog = self.catalog.load()?;
        let rows = self.queue.list_rows()?;
        info!(rows = rows.len(), products = catalog.len(), "run started");

        let mut report = RunReport {
            rows_scanned: rows.len(),
            ..RunReport::default()
        };
        for row in rows {
            let row_id = row.id;
            match self.process_row(&row, &catalog, now).await {
                Ok(RowOutcome::Skipped) => report.rows_skipped += 1,
                Ok(RowOutcome::Pending) => report.rows_pending += 1,
                Ok(RowOutcome::Processed { completed, total }) => {
                    report.rows_processed += 1;
                    report.keys_completed += completed;
                    report.keys_failed += total - completed;
                }
                // Row-level errors never abort the run.
                Err(e) => {
                    report.rows_failed += 1;
                    warn!(row = row_id, error = %e, "row failed");
                    if let Err(e) = self.queue.write_status(row_id, STATUS_ROW_FAILED) {
                        warn!(row = row_id, error = %e, "status write failed");
                    }
                }
            }
        }

        info!(
            processed = report.rows_processed,
            pending = report.rows_pending,
            failed = report.rows_failed,
            keys_completed = report.keys_completed,
            keys_failed = report.keys_failed,
            "run finished"
        );
        Ok(report)
    }

    async fn process_row(
        &self,
        row: &ScheduleRow,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> Result<RowOutcome> {
        let due_raw = match row.due_at.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(RowOutcome::Skipped),
        };
        let keys_raw = match row.key_string.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return Ok(RowOutcome::Skipped),
        };

        let due = parse_due(due_raw).ok_or_else(|| EngineError::BadDueTime {
            raw: due_raw.to_string(),
        })?;
        if due > now {
            self.queue.write_status(row.id, STATUS_PENDING)?;
            return Ok(RowOutcome::Pending);
        }

        let mut state = RowState::parse(row.notes.as_deref())?;
        let keys = split_keys(keys_raw);
        let total = keys.len();

        for key_raw in &keys {
            if state.record_for(key_raw).is_some_and(JobRecord::is_completed) {
                info!(row = row.id, key = %key_raw, "already completed, skipping");
                continue;
            }

            let mut record = JobRecord::pending(key_raw.clone(), now);
            match self.execute_key(key_raw, catalog, now).await {
                Ok((payload, response)) => {
                    record.complete(Utc::now(), payload, response);
                    info!(row = row.id, key = %key_raw, "key completed");
                }
                Err(e) => {
                    record.fail(Utc::now(), e.to_string());
                    warn!(row = row.id, key = %key_raw, error = %e, "key failed");
                }
            }
            state.upsert(record);
            // Checkpoint after every key so an interrupted run can
            // resume without repeating finished work.
            self.queue.write_notes(row.id, &state.to_notes()?)?;
        }

        let completed = keys
            .iter()
            .filter(|k| state.record_for(k).is_some_and(JobRecord::is_completed))
            .count();
        self.queue
            .write_status(row.id, &format!("{completed}/{total} Completed"))?;
        Ok(RowOutcome::Processed { completed, total })
    }

    /// Tokenize → dispatch → resolve content → assemble → deliver.
    /// Every failure is returned to the caller to be recorded on the
    /// key's JobRecord; nothing here touches sibling keys.
    async fn execute_key(
        &self,
        key_raw: &str,
        catalog: &Catalog,
        now: DateTime<Utc>,
    ) -> Result<(serde_json::Value, serde_json::Value)> {
        let token = parse_token(key_raw)?;

        let resolution = if token.is_manual() {
            Resolution::default()
        } else {
            let ctx = ResolveContext {
                catalog,
                now,
                params: &token.params,
            };
            let resolution = self.registry.dispatch(&token.name, &ctx)?;
            if resolution.products.is_empty() {
                return Err(EngineError::NoProducts {
                    directive: token.name.clone(),
                });
            }
            resolution
        };

        let first = resolution.products.first();
        let lookup = derive_lookup_key(&token, first);
        let vars = build_vars(
            &token.name,
            &token.params,
            first,
            resolution.collection_title.as_deref(),
        );
        // Missing content is fatal only for manual posts, which have
        // nothing but their content row; registry keys still go out
        // with empty text (the footer message stands in alone).
        let record = match self.content.resolve(&lookup, &vars, catalog)? {
            Some(record) => record,
            None if token.is_manual() => {
                return Err(EngineError::MissingContent {
                    key_type: lookup.key_type.as_str().to_string(),
                    key: lookup.key.clone(),
                });
            }
            None => {
                warn!(key = %key_raw, "no content found, posting with empty text");
                ContentRecord::default()
            }
        };

        let post = self.assembler.assemble(&token, &resolution, &record).await?;

        let ack = if post.kind == PostKind::Single && !self.send_single {
            info!(key = %key_raw, "single-post dispatch disabled, recording synthetic ack");
            Ack::success()
        } else {
            self.channel.deliver(&post.payload).await?
        };

        Ok((
            serde_json::to_value(&post.payload)?,
            serde_json::to_value(&ack)?,
        ))
    }
}

/// Parse a due-time cell. Accepts RFC 3339 or a bare
/// `YYYY-MM-DD HH:MM[:SS]` local-less timestamp read as UTC.
pub fn parse_due(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_time_formats() {
        assert!(parse_due("2026-03-01T09:00:00Z").is_some());
        assert!(parse_due("2026-03-01T09:00:00+08:00").is_some());
        assert!(parse_due("2026-03-01 09:00:00").is_some());
        assert!(parse_due("2026-03-01 09:00").is_some());
        assert!(parse_due("tomorrow").is_none());
        assert!(parse_due("").is_none());
    }

    #[test]
    fn rfc3339_offset_is_normalized_to_utc() {
        let dt = parse_due("2026-03-01T09:00:00+08:00").unwrap();
        assert_eq!(dt, parse_due("2026-03-01T01:00:00Z").unwrap());
    }
}
