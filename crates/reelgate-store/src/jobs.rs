//! Broadcast job records — durable CRUD with at-least-once write semantics.
//!
//! Apart from `create`, every operation degrades on storage failure: reads
//! return empty, writes become logged no-ops. Callers cannot distinguish
//! "truly empty" from "store degraded"; that ambiguity is part of the
//! contract the rest of the system is written against.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::db::Database;
use reelgate_core::error::{ReelgateError, Result};
use reelgate_core::types::{BroadcastJob, BroadcastPayload, JobPatch, JobStatus, LinkButton};

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";

#[derive(Debug, Clone)]
pub struct JobStore {
    db: Database,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new `Pending` job and return its id. This is the one job
    /// operation that surfaces `Storage` — the operator command is simply
    /// not accepted.
    pub fn create(
        &self,
        payload: &BroadcastPayload,
        buttons: &[LinkButton],
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<i64> {
        let payload_json = encode_payload(payload)?;
        let buttons_json = encode_buttons(buttons)?;
        let created_at = Utc::now().to_rfc3339();
        self.db.with_conn("create job", |conn| {
            conn.execute(
                "INSERT INTO broadcast_jobs (payload, buttons, run_date, run_time, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                rusqlite::params![
                    payload_json,
                    buttons_json,
                    date.format(DATE_FMT).to_string(),
                    time.format(TIME_FMT).to_string(),
                    created_at,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// `None` covers both a missing row and a degraded store.
    pub fn get(&self, id: i64) -> Option<BroadcastJob> {
        self.db
            .with_conn("read job", |conn| {
                conn.query_row(
                    "SELECT id, payload, buttons, run_date, run_time, status, created_at
                     FROM broadcast_jobs WHERE id = ?1",
                    rusqlite::params![id],
                    row_to_job,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("job {id} read degraded to none: {e}");
                None
            })
    }

    /// Pending jobs ordered by (date, time) ascending. Display order only —
    /// execution order is per-job wall-clock driven.
    pub fn list_pending(&self) -> Vec<BroadcastJob> {
        self.db
            .with_conn("list pending jobs", |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, payload, buttons, run_date, run_time, status, created_at
                     FROM broadcast_jobs WHERE status = 'pending'
                     ORDER BY run_date, run_time",
                )?;
                let rows = stmt.query_map([], row_to_job)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .unwrap_or_else(|e| {
                tracing::warn!("pending job listing degraded to empty: {e}");
                Vec::new()
            })
    }

    /// Apply only the fields present in `patch`, in one UPDATE statement —
    /// no observer ever sees a half-applied field set.
    pub fn update(&self, id: i64, patch: &JobPatch) {
        let payload_json = match &patch.payload {
            Some(p) => match encode_payload(p) {
                Ok(json) => Some(json),
                Err(e) => {
                    tracing::warn!("job {id} update dropped: {e}");
                    return;
                }
            },
            None => None,
        };
        let buttons_json = match &patch.buttons {
            Some(b) => match encode_buttons(b) {
                Ok(json) => Some(json),
                Err(e) => {
                    tracing::warn!("job {id} update dropped: {e}");
                    return;
                }
            },
            None => None,
        };
        let date_text = patch.date.map(|d| d.format(DATE_FMT).to_string());
        let time_text = patch.time.map(|t| t.format(TIME_FMT).to_string());

        let outcome = self.db.with_conn("update job", |conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut args: Vec<&dyn rusqlite::ToSql> = Vec::new();
            if let Some(p) = &payload_json {
                sets.push("payload = ?");
                args.push(p);
            }
            if let Some(b) = &buttons_json {
                sets.push("buttons = ?");
                args.push(b);
            }
            if let Some(d) = &date_text {
                sets.push("run_date = ?");
                args.push(d);
            }
            if let Some(t) = &time_text {
                sets.push("run_time = ?");
                args.push(t);
            }
            if sets.is_empty() {
                return Ok(0);
            }
            let sql = format!("UPDATE broadcast_jobs SET {} WHERE id = ?", sets.join(", "));
            args.push(&id);
            conn.execute(&sql, args.as_slice())
        });
        if let Err(e) = outcome {
            tracing::warn!("job {id} update degraded to no-op: {e}");
        }
    }

    /// Idempotent: the second call finds the status already set and changes
    /// nothing observable.
    pub fn mark_completed(&self, id: i64) {
        let outcome = self.db.with_conn("mark job completed", |conn| {
            conn.execute(
                "UPDATE broadcast_jobs SET status = 'completed' WHERE id = ?1",
                rusqlite::params![id],
            )
        });
        if let Err(e) = outcome {
            tracing::warn!("job {id} completion mark degraded to no-op: {e}");
        }
    }

    /// Idempotent removal; `false` when the row was already gone (or the
    /// store degraded).
    pub fn delete(&self, id: i64) -> bool {
        self.db
            .with_conn("delete job", |conn| {
                conn.execute(
                    "DELETE FROM broadcast_jobs WHERE id = ?1",
                    rusqlite::params![id],
                )
            })
            .map(|n| n > 0)
            .unwrap_or_else(|e| {
                tracing::warn!("job {id} deletion degraded to no-op: {e}");
                false
            })
    }
}

fn encode_payload(payload: &BroadcastPayload) -> Result<String> {
    serde_json::to_string(payload)
        .map_err(|e| ReelgateError::Storage(format!("payload encode: {e}")))
}

/// Empty button lists persist as NULL, matching "no buttons" on read.
fn encode_buttons(buttons: &[LinkButton]) -> Result<Option<String>> {
    if buttons.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(buttons)
        .map(Some)
        .map_err(|e| ReelgateError::Storage(format!("buttons encode: {e}")))
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<BroadcastJob> {
    let id: i64 = row.get(0)?;
    let payload_json: String = row.get(1)?;
    let buttons_json: Option<String> = row.get(2)?;
    let date_text: String = row.get(3)?;
    let time_text: String = row.get(4)?;
    let status_text: String = row.get(5)?;
    let created_text: String = row.get(6)?;

    let payload: BroadcastPayload = serde_json::from_str(&payload_json)
        .map_err(|e| bad_column(1, e))?;
    let buttons: Vec<LinkButton> = match buttons_json {
        Some(json) => serde_json::from_str(&json).map_err(|e| bad_column(2, e))?,
        None => Vec::new(),
    };
    let date = NaiveDate::parse_from_str(&date_text, DATE_FMT).map_err(|e| bad_column(3, e))?;
    let time = NaiveTime::parse_from_str(&time_text, TIME_FMT).map_err(|e| bad_column(4, e))?;
    let status = JobStatus::parse(&status_text)
        .ok_or_else(|| bad_column(5, format!("unknown status {status_text:?}")))?;
    let created_at = DateTime::parse_from_rfc3339(&created_text)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(BroadcastJob {
        id,
        payload,
        buttons,
        date,
        time,
        status,
        created_at,
    })
}

fn bad_column(index: usize, err: impl ToString) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        err.to_string().into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str) -> (JobStore, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("reelgate-jobs-{name}.db"));
        std::fs::remove_file(&path).ok();
        let db = Database::open(&path).unwrap();
        (JobStore::new(db), path)
    }

    fn civil(d: &str, t: &str) -> (NaiveDate, NaiveTime) {
        (
            NaiveDate::parse_from_str(d, DATE_FMT).unwrap(),
            NaiveTime::parse_from_str(t, TIME_FMT).unwrap(),
        )
    }

    #[test]
    fn create_and_read_back() {
        let (jobs, path) = store("create");
        let (date, time) = civil("2026-09-01", "18:30");
        let buttons = vec![LinkButton::new("Watch", "https://t.me/x")];
        let id = jobs
            .create(&BroadcastPayload::text("season premiere"), &buttons, date, time)
            .unwrap();

        let job = jobs.get(id).unwrap();
        assert_eq!(job.payload, BroadcastPayload::text("season premiere"));
        assert_eq!(job.buttons, buttons);
        assert_eq!((job.date, job.time), (date, time));
        assert_eq!(job.status, JobStatus::Pending);

        assert!(jobs.get(id + 1).is_none());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn ids_are_monotonic() {
        let (jobs, path) = store("monotonic");
        let (date, time) = civil("2026-09-01", "10:00");
        let a = jobs
            .create(&BroadcastPayload::text("a"), &[], date, time)
            .unwrap();
        let b = jobs
            .create(&BroadcastPayload::text("b"), &[], date, time)
            .unwrap();
        assert!(b > a);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn pending_listing_is_time_ordered() {
        let (jobs, path) = store("order");
        let (d2, t2) = civil("2026-09-02", "09:00");
        let (d1, t1) = civil("2026-09-01", "22:00");
        let (d1b, t1b) = civil("2026-09-01", "08:00");
        jobs.create(&BroadcastPayload::text("later"), &[], d2, t2).unwrap();
        jobs.create(&BroadcastPayload::text("evening"), &[], d1, t1).unwrap();
        let first = jobs
            .create(&BroadcastPayload::text("morning"), &[], d1b, t1b)
            .unwrap();

        let pending = jobs.list_pending();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0].id, first);
        assert_eq!(pending[2].date, d2);

        jobs.mark_completed(first);
        assert_eq!(jobs.list_pending().len(), 2);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn partial_update_leaves_other_fields_alone() {
        let (jobs, path) = store("patch");
        let (date, time) = civil("2026-09-01", "18:30");
        let id = jobs
            .create(
                &BroadcastPayload::text("original"),
                &[LinkButton::new("A", "https://a")],
                date,
                time,
            )
            .unwrap();

        let new_time = NaiveTime::parse_from_str("20:00", TIME_FMT).unwrap();
        jobs.update(
            id,
            &JobPatch {
                time: Some(new_time),
                ..Default::default()
            },
        );

        let job = jobs.get(id).unwrap();
        assert_eq!(job.time, new_time);
        assert_eq!(job.date, date);
        assert_eq!(job.payload, BroadcastPayload::text("original"));
        assert_eq!(job.buttons.len(), 1);

        // Buttons can be cleared explicitly.
        jobs.update(
            id,
            &JobPatch {
                buttons: Some(Vec::new()),
                ..Default::default()
            },
        );
        assert!(jobs.get(id).unwrap().buttons.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn completion_is_idempotent() {
        let (jobs, path) = store("complete");
        let (date, time) = civil("2026-09-01", "18:30");
        let id = jobs
            .create(&BroadcastPayload::text("x"), &[], date, time)
            .unwrap();

        jobs.mark_completed(id);
        let once = jobs.get(id).unwrap();
        jobs.mark_completed(id);
        let twice = jobs.get(id).unwrap();
        assert_eq!(once.status, JobStatus::Completed);
        assert_eq!(twice.status, JobStatus::Completed);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn deletion_is_idempotent() {
        let (jobs, path) = store("delete");
        let (date, time) = civil("2026-09-01", "18:30");
        let id = jobs
            .create(&BroadcastPayload::text("x"), &[], date, time)
            .unwrap();

        assert!(jobs.delete(id));
        assert!(!jobs.delete(id));
        assert!(jobs.get(id).is_none());
        std::fs::remove_file(&path).ok();
    }
}
