//! Operator console API — what the admin command surface calls into.

use chrono::{NaiveDate, NaiveTime};

use reelgate_core::error::Result;
use reelgate_core::types::{BroadcastJob, BroadcastPayload, JobPatch, LinkButton};
use reelgate_store::JobStore;

use crate::fanout::{FanoutEngine, FanoutOutcome};
use crate::supervisor::BroadcastSupervisor;

/// The scheduling API exposed to the operator-facing command layer.
#[derive(Clone)]
pub struct Console {
    jobs: JobStore,
    supervisor: BroadcastSupervisor,
    fanout: FanoutEngine,
}

impl Console {
    pub fn new(jobs: JobStore, supervisor: BroadcastSupervisor, fanout: FanoutEngine) -> Self {
        Self {
            jobs,
            supervisor,
            fanout,
        }
    }

    /// Persist a new pending job and hand it to the supervisor. Storage
    /// failure surfaces here — the command is simply not accepted.
    pub fn create_job(
        &self,
        payload: BroadcastPayload,
        buttons: Vec<LinkButton>,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<i64> {
        let id = self.jobs.create(&payload, &buttons, date, time)?;
        self.supervisor.start(id);
        tracing::info!("job {id}: scheduled for {date} {time}");
        Ok(id)
    }

    /// Apply a partial edit and restart the job's task so the delay is
    /// re-derived from the (possibly changed) target time.
    pub fn edit_job(&self, id: i64, patch: JobPatch) {
        if patch.is_empty() {
            return;
        }
        self.jobs.update(id, &patch);
        self.supervisor.start(id);
    }

    /// Cancel = cancel the task + hard-delete the record. Idempotent; the
    /// second call finds nothing and reports `false`.
    pub fn cancel_job(&self, id: i64) -> bool {
        self.supervisor.cancel(id);
        self.jobs.delete(id)
    }

    /// Send an already-scheduled job immediately.
    pub async fn fire_now(&self, id: i64) -> Option<FanoutOutcome> {
        self.supervisor.fire_now(id).await
    }

    pub fn list_pending_jobs(&self) -> Vec<BroadcastJob> {
        self.jobs.list_pending()
    }

    pub fn get_job(&self, id: i64) -> Option<BroadcastJob> {
        self.jobs.get(id)
    }

    /// Ad-hoc, unscheduled fan-out.
    pub async fn send_immediate(
        &self,
        payload: &BroadcastPayload,
        buttons: &[LinkButton],
    ) -> FanoutOutcome {
        self.fanout.broadcast(payload, buttons).await
    }

    /// Render a stored job to one recipient with the preview marker.
    pub async fn preview_job(&self, recipient: i64, id: i64) -> Option<Result<()>> {
        let job = self.jobs.get(id)?;
        Some(self.fanout.preview(recipient, &job.payload, &job.buttons).await)
    }

    /// Preview not-yet-persisted content (operator confirmation step).
    pub async fn preview(
        &self,
        recipient: i64,
        payload: &BroadcastPayload,
        buttons: &[LinkButton],
    ) -> Result<()> {
        self.fanout.preview(recipient, payload, buttons).await
    }
}
