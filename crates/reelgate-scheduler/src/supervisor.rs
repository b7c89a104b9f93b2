//! Broadcast supervisor — one cancellable, sleeping task per pending job.
//!
//! The job-id → task registry is the only shared mutable state in the core.
//! It is owned by the supervisor (injected nowhere as a global), guarded by
//! a mutex, and every spawned task deregisters itself on every exit path via
//! an epoch-checked drop guard — natural completion, race abort, and
//! cancellation all leave the registry consistent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::AbortHandle;

use reelgate_core::civil::ReferenceClock;
use reelgate_core::traits::Dispatcher;
use reelgate_core::types::{BroadcastJob, JobStatus};
use reelgate_store::JobStore;

use crate::fanout::{FanoutEngine, FanoutOutcome};

struct TaskEntry {
    epoch: u64,
    abort: AbortHandle,
}

type TaskRegistry = Arc<Mutex<HashMap<i64, TaskEntry>>>;

/// Removes the task's registry entry when its future is dropped — on any
/// exit path, including abort. The epoch check keeps a cancelled task from
/// evicting the entry of its replacement.
struct Deregister {
    registry: TaskRegistry,
    id: i64,
    epoch: u64,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        if registry.get(&self.id).is_some_and(|e| e.epoch == self.epoch) {
            registry.remove(&self.id);
        }
    }
}

/// Cheap to clone: every field is a handle. Clones share one registry, so
/// the exactly-one-task-per-job invariant holds across all of them.
#[derive(Clone)]
pub struct BroadcastSupervisor {
    jobs: JobStore,
    fanout: FanoutEngine,
    clock: ReferenceClock,
    gateway: Arc<dyn Dispatcher>,
    operator_chat_id: i64,
    registry: TaskRegistry,
    next_epoch: Arc<AtomicU64>,
}

impl BroadcastSupervisor {
    pub fn new(
        jobs: JobStore,
        fanout: FanoutEngine,
        clock: ReferenceClock,
        gateway: Arc<dyn Dispatcher>,
        operator_chat_id: i64,
    ) -> Self {
        Self {
            jobs,
            fanout,
            clock,
            gateway,
            operator_chat_id,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn (or replace) the task for `id`. Replace semantics implement
    /// "edit a pending broadcast": every field edit calls `start` again so
    /// the delay is re-derived from the possibly-changed target time.
    pub fn start(&self, id: i64) {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let supervisor = self.clone();

        // The lock is held across spawn + insert so the new task's own
        // deregistration can never run before its entry exists.
        let mut registry = lock(&self.registry);
        let task = tokio::spawn(async move {
            let _deregister = Deregister {
                registry: Arc::clone(&supervisor.registry),
                id,
                epoch,
            };
            supervisor.run_job(id).await;
        });
        if let Some(previous) = registry.insert(
            id,
            TaskEntry {
                epoch,
                abort: task.abort_handle(),
            },
        ) {
            previous.abort.abort();
        }
    }

    /// Rebuild the task set from the store. Called once at process start;
    /// jobs whose target has already elapsed fire immediately (delay zero),
    /// which is what makes delivery at-least-once across restarts.
    pub fn restart_all(&self) -> usize {
        let pending = self.jobs.list_pending();
        for job in &pending {
            self.start(job.id);
        }
        tracing::info!("restarted {} pending broadcasts", pending.len());
        pending.len()
    }

    /// Cancel the in-memory task if present; no-op otherwise. Does not touch
    /// the job record — callers combine with `JobStore::delete` for true
    /// cancellation.
    pub fn cancel(&self, id: i64) {
        let mut registry = lock(&self.registry);
        if let Some(entry) = registry.remove(&id) {
            entry.abort.abort();
            tracing::debug!("job {id}: scheduled task cancelled");
        }
    }

    /// Cancel the pending sleep and fan out right now. Returns `None` when
    /// the job is missing or no longer pending.
    pub async fn fire_now(&self, id: i64) -> Option<FanoutOutcome> {
        self.cancel(id);
        let job = self.jobs.get(id)?;
        if job.status != JobStatus::Pending {
            return None;
        }
        let outcome = self.fanout.broadcast(&job.payload, &job.buttons).await;
        self.jobs.mark_completed(id);
        Some(outcome)
    }

    /// Number of live scheduled tasks.
    pub fn active_tasks(&self) -> usize {
        lock(&self.registry).len()
    }

    pub fn is_scheduled(&self, id: i64) -> bool {
        lock(&self.registry).contains_key(&id)
    }

    async fn run_job(&self, id: i64) {
        let Some(job) = self.jobs.get(id) else {
            tracing::debug!("job {id}: gone before scheduling, aborting");
            return;
        };
        if job.status != JobStatus::Pending {
            tracing::debug!("job {id}: not pending, aborting");
            return;
        }

        let delay = self.clock.delay_until(job.date, job.time);
        tracing::info!("job {id}: firing in {}s", delay.as_secs());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // Race checkpoint: the job may have been deleted, completed, or
        // handed to a replacement task while we slept.
        let Some(job) = self.jobs.get(id) else {
            tracing::debug!("job {id}: gone at wake, aborting");
            return;
        };
        if job.status != JobStatus::Pending {
            tracing::debug!("job {id}: no longer pending at wake, aborting");
            return;
        }

        let outcome = self.fanout.broadcast(&job.payload, &job.buttons).await;
        self.jobs.mark_completed(id);
        self.notify_operator(&job, outcome).await;
    }

    /// Completion notice to the operator. Best effort: its own delivery
    /// failure is swallowed.
    async fn notify_operator(&self, job: &BroadcastJob, outcome: FanoutOutcome) {
        if self.operator_chat_id == 0 {
            return;
        }
        let text = format!(
            "✅ Broadcast #{} delivered.\n\n📅 {} {}\n📨 Sent: {}\n❌ Failed: {}",
            job.id,
            job.date.format("%d.%m.%Y"),
            job.time.format("%H:%M"),
            outcome.delivered,
            outcome.failed
        );
        if let Err(e) = self
            .gateway
            .send_text(self.operator_chat_id, &text, &[])
            .await
        {
            tracing::debug!("completion notice for job {} not delivered: {e}", job.id);
        }
    }
}

fn lock(registry: &TaskRegistry) -> MutexGuard<'_, HashMap<i64, TaskEntry>> {
    match registry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
