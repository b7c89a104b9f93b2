//! Scheduler lifecycle tests: task replacement, cancellation, restart
//! recovery, and fan-out accounting, all on a paused clock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as CivilDuration;

use reelgate_core::civil::ReferenceClock;
use reelgate_core::error::{ReelgateError, Result};
use reelgate_core::traits::Dispatcher;
use reelgate_core::types::{BroadcastPayload, JobPatch, JobStatus, LinkButton};
use reelgate_scheduler::{BroadcastSupervisor, Console, FanoutEngine};
use reelgate_store::{Database, JobStore, UserStore};

/// Records every send; fails for recipients in `fail_for`.
#[derive(Default)]
struct FakeGateway {
    sent: Mutex<Vec<(i64, String)>>,
    fail_for: Mutex<HashSet<i64>>,
}

impl FakeGateway {
    fn sent_to(&self, recipient: i64) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn total_sent(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn record(&self, recipient: i64, rendered: String) -> Result<()> {
        if self.fail_for.lock().unwrap().contains(&recipient) {
            return Err(ReelgateError::dispatch(format!("{recipient} blocked the bot")));
        }
        self.sent.lock().unwrap().push((recipient, rendered));
        Ok(())
    }
}

#[async_trait]
impl Dispatcher for FakeGateway {
    async fn send_text(&self, recipient: i64, text: &str, _buttons: &[LinkButton]) -> Result<()> {
        self.record(recipient, text.to_string())
    }

    async fn send_photo(
        &self,
        recipient: i64,
        file_ref: &str,
        _caption: Option<&str>,
        _buttons: &[LinkButton],
    ) -> Result<()> {
        self.record(recipient, format!("photo:{file_ref}"))
    }

    async fn send_video(
        &self,
        recipient: i64,
        file_ref: &str,
        _caption: Option<&str>,
        _buttons: &[LinkButton],
    ) -> Result<()> {
        self.record(recipient, format!("video:{file_ref}"))
    }
}

struct Harness {
    gateway: Arc<FakeGateway>,
    jobs: JobStore,
    supervisor: BroadcastSupervisor,
    console: Console,
    clock: ReferenceClock,
    db_path: std::path::PathBuf,
}

impl Harness {
    /// Fresh store with `user_count` recipients and a zero-pace fan-out.
    fn new(name: &str, user_count: i64, operator: i64) -> Self {
        let db_path = std::env::temp_dir().join(format!("reelgate-sched-{name}.db"));
        std::fs::remove_file(&db_path).ok();
        let db = Database::open(&db_path).unwrap();

        let users = UserStore::new(db.clone());
        for id in 1..=user_count {
            users.record_contact(id, Some(&format!("user{id}")));
        }

        let gateway = Arc::new(FakeGateway::default());
        let clock = ReferenceClock::new(3);
        let jobs = JobStore::new(db.clone());
        let fanout = FanoutEngine::new(gateway.clone(), users, 0);
        let supervisor = BroadcastSupervisor::new(
            jobs.clone(),
            fanout.clone(),
            clock,
            gateway.clone(),
            operator,
        );
        let console = Console::new(jobs.clone(), supervisor.clone(), fanout);

        Self {
            gateway,
            jobs,
            supervisor,
            console,
            clock,
            db_path,
        }
    }

    /// Civil (date, time) at `minutes` from now in the reference zone.
    /// Times persist at minute precision, so add a minute of slack for
    /// positive offsets to keep the target strictly in the future.
    fn civil_in_minutes(&self, minutes: i64) -> (chrono::NaiveDate, chrono::NaiveTime) {
        let slack = if minutes > 0 { 1 } else { 0 };
        let at = self.clock.now() + CivilDuration::minutes(minutes + slack);
        (at.date(), at.time())
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        std::fs::remove_file(&self.db_path).ok();
    }
}

/// Let spawned tasks run up to their next suspension point.
async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

// A job whose target is already past fires immediately and reaches every
// recipient.
#[tokio::test(start_paused = true)]
async fn past_target_fires_immediately() {
    let h = Harness::new("past-target", 4, 0);
    let (date, time) = h.civil_in_minutes(-60);
    let id = h
        .console
        .create_job(BroadcastPayload::text("hello"), vec![], date, time)
        .unwrap();

    settle().await;
    assert_eq!(h.gateway.total_sent(), 4);
    assert_eq!(h.jobs.get(id).unwrap().status, JobStatus::Completed);
    assert_eq!(h.supervisor.active_tasks(), 0);
}

// Starting twice leaves exactly one live task, and the replaced one never
// fires.
#[tokio::test(start_paused = true)]
async fn restart_replaces_existing_task() {
    let h = Harness::new("replace", 3, 0);
    let (date, time) = h.civil_in_minutes(24 * 60);
    let id = h
        .console
        .create_job(BroadcastPayload::text("once"), vec![], date, time)
        .unwrap();
    settle().await;

    h.supervisor.start(id);
    settle().await;
    assert_eq!(h.supervisor.active_tasks(), 1);

    advance(Duration::from_secs(30 * 3600)).await;
    // One fan-out, not two.
    assert_eq!(h.gateway.total_sent(), 3);
    assert_eq!(h.supervisor.active_tasks(), 0);
}

// k failing recipients out of n yield (n-k, k), every recipient attempted
// exactly once.
#[tokio::test(start_paused = true)]
async fn fanout_counts_failures_without_aborting() {
    let h = Harness::new("fanout-tally", 5, 0);
    h.gateway.fail_for.lock().unwrap().extend([2, 4]);

    let outcome = h
        .console
        .send_immediate(&BroadcastPayload::text("promo"), &[])
        .await;

    assert_eq!((outcome.delivered, outcome.failed), (3, 2));
    for id in [1, 3, 5] {
        assert_eq!(h.gateway.sent_to(id).len(), 1);
    }
    assert!(h.gateway.sent_to(2).is_empty());
    assert!(h.gateway.sent_to(4).is_empty());
}

// Editing the schedule cancels the old sleep and re-derives the delay from
// the new target.
#[tokio::test(start_paused = true)]
async fn edit_rederives_delay() {
    let h = Harness::new("edit-delay", 2, 0);
    let (date, time) = h.civil_in_minutes(24 * 60);
    let id = h
        .console
        .create_job(BroadcastPayload::text("draft"), vec![], date, time)
        .unwrap();
    settle().await;

    advance(Duration::from_secs(3600)).await;
    assert_eq!(h.gateway.total_sent(), 0);

    // Pull the job in to two hours out and fix the copy.
    let (new_date, new_time) = h.civil_in_minutes(120);
    h.console.edit_job(
        id,
        JobPatch {
            payload: Some(BroadcastPayload::text("final copy")),
            date: Some(new_date),
            time: Some(new_time),
            ..Default::default()
        },
    );
    settle().await;
    assert_eq!(h.supervisor.active_tasks(), 1);

    // Not yet: the new target is still ahead.
    advance(Duration::from_secs(115 * 60)).await;
    assert_eq!(h.gateway.total_sent(), 0);

    // Past the new target: fires with the edited payload.
    advance(Duration::from_secs(10 * 60)).await;
    assert_eq!(h.gateway.total_sent(), 2);
    assert_eq!(h.gateway.sent_to(1), vec!["final copy".to_string()]);
    assert_eq!(h.jobs.get(id).unwrap().status, JobStatus::Completed);
}

// Double cancellation is a quiet no-op the second time.
#[tokio::test(start_paused = true)]
async fn cancel_twice_is_noop() {
    let h = Harness::new("cancel-twice", 2, 0);
    let (date, time) = h.civil_in_minutes(60);
    let id = h
        .console
        .create_job(BroadcastPayload::text("x"), vec![], date, time)
        .unwrap();
    settle().await;

    assert!(h.console.cancel_job(id));
    assert!(!h.console.cancel_job(id));
    assert_eq!(h.supervisor.active_tasks(), 0);
    assert!(h.jobs.get(id).is_none());

    // The cancelled task never fires.
    advance(Duration::from_secs(2 * 3600)).await;
    assert_eq!(h.gateway.total_sent(), 0);
}

// Fire-now preempts the sleep, completes the job, and restart does not
// resurrect it.
#[tokio::test(start_paused = true)]
async fn fire_now_preempts_schedule() {
    let h = Harness::new("fire-now", 3, 0);
    let (date, time) = h.civil_in_minutes(10);
    let id = h
        .console
        .create_job(BroadcastPayload::text("soon"), vec![], date, time)
        .unwrap();
    settle().await;
    assert!(h.supervisor.is_scheduled(id));

    let outcome = h.console.fire_now(id).await.unwrap();
    assert_eq!((outcome.delivered, outcome.failed), (3, 0));
    assert_eq!(h.jobs.get(id).unwrap().status, JobStatus::Completed);

    assert_eq!(h.supervisor.restart_all(), 0);
    settle().await;
    assert_eq!(h.supervisor.active_tasks(), 0);

    // Firing again reports nothing to do.
    assert!(h.console.fire_now(id).await.is_none());
}

// Restart spawns tasks for pending jobs only; completed jobs never fire.
#[tokio::test(start_paused = true)]
async fn restart_skips_completed_jobs() {
    let h = Harness::new("restart", 2, 0);
    let (date, time) = h.civil_in_minutes(12 * 60);
    let a = h
        .jobs
        .create(&BroadcastPayload::text("pending"), &[], date, time)
        .unwrap();
    let b = h
        .jobs
        .create(&BroadcastPayload::text("done"), &[], date, time)
        .unwrap();
    h.jobs.mark_completed(b);

    assert_eq!(h.supervisor.restart_all(), 1);
    settle().await;
    assert_eq!(h.supervisor.active_tasks(), 1);
    assert!(h.supervisor.is_scheduled(a));
    assert!(!h.supervisor.is_scheduled(b));

    advance(Duration::from_secs(24 * 3600)).await;
    // Only A's fan-out ran.
    assert_eq!(h.gateway.total_sent(), 2);
    assert_eq!(h.gateway.sent_to(1), vec!["pending".to_string()]);
}

// A deleted job is discovered at wake and aborted silently.
#[tokio::test(start_paused = true)]
async fn deletion_observed_at_wake() {
    let h = Harness::new("wake-race", 2, 0);
    let (date, time) = h.civil_in_minutes(60);
    let id = h
        .console
        .create_job(BroadcastPayload::text("gone"), vec![], date, time)
        .unwrap();
    settle().await;

    // Delete the record out from under the sleeping task, leaving the task
    // itself alive.
    assert!(h.jobs.delete(id));

    advance(Duration::from_secs(2 * 3600)).await;
    assert_eq!(h.gateway.total_sent(), 0);
    assert_eq!(h.supervisor.active_tasks(), 0);
}

// The scheduled path sends a completion notice to the operator; counts match
// the fan-out tally.
#[tokio::test(start_paused = true)]
async fn operator_gets_completion_notice() {
    let operator = 777;
    let h = Harness::new("notice", 3, operator);
    h.gateway.fail_for.lock().unwrap().insert(2);

    let (date, time) = h.civil_in_minutes(-5);
    let id = h
        .console
        .create_job(BroadcastPayload::text("news"), vec![], date, time)
        .unwrap();
    settle().await;

    let notices = h.gateway.sent_to(operator);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains(&format!("#{id}")));
    assert!(notices[0].contains("Sent: 2"));
    assert!(notices[0].contains("Failed: 1"));
}

// Media payloads route through their media branch with the shared buttons.
#[tokio::test(start_paused = true)]
async fn media_payloads_take_media_branch() {
    let h = Harness::new("media", 2, 0);
    let outcome = h
        .console
        .send_immediate(
            &BroadcastPayload::Photo {
                file_ref: "file-abc".into(),
                caption: Some("poster".into()),
            },
            &[LinkButton::new("Open", "https://t.me/x")],
        )
        .await;

    assert_eq!((outcome.delivered, outcome.failed), (2, 0));
    assert_eq!(h.gateway.sent_to(1), vec!["photo:file-abc".to_string()]);
}
