//! # Reelgate Scheduler
//!
//! The broadcast core: a durable, resumable, cancellable scheduler that fans
//! a message out to every known user at a wall-clock time.
//!
//! ## Architecture
//! ```text
//! Console (operator commands)
//!   ├── create/edit ──► JobStore (pending row) ──► Supervisor.start(id)
//!   ├── cancel ──────► Supervisor.cancel + JobStore.delete
//!   └── fire now ────► Supervisor.fire_now
//!
//! Supervisor (one sleeping task per pending job)
//!   ├── sleep until target (reference timezone, zero for past targets)
//!   ├── re-read job at wake — silently abort unless still pending
//!   ├── FanoutEngine.broadcast ──► Dispatcher, one recipient at a time
//!   ├── JobStore.mark_completed
//!   └── best-effort operator notice
//!
//! restart_all() at process start rebuilds every task from the pending rows;
//! the target time itself is the durable schedule.
//! ```

pub mod console;
pub mod fanout;
pub mod supervisor;

pub use console::Console;
pub use fanout::{FanoutEngine, FanoutOutcome};
pub use supervisor::BroadcastSupervisor;
