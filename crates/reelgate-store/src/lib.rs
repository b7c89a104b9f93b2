//! # Reelgate Store
//!
//! Durable table-backed storage: users, catalog entries, required channels,
//! bot copy, settings, and broadcast job records.
//!
//! Discipline (applies to every store in this crate): each operation opens
//! its own SQLite connection and releases it on return — no handle is ever
//! held across an await point. Busy/locked errors retry with bounded
//! exponential backoff; past the budget, read paths degrade to empty results
//! and log, so a storage hiccup never crashes a caller. `JobStore::create`
//! is the one operation that surfaces `Storage` to the caller.

pub mod catalog;
pub mod channels;
pub mod db;
pub mod jobs;
pub mod texts;
pub mod users;

pub use catalog::{CatalogEntry, CatalogStore};
pub use channels::{ChannelStore, RequiredChannel};
pub use db::Database;
pub use jobs::JobStore;
pub use texts::TextStore;
pub use users::{UserStats, UserStore};
