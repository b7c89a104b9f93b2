//! # Reelgate Bot
//!
//! The outer surface: long-poll update routing, the subscription gate, the
//! user catalog flows, and the operator's single-message command set. All
//! scheduling goes through `reelgate_scheduler::Console`; this crate never
//! touches job rows directly.

pub mod admin;
pub mod gate;
pub mod runtime;
pub mod user;

pub use runtime::BotRuntime;
