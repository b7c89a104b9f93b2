//! Error taxonomy shared across the workspace.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReelgateError>;

/// All failure classes the system distinguishes.
///
/// `Storage` and `Dispatch` are recovered close to where they occur: the
/// store degrades to empty results, the fan-out engine counts a failure and
/// moves on. `Validation` is surfaced to the operator as a re-entry prompt
/// and never reaches the scheduler.
#[derive(Debug, Error)]
pub enum ReelgateError {
    /// Persistent store unavailable or locked beyond the retry budget.
    #[error("storage: {0}")]
    Storage(String),

    /// A single recipient send failed (blocked bot, bad chat id, network).
    #[error("dispatch: {0}")]
    Dispatch(String),

    /// Malformed operator input (date, time, buttons, channel list).
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("config: {0}")]
    Config(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl ReelgateError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
