//! Capability seams between the core and the outside world.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::LinkButton;

/// Message-dispatch capability: send one payload to one recipient.
///
/// The scheduler and fan-out engine only ever see this trait; the platform
/// wire format lives entirely behind it (the Telegram implementation is in
/// `reelgate-gateway`, tests use in-memory fakes).
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send_text(&self, recipient: i64, text: &str, buttons: &[LinkButton]) -> Result<()>;

    async fn send_photo(
        &self,
        recipient: i64,
        file_ref: &str,
        caption: Option<&str>,
        buttons: &[LinkButton],
    ) -> Result<()>;

    async fn send_video(
        &self,
        recipient: i64,
        file_ref: &str,
        caption: Option<&str>,
        buttons: &[LinkButton],
    ) -> Result<()>;
}
