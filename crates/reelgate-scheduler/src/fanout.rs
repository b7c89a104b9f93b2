//! Fan-out engine — deliver one payload to every known recipient.

use std::sync::Arc;
use std::time::Duration;

use reelgate_core::error::Result;
use reelgate_core::traits::Dispatcher;
use reelgate_core::types::{BroadcastPayload, LinkButton};
use reelgate_store::UserStore;

/// Delivery tally for one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutOutcome {
    pub delivered: u32,
    pub failed: u32,
}

/// Sequential fan-out over the full user list. Deliberately not parallel:
/// the inter-send pause keeps the gateway inside platform rate limits, and
/// one slow recipient costs pacing, not correctness.
#[derive(Clone)]
pub struct FanoutEngine {
    gateway: Arc<dyn Dispatcher>,
    users: UserStore,
    pace: Duration,
}

impl FanoutEngine {
    pub fn new(gateway: Arc<dyn Dispatcher>, users: UserStore, pace_ms: u64) -> Self {
        Self {
            gateway,
            users,
            pace: Duration::from_millis(pace_ms),
        }
    }

    /// Send `payload` to every known user id. The recipient list is
    /// snapshotted once at the start; users appearing mid-broadcast are not
    /// included. A failed send is counted and the loop moves on — a single
    /// bad recipient never aborts the batch.
    pub async fn broadcast(
        &self,
        payload: &BroadcastPayload,
        buttons: &[LinkButton],
    ) -> FanoutOutcome {
        let recipients = self.users.all_ids();
        let mut outcome = FanoutOutcome::default();

        for (i, recipient) in recipients.iter().enumerate() {
            if i > 0 && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
            match self.deliver(*recipient, payload, buttons).await {
                Ok(()) => outcome.delivered += 1,
                Err(e) => {
                    tracing::warn!("broadcast delivery to {recipient} failed: {e}");
                    outcome.failed += 1;
                }
            }
        }

        tracing::info!(
            "fan-out finished: {} delivered, {} failed",
            outcome.delivered,
            outcome.failed
        );
        outcome
    }

    /// Same rendering as the fan-out, single recipient, marked as a preview.
    /// Used for operator confirmation before scheduling and for inspecting
    /// an already-scheduled job.
    pub async fn preview(
        &self,
        recipient: i64,
        payload: &BroadcastPayload,
        buttons: &[LinkButton],
    ) -> Result<()> {
        const MARKER: &str = "👁 <b>PREVIEW</b>\n\n";
        match payload {
            BroadcastPayload::Text { text } => {
                self.gateway
                    .send_text(recipient, &format!("{MARKER}{text}"), buttons)
                    .await
            }
            BroadcastPayload::Photo { file_ref, caption } => {
                let caption = format!("{MARKER}{}", caption.as_deref().unwrap_or_default());
                self.gateway
                    .send_photo(recipient, file_ref, Some(&caption), buttons)
                    .await
            }
            BroadcastPayload::Video { file_ref, caption } => {
                let caption = format!("{MARKER}{}", caption.as_deref().unwrap_or_default());
                self.gateway
                    .send_video(recipient, file_ref, Some(&caption), buttons)
                    .await
            }
        }
    }

    async fn deliver(
        &self,
        recipient: i64,
        payload: &BroadcastPayload,
        buttons: &[LinkButton],
    ) -> Result<()> {
        match payload {
            BroadcastPayload::Text { text } => {
                self.gateway.send_text(recipient, text, buttons).await
            }
            BroadcastPayload::Photo { file_ref, caption } => {
                self.gateway
                    .send_photo(recipient, file_ref, caption.as_deref(), buttons)
                    .await
            }
            BroadcastPayload::Video { file_ref, caption } => {
                self.gateway
                    .send_video(recipient, file_ref, caption.as_deref(), buttons)
                    .await
            }
        }
    }
}
