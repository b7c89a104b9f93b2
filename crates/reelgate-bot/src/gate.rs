//! Subscription gate — the catalog opens only after the user subscribes to
//! every required channel.

use reelgate_gateway::{InlineButton, InlineKeyboard, ReplyMarkup, TelegramGateway};
use reelgate_store::{ChannelStore, RequiredChannel};

pub const CHECK_SUBSCRIPTION: &str = "check_sub";

#[derive(Debug)]
pub struct GateOutcome {
    pub missing: Vec<RequiredChannel>,
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Probe membership in every required channel that carries a chat id.
/// Channels without one are keyboard-only. A failed probe is logged and
/// skipped — ambiguity never locks a user out.
pub async fn check(
    gateway: &TelegramGateway,
    channels: &ChannelStore,
    user_id: i64,
) -> GateOutcome {
    let mut missing = Vec::new();
    for channel in channels.all() {
        let Some(chat_id) = channel.channel_id.as_deref().and_then(|id| id.parse::<i64>().ok())
        else {
            continue;
        };
        match gateway.membership(chat_id, user_id).await {
            Ok(status) if status.is_blocked() => missing.push(channel),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("membership probe for channel {chat_id} failed: {e}");
            }
        }
    }
    GateOutcome { missing }
}

/// One URL button per required channel plus the re-check button.
pub fn subscribe_keyboard(channels: &[RequiredChannel]) -> ReplyMarkup {
    let mut keyboard = InlineKeyboard::new();
    for channel in channels {
        keyboard = keyboard.row(vec![InlineButton::url(&channel.label, &channel.link)]);
    }
    keyboard
        .row(vec![InlineButton::callback(
            "✅ I subscribed",
            CHECK_SUBSCRIPTION,
        )])
        .markup()
}
