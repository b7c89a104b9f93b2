//! The bot runtime — long-poll loop and per-update routing.

use std::sync::Arc;
use std::time::Duration;

use reelgate_core::civil::ReferenceClock;
use reelgate_core::error::Result;
use reelgate_gateway::{CallbackQuery, Message, TelegramGateway, TelegramUpdate};
use reelgate_scheduler::Console;
use reelgate_store::{CatalogStore, ChannelStore, TextStore, UserStore};

use crate::{admin, gate, user};

pub struct BotRuntime {
    pub gateway: Arc<TelegramGateway>,
    pub users: UserStore,
    pub catalog: CatalogStore,
    pub channels: ChannelStore,
    pub texts: TextStore,
    pub console: Console,
    pub clock: ReferenceClock,
    pub operator_chat_id: i64,
}

impl BotRuntime {
    /// Poll forever. Each update is handled in its own task, so a failing
    /// handler never takes the loop (or another update) down with it.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        tracing::info!("update loop started");
        loop {
            match self.gateway.poll_updates().await {
                Ok(updates) => {
                    for update in updates {
                        let bot = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(e) = bot.handle_update(update).await {
                                tracing::warn!("update handling failed: {e}");
                            }
                        });
                    }
                }
                Err(e) => {
                    tracing::error!("update polling failed: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn handle_update(&self, update: TelegramUpdate) -> Result<()> {
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }
        if let Some(callback) = update.callback_query {
            return self.handle_callback(callback).await;
        }
        Ok(())
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        let chat_id = message.chat.id;
        if let Some(from) = &message.from {
            if from.is_bot {
                return Ok(());
            }
            self.users.record_contact(from.id, Some(&from.display_name()));
        }

        let text = message.text_or_caption().unwrap_or_default().to_string();

        if chat_id == self.operator_chat_id && text.starts_with('/') && text != "/start" {
            return admin::handle_command(self, &message, &text).await;
        }

        match text.as_str() {
            "/start" => self.start_flow(chat_id).await,
            user::BTN_SEARCH => {
                self.gateway
                    .send_message(chat_id, &self.texts.text("search_prompt"), None)
                    .await
            }
            user::BTN_RANDOM => {
                if self.gate_passed(chat_id).await? {
                    user::random_pick(self, chat_id).await
                } else {
                    Ok(())
                }
            }
            user::BTN_ADS => user::ad_info(self, chat_id).await,
            other if is_code(other) => {
                if self.gate_passed(chat_id).await? {
                    user::lookup_code(self, chat_id, other).await
                } else {
                    Ok(())
                }
            }
            _ => {
                self.gateway
                    .send_message(chat_id, &self.texts.text("search_prompt"), None)
                    .await
            }
        }
    }

    async fn handle_callback(&self, callback: CallbackQuery) -> Result<()> {
        let chat_id = callback
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(callback.from.id);
        self.gateway.answer_callback(&callback.id).await;

        match callback.data.as_deref() {
            Some(gate::CHECK_SUBSCRIPTION) => {
                let outcome = gate::check(&self.gateway, &self.channels, callback.from.id).await;
                if outcome.passed() {
                    user::send_welcome(self, chat_id).await
                } else {
                    self.gateway
                        .send_message(
                            chat_id,
                            &self.texts.text("subscribe_required"),
                            Some(&gate::subscribe_keyboard(&outcome.missing)),
                        )
                        .await
                }
            }
            Some(user::CB_SEARCH) => {
                self.gateway
                    .send_message(chat_id, &self.texts.text("search_prompt"), None)
                    .await
            }
            Some(user::CB_MENU) => user::send_menu(self, chat_id).await,
            _ => Ok(()),
        }
    }

    async fn start_flow(&self, chat_id: i64) -> Result<()> {
        if self.gate_passed(chat_id).await? {
            user::send_welcome(self, chat_id).await?;
            user::send_menu(self, chat_id).await?;
        }
        Ok(())
    }

    /// `true` when the gate is open; otherwise the subscribe prompt has
    /// already been sent.
    async fn gate_passed(&self, chat_id: i64) -> Result<bool> {
        let outcome = gate::check(&self.gateway, &self.channels, chat_id).await;
        if outcome.passed() {
            return Ok(true);
        }
        self.gateway
            .send_message(
                chat_id,
                &self.texts.text("subscribe_required"),
                Some(&gate::subscribe_keyboard(&outcome.missing)),
            )
            .await?;
        Ok(false)
    }
}

/// Catalog codes are short digit strings.
fn is_code(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && text.len() <= 8 && text.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_detection() {
        assert!(is_code("1234"));
        assert!(is_code(" 007 "));
        assert!(!is_code("12a4"));
        assert!(!is_code(""));
        assert!(!is_code("123456789"));
        assert!(!is_code("/start"));
    }
}
