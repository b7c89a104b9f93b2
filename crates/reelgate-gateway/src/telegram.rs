//! Telegram Bot API client — long polling, message sending, membership probe.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use reelgate_core::error::{ReelgateError, Result};
use reelgate_core::traits::Dispatcher;
use reelgate_core::types::{LinkButton, MembershipStatus};

use crate::api::{ApiResponse, ChatMember, TelegramUpdate, TelegramUser};
use crate::keyboards::{InlineKeyboard, ReplyMarkup};

/// Per-request timeout for dispatch calls; a timed-out send is counted as a
/// failure, never retried here.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TelegramGateway {
    token: String,
    client: reqwest::Client,
    poll_timeout: u64,
    last_update_id: AtomicI64,
}

impl TelegramGateway {
    pub fn new(token: impl Into<String>, poll_timeout_secs: u64) -> Self {
        Self {
            token: token.into(),
            client: reqwest::Client::new(),
            poll_timeout: poll_timeout_secs,
            last_update_id: AtomicI64::new(0),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ReelgateError::Dispatch(format!("{method} failed: {e}")))?;

        let api: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ReelgateError::Dispatch(format!("{method}: invalid response: {e}")))?;

        if !api.ok {
            return Err(ReelgateError::Dispatch(format!(
                "{method}: {}",
                api.description.unwrap_or_default()
            )));
        }
        api.result
            .ok_or_else(|| ReelgateError::Dispatch(format!("{method}: empty result")))
    }

    /// Identify the bot account (startup sanity check).
    pub async fn get_me(&self) -> Result<TelegramUser> {
        self.call("getMe", json!({}), DISPATCH_TIMEOUT).await
    }

    /// Long-poll the next batch of updates. The confirmed-offset cursor is
    /// kept internally, so consecutive calls never replay an update.
    pub async fn poll_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::Acquire) + 1;
        let updates: Vec<TelegramUpdate> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": self.poll_timeout,
                    "allowed_updates": ["message", "callback_query"],
                }),
                // The HTTP timeout must outlive the server-side hold.
                Duration::from_secs(self.poll_timeout + 10),
            )
            .await?;

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::Release);
        }
        Ok(updates)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        attach_markup(&mut body, markup)?;
        self.call::<serde_json::Value>("sendMessage", body, DISPATCH_TIMEOUT)
            .await
            .map(|_| ())
    }

    pub async fn send_photo_message(
        &self,
        chat_id: i64,
        file_ref: &str,
        caption: Option<&str>,
        markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "photo": file_ref,
            "parse_mode": "HTML",
        });
        if let Some(caption) = caption {
            body["caption"] = json!(caption);
        }
        attach_markup(&mut body, markup)?;
        self.call::<serde_json::Value>("sendPhoto", body, DISPATCH_TIMEOUT)
            .await
            .map(|_| ())
    }

    pub async fn send_video_message(
        &self,
        chat_id: i64,
        file_ref: &str,
        caption: Option<&str>,
        markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "video": file_ref,
            "parse_mode": "HTML",
        });
        if let Some(caption) = caption {
            body["caption"] = json!(caption);
        }
        attach_markup(&mut body, markup)?;
        self.call::<serde_json::Value>("sendVideo", body, DISPATCH_TIMEOUT)
            .await
            .map(|_| ())
    }

    /// Acknowledge a callback query so the client stops its spinner.
    pub async fn answer_callback(&self, callback_id: &str) {
        let outcome = self
            .call::<serde_json::Value>(
                "answerCallbackQuery",
                json!({ "callback_query_id": callback_id }),
                DISPATCH_TIMEOUT,
            )
            .await;
        if let Err(e) = outcome {
            tracing::debug!("answerCallbackQuery: {e}");
        }
    }

    /// Opaque membership probe for the subscription gate.
    pub async fn membership(&self, channel_id: i64, user_id: i64) -> Result<MembershipStatus> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                json!({ "chat_id": channel_id, "user_id": user_id }),
                DISPATCH_TIMEOUT,
            )
            .await?;
        Ok(MembershipStatus::from_api(&member.status))
    }
}

fn attach_markup(body: &mut serde_json::Value, markup: Option<&ReplyMarkup>) -> Result<()> {
    if let Some(markup) = markup {
        let value = serde_json::to_value(markup)
            .map_err(|e| ReelgateError::Dispatch(format!("reply markup encode: {e}")))?;
        body["reply_markup"] = value;
    }
    Ok(())
}

#[async_trait]
impl Dispatcher for TelegramGateway {
    async fn send_text(&self, recipient: i64, text: &str, buttons: &[LinkButton]) -> Result<()> {
        self.send_message(recipient, text, InlineKeyboard::links_markup(buttons).as_ref())
            .await
    }

    async fn send_photo(
        &self,
        recipient: i64,
        file_ref: &str,
        caption: Option<&str>,
        buttons: &[LinkButton],
    ) -> Result<()> {
        self.send_photo_message(
            recipient,
            file_ref,
            caption,
            InlineKeyboard::links_markup(buttons).as_ref(),
        )
        .await
    }

    async fn send_video(
        &self,
        recipient: i64,
        file_ref: &str,
        caption: Option<&str>,
        buttons: &[LinkButton],
    ) -> Result<()> {
        self.send_video_message(
            recipient,
            file_ref,
            caption,
            InlineKeyboard::links_markup(buttons).as_ref(),
        )
        .await
    }
}
