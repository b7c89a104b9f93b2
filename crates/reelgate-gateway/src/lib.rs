//! # Reelgate Gateway
//!
//! Telegram Bot API integration — long polling plus message dispatch. The
//! wire format lives entirely in this crate; everything above it speaks
//! `reelgate_core::Dispatcher` and the typed update structs.

pub mod api;
pub mod keyboards;
pub mod telegram;

pub use api::{CallbackQuery, Chat, Message, TelegramUpdate, TelegramUser};
pub use keyboards::{InlineButton, InlineKeyboard, ReplyKeyboard, ReplyMarkup};
pub use telegram::TelegramGateway;
