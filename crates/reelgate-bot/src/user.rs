//! User-facing flows: welcome, code lookup, random pick, ad info.

use reelgate_core::error::Result;
use reelgate_gateway::{InlineButton, InlineKeyboard, ReplyKeyboard, ReplyMarkup};
use reelgate_store::CatalogEntry;

use crate::runtime::BotRuntime;

pub const BTN_SEARCH: &str = "🔍 Search by code";
pub const BTN_RANDOM: &str = "🎲 Random pick";
pub const BTN_ADS: &str = "📣 Buy ads";

pub const CB_SEARCH: &str = "search_code";
pub const CB_MENU: &str = "open_menu";

pub fn reply_keyboard() -> ReplyMarkup {
    ReplyKeyboard::new()
        .row(&[BTN_SEARCH, BTN_RANDOM])
        .row(&[BTN_ADS])
        .markup()
}

fn welcome_keyboard() -> ReplyMarkup {
    InlineKeyboard::new()
        .row(vec![InlineButton::callback(BTN_SEARCH, CB_SEARCH)])
        .row(vec![InlineButton::callback("📖 Open menu", CB_MENU)])
        .markup()
}

/// Welcome copy with the instruction link substituted, optionally on top of
/// the configured welcome image.
pub async fn send_welcome(bot: &BotRuntime, chat_id: i64) -> Result<()> {
    let link = bot
        .texts
        .setting("instruction_link")
        .unwrap_or_else(|| "https://t.me/reelgate_howto".into());
    let text = bot.texts.text("welcome").replace("{instruction_link}", &link);
    let keyboard = welcome_keyboard();

    match bot.texts.setting("welcome_image") {
        Some(image) => {
            bot.gateway
                .send_photo_message(chat_id, &image, Some(&text), Some(&keyboard))
                .await
        }
        None => bot.gateway.send_message(chat_id, &text, Some(&keyboard)).await,
    }
}

pub async fn send_menu(bot: &BotRuntime, chat_id: i64) -> Result<()> {
    bot.gateway
        .send_message(chat_id, &bot.texts.text("search_prompt"), Some(&reply_keyboard()))
        .await
}

pub async fn lookup_code(bot: &BotRuntime, chat_id: i64, code: &str) -> Result<()> {
    match bot.catalog.find(code.trim()) {
        Some(entry) => send_entry(bot, chat_id, &entry).await,
        None => {
            bot.gateway
                .send_message(chat_id, &bot.texts.text("not_found"), None)
                .await
        }
    }
}

pub async fn random_pick(bot: &BotRuntime, chat_id: i64) -> Result<()> {
    match bot.catalog.random() {
        Some(entry) => send_entry(bot, chat_id, &entry).await,
        None => {
            bot.gateway
                .send_message(chat_id, &bot.texts.text("random_empty"), None)
                .await
        }
    }
}

pub async fn ad_info(bot: &BotRuntime, chat_id: i64) -> Result<()> {
    bot.gateway
        .send_message(chat_id, &bot.texts.text("ad_text"), None)
        .await
}

async fn send_entry(bot: &BotRuntime, chat_id: i64, entry: &CatalogEntry) -> Result<()> {
    let caption = format!("🎬 <b>{}</b>\n\n🔢 Code: <code>{}</code>", entry.title, entry.code);
    match &entry.image_ref {
        Some(image) => {
            bot.gateway
                .send_photo_message(chat_id, image, Some(&caption), None)
                .await
        }
        None => bot.gateway.send_message(chat_id, &caption, None).await,
    }
}
