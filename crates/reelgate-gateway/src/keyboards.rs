//! Keyboard builders — serialize straight into Bot API reply markup.

use serde::Serialize;

use reelgate_core::types::LinkButton;

/// Either kind of reply markup a message can carry.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboard),
    Reply(ReplyKeyboard),
}

/// Inline keyboard attached under a message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InlineKeyboard {
    inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// One full-width row per link button (broadcast layout).
    pub fn from_links(buttons: &[LinkButton]) -> Self {
        let mut keyboard = Self::new();
        for button in buttons {
            keyboard = keyboard.row(vec![InlineButton::url(&button.label, &button.url)]);
        }
        keyboard
    }

    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.inline_keyboard.push(buttons);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.inline_keyboard.is_empty()
    }

    pub fn markup(self) -> ReplyMarkup {
        ReplyMarkup::Inline(self)
    }

    /// Markup for a broadcast button list; `None` when there are no buttons
    /// so the message goes out bare.
    pub fn links_markup(buttons: &[LinkButton]) -> Option<ReplyMarkup> {
        if buttons.is_empty() {
            None
        } else {
            Some(Self::from_links(buttons).markup())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
}

impl InlineButton {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
        }
    }

    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
        }
    }
}

/// Persistent reply keyboard shown at the bottom of the chat.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplyKeyboard {
    keyboard: Vec<Vec<KeyboardButton>>,
    resize_keyboard: bool,
}

impl ReplyKeyboard {
    pub fn new() -> Self {
        Self {
            keyboard: Vec::new(),
            resize_keyboard: true,
        }
    }

    pub fn row(mut self, labels: &[&str]) -> Self {
        self.keyboard.push(
            labels
                .iter()
                .map(|text| KeyboardButton {
                    text: (*text).into(),
                })
                .collect(),
        );
        self
    }

    pub fn markup(self) -> ReplyMarkup {
        ReplyMarkup::Reply(self)
    }
}

#[derive(Debug, Clone, Serialize)]
struct KeyboardButton {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_rows_serialize_one_per_row() {
        let keyboard = InlineKeyboard::from_links(&[
            LinkButton::new("Watch", "https://t.me/a"),
            LinkButton::new("More", "https://t.me/b"),
        ]);
        let json = serde_json::to_value(&keyboard).unwrap();
        let rows = json["inline_keyboard"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0]["text"], "Watch");
        assert_eq!(rows[0][0]["url"], "https://t.me/a");
        assert!(rows[0][0].get("callback_data").is_none());
    }

    #[test]
    fn callback_button_omits_url() {
        let keyboard = InlineKeyboard::new()
            .row(vec![InlineButton::callback("✅ I subscribed", "check_sub")]);
        let json = serde_json::to_value(&keyboard).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["callback_data"], "check_sub");
        assert!(json["inline_keyboard"][0][0].get("url").is_none());
    }

    #[test]
    fn no_markup_for_empty_button_list() {
        assert!(InlineKeyboard::links_markup(&[]).is_none());
    }
}
