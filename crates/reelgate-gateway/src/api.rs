//! Telegram Bot API wire types — the subset this bot consumes.

use serde::Deserialize;

/// Standard Bot API response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
    /// Thumbnail sizes, smallest first; the last entry is the original.
    pub photo: Option<Vec<PhotoSize>>,
    pub video: Option<Video>,
}

impl Message {
    /// Text or caption, whichever the message carries.
    pub fn text_or_caption(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// File reference of the attached media, if any (largest photo size).
    pub fn media_ref(&self) -> Option<&str> {
        if let Some(video) = &self.video {
            return Some(&video.file_id);
        }
        self.photo
            .as_ref()
            .and_then(|sizes| sizes.last())
            .map(|p| p.file_id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl TelegramUser {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {last}", self.first_name),
            None => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TelegramUser,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_ref_prefers_largest_photo() {
        let json = r#"{
            "message_id": 1,
            "chat": {"id": 5, "type": "private"},
            "caption": "/schedule 21.08 18:00",
            "photo": [{"file_id": "small"}, {"file_id": "big"}]
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.media_ref(), Some("big"));
        assert_eq!(msg.text_or_caption(), Some("/schedule 21.08 18:00"));
    }

    #[test]
    fn update_with_callback() {
        let json = r#"{
            "update_id": 10,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 7, "first_name": "Ann"},
                "data": "check_sub"
            }
        }"#;
        let update: TelegramUpdate = serde_json::from_str(json).unwrap();
        let cb = update.callback_query.unwrap();
        assert_eq!(cb.data.as_deref(), Some("check_sub"));
        assert_eq!(cb.from.display_name(), "Ann");
    }
}
