//! Transport-neutral view of an incoming update

use lendcore::session::photo::PhotoVariant;
use lendcore::session::topic::RequestType;
use teloxide::types::{CallbackQuery, Message};

/// What the user sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    /// Inline keyboard press; `data` is routed like typed text
    Callback { id: String, data: String },
    Photo {
        variants: Vec<PhotoVariant>,
        media_group_id: Option<String>,
        caption: Option<String>,
    },
}

/// One update, reduced to what the router needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub user_id: i64,
    pub chat_id: i64,
    pub username: Option<String>,
    pub language_code: Option<String>,
    pub request_type: RequestType,
    pub content: Content,
}

impl Inbound {
    /// Builds an inbound from a text or photo message. Other messages and
    /// messages without a sender yield `None`.
    pub fn from_message(msg: &Message) -> Option<Self> {
        let from = msg.from.as_ref()?;
        let user_id = i64::try_from(from.id.0).ok()?;

        let content = if let Some(text) = msg.text() {
            Content::Text(text.to_string())
        } else if let Some(sizes) = msg.photo() {
            Content::Photo {
                variants: sizes
                    .iter()
                    .map(|size| PhotoVariant {
                        file_id: size.file.id.0.clone(),
                        file_unique_id: size.file.unique_id.0.clone(),
                        file_size: Some(size.file.size),
                    })
                    .collect(),
                media_group_id: msg.media_group_id().map(|id| id.0.clone()),
                caption: msg.caption().map(str::to_string),
            }
        } else {
            return None;
        };

        Some(Self {
            user_id,
            chat_id: msg.chat.id.0,
            username: from.username.clone(),
            language_code: from.language_code.clone(),
            request_type: request_type(msg.chat.is_private()),
            content,
        })
    }

    /// Builds an inbound from an inline keyboard press.
    pub fn from_callback(q: &CallbackQuery) -> Option<Self> {
        let data = q.data.clone()?;
        let user_id = i64::try_from(q.from.id.0).ok()?;
        let chat = q.message.as_ref().map(|m| m.chat());

        Some(Self {
            user_id,
            chat_id: chat.map(|c| c.id.0).unwrap_or(user_id),
            username: q.from.username.clone(),
            language_code: q.from.language_code.clone(),
            request_type: request_type(chat.map(|c| c.is_private()).unwrap_or(true)),
            content: Content::Callback {
                id: q.id.0.clone(),
                data,
            },
        })
    }

    /// Text the router interprets: message text, callback data or photo caption.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            Content::Callback { data, .. } => Some(data),
            Content::Photo { caption, .. } => caption.as_deref(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.request_type == RequestType::Private
    }
}

fn request_type(is_private: bool) -> RequestType {
    if is_private {
        RequestType::Private
    } else {
        RequestType::Group
    }
}
