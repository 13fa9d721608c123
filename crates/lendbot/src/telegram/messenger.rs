//! Outbound side of the bot
//!
//! The router produces `Outgoing` values; a `Messenger` delivers them.
//! Delivery is fire-and-forget: failures are logged and never reach the
//! conversation state.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::requests::Requester;
use teloxide::types::{CallbackQueryId, FileId, InlineKeyboardMarkup, InputFile};

/// A reply produced while handling one update.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Text {
        chat_id: i64,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    },
    Photo {
        chat_id: i64,
        file_id: String,
        caption: Option<String>,
    },
    Location {
        chat_id: i64,
        latitude: f64,
        longitude: f64,
        heading: Option<u16>,
    },
    AnswerCallback {
        callback_id: String,
    },
}

/// Sends messages to Telegram chats.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>);

    async fn send_photo(&self, chat_id: i64, file_id: &str, caption: Option<&str>);

    async fn send_location(&self, chat_id: i64, latitude: f64, longitude: f64, heading: Option<u16>);

    async fn answer_callback(&self, callback_id: &str);
}

/// Delivers replies in order.
pub async fn deliver(messenger: &dyn Messenger, replies: &[Outgoing]) {
    for reply in replies {
        match reply {
            Outgoing::Text {
                chat_id,
                text,
                keyboard,
            } => messenger.send_text(*chat_id, text, keyboard.clone()).await,
            Outgoing::Photo {
                chat_id,
                file_id,
                caption,
            } => messenger.send_photo(*chat_id, file_id, caption.as_deref()).await,
            Outgoing::Location {
                chat_id,
                latitude,
                longitude,
                heading,
            } => messenger.send_location(*chat_id, *latitude, *longitude, *heading).await,
            Outgoing::AnswerCallback { callback_id } => messenger.answer_callback(callback_id).await,
        }
    }
}

#[async_trait]
impl Messenger for Bot {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) {
        let request = self.send_message(ChatId(chat_id), text);
        let result = match keyboard {
            Some(keyboard) => request.reply_markup(keyboard).await,
            None => request.await,
        };
        if let Err(e) = result {
            log::error!("❌ Failed to send message to chat {}: {}", chat_id, e);
        }
    }

    async fn send_photo(&self, chat_id: i64, file_id: &str, caption: Option<&str>) {
        let request = Requester::send_photo(self, ChatId(chat_id), InputFile::file_id(FileId(file_id.to_string())));
        let result = match caption {
            Some(caption) => request.caption(caption).await,
            None => request.await,
        };
        if let Err(e) = result {
            log::error!("❌ Failed to send photo to chat {}: {}", chat_id, e);
        }
    }

    async fn send_location(&self, chat_id: i64, latitude: f64, longitude: f64, heading: Option<u16>) {
        let request = Requester::send_location(self, ChatId(chat_id), latitude, longitude);
        let result = match heading {
            Some(heading) => request.heading(heading).await,
            None => request.await,
        };
        if let Err(e) = result {
            log::error!("❌ Failed to send location to chat {}: {}", chat_id, e);
        }
    }

    async fn answer_callback(&self, callback_id: &str) {
        if let Err(e) = self
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await
        {
            log::warn!("Failed to answer callback {}: {}", callback_id, e);
        }
    }
}
