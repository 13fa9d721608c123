//! Shared fixtures for the router integration tests
//!
//! Every `TestEnv` owns a fresh SQLite file in a temporary directory, so
//! tests do not share state and can run in parallel.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lendbot::telegram::{Content, Inbound, Messenger, Outgoing, Routed};
use lendbot::{process, HandlerDeps};
use lendcore::session::photo::PhotoVariant;
use lendcore::session::topic::RequestType;
use lendcore::storage::tools::{self, NewTool};
use lendcore::storage::{create_pool, get_connection, users, DbConnection};
use lendcore::Config;
use teloxide::types::{InlineKeyboardButtonKind, InlineKeyboardMarkup};
use tempfile::TempDir;

pub const STUDENT: i64 = 1001;
pub const OTHER_STUDENT: i64 = 1002;
pub const STAFF: i64 = 9001;
pub const STAFF_CHAT: i64 = -100_500;
pub const BOT_USERNAME: &str = "LabBot";

pub struct TestEnv {
    pub deps: HandlerDeps,
    _dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lendbot.sqlite");
        let pool = create_pool(path.to_str().unwrap()).unwrap();

        let config = Config::from_lookup(|key| match key {
            "STAFF_IDS" => Some(STAFF.to_string()),
            "STAFF_CHAT_ID" => Some(STAFF_CHAT.to_string()),
            "DEFAULT_LANG" => Some("en".to_string()),
            "LAB_LATITUDE" => Some("-7.2819".to_string()),
            "LAB_LONGITUDE" => Some("112.7948".to_string()),
            _ => None,
        })
        .unwrap();

        Self {
            deps: HandlerDeps::new(Arc::new(pool), Arc::new(config), Some(BOT_USERNAME.to_string())),
            _dir: dir,
        }
    }

    pub fn conn(&self) -> DbConnection {
        get_connection(&self.deps.db_pool).unwrap()
    }

    /// Text message in the user's private chat.
    pub fn send(&self, user_id: i64, text: &str) -> Routed {
        self.dispatch(inbound(user_id, user_id, RequestType::Private, Content::Text(text.to_string())))
    }

    /// Text message in a group chat.
    pub fn send_in_group(&self, user_id: i64, chat_id: i64, text: &str) -> Routed {
        self.dispatch(inbound(user_id, chat_id, RequestType::Group, Content::Text(text.to_string())))
    }

    /// Inline button press in the user's private chat.
    pub fn press(&self, user_id: i64, data: &str) -> Routed {
        self.dispatch(inbound(
            user_id,
            user_id,
            RequestType::Private,
            Content::Callback {
                id: format!("cb-{}", data),
                data: data.to_string(),
            },
        ))
    }

    /// Inline button press in the staff chat.
    pub fn press_in_staff_chat(&self, user_id: i64, data: &str) -> Routed {
        self.dispatch(inbound(
            user_id,
            STAFF_CHAT,
            RequestType::Group,
            Content::Callback {
                id: format!("cb-{}", data),
                data: data.to_string(),
            },
        ))
    }

    /// Photo with three size variants; the middle one is the largest.
    pub fn send_photo(&self, user_id: i64, name: &str, media_group_id: Option<&str>) -> Routed {
        let variants = [("s", 1_000), ("x", 90_000), ("m", 20_000)]
            .iter()
            .map(|(size, bytes)| PhotoVariant {
                file_id: format!("{}-{}", name, size),
                file_unique_id: format!("u-{}-{}", name, size),
                file_size: Some(*bytes),
            })
            .collect();
        self.dispatch(inbound(
            user_id,
            user_id,
            RequestType::Private,
            Content::Photo {
                variants,
                media_group_id: media_group_id.map(str::to_string),
                caption: None,
            },
        ))
    }

    pub fn dispatch(&self, inbound: Inbound) -> Routed {
        process(&self.deps, &inbound).unwrap()
    }

    pub fn register(&self, user_id: i64, name: &str) {
        let conn = self.conn();
        users::ensure_user(&conn, user_id, None).unwrap();
        users::register_user(&conn, user_id, name, "5025201001", 2021).unwrap();
    }

    pub fn add_tool(&self, name: &str, stock: i64) -> i64 {
        let tool = NewTool {
            name: name.to_string(),
            brand: "Generic".to_string(),
            product_type: "Instrument".to_string(),
            weight: 1.0,
            stock,
            info: String::new(),
        };
        tools::create_tool(&self.conn(), &tool, &[]).unwrap()
    }
}

pub fn inbound(user_id: i64, chat_id: i64, request_type: RequestType, content: Content) -> Inbound {
    Inbound {
        user_id,
        chat_id,
        username: Some(format!("user{}", user_id)),
        language_code: Some("en".to_string()),
        request_type,
        content,
    }
}

/// Texts sent to `chat_id`, in order.
pub fn texts_to(routed: &Routed, chat_id: i64) -> Vec<String> {
    routed
        .replies
        .iter()
        .filter_map(|reply| match reply {
            Outgoing::Text { chat_id: to, text, .. } if *to == chat_id => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// All texts of a routed update joined by newlines.
pub fn all_text(routed: &Routed) -> String {
    routed
        .replies
        .iter()
        .filter_map(|reply| match reply {
            Outgoing::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Callback data of every button attached to replies sent to `chat_id`.
pub fn buttons_to(routed: &Routed, chat_id: i64) -> Vec<String> {
    routed
        .replies
        .iter()
        .filter_map(|reply| match reply {
            Outgoing::Text {
                chat_id: to,
                keyboard: Some(keyboard),
                ..
            } if *to == chat_id => Some(callback_data(keyboard)),
            _ => None,
        })
        .flatten()
        .collect()
}

fn callback_data(keyboard: &InlineKeyboardMarkup) -> Vec<String> {
    keyboard
        .inline_keyboard
        .iter()
        .flatten()
        .filter_map(|button| match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

/// Messenger that records what would have been sent.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<Outgoing>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<Outgoing> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<InlineKeyboardMarkup>) {
        self.sent.lock().unwrap().push(Outgoing::Text {
            chat_id,
            text: text.to_string(),
            keyboard,
        });
    }

    async fn send_photo(&self, chat_id: i64, file_id: &str, caption: Option<&str>) {
        self.sent.lock().unwrap().push(Outgoing::Photo {
            chat_id,
            file_id: file_id.to_string(),
            caption: caption.map(str::to_string),
        });
    }

    async fn send_location(&self, chat_id: i64, latitude: f64, longitude: f64, heading: Option<u16>) {
        self.sent.lock().unwrap().push(Outgoing::Location {
            chat_id,
            latitude,
            longitude,
            heading,
        });
    }

    async fn answer_callback(&self, callback_id: &str) {
        self.sent.lock().unwrap().push(Outgoing::AnswerCallback {
            callback_id: callback_id.to_string(),
        });
    }
}
