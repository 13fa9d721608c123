//! Lendbot - Telegram front end for the lab tool-lending service
//!
//! Turns Telegram updates into calls on the `lendcore` session state machine
//! and sends the resulting replies back.
//!
//! # Module Structure
//!
//! - `cli`: Command-line interface
//! - `i18n`: Fluent message catalogue (Indonesian and English)
//! - `telegram`: Router, step handlers, finalizers, dispatcher schema

pub mod cli;
pub mod i18n;
pub mod telegram;

pub use telegram::{create_bot, handle_inbound, process, schema, setup_bot_commands, HandlerDeps, Messenger};
