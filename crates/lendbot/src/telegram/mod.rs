//! Telegram integration: update conversion, routing, step handlers and delivery

pub mod bot;
mod commands;
mod finalize;
pub mod handlers;
pub mod inbound;
pub mod keyboards;
pub mod messenger;
pub mod router;
pub mod staff;
mod steps;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use inbound::{Content, Inbound};
pub use messenger::{Messenger, Outgoing};
pub use router::{handle_inbound, parse_command, process, Outcome, Routed};
pub use staff::StaffAction;
