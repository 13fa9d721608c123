//! Dispatcher schema

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message};

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::inbound::Inbound;
use crate::telegram::router::handle_inbound;

/// Creates the dispatcher schema for the bot.
///
/// Text and photo messages and inline keyboard presses all go through the
/// router. Failures are answered inside `handle_inbound`, so the endpoints
/// never return an error to the dispatcher.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_messages = deps.clone();
    let deps_callback = deps;

    dptree::entry()
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callback))
}

/// Handler for text and photo messages
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        async move {
            match Inbound::from_message(&msg) {
                Some(inbound) => {
                    handle_inbound(&bot, &deps, &inbound).await;
                }
                None => log::debug!("Ignoring message {} in chat {}", msg.id.0, msg.chat.id.0),
            }
            Ok(())
        }
    })
}

/// Handler for inline keyboard presses
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            match Inbound::from_callback(&q) {
                Some(inbound) => {
                    handle_inbound(&bot, &deps, &inbound).await;
                }
                None => {
                    // Still answer so the client stops its spinner
                    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                        log::warn!("Failed to answer callback {}: {}", q.id.0, e);
                    }
                }
            }
            Ok(())
        }
    })
}
