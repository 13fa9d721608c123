//! Command/topic router
//!
//! Every update goes through `process`, which runs synchronously against one
//! pooled SQLite connection and returns the replies to send. `handle_inbound`
//! runs it off the async runtime and delivers the replies, so no connection
//! is ever held across an `.await`.
//!
//! Routing order:
//! 1. staff decision callbacks (`staff:...`), handled outside sessions;
//! 2. commands, which always win over free text;
//! 3. the step handler of the current topic when a session is open;
//! 4. otherwise a help hint (private chats) or nothing (groups).

use fluent_templates::fluent_bundle::{FluentArgs, FluentValue};
use lazy_regex::regex_captures;
use lendcore::core::validation::ValidationError;
use lendcore::session::lifecycle::{self, SessionState};
use lendcore::session::topic::{FlowMode, Topic};
use lendcore::storage::borrows::Decision;
use lendcore::storage::{get_connection, users};
use lendcore::{AppResult, Config};
use rusqlite::Connection;
use teloxide::types::InlineKeyboardMarkup;
use unic_langid::LanguageIdentifier;

use crate::i18n;
use crate::telegram::commands;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::inbound::{Content, Inbound};
use crate::telegram::messenger::{deliver, Messenger, Outgoing};
use crate::telegram::staff::{self, StaffAction};
use crate::telegram::steps;

/// What handling one update did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Not addressed to the bot, or nothing to do
    Ignored,
    /// Informational reply, no state change
    Replied,
    /// Refused: staff only, registration required, another flow open
    Denied,
    Opened(FlowMode),
    /// A detail for this topic was recorded
    Advanced(Topic),
    /// Input rejected at this topic; the question was asked again
    Reprompted(Topic),
    /// Confirmed and the business operation ran
    Finalized(FlowMode),
    /// User answered "no" at the confirmation step
    Declined(FlowMode),
    /// Closed without a business operation (incomplete draft or vanished record)
    Abandoned(FlowMode),
    Cancelled,
    /// Session was at a foreign or unknown topic and has been cleaned up
    Expired,
    StaffDecision(Decision),
    /// Storage or internal failure; the user got the generic error message
    Failed,
}

/// Result of `process`: the outcome and the replies to deliver in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    pub outcome: Outcome,
    pub replies: Vec<Outgoing>,
}

/// Per-update context shared by the command, step and finalize handlers.
pub(crate) struct Ctx<'a> {
    pub conn: &'a Connection,
    pub config: &'a Config,
    pub inbound: &'a Inbound,
    pub lang: LanguageIdentifier,
    pub replies: Vec<Outgoing>,
}

impl<'a> Ctx<'a> {
    pub fn new(conn: &'a Connection, config: &'a Config, inbound: &'a Inbound) -> Self {
        Self {
            conn,
            config,
            inbound,
            lang: i18n::user_lang(inbound.language_code.as_deref(), &config.default_lang),
            replies: Vec::new(),
        }
    }

    pub fn t(&self, key: &str) -> String {
        i18n::t(&self.lang, key)
    }

    pub fn t_args(&self, key: &str, pairs: &[(&str, FluentValue<'_>)]) -> String {
        i18n::t_args(&self.lang, key, &fluent_args(pairs))
    }

    pub fn reply(&mut self, text: impl Into<String>) {
        self.send_to(self.inbound.chat_id, text, None);
    }

    pub fn reply_with(&mut self, text: impl Into<String>, keyboard: InlineKeyboardMarkup) {
        self.send_to(self.inbound.chat_id, text, Some(keyboard));
    }

    pub fn send_to(&mut self, chat_id: i64, text: impl Into<String>, keyboard: Option<InlineKeyboardMarkup>) {
        self.replies.push(Outgoing::Text {
            chat_id,
            text: text.into(),
            keyboard,
        });
    }

    pub fn is_staff(&self) -> bool {
        self.config.is_staff(self.inbound.user_id)
    }

    /// Language for messages sent to other users (staff chat, borrowers).
    pub fn default_lang(&self) -> LanguageIdentifier {
        i18n::lang_from_code(&self.config.default_lang)
    }

    /// Localized explanation of a rejected input.
    pub fn validation_message(&self, err: &ValidationError) -> String {
        match err {
            ValidationError::InvalidNumber(value) => self.t_args("error-invalid-number", &[("value", value.as_str().into())]),
            ValidationError::OutOfRange { value, min, max } => self.t_args(
                "error-out-of-range",
                &[("value", (*value).into()), ("min", (*min).into()), ("max", (*max).into())],
            ),
            ValidationError::InvalidWeight(value) => self.t_args("error-invalid-weight", &[("value", value.as_str().into())]),
            ValidationError::TooShort { min } => self.t_args("error-too-short", &[("min", (*min).into())]),
            ValidationError::TooLong { max } => self.t_args("error-too-long", &[("max", (*max).into())]),
            ValidationError::InvalidNim(value) => self.t_args("error-invalid-nim", &[("value", value.as_str().into())]),
            ValidationError::NotYesNo(_) => self.t("error-not-yes-no"),
            ValidationError::UnknownTool(id) => self.t_args("error-unknown-tool", &[("id", (*id).into())]),
            ValidationError::UnknownBorrow(id) => self.t_args("error-unknown-borrow", &[("id", (*id).into())]),
            ValidationError::ExpectedPhoto => self.t("error-expected-photo"),
            ValidationError::NoPhotos => self.t("error-no-photos"),
            ValidationError::UnknownField(value) => self.t_args("error-unknown-field", &[("value", value.as_str().into())]),
            ValidationError::ExpectedText => self.t("error-expected-text"),
        }
    }
}

/// Builds Fluent arguments from key/value pairs.
pub(crate) fn fluent_args<'a>(pairs: &[(&str, FluentValue<'a>)]) -> FluentArgs<'a> {
    let mut args = FluentArgs::new();
    for (key, value) in pairs {
        args.set(key.to_string(), value.clone());
    }
    args
}

/// Extracts the command name: the text after a leading `/` up to the first
/// whitespace or `@`, lowercased. `None` when the text is not a command.
///
/// `"/help"` and `"/help extra"` give `help`; `"hello"`, `"hello/"` and `"/"` give `None`.
pub fn parse_command(text: &str) -> Option<String> {
    let (_, name) = regex_captures!(r"^/([^\s@]*)", text)?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_lowercase())
    }
}

/// Bot username a command is addressed to (`/pinjam@LabBot` gives `LabBot`).
pub fn command_target(text: &str) -> Option<&str> {
    regex_captures!(r"^/[^\s@]+@(\S+)", text).map(|(_, target)| target)
}

/// Everything after the command name, trimmed.
pub fn command_args(text: &str) -> &str {
    text.trim_start()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

/// Handles one update against the database and returns the replies.
///
/// # Errors
///
/// Storage failures are returned unchanged; nothing has been sent yet.
pub fn process(deps: &HandlerDeps, inbound: &Inbound) -> AppResult<Routed> {
    let conn = get_connection(&deps.db_pool)?;
    users::ensure_user(&conn, inbound.user_id, inbound.username.as_deref())?;

    let mut ctx = Ctx::new(&conn, &deps.config, inbound);
    if let Content::Callback { id, .. } = &inbound.content {
        ctx.replies.push(Outgoing::AnswerCallback {
            callback_id: id.clone(),
        });
    }

    let outcome = route(&mut ctx, deps.bot_username.as_deref())?;
    log::debug!("Update from user {} handled: {:?}", inbound.user_id, outcome);

    Ok(Routed {
        outcome,
        replies: ctx.replies,
    })
}

fn route(ctx: &mut Ctx<'_>, bot_username: Option<&str>) -> AppResult<Outcome> {
    let inbound = ctx.inbound;

    if let Content::Callback { data, .. } = &inbound.content {
        if let Some(action) = StaffAction::from_callback_data(data) {
            return staff::decide(ctx, action);
        }
    }

    let text = inbound.text().unwrap_or("");
    let command = match &inbound.content {
        Content::Text(_) => parse_command(text),
        _ => None,
    };

    if command.is_some() {
        if let (Some(target), Some(username)) = (command_target(text), bot_username) {
            if !target.eq_ignore_ascii_case(username) {
                return Ok(Outcome::Ignored);
            }
        }
    }

    let state = lifecycle::state_for(ctx.conn, inbound.user_id, inbound.request_type)?;

    match (state, command) {
        (SessionState::Idle, Some(name)) => commands::dispatch(ctx, &name, command_args(text), None),
        (SessionState::InFlow { session, .. }, Some(name)) => {
            commands::dispatch(ctx, &name, command_args(text), Some(&session))
        }
        (SessionState::Stale { session }, Some(name)) => {
            commands::dispatch(ctx, &name, command_args(text), Some(&session))
        }
        (SessionState::InFlow { session, topic }, None) => steps::handle(ctx, &session, topic),
        (SessionState::Stale { session }, None) => steps::expire(ctx, &session, None),
        (SessionState::Idle, None) => {
            if inbound.is_private() {
                let hint = ctx.t("idle-hint");
                ctx.reply(hint);
                Ok(Outcome::Replied)
            } else {
                Ok(Outcome::Ignored)
            }
        }
    }
}

/// Processes an update and delivers its replies.
///
/// Storage failures are logged with the update's context and answered with
/// the generic error message.
pub async fn handle_inbound(messenger: &dyn Messenger, deps: &HandlerDeps, inbound: &Inbound) -> Outcome {
    let routed = {
        let deps = deps.clone();
        let inbound = inbound.clone();
        tokio::task::spawn_blocking(move || process(&deps, &inbound)).await
    };

    let failure = match routed {
        Ok(Ok(routed)) => {
            deliver(messenger, &routed.replies).await;
            return routed.outcome;
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("handler task failed: {}", e),
    };

    log::error!(
        "❌ Failed to handle update from user {} in chat {} ({:?}): {}",
        inbound.user_id,
        inbound.chat_id,
        inbound.content,
        failure
    );

    let lang = i18n::user_lang(inbound.language_code.as_deref(), &deps.config.default_lang);
    let mut replies = Vec::new();
    if let Content::Callback { id, .. } = &inbound.content {
        replies.push(Outgoing::AnswerCallback {
            callback_id: id.clone(),
        });
    }
    replies.push(Outgoing::Text {
        chat_id: inbound.chat_id,
        text: i18n::t(&lang, "error-generic"),
        keyboard: None,
    });
    deliver(messenger, &replies).await;

    Outcome::Failed
}
