//! Bot initialization and the command set
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - Command menu registration per language

use std::str::FromStr;

use lendcore::core::config;
use lendcore::session::topic::FlowMode;
use lendcore::Config;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use teloxide::prelude::*;
use teloxide::types::BotCommand;

use crate::i18n;

/// Bot commands
///
/// The lowercase variant name is the command typed after `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Start,
    Help,
    /// List tools, or show one tool: `/cek [id]`
    Cek,
    Pinjam,
    Kembali,
    Daftar,
    Tambah,
    Edit,
    Foto,
    Batal,
    Lokasi,
    Status,
    /// `/konfirmasi <borrow_id>`
    Konfirmasi,
    /// `/tolak <borrow_id>`
    Tolak,
    /// `/terima <returning_id>`
    Terima,
}

impl Command {
    /// Parses a command name as returned by `router::parse_command`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    /// Flow the command opens, if any.
    pub fn flow(self) -> Option<FlowMode> {
        match self {
            Command::Pinjam => Some(FlowMode::Borrow),
            Command::Kembali => Some(FlowMode::Return),
            Command::Daftar => Some(FlowMode::Register),
            Command::Tambah => Some(FlowMode::Add),
            Command::Edit => Some(FlowMode::Edit),
            Command::Foto => Some(FlowMode::Photo),
            _ => None,
        }
    }

    /// Staff decisions and tool management.
    pub fn is_staff_only(self) -> bool {
        matches!(self, Command::Konfirmasi | Command::Tolak | Command::Terima)
            || self.flow().is_some_and(FlowMode::requires_staff)
    }

    fn description_key(self) -> String {
        format!("command-desc-{}", self.as_ref())
    }
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Missing token, invalid BOT_API_URL or HTTP client failure
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    if config.bot_token.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }

    let client = teloxide::net::default_reqwest_settings()
        .timeout(config::network::timeout())
        .build()?;
    let bot = Bot::with_client(&config.bot_token, client);

    match &config.bot_api_url {
        Some(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            Ok(bot.set_api_url(url))
        }
        None => Ok(bot),
    }
}

/// Commands shown in the Telegram menu for one language. Staff commands are hidden.
pub fn menu_commands(lang: &unic_langid::LanguageIdentifier) -> Vec<BotCommand> {
    Command::iter()
        .filter(|command| !command.is_staff_only())
        .map(|command| BotCommand::new(command.as_ref(), i18n::t(lang, &command.description_key())))
        .collect()
}

/// Sets up bot commands in Telegram UI for every supported language
///
/// The default language's list is also registered without a language code.
pub async fn setup_bot_commands(bot: &Bot, default_lang: &str) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(menu_commands(&i18n::lang_from_code(default_lang)))
        .await?;

    for (code, _) in i18n::SUPPORTED_LANGS {
        bot.set_my_commands(menu_commands(&i18n::lang_from_code(code)))
            .language_code(code.to_string())
            .await?;
    }

    Ok(())
}
