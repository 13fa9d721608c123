use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;

use crate::core::error::{AppError, AppResult};

/// Runtime configuration for the bot
///
/// Built once at startup (see `Config::from_env`) and shared by reference
/// with every component that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot token, read from BOT_TOKEN or TELOXIDE_TOKEN
    pub bot_token: String,
    /// Custom Bot API server (BOT_API_URL), e.g. a local telegram-bot-api instance
    pub bot_api_url: Option<String>,
    /// SQLite database file. Default: lendbot.sqlite
    pub database_path: String,
    /// Log file path. Default: lendbot.log
    pub log_file_path: String,
    /// Log level for console and file output. Default: info
    pub log_level: LevelFilter,
    /// Public URL Telegram posts updates to. Polling is used when unset.
    pub webhook_url: Option<String>,
    /// Local port the webhook listener binds to. Default: 8080
    pub webhook_port: u16,
    /// Telegram ids of lab staff (comma separated in STAFF_IDS)
    pub staff_ids: Vec<i64>,
    /// Chat that receives new borrow and return requests
    pub staff_chat_id: Option<i64>,
    /// Lab location sent by /lokasi
    pub lab_location: Option<LabLocation>,
    /// Language used when Telegram does not report one. Default: id
    pub default_lang: String,
    /// Oldest accepted batch (angkatan) year at registration. Default: 2000
    pub min_batch_year: i32,
}

/// Coordinates of the lab, sent with `sendLocation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<u16>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN").or_else(|| get("TELOXIDE_TOKEN")).unwrap_or_default();

        let log_level = match get("LOG_LEVEL") {
            Some(level) => LevelFilter::from_str(&level)
                .map_err(|_| AppError::Config(format!("LOG_LEVEL: unknown level '{}'", level)))?,
            None => LevelFilter::Info,
        };

        let staff_ids = match get("STAFF_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_value::<i64>("STAFF_IDS", s))
                .collect::<AppResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let lab_location = match (get("LAB_LATITUDE"), get("LAB_LONGITUDE")) {
            (Some(lat), Some(lon)) => Some(LabLocation {
                latitude: parse_value("LAB_LATITUDE", &lat)?,
                longitude: parse_value("LAB_LONGITUDE", &lon)?,
                heading: get("LAB_HEADING")
                    .map(|h| parse_value("LAB_HEADING", &h))
                    .transpose()?,
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::Config(
                    "LAB_LATITUDE and LAB_LONGITUDE must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            bot_token,
            bot_api_url: get("BOT_API_URL"),
            database_path: get("DATABASE_PATH").unwrap_or_else(|| "lendbot.sqlite".to_string()),
            log_file_path: get("LOG_FILE_PATH").unwrap_or_else(|| "lendbot.log".to_string()),
            log_level,
            webhook_url: get("WEBHOOK_URL"),
            webhook_port: get("WEBHOOK_PORT")
                .map(|p| parse_value("WEBHOOK_PORT", &p))
                .transpose()?
                .unwrap_or(8080),
            staff_ids,
            staff_chat_id: get("STAFF_CHAT_ID")
                .map(|c| parse_value("STAFF_CHAT_ID", &c))
                .transpose()?,
            lab_location,
            default_lang: get("DEFAULT_LANG").unwrap_or_else(|| "id".to_string()),
            min_batch_year: get("MIN_BATCH_YEAR")
                .map(|y| parse_value("MIN_BATCH_YEAR", &y))
                .transpose()?
                .unwrap_or(2000),
        })
    }

    /// Whether the Telegram user is configured as lab staff.
    pub fn is_staff(&self, user_id: i64) -> bool {
        self.staff_ids.contains(&user_id)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.parse::<T>()
        .map_err(|_| AppError::Config(format!("{}: cannot parse '{}'", key, raw)))
}

/// Database configuration
pub mod db {
    use super::Duration;

    /// Maximum number of pooled SQLite connections
    pub const MAX_POOL_SIZE: u32 = 10;

    /// How long a connection waits on a locked database (in seconds)
    pub const BUSY_TIMEOUT_SECS: u64 = 5;

    /// Busy timeout duration
    pub fn busy_timeout() -> Duration {
        Duration::from_secs(BUSY_TIMEOUT_SECS)
    }
}

/// Conversation limits
pub mod session {
    /// Shortest accepted name (registration, tool name)
    pub const MIN_NAME_LEN: usize = 3;

    /// Longest accepted single-line answer
    pub const MAX_NAME_LEN: usize = 64;

    /// Longest accepted free-text answer (tool info)
    pub const MAX_TEXT_LEN: usize = 500;

    /// Longest borrow period a student may request (in days)
    pub const MAX_BORROW_DAYS: i64 = 90;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Telegram API calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, "lendbot.sqlite");
        assert_eq!(config.webhook_port, 8080);
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.default_lang, "id");
        assert_eq!(config.min_batch_year, 2000);
        assert!(config.staff_ids.is_empty());
        assert!(config.lab_location.is_none());
        assert!(config.webhook_url.is_none());
        assert!(config.bot_api_url.is_none());
    }

    #[test]
    fn test_teloxide_token_fallback() {
        let config = Config::from_lookup(lookup(&[("TELOXIDE_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.bot_token, "123:abc");
    }

    #[test]
    fn test_staff_ids_and_location() {
        let config = Config::from_lookup(lookup(&[
            ("STAFF_IDS", "10, 20,30"),
            ("LAB_LATITUDE", "-7.2819"),
            ("LAB_LONGITUDE", "112.7948"),
            ("LAB_HEADING", "90"),
        ]))
        .unwrap();
        assert_eq!(config.staff_ids, vec![10, 20, 30]);
        assert!(config.is_staff(20));
        assert!(!config.is_staff(40));
        let location = config.lab_location.unwrap();
        assert_eq!(location.heading, Some(90));
        assert!((location.latitude + 7.2819).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Config::from_lookup(lookup(&[("WEBHOOK_PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("STAFF_IDS", "1,abc")])).is_err());
        assert!(Config::from_lookup(lookup(&[("LOG_LEVEL", "loud")])).is_err());
        assert!(Config::from_lookup(lookup(&[("LAB_LATITUDE", "1.0")])).is_err());
    }

    #[test]
    fn test_empty_value_is_unset() {
        let config = Config::from_lookup(lookup(&[("WEBHOOK_URL", "  ")])).unwrap();
        assert!(config.webhook_url.is_none());
    }
}
