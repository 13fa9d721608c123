use thiserror::Error;

use crate::core::validation::ValidationError;
use crate::session::payload::CodecError;
use crate::session::topic::RequestType;

/// Centralized error types for the application
///
/// All errors raised by the session core and the repositories are converted
/// to this enum. Uses `thiserror` for automatic error conversion and display
/// formatting.
///
/// # Example
///
/// ```no_run
/// use lendcore::AppError;
///
/// fn handle_error(err: AppError) {
///     log::error!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[cfg(feature = "telegram")]
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// A stored session payload could not be decoded
    #[error("Payload error: {0}")]
    Codec(#[from] CodecError),

    /// User input rejected by a step validator
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A second in-progress session was requested for the same user and chat type
    #[error("User {user_id} already has an open {request_type} session")]
    SessionAlreadyOpen { user_id: i64, request_type: RequestType },

    /// Referenced row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid or missing configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anyhow errors (migrations, startup)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Storage failures abort the current step and get the generic reply.
    pub fn is_storage(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::DatabasePool(_))
    }
}
