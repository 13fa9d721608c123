//! Handler types and dependencies

use std::sync::Arc;

use lendcore::{Config, DbPool};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub db_pool: Arc<DbPool>,
    pub config: Arc<Config>,
    pub bot_username: Option<String>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(db_pool: Arc<DbPool>, config: Arc<Config>, bot_username: Option<String>) -> Self {
        Self {
            db_pool,
            config,
            bot_username,
        }
    }
}
