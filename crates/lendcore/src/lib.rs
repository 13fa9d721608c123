//! Lendcore - chat-session state machine and storage for the lab tool-lending bot
//!
//! This library holds everything that does not talk to Telegram: the session
//! payload codec, the per-flow topic tables, the domain reconstructor, the
//! session lifecycle manager and the SQLite repositories behind them.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging and input validation
//! - `session`: Topics, payload codec, reconstruction and session lifecycle
//! - `storage`: Connection pool, migrations and repositories

pub mod core;
pub mod session;
pub mod storage;

// Re-export commonly used types for convenience
pub use core::{AppError, AppResult, Config};
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
