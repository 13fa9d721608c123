//! SQLite storage: connection pool, migrations and repositories

pub mod borrows;
pub mod db;
pub mod migrations;
pub mod sessions;
pub mod tools;
pub mod users;

// Re-exports for convenience
pub use db::{create_pool, get_connection, with_transaction, DbConnection, DbPool};

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;

/// Reads a text column holding a strum tag.
pub(crate) fn tag_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
