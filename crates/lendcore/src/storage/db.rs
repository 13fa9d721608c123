use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::core::config;
use crate::core::error::AppResult;
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Every pooled connection enables foreign keys (session details cascade
/// with their session) and waits up to `config::db::BUSY_TIMEOUT_SECS` on a
/// locked database. Pending migrations are applied before the pool is
/// returned.
///
/// # Example
///
/// ```no_run
/// use lendcore::storage;
///
/// let pool = storage::create_pool("lendbot.sqlite")?;
/// let conn = storage::get_connection(&pool)?;
/// # Ok::<(), lendcore::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(init_connection);
    let pool = Pool::builder().max_size(config::db::MAX_POOL_SIZE).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    log::info!("🗄️ Database ready at {}", database_path);
    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    Ok(pool.get()?)
}

/// Runs `f` atomically.
///
/// Opens a transaction when `conn` is in autocommit mode; inside a caller's
/// transaction `f` simply joins it. The transaction rolls back when `f`
/// returns an error.
pub fn with_transaction<T, F>(conn: &Connection, f: F) -> AppResult<T>
where
    F: FnOnce(&Connection) -> AppResult<T>,
{
    if !conn.is_autocommit() {
        return f(conn);
    }
    let tx = conn.unchecked_transaction()?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Opens a migrated in-memory database. Used by unit tests and benchmarks.
#[doc(hidden)]
pub fn open_in_memory() -> AppResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_connection(&mut conn)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(config::db::busy_timeout())
}
