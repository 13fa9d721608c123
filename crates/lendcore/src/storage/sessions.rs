//! Session and session detail repository
//!
//! Plain row access. Ordering and invariants (one open session per user and
//! chat type, chronological replay) are handled by `session::lifecycle`.

use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::session::topic::{FlowMode, RequestType, SessionStatus, Topic};
use crate::storage::tag_column;

/// A conversation in progress (or just completed) for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// UUID v4
    pub id: String,
    pub user_id: i64,
    pub status: SessionStatus,
    pub request_type: RequestType,
    pub flow: FlowMode,
    pub created_at: String,
    pub updated_at: String,
}

/// One recorded step of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDetail {
    pub id: i64,
    pub session_id: String,
    /// `None` when the stored tag is not a known topic
    pub topic: Option<Topic>,
    /// Encoded payload, stored verbatim
    pub payload: String,
    pub created_at: String,
}

const SESSION_COLUMNS: &str = "id, user_id, status, request_type, flow, created_at, updated_at";
const DETAIL_COLUMNS: &str = "id, session_id, topic, payload, created_at";

fn session_from_row(row: &Row<'_>) -> Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        status: tag_column(row, 2)?,
        request_type: tag_column(row, 3)?,
        flow: tag_column(row, 4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn detail_from_row(row: &Row<'_>) -> Result<SessionDetail> {
    Ok(SessionDetail {
        id: row.get(0)?,
        session_id: row.get(1)?,
        topic: row.get::<_, String>(2)?.parse().ok(),
        payload: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// The in-progress session of a user in the given chat type, if any.
pub fn find_current_session(conn: &Connection, user_id: i64, request_type: RequestType) -> Result<Option<Session>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM sessions WHERE user_id = ?1 AND request_type = ?2 AND status = ?3",
            SESSION_COLUMNS
        ),
        params![user_id, request_type.as_ref(), SessionStatus::InProgress.as_ref()],
        session_from_row,
    )
    .optional()
}

/// Looks a session up by id regardless of its status.
pub fn get_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    conn.query_row(
        &format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS),
        params![session_id],
        session_from_row,
    )
    .optional()
}

/// Inserts a new session row.
///
/// A second in-progress session for the same user and chat type violates the
/// `idx_sessions_open` unique index.
pub fn save_session(conn: &Connection, session: &Session) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, user_id, status, request_type, flow) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            session.id,
            session.user_id,
            session.status.as_ref(),
            session.request_type.as_ref(),
            session.flow.as_ref()
        ],
    )?;
    Ok(())
}

/// Returns the number of updated rows (0 when the session does not exist).
pub fn update_session_status(conn: &Connection, session_id: &str, status: SessionStatus) -> Result<usize> {
    conn.execute(
        "UPDATE sessions SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
        params![status.as_ref(), session_id],
    )
}

/// Returns the number of deleted rows.
pub fn delete_session(conn: &Connection, session_id: &str) -> Result<usize> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
}

/// Appends a detail and returns its id.
pub fn save_session_detail(conn: &Connection, session_id: &str, topic: Topic, payload: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO session_details (session_id, topic, payload) VALUES (?1, ?2, ?3)",
        params![session_id, topic.as_ref(), payload],
    )?;
    conn.execute(
        "UPDATE sessions SET updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
        params![session_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns the number of deleted rows.
pub fn delete_session_details_by_session_id(conn: &Connection, session_id: &str) -> Result<usize> {
    conn.execute("DELETE FROM session_details WHERE session_id = ?1", params![session_id])
}

/// All details of a session, newest first.
pub fn get_session_details(conn: &Connection, session_id: &str) -> Result<Vec<SessionDetail>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM session_details WHERE session_id = ?1 ORDER BY id DESC",
        DETAIL_COLUMNS
    ))?;
    let rows = stmt.query_map(params![session_id], detail_from_row)?;
    rows.collect()
}

/// The most recent detail of a session.
pub fn latest_session_detail(conn: &Connection, session_id: &str) -> Result<Option<SessionDetail>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM session_details WHERE session_id = ?1 ORDER BY id DESC LIMIT 1",
            DETAIL_COLUMNS
        ),
        params![session_id],
        detail_from_row,
    )
    .optional()
}
