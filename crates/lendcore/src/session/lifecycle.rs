//! Session lifecycle
//!
//! Opening, inspecting, extending and closing the one in-progress session a
//! user may have per chat type. Storage errors are returned unchanged.

use rusqlite::{Connection, ErrorCode};
use uuid::Uuid;

use crate::core::error::{AppError, AppResult};
use crate::session::payload::{encode, Payload};
use crate::session::topic::{FlowMode, RequestType, SessionStatus, Topic};
use crate::storage::db::with_transaction;
use crate::storage::sessions::{self, Session, SessionDetail};

/// Where a user stands in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    InFlow {
        session: Session,
        /// Topic of the newest detail
        topic: Topic,
    },
    /// Newest detail carries a topic this build does not know
    Stale { session: Session },
}

/// Starts a session for `flow` and records its opening detail.
///
/// # Errors
///
/// `AppError::SessionAlreadyOpen` when the user already has an in-progress
/// session in this chat type.
pub fn open(conn: &Connection, user_id: i64, request_type: RequestType, flow: FlowMode) -> AppResult<Session> {
    let already_open = AppError::SessionAlreadyOpen { user_id, request_type };
    if sessions::find_current_session(conn, user_id, request_type)?.is_some() {
        return Err(already_open);
    }

    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        status: SessionStatus::InProgress,
        request_type,
        flow,
        created_at: String::new(),
        updated_at: String::new(),
    };

    let opening = Payload::opening(flow.init_topic())
        .ok_or_else(|| AppError::NotFound(format!("opening payload for {}", flow)))?;

    with_transaction(conn, |tx| {
        match sessions::save_session(tx, &session) {
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(already_open);
            }
            other => other?,
        }
        sessions::save_session_detail(tx, &session.id, opening.topic(), &encode(&opening))?;
        Ok(())
    })?;

    log::info!("💬 Opened {} session {} for user {}", flow, session.id, user_id);

    Ok(sessions::get_session(conn, &session.id)?.unwrap_or(session))
}

/// The user's in-progress session in this chat type.
pub fn current_for(conn: &Connection, user_id: i64, request_type: RequestType) -> AppResult<Option<Session>> {
    Ok(sessions::find_current_session(conn, user_id, request_type)?)
}

/// Topic of the session's newest detail, `None` when absent or unknown.
pub fn current_topic(conn: &Connection, session: &Session) -> AppResult<Option<Topic>> {
    Ok(sessions::latest_session_detail(conn, &session.id)?.and_then(|detail| detail.topic))
}

/// Looks up the in-progress session together with its newest detail.
pub fn state_for(conn: &Connection, user_id: i64, request_type: RequestType) -> AppResult<SessionState> {
    let session = match current_for(conn, user_id, request_type)? {
        Some(session) => session,
        None => return Ok(SessionState::Idle),
    };

    let state = match sessions::latest_session_detail(conn, &session.id)? {
        Some(detail) => match detail.topic {
            Some(topic) => SessionState::InFlow { session, topic },
            None => {
                log::warn!("⚠️ Latest detail {} of session {} has an unknown topic", detail.id, session.id);
                SessionState::Stale { session }
            }
        },
        // A session always gets its opening detail; treat a bare row as just opened
        None => SessionState::InFlow {
            topic: session.flow.init_topic(),
            session,
        },
    };
    Ok(state)
}

/// Records the answer for `payload.topic()` and returns the detail id.
pub fn append_detail(conn: &Connection, session: &Session, payload: &Payload) -> AppResult<i64> {
    let topic = payload.topic();
    let id = sessions::save_session_detail(conn, &session.id, topic, &encode(payload))?;
    log::debug!("Session {} advanced to {}", session.id, topic);
    Ok(id)
}

/// All details of a session, oldest first.
pub fn details(conn: &Connection, session_id: &str) -> AppResult<Vec<SessionDetail>> {
    let mut details = sessions::get_session_details(conn, session_id)?;
    details.reverse();
    Ok(details)
}

/// Marks the session complete. Returns whether a row was updated.
pub fn mark_complete(conn: &Connection, session_id: &str) -> AppResult<bool> {
    Ok(sessions::update_session_status(conn, session_id, SessionStatus::Complete)? > 0)
}

/// Deletes the session and its details.
///
/// Closing a session that no longer exists is not an error: returns
/// `Ok(false)`. `Ok(true)` means rows were removed.
pub fn close(conn: &Connection, session_id: &str) -> AppResult<bool> {
    let removed = with_transaction(conn, |tx| {
        sessions::delete_session_details_by_session_id(tx, session_id)?;
        Ok(sessions::delete_session(tx, session_id)? > 0)
    })?;
    if removed {
        log::info!("🧹 Closed session {}", session_id);
    }
    Ok(removed)
}
