//! Borrow requests and tool returnings
//!
//! A borrow starts as `requested`. Staff confirmation takes one unit of stock,
//! rejection leaves the stock alone. A confirmed borrow is returned through a
//! `tool_returnings` row that staff accept, which puts the unit back.
//!
//! The multi-statement operations here expect to run inside the caller's
//! transaction.

use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use strum::{AsRefStr, Display, EnumString};

use crate::storage::tag_column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BorrowStatus {
    Requested,
    Confirmed,
    Rejected,
    Returned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReturningStatus {
    Requested,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Borrow {
    pub id: i64,
    pub user_id: i64,
    pub tool_id: i64,
    pub duration_days: i64,
    pub status: BorrowStatus,
    /// Staff member who confirmed or rejected the request
    pub confirmed_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolReturning {
    pub id: i64,
    pub borrow_id: i64,
    pub user_id: i64,
    pub status: ReturningStatus,
    pub confirmed_by: Option<i64>,
    pub created_at: String,
}

/// Result of a staff decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Applied,
    /// Request does not exist or was already decided
    NotPending,
    /// No unit left to hand out
    OutOfStock,
}

const BORROW_COLUMNS: &str = "id, user_id, tool_id, duration_days, status, confirmed_by, created_at, updated_at";

fn borrow_from_row(row: &Row<'_>) -> Result<Borrow> {
    Ok(Borrow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        tool_id: row.get(2)?,
        duration_days: row.get(3)?,
        status: tag_column(row, 4)?,
        confirmed_by: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn returning_from_row(row: &Row<'_>) -> Result<ToolReturning> {
    Ok(ToolReturning {
        id: row.get(0)?,
        borrow_id: row.get(1)?,
        user_id: row.get(2)?,
        status: tag_column(row, 3)?,
        confirmed_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Records a borrow request and returns its id.
pub fn create_borrow(conn: &Connection, user_id: i64, tool_id: i64, duration_days: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO borrows (user_id, tool_id, duration_days) VALUES (?1, ?2, ?3)",
        params![user_id, tool_id, duration_days],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_borrow(conn: &Connection, borrow_id: i64) -> Result<Option<Borrow>> {
    conn.query_row(
        &format!("SELECT {} FROM borrows WHERE id = ?1", BORROW_COLUMNS),
        params![borrow_id],
        borrow_from_row,
    )
    .optional()
}

/// Borrows of a user, newest first.
pub fn list_user_borrows(conn: &Connection, user_id: i64) -> Result<Vec<Borrow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM borrows WHERE user_id = ?1 ORDER BY id DESC",
        BORROW_COLUMNS
    ))?;
    let rows = stmt.query_map(params![user_id], borrow_from_row)?;
    rows.collect()
}

/// Confirmed borrows of a user that have no pending return.
pub fn list_returnable_borrows(conn: &Connection, user_id: i64) -> Result<Vec<Borrow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM borrows b WHERE b.user_id = ?1 AND b.status = 'confirmed'
         AND NOT EXISTS (SELECT 1 FROM tool_returnings r WHERE r.borrow_id = b.id AND r.status = 'requested')
         ORDER BY b.id",
        BORROW_COLUMNS
    ))?;
    let rows = stmt.query_map(params![user_id], borrow_from_row)?;
    rows.collect()
}

/// Marks a requested borrow confirmed and takes one unit of stock.
pub fn confirm_borrow(conn: &Connection, borrow_id: i64, staff_id: i64) -> Result<Decision> {
    let borrow = match get_borrow(conn, borrow_id)? {
        Some(borrow) if borrow.status == BorrowStatus::Requested => borrow,
        _ => return Ok(Decision::NotPending),
    };

    let taken = conn.execute(
        "UPDATE tools SET stock = stock - 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?1 AND stock > 0",
        params![borrow.tool_id],
    )?;
    if taken == 0 {
        return Ok(Decision::OutOfStock);
    }

    set_borrow_status(conn, borrow_id, BorrowStatus::Confirmed, Some(staff_id))?;
    Ok(Decision::Applied)
}

/// Marks a requested borrow rejected.
pub fn reject_borrow(conn: &Connection, borrow_id: i64, staff_id: i64) -> Result<Decision> {
    match get_borrow(conn, borrow_id)? {
        Some(borrow) if borrow.status == BorrowStatus::Requested => {
            set_borrow_status(conn, borrow_id, BorrowStatus::Rejected, Some(staff_id))?;
            Ok(Decision::Applied)
        }
        _ => Ok(Decision::NotPending),
    }
}

fn set_borrow_status(conn: &Connection, borrow_id: i64, status: BorrowStatus, staff_id: Option<i64>) -> Result<usize> {
    conn.execute(
        "UPDATE borrows SET status = ?1, confirmed_by = COALESCE(?2, confirmed_by), updated_at = CURRENT_TIMESTAMP
         WHERE id = ?3",
        params![status.as_ref(), staff_id, borrow_id],
    )
}

/// Records a return request and returns its id.
pub fn create_tool_returning(conn: &Connection, borrow_id: i64, user_id: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO tool_returnings (borrow_id, user_id) VALUES (?1, ?2)",
        params![borrow_id, user_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_tool_returning(conn: &Connection, returning_id: i64) -> Result<Option<ToolReturning>> {
    conn.query_row(
        "SELECT id, borrow_id, user_id, status, confirmed_by, created_at FROM tool_returnings WHERE id = ?1",
        params![returning_id],
        returning_from_row,
    )
    .optional()
}

/// Accepts a pending return: the borrow becomes `returned` and the unit goes back to stock.
pub fn confirm_tool_returning(conn: &Connection, returning_id: i64, staff_id: i64) -> Result<Decision> {
    let returning = match get_tool_returning(conn, returning_id)? {
        Some(returning) if returning.status == ReturningStatus::Requested => returning,
        _ => return Ok(Decision::NotPending),
    };
    let borrow = match get_borrow(conn, returning.borrow_id)? {
        Some(borrow) if borrow.status == BorrowStatus::Confirmed => borrow,
        _ => return Ok(Decision::NotPending),
    };

    conn.execute(
        "UPDATE tool_returnings SET status = ?1, confirmed_by = ?2 WHERE id = ?3",
        params![ReturningStatus::Confirmed.as_ref(), staff_id, returning_id],
    )?;
    set_borrow_status(conn, borrow.id, BorrowStatus::Returned, None)?;
    conn.execute(
        "UPDATE tools SET stock = stock + 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
        params![borrow.tool_id],
    )?;
    Ok(Decision::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::open_in_memory;
    use crate::storage::tools::{create_tool, get_tool, NewTool};
    use crate::storage::users::ensure_user;

    const STUDENT: i64 = 100;
    const STAFF: i64 = 900;

    fn setup(stock: i64) -> (Connection, i64) {
        let conn = open_in_memory().unwrap();
        ensure_user(&conn, STUDENT, Some("budi")).unwrap();
        let tool = NewTool {
            name: "Solder".to_string(),
            brand: "Hakko".to_string(),
            product_type: "FX-888D".to_string(),
            weight: 1.2,
            stock,
            info: String::new(),
        };
        let tool_id = create_tool(&conn, &tool, &[]).unwrap();
        (conn, tool_id)
    }

    fn stock(conn: &Connection, tool_id: i64) -> i64 {
        get_tool(conn, tool_id).unwrap().unwrap().stock
    }

    #[test]
    fn test_confirm_borrow_takes_stock() {
        let (conn, tool_id) = setup(2);
        let borrow_id = create_borrow(&conn, STUDENT, tool_id, 7).unwrap();
        assert_eq!(get_borrow(&conn, borrow_id).unwrap().unwrap().status, BorrowStatus::Requested);

        assert_eq!(confirm_borrow(&conn, borrow_id, STAFF).unwrap(), Decision::Applied);
        let borrow = get_borrow(&conn, borrow_id).unwrap().unwrap();
        assert_eq!(borrow.status, BorrowStatus::Confirmed);
        assert_eq!(borrow.confirmed_by, Some(STAFF));
        assert_eq!(stock(&conn, tool_id), 1);

        assert_eq!(confirm_borrow(&conn, borrow_id, STAFF).unwrap(), Decision::NotPending);
        assert_eq!(stock(&conn, tool_id), 1);
    }

    #[test]
    fn test_confirm_borrow_out_of_stock() {
        let (conn, tool_id) = setup(0);
        let borrow_id = create_borrow(&conn, STUDENT, tool_id, 7).unwrap();

        assert_eq!(confirm_borrow(&conn, borrow_id, STAFF).unwrap(), Decision::OutOfStock);
        assert_eq!(get_borrow(&conn, borrow_id).unwrap().unwrap().status, BorrowStatus::Requested);
    }

    #[test]
    fn test_reject_borrow() {
        let (conn, tool_id) = setup(1);
        let borrow_id = create_borrow(&conn, STUDENT, tool_id, 7).unwrap();

        assert_eq!(reject_borrow(&conn, borrow_id, STAFF).unwrap(), Decision::Applied);
        assert_eq!(get_borrow(&conn, borrow_id).unwrap().unwrap().status, BorrowStatus::Rejected);
        assert_eq!(stock(&conn, tool_id), 1);
        assert_eq!(reject_borrow(&conn, 999, STAFF).unwrap(), Decision::NotPending);
    }

    #[test]
    fn test_return_restores_stock() {
        let (conn, tool_id) = setup(1);
        let borrow_id = create_borrow(&conn, STUDENT, tool_id, 7).unwrap();
        confirm_borrow(&conn, borrow_id, STAFF).unwrap();
        assert_eq!(list_returnable_borrows(&conn, STUDENT).unwrap().len(), 1);

        let returning_id = create_tool_returning(&conn, borrow_id, STUDENT).unwrap();
        assert!(list_returnable_borrows(&conn, STUDENT).unwrap().is_empty());

        assert_eq!(confirm_tool_returning(&conn, returning_id, STAFF).unwrap(), Decision::Applied);
        assert_eq!(get_borrow(&conn, borrow_id).unwrap().unwrap().status, BorrowStatus::Returned);
        assert_eq!(
            get_tool_returning(&conn, returning_id).unwrap().unwrap().status,
            ReturningStatus::Confirmed
        );
        assert_eq!(stock(&conn, tool_id), 1);
        assert_eq!(confirm_tool_returning(&conn, returning_id, STAFF).unwrap(), Decision::NotPending);
    }

    #[test]
    fn test_list_user_borrows_newest_first() {
        let (conn, tool_id) = setup(5);
        let first = create_borrow(&conn, STUDENT, tool_id, 7).unwrap();
        let second = create_borrow(&conn, STUDENT, tool_id, 14).unwrap();

        let ids: Vec<i64> = list_user_borrows(&conn, STUDENT).unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
