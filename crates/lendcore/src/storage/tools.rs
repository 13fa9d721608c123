use rusqlite::{params, Connection, OptionalExtension, Result, Row};

use crate::session::photo::PhotoRef;

/// A lendable lab tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub product_type: String,
    /// Weight in kilograms
    pub weight: f64,
    /// Units currently available for borrowing
    pub stock: i64,
    pub info: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields of a tool before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTool {
    pub name: String,
    pub brand: String,
    pub product_type: String,
    pub weight: f64,
    pub stock: i64,
    pub info: String,
}

const TOOL_COLUMNS: &str = "id, name, brand, product_type, weight, stock, info, created_at, updated_at";

fn tool_from_row(row: &Row<'_>) -> Result<Tool> {
    Ok(Tool {
        id: row.get(0)?,
        name: row.get(1)?,
        brand: row.get(2)?,
        product_type: row.get(3)?,
        weight: row.get(4)?,
        stock: row.get(5)?,
        info: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Inserts a tool with its photos and returns the new id.
pub fn create_tool(conn: &Connection, tool: &NewTool, photos: &[PhotoRef]) -> Result<i64> {
    conn.execute(
        "INSERT INTO tools (name, brand, product_type, weight, stock, info) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![tool.name, tool.brand, tool.product_type, tool.weight, tool.stock, tool.info],
    )?;
    let tool_id = conn.last_insert_rowid();
    add_tool_photos(conn, tool_id, photos)?;
    Ok(tool_id)
}

pub fn get_tool(conn: &Connection, tool_id: i64) -> Result<Option<Tool>> {
    conn.query_row(
        &format!("SELECT {} FROM tools WHERE id = ?1", TOOL_COLUMNS),
        params![tool_id],
        tool_from_row,
    )
    .optional()
}

/// All tools ordered by name.
pub fn list_tools(conn: &Connection) -> Result<Vec<Tool>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM tools ORDER BY name COLLATE NOCASE, id", TOOL_COLUMNS))?;
    let rows = stmt.query_map([], tool_from_row)?;
    rows.collect()
}

/// Overwrites every editable field. Returns the number of updated rows.
pub fn update_tool(conn: &Connection, tool: &Tool) -> Result<usize> {
    conn.execute(
        "UPDATE tools SET name = ?1, brand = ?2, product_type = ?3, weight = ?4, stock = ?5, info = ?6,
         updated_at = CURRENT_TIMESTAMP WHERE id = ?7",
        params![tool.name, tool.brand, tool.product_type, tool.weight, tool.stock, tool.info, tool.id],
    )
}

/// Appends photos after the tool's existing ones.
pub fn add_tool_photos(conn: &Connection, tool_id: i64, photos: &[PhotoRef]) -> Result<()> {
    let next_position: i64 = conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM tool_photos WHERE tool_id = ?1",
        params![tool_id],
        |row| row.get(0),
    )?;
    let mut stmt =
        conn.prepare("INSERT INTO tool_photos (tool_id, file_id, file_unique_id, position) VALUES (?1, ?2, ?3, ?4)")?;
    for (offset, photo) in (0_i64..).zip(photos) {
        stmt.execute(params![tool_id, photo.file_id, photo.file_unique_id, next_position + offset])?;
    }
    Ok(())
}

/// Photos of a tool in upload order.
pub fn get_tool_photos(conn: &Connection, tool_id: i64) -> Result<Vec<PhotoRef>> {
    let mut stmt =
        conn.prepare("SELECT file_id, file_unique_id FROM tool_photos WHERE tool_id = ?1 ORDER BY position, id")?;
    let rows = stmt.query_map(params![tool_id], |row| {
        Ok(PhotoRef {
            file_id: row.get(0)?,
            file_unique_id: row.get(1)?,
            media_group_id: None,
        })
    })?;
    rows.collect()
}
