use rusqlite::{params, Connection, OptionalExtension, Result, Row};

/// A Telegram user known to the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
    /// Student number (NIM)
    pub nim: Option<String>,
    /// Batch (angkatan) year
    pub batch_year: Option<i32>,
    /// Set once the registration flow is confirmed
    pub registered: bool,
    pub created_at: String,
}

impl User {
    /// Name used in staff notifications.
    pub fn display_name(&self) -> String {
        match (&self.name, &self.username) {
            (Some(name), _) => name.clone(),
            (None, Some(username)) => format!("@{}", username),
            (None, None) => self.telegram_id.to_string(),
        }
    }
}

fn user_from_row(row: &Row<'_>) -> Result<User> {
    Ok(User {
        telegram_id: row.get(0)?,
        username: row.get(1)?,
        name: row.get(2)?,
        nim: row.get(3)?,
        batch_year: row.get(4)?,
        registered: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
    })
}

pub fn get_user(conn: &Connection, telegram_id: i64) -> Result<Option<User>> {
    conn.query_row(
        "SELECT telegram_id, username, name, nim, batch_year, registered, created_at FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        user_from_row,
    )
    .optional()
}

/// Inserts the user on first contact and keeps the username current.
pub fn ensure_user(conn: &Connection, telegram_id: i64, username: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT INTO users (telegram_id, username) VALUES (?1, ?2)
         ON CONFLICT(telegram_id) DO UPDATE SET username = COALESCE(excluded.username, users.username)",
        params![telegram_id, username],
    )?;
    Ok(())
}

/// Stores the confirmed registration. Returns the number of updated rows.
pub fn register_user(conn: &Connection, telegram_id: i64, name: &str, nim: &str, batch_year: i32) -> Result<usize> {
    conn.execute(
        "UPDATE users SET name = ?1, nim = ?2, batch_year = ?3, registered = 1 WHERE telegram_id = ?4",
        params![name, nim, batch_year, telegram_id],
    )
}
