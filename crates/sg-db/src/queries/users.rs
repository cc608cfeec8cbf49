//! User operations.

use chrono::Utc;
use rusqlite::Connection;
use sg_core::{Error, Result, UserId};

use crate::models::User;

/// Create a new user and return it.
pub fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: &str,
    is_premium: bool,
) -> Result<User> {
    let id = UserId::new();
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO users (id, username, password_hash, role, is_premium, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![id.to_string(), username, password_hash, role, is_premium, created_at],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("Username '{username}' already exists"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(User {
        id,
        username: username.to_string(),
        password_hash: password_hash.to_string(),
        role: role.to_string(),
        is_premium,
        created_at,
    })
}

fn get_user_where(conn: &Connection, clause: &str, value: &str) -> Result<Option<User>> {
    let q = format!("SELECT {} FROM users WHERE {clause} = ?1", User::COLS);
    match conn.query_row(&q, [value], User::from_row) {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user by primary key.
pub fn get_user_by_id(conn: &Connection, id: UserId) -> Result<Option<User>> {
    get_user_where(conn, "id", &id.to_string())
}

/// Get a user by username.
pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    get_user_where(conn, "username", username)
}

/// Grant or revoke premium entitlement.
pub fn set_premium(conn: &Connection, id: UserId, is_premium: bool) -> Result<bool> {
    let n = conn
        .execute(
            "UPDATE users SET is_premium = ?1 WHERE id = ?2",
            rusqlite::params![is_premium, id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
