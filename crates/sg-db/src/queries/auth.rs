//! Session tokens.
//!
//! Expiry timestamps are RFC 3339 strings in UTC, so lexical comparison in
//! SQL orders them correctly. Entitlement is read through the token on every
//! request, so a premium grant or revocation applies immediately.

use rusqlite::{Connection, OptionalExtension};
use sg_core::{Error, Result, SessionId, UserEntitlement, UserId};

use crate::models::{AuthToken, User};

/// Store a freshly issued session token for `user_id`.
pub fn create_token(
    conn: &Connection,
    user_id: UserId,
    token: &str,
    expires_at: &str,
) -> Result<AuthToken> {
    let session = AuthToken {
        id: SessionId::new(),
        user_id,
        token: token.to_string(),
        expires_at: expires_at.to_string(),
    };

    conn.execute(
        "INSERT INTO auth_tokens (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            session.id.to_string(),
            session.user_id.to_string(),
            session.token,
            session.expires_at
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(session)
}

/// Entitlement of the user owning `token`, if the token is live at `now`.
pub fn session_entitlement(
    conn: &Connection,
    token: &str,
    now: &str,
) -> Result<Option<UserEntitlement>> {
    let q = format!(
        "SELECT {} FROM users WHERE id = \
         (SELECT user_id FROM auth_tokens WHERE token = ?1 AND expires_at > ?2)",
        User::COLS
    );
    let user = conn
        .query_row(&q, [token, now], User::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(user.map(|u| u.entitlement()))
}

/// Revoke a token. Returns whether it existed.
pub fn delete_token(conn: &Connection, token: &str) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM auth_tokens WHERE token = ?1", [token])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Drop every token that expired at or before `now`.
pub fn delete_expired_tokens(conn: &Connection, now: &str) -> Result<usize> {
    conn.execute("DELETE FROM auth_tokens WHERE expires_at <= ?1", [now])
        .map_err(|e| Error::database(e.to_string()))
}
