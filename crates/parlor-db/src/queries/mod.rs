pub mod chat;
pub mod polls;
pub mod posts;
pub mod users;

use crate::StoreError;
use rusqlite::Connection;

pub(crate) fn user_exists(conn: &Connection, user_id: i64) -> Result<bool, StoreError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE id = ?1",
        [user_id],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

pub(crate) fn post_exists(conn: &Connection, post_id: i64) -> Result<bool, StoreError> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM posts WHERE id = ?1",
        [post_id],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

/// Shorthand for the check-then-fail pattern every mutation starts with.
pub(crate) fn require_user(conn: &Connection, user_id: i64) -> Result<(), StoreError> {
    if user_exists(conn, user_id)? {
        Ok(())
    } else {
        Err(StoreError::NotFound("user"))
    }
}

pub(crate) fn require_post(conn: &Connection, post_id: i64) -> Result<(), StoreError> {
    if post_exists(conn, post_id)? {
        Ok(())
    } else {
        Err(StoreError::NotFound("post"))
    }
}
