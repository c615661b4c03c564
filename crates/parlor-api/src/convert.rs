//! Row-to-wire conversion. The DB layer hands timestamps back as the TEXT
//! SQLite stored; they become chrono values here, at the boundary, and
//! corrupt values surface as errors instead of silently zero-filled dates.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::error;

use parlor_db::models::{CommentRow, MessageRow, PostRow, RoomRow};
use parlor_types::api::PostResponse;
use parlor_types::models::{ChatMessage, ChatRoom, Comment};

use crate::error::ApiError;

/// SQLite's `datetime('now')` produces "YYYY-MM-DD HH:MM:SS" without a
/// timezone; RFC 3339 is accepted too for rows written by other tooling.
pub fn timestamp(s: &str) -> Result<DateTime<Utc>, ApiError> {
    s.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            error!("corrupt timestamp '{s}': {e}");
            ApiError::Internal
        })
}

pub fn room(row: RoomRow) -> Result<ChatRoom, ApiError> {
    Ok(ChatRoom {
        id: row.id,
        user1_id: row.user_a_id,
        user2_id: row.user_b_id,
        created_at: timestamp(&row.created_at)?,
        last_message_at: timestamp(&row.last_message_at)?,
    })
}

pub fn message(row: MessageRow) -> Result<ChatMessage, ApiError> {
    Ok(ChatMessage {
        id: row.id,
        room_id: row.room_id,
        sender_id: row.sender_id,
        message: row.message,
        is_read: row.is_read,
        created_at: timestamp(&row.created_at)?,
    })
}

pub fn comment(row: CommentRow) -> Result<Comment, ApiError> {
    Ok(Comment {
        id: row.id,
        post_id: row.post_id,
        author_id: row.author_id,
        author_username: row.author_username,
        content: row.content,
        created_at: timestamp(&row.created_at)?,
    })
}

pub fn post(row: PostRow) -> Result<PostResponse, ApiError> {
    Ok(PostResponse {
        id: row.id,
        author_id: row.author_id,
        author_username: row.author_username,
        content: row.content,
        image_url: row.image_url,
        video_url: row.video_url,
        likes_count: row.likes_count,
        comments_count: row.comments_count,
        liked: row.liked,
        saved: row.saved,
        created_at: timestamp(&row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::timestamp;

    #[test]
    fn parses_sqlite_and_rfc3339_formats() {
        let t = timestamp("2026-08-07 12:30:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2026-08-07T12:30:00+00:00");

        assert!(timestamp("2026-08-07T12:30:00Z").is_ok());
    }

    #[test]
    fn corrupt_timestamp_is_an_error() {
        assert!(timestamp("yesterday-ish").is_err());
        assert!(timestamp("").is_err());
    }
}
