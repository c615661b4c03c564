//! Database row types — these map directly to SQLite rows.
//! Distinct from the parlor-types wire models to keep the DB layer
//! independent; timestamps stay as the TEXT SQLite hands back and are
//! parsed at the API boundary.

#[derive(Debug)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub created_at: String,
    pub last_login: Option<String>,
}

/// One feed entry: the stored post columns plus the per-viewer annotations
/// (liked/saved) and aggregate counts computed in the same query.
#[derive(Debug)]
pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub liked: bool,
    pub saved: bool,
    pub created_at: String,
}

#[derive(Debug)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct RoomRow {
    pub id: i64,
    pub user_a_id: i64,
    pub user_b_id: i64,
    pub created_at: String,
    pub last_message_at: String,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: i64,
    pub room_id: i64,
    pub sender_id: i64,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct PollRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub question: String,
    pub created_at: String,
}

pub struct PollOptionRow {
    pub id: i64,
    pub poll_id: i64,
    pub option_text: String,
    pub votes_count: i64,
}
