use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims issued at registration/login. Canonical definition lives here
/// in parlor-types so the API layer and any token-consuming tooling agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub user_id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// A post as the client sees it: annotated with author username, aggregate
/// counts, and the requesting user's liked/saved flags.
#[derive(Debug, Serialize)]
pub struct PostResponse {
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
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub user_id: i64,
    pub content: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomRequest {
    pub user1_id: i64,
    pub user2_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub room_id: i64,
    pub sender_id: i64,
    pub message: String,
}

/// Body shared by the endpoints that act on behalf of a user and carry
/// nothing else: mark-read, like, unlike, toggle-save.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserIdRequest {
    pub user_id: i64,
}

// -- Polls --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePollRequest {
    pub user_id: i64,
    pub question: String,
    pub options: Vec<PollOptionInput>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollOptionInput {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub user_id: i64,
    pub option_id: i64,
}

/// Aggregated poll state from one viewer's perspective.
///
/// Percentages are rounded independently per option and are not guaranteed
/// to sum to 100; clients render each option on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollView {
    pub id: i64,
    pub question: String,
    pub options: Vec<PollOptionView>,
    pub total_votes: i64,
    pub user_has_voted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOptionView {
    pub id: i64,
    pub text: String,
    pub votes_count: i64,
    pub percentage: i64,
    pub user_voted: bool,
}
