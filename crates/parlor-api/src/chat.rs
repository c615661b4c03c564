use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use parlor_types::api::{CreateRoomRequest, SendMessageRequest, UserIdRequest};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// Get-or-create: the same room comes back no matter which order the client
/// lists the two user ids in.
pub async fn get_or_create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.get_or_create_room(req.user1_id, req.user2_id)
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(convert::room(row)?))
}

pub async fn list_rooms(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.rooms_for_user(user_id))
        .await
        .map_err(ApiError::join)??;

    let rooms = rows
        .into_iter()
        .map(convert::room)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(rooms))
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.send_message(req.room_id, req.sender_id, &req.message)
    })
    .await
    .map_err(ApiError::join)??;

    Ok((StatusCode::CREATED, Json(convert::message(row)?)))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_for_room(room_id))
        .await
        .map_err(ApiError::join)??;

    let messages = rows
        .into_iter()
        .map(convert::message)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(messages))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(room_id): Path<i64>,
    Json(req): Json<UserIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.mark_read(room_id, req.user_id))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let count = tokio::task::spawn_blocking(move || db.db.unread_count(user_id))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(serde_json::json!({ "unread_count": count })))
}
