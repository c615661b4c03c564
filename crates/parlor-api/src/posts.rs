use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use parlor_types::api::{CreateCommentRequest, CreatePostRequest, UserIdRequest};

use crate::auth::AppState;
use crate::convert;
use crate::error::ApiError;

/// Feed and post reads are always relative to a viewer: the liked/saved
/// flags depend on who is asking.
#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub user_id: i64,
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.create_post(
            req.user_id,
            req.content.as_deref(),
            req.image_url.as_deref(),
            req.video_url.as_deref(),
        )
    })
    .await
    .map_err(ApiError::join)??;

    Ok((StatusCode::CREATED, Json(convert::post(row)?)))
}

pub async fn feed(
    State(state): State<AppState>,
    Query(query): Query<ViewerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.feed(query.user_id))
        .await
        .map_err(ApiError::join)??;

    let posts = rows
        .into_iter()
        .map(convert::post)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(posts))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.create_comment(post_id, req.user_id, &req.content)
    })
    .await
    .map_err(ApiError::join)??;

    Ok((StatusCode::CREATED, Json(convert::comment(row)?)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.comments_for_post(post_id))
        .await
        .map_err(ApiError::join)??;

    let comments = rows
        .into_iter()
        .map(convert::comment)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(comments))
}

pub async fn like(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(req): Json<UserIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    set_liked(state, post_id, req.user_id, true).await
}

pub async fn unlike(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(req): Json<UserIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    set_liked(state, post_id, req.user_id, false).await
}

/// like/unlike are one setter underneath; repeating either is a no-op.
async fn set_liked(
    state: AppState,
    post_id: i64,
    user_id: i64,
    desired: bool,
) -> Result<Json<serde_json::Value>, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.set_liked(post_id, user_id, desired))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn toggle_save(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(req): Json<UserIdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let saved = tokio::task::spawn_blocking(move || db.db.toggle_save(post_id, req.user_id))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(serde_json::json!({ "saved": saved })))
}
