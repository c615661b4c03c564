use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use parlor_types::api::{CreatePollRequest, VoteRequest};

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    /// Without a viewer the user_voted flags all come back false.
    pub user_id: Option<i64>,
}

pub async fn create_poll(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Json(req): Json<CreatePollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let options: Vec<String> = req.options.into_iter().map(|o| o.text).collect();

    let db = state.clone();
    let poll_id = tokio::task::spawn_blocking(move || {
        db.db.create_poll(post_id, req.user_id, &req.question, &options)
    })
    .await
    .map_err(ApiError::join)??;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "poll_id": poll_id })),
    ))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.cast_vote(poll_id, req.option_id, req.user_id))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn fetch_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<i64>,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let view = tokio::task::spawn_blocking(move || db.db.fetch_poll(poll_id, query.user_id))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(view))
}
