//! Handlers for `/resources/tags`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use chanfind_core::Tag;

use crate::error::ApiError;
use crate::extract::{AppState, Caller};

#[derive(Debug, Deserialize)]
pub struct ReadParams {
    #[serde(default = "super::default_with_channels", rename = "withChannels")]
    pub with_channels: bool,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tags.list().await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path(tag_name): Path<String>,
    Query(params): Query<ReadParams>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state.tags.read(&tag_name, params.with_channels).await?;
    Ok(Json(tag))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(tag_name): Path<String>,
    Json(payload): Json<Tag>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state.tags.create(&principal, &tag_name, payload).await?;
    Ok(Json(tag))
}

pub async fn create_multiple(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Json(payloads): Json<Vec<Tag>>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.tags.create_multiple(&principal, payloads).await?;
    Ok(Json(tags))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(tag_name): Path<String>,
    Json(payload): Json<Tag>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state.tags.update(&principal, &tag_name, payload).await?;
    Ok(Json(tag))
}

pub async fn update_multiple(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Json(payloads): Json<Vec<Tag>>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.tags.update_multiple(&principal, payloads).await?;
    Ok(Json(tags))
}

pub async fn add_single(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path((tag_name, channel_name)): Path<(String, String)>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state
        .tags
        .add_single(&principal, &tag_name, &channel_name)
        .await?;
    Ok(Json(tag))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(tag_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tags.remove(&principal, &tag_name).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_single(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path((tag_name, channel_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .tags
        .remove_single(&principal, &tag_name, &channel_name)
        .await?;
    Ok(StatusCode::OK)
}
