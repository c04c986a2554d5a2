//! Handlers for `/resources/channels`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use chanfind_core::Channel;

use crate::error::ApiError;
use crate::extract::{AppState, Caller};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, ApiError> {
    Ok(Json(state.channels.list().await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path(channel_name): Path<String>,
) -> Result<Json<Channel>, ApiError> {
    Ok(Json(state.channels.read(&channel_name).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(channel_name): Path<String>,
    Json(payload): Json<Channel>,
) -> Result<Json<Channel>, ApiError> {
    let channel = state
        .channels
        .create(&principal, &channel_name, payload)
        .await?;
    Ok(Json(channel))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(channel_name): Path<String>,
    Json(payload): Json<Channel>,
) -> Result<Json<Channel>, ApiError> {
    let channel = state
        .channels
        .update(&principal, &channel_name, payload)
        .await?;
    Ok(Json(channel))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(channel_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.channels.remove(&principal, &channel_name).await?;
    Ok(StatusCode::OK)
}
