//! Handlers for `/resources/properties`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use chanfind_core::Property;

use crate::error::ApiError;
use crate::extract::{AppState, Caller};

#[derive(Debug, Deserialize)]
pub struct ReadParams {
    /// Populate the denormalized bearing-channel list. Defaults to true.
    #[serde(default = "super::default_with_channels", rename = "withChannels")]
    pub with_channels: bool,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list().await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path(property_name): Path<String>,
    Query(params): Query<ReadParams>,
) -> Result<Json<Property>, ApiError> {
    let property = state
        .properties
        .read(&property_name, params.with_channels)
        .await?;
    Ok(Json(property))
}

pub async fn create(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(property_name): Path<String>,
    Json(payload): Json<Property>,
) -> Result<Json<Property>, ApiError> {
    let property = state
        .properties
        .create(&principal, &property_name, payload)
        .await?;
    Ok(Json(property))
}

pub async fn create_multiple(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Json(payloads): Json<Vec<Property>>,
) -> Result<Json<Vec<Property>>, ApiError> {
    let properties = state.properties.create_multiple(&principal, payloads).await?;
    Ok(Json(properties))
}

pub async fn update(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(property_name): Path<String>,
    Json(payload): Json<Property>,
) -> Result<Json<Property>, ApiError> {
    let property = state
        .properties
        .update(&principal, &property_name, payload)
        .await?;
    Ok(Json(property))
}

pub async fn update_multiple(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Json(payloads): Json<Vec<Property>>,
) -> Result<Json<Vec<Property>>, ApiError> {
    let properties = state.properties.update_multiple(&principal, payloads).await?;
    Ok(Json(properties))
}

pub async fn add_single(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path((property_name, channel_name)): Path<(String, String)>,
) -> Result<Json<Property>, ApiError> {
    let property = state
        .properties
        .add_single(&principal, &property_name, &channel_name)
        .await?;
    Ok(Json(property))
}

pub async fn remove(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path(property_name): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.properties.remove(&principal, &property_name).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_single(
    State(state): State<AppState>,
    Caller(principal): Caller,
    Path((property_name, channel_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .properties
        .remove_single(&principal, &property_name, &channel_name)
        .await?;
    Ok(StatusCode::OK)
}
