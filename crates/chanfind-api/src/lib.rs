//! # chanfind-api
//!
//! HTTP API server for the channel directory: channels, properties, and
//! tags under `/resources`, with HTTP Basic principals and group-based
//! authorization.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod services;

use axum::http::Request;
use axum::routing::{get, put};
use axum::{Json, Router};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub use config::{Config, UserDirectory};
pub use error::ApiError;
pub use extract::{AppState, Caller};
pub use services::{ChannelService, PropertyService, TagService};

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the application router. Middleware is layered on by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Channels
        .route("/resources/channels", get(handlers::channels::list))
        .route(
            "/resources/channels/:channel_name",
            get(handlers::channels::read)
                .put(handlers::channels::create)
                .post(handlers::channels::update)
                .delete(handlers::channels::remove),
        )
        // Properties
        .route(
            "/resources/properties",
            get(handlers::properties::list)
                .put(handlers::properties::create_multiple)
                .post(handlers::properties::update_multiple),
        )
        .route(
            "/resources/properties/:property_name",
            get(handlers::properties::read)
                .put(handlers::properties::create)
                .post(handlers::properties::update)
                .delete(handlers::properties::remove),
        )
        .route(
            "/resources/properties/:property_name/:channel_name",
            put(handlers::properties::add_single).delete(handlers::properties::remove_single),
        )
        // Tags
        .route(
            "/resources/tags",
            get(handlers::tags::list)
                .put(handlers::tags::create_multiple)
                .post(handlers::tags::update_multiple),
        )
        .route(
            "/resources/tags/:tag_name",
            get(handlers::tags::read)
                .put(handlers::tags::create)
                .post(handlers::tags::update)
                .delete(handlers::tags::remove),
        )
        .route(
            "/resources/tags/:tag_name/:channel_name",
            put(handlers::tags::add_single).delete(handlers::tags::remove_single),
        )
        .with_state(state)
}
