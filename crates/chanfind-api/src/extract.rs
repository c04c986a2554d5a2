//! Shared handler state and request principal extraction.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use chanfind_core::Principal;

use crate::config::UserDirectory;
use crate::error::ApiError;
use crate::services::{ChannelService, PropertyService, TagService};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub channels: ChannelService,
    pub properties: PropertyService,
    pub tags: TagService,
    pub users: UserDirectory,
}

impl AppState {
    pub fn new(
        channels: ChannelService,
        properties: PropertyService,
        tags: TagService,
        users: UserDirectory,
    ) -> Self {
        Self {
            channels,
            properties,
            tags,
            users,
        }
    }
}

/// The authenticated principal of a request.
///
/// Credentials arrive as HTTP Basic auth; the user name is resolved against
/// the configured directory for group membership. Requests without an
/// Authorization header proceed as the anonymous principal, which holds no
/// groups and therefore passes no role gate. Password verification is
/// delegated to the fronting proxy.
pub struct Caller(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Caller(Principal::anonymous()));
        };

        let value = header
            .to_str()
            .map_err(|_| ApiError::BadRequest("malformed Authorization header".to_string()))?;
        let encoded = value.strip_prefix("Basic ").ok_or_else(|| {
            ApiError::Unauthorized("only Basic authentication is supported".to_string())
        })?;

        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|_| ApiError::Unauthorized("invalid Basic credentials".to_string()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| ApiError::Unauthorized("invalid Basic credentials".to_string()))?;
        let (name, _password) = decoded
            .split_once(':')
            .ok_or_else(|| ApiError::Unauthorized("invalid Basic credentials".to_string()))?;
        if name.is_empty() {
            return Err(ApiError::Unauthorized(
                "invalid Basic credentials".to_string(),
            ));
        }

        Ok(Caller(state.users.resolve(name)))
    }
}
