//! `/auth` handlers: registration, login and streaming credentials.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, CurrentPrincipal, OptionalJson};
use crate::api::ApiState;
use crate::auth::AuthenticationResult;
use crate::types::{LoginRequest, RegisterRequest, StreamTokenRequest};

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl From<AuthenticationResult> for TokenResponse {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            access_token: result.access_token,
            token_type: "bearer",
            expires_in: result.expires_in.as_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StreamTokenResponse {
    pub websocket_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub subscription_topics: Vec<String>,
    pub publish_topics: Vec<String>,
    pub user_id: i64,
    pub device_id: Option<String>,
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let result = state.auth_service.register(request).await?;
    Ok(Json(result.into()))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<ApiState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let result = state.auth_service.login(request).await?;
    Ok(Json(result.into()))
}

/// `POST /auth/stream/token`
///
/// Issues a credential bound to one owned device. Only a request that names
/// no device (empty body, `{}` or a null/empty `device_id`) can get the
/// wildcard grant, and only when it has been enabled in configuration. A body
/// that fails to parse is rejected, never read as "no device".
pub async fn stream_token(
    State(state): State<ApiState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    OptionalJson(request): OptionalJson<StreamTokenRequest>,
) -> ApiResult<Json<StreamTokenResponse>> {
    let request = request.unwrap_or_default();
    let service = &state.auth_service;

    let issued = match request.device_id.filter(|id| !id.is_empty()) {
        Some(device_id) => service.issue_stream_credential(&principal, &device_id).await?,
        None if service.legacy_grant_enabled() => service.issue_legacy_stream_credential(&principal)?,
        None => return Err(ApiError::validation("device_id is required")),
    };

    let claims = issued.claims;
    Ok(Json(StreamTokenResponse {
        websocket_token: issued.token,
        token_type: "websocket",
        expires_in: claims.exp.saturating_sub(claims.iat),
        device_id: claims.scope.device_id().map(str::to_string),
        subscription_topics: claims.subscribe_topics,
        publish_topics: claims.publish_topics,
        user_id: claims.user_id,
    }))
}
