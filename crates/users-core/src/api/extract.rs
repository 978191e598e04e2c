//! Extractors for API handlers.

use axum::{
    async_trait,
    body::{self, Body},
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use iotp_auth_core::bearer_token;
use serde::de::DeserializeOwned;

use super::error::ApiError;
use super::ApiState;
use crate::types::Principal;

/// Request bodies on this API are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Principal named by a valid `Authorization: Bearer` access token.
///
/// Rejects with 401 when the header is missing, the token does not verify as
/// an access token, or the principal no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

#[async_trait]
impl FromRequestParts<ApiState> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &ApiState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

        let principal = state.auth_service.authenticate_bearer(token).await?;
        Ok(CurrentPrincipal(principal))
    }
}

/// JSON body whose rejections use the API's `{error, detail}` shape.
///
/// Malformed JSON and a missing `Content-Type: application/json` are 400s;
/// well-formed JSON of the wrong shape is a 422.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Like [`ApiJson`] but an empty body yields `None`.
///
/// Only an empty (or whitespace) body counts as absent. A non-empty body must
/// still be valid JSON sent as `application/json`.
#[derive(Debug, Clone)]
pub struct OptionalJson<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {}", e)))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalJson(None));
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        Ok(OptionalJson(Some(value)))
    }
}
