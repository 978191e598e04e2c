//! `/users` handlers.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::error::ApiResult;
use crate::api::extract::CurrentPrincipal;
use crate::api::ApiState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub device_count: i64,
}

/// `GET /users/me`
pub async fn me(
    State(state): State<ApiState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ApiResult<Json<ProfileResponse>> {
    let device_count = state.auth_service.device_count(&principal).await?;

    Ok(Json(ProfileResponse {
        id: principal.id,
        email: principal.email,
        is_admin: principal.is_admin,
        created_at: principal.created_at,
        device_count,
    }))
}
