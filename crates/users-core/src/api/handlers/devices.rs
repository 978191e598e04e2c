//! `/devices` handlers. Every lookup is scoped to the calling principal.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, CurrentPrincipal};
use crate::api::ApiState;
use crate::types::{CreateDeviceRequest, Device};

#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<Device>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// `GET /devices`
pub async fn list(
    State(state): State<ApiState>,
    CurrentPrincipal(principal): CurrentPrincipal,
) -> ApiResult<Json<DeviceListResponse>> {
    let devices = state.auth_service.list_devices(&principal).await?;
    Ok(Json(DeviceListResponse {
        total: devices.len(),
        devices,
    }))
}

/// `POST /devices`
pub async fn create(
    State(state): State<ApiState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    ApiJson(request): ApiJson<CreateDeviceRequest>,
) -> ApiResult<Json<Device>> {
    let device = state.auth_service.create_device(&principal, request).await?;
    Ok(Json(device))
}

/// `GET /devices/:id`
pub async fn get(
    State(state): State<ApiState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<Device>> {
    let device = state.auth_service.get_device(&principal, id).await?;
    Ok(Json(device))
}

/// `DELETE /devices/:id`
pub async fn delete(
    State(state): State<ApiState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    let device = state.auth_service.delete_device(&principal, id).await?;
    Ok(Json(MessageResponse {
        message: format!("Device {} deleted successfully", device.name),
    }))
}
