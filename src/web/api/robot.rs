use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::controller::ControlCommand;
use crate::peripheral::AntennaState;
use crate::scan::ScanPlan;
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::Operator;
use crate::web::AppState;
use crate::web::config::Permission;

/// Scan parameters; omitted fields fall back to the configured scan.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ScanRequest {
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub velocity: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueuedResponse {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<ScanPlan>,
}

fn enqueue(state: &AppState, command: ControlCommand) -> ApiResult<(StatusCode, Json<QueuedResponse>)> {
    let plan = match &command {
        ControlCommand::Scan(plan) => Some(*plan),
        _ => None,
    };
    let name = command.name().to_string();
    state.controller.submit(command)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse {
            command: name,
            plan,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/scan",
    request_body = ScanRequest,
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 202, description = "Scan queued", body = QueuedResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 409, description = "Command queue full", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "robot"
)]
pub async fn scan(
    State(state): State<AppState>,
    user: Operator,
    Json(request): Json<ScanRequest>,
) -> ApiResult<(StatusCode, Json<QueuedResponse>)> {
    user.require(Permission::RunScan)?;

    let defaults = state.default_plan;
    let plan = ScanPlan {
        rows: request.rows.unwrap_or(defaults.rows),
        columns: request.columns.unwrap_or(defaults.columns),
        velocity: request.velocity.unwrap_or(defaults.velocity),
    };
    plan.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    log::info!("{} requested a {}x{} scan", user.name, plan.rows, plan.columns);
    enqueue(&state, ControlCommand::Scan(plan))
}

#[utoipa::path(
    post,
    path = "/api/capture",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 202, description = "Capture queued", body = QueuedResponse),
        (status = 409, description = "Command queue full", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "robot"
)]
pub async fn capture(
    State(state): State<AppState>,
    user: Operator,
) -> ApiResult<(StatusCode, Json<QueuedResponse>)> {
    user.require(Permission::Capture)?;
    enqueue(&state, ControlCommand::Capture)
}

#[utoipa::path(
    post,
    path = "/api/photo",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 202, description = "Photo queued", body = QueuedResponse),
        (status = 409, description = "Command queue full", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "robot"
)]
pub async fn photo(
    State(state): State<AppState>,
    user: Operator,
) -> ApiResult<(StatusCode, Json<QueuedResponse>)> {
    user.require(Permission::Capture)?;
    enqueue(&state, ControlCommand::TakePhoto)
}

#[utoipa::path(
    post,
    path = "/api/heading",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 202, description = "Heading read queued", body = QueuedResponse),
        (status = 409, description = "Command queue full", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "robot"
)]
pub async fn heading(
    State(state): State<AppState>,
    user: Operator,
) -> ApiResult<(StatusCode, Json<QueuedResponse>)> {
    user.require(Permission::Capture)?;
    enqueue(&state, ControlCommand::ReadHeading)
}

#[utoipa::path(
    post,
    path = "/api/antenna/{position}",
    params(
        ("position" = String, Path, description = "Antenna position, 0 to 4")
    ),
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 202, description = "Antenna command queued", body = QueuedResponse),
        (status = 400, description = "Unknown antenna position", body = ErrorResponse),
        (status = 409, description = "Command queue full", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "robot"
)]
pub async fn antenna(
    State(state): State<AppState>,
    user: Operator,
    Path(position): Path<String>,
) -> ApiResult<(StatusCode, Json<QueuedResponse>)> {
    user.require(Permission::SendAntenna)?;
    let antenna: AntennaState = position
        .parse()
        .map_err(|e: crate::peripheral::PeripheralError| ApiError::Validation(e.to_string()))?;
    enqueue(&state, ControlCommand::SendAntenna(antenna))
}

#[utoipa::path(
    post,
    path = "/api/stop",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Stop signalled"),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "robot"
)]
pub async fn stop(State(state): State<AppState>, user: Operator) -> ApiResult<StatusCode> {
    user.require(Permission::Stop)?;
    log::warn!("{} requested stop", user.name);
    state.controller.stop();
    Ok(StatusCode::OK)
}
