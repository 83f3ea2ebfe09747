use axum::{extract::State, Json};

use crate::controller::ControllerStatus;
use crate::peripheral::ConnectivityStatus;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::Operator;
use crate::web::AppState;

#[utoipa::path(
    get,
    path = "/api/status",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Controller status", body = ControllerStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "status"
)]
pub async fn controller(
    State(state): State<AppState>,
    _user: Operator,
) -> ApiResult<Json<ControllerStatus>> {
    Ok(Json(state.controller.status()))
}

#[utoipa::path(
    get,
    path = "/api/connectivity",
    security(
        ("api_key" = [])
    ),
    responses(
        (status = 200, description = "Peripheral connectivity", body = ConnectivityStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "status"
)]
pub async fn connectivity(
    State(state): State<AppState>,
    _user: Operator,
) -> ApiResult<Json<ConnectivityStatus>> {
    let status = state.connectivity.borrow().clone();
    Ok(Json(status))
}
