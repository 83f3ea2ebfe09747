//! Bearer API-key authentication for the operator API.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashSet;

use super::api::error::ErrorResponse;
use super::config::Permission;
use super::AppState;

/// The operator behind a request, resolved from its API key.
#[derive(Debug, Clone)]
pub struct Operator {
    pub name: String,
    permissions: HashSet<Permission>,
}

impl Operator {
    pub fn require(&self, permission: Permission) -> Result<(), PermissionError> {
        if self.permissions.contains(&permission) {
            return Ok(());
        }
        log::warn!("Operator {} lacks permission {:?}", self.name, permission);
        Err(PermissionError {
            operator: self.name.clone(),
            permission,
        })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingHeader,
    NotBearer,
    UnknownKey,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingHeader => "missing Authorization header",
            AuthError::NotBearer => "expected 'Authorization: Bearer <key>'",
            AuthError::UnknownKey => "unknown API key",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::with_message("unauthorized", message)),
        )
            .into_response()
    }
}

#[derive(Debug)]
pub struct PermissionError {
    operator: String,
    permission: Permission,
}

impl IntoResponse for PermissionError {
    fn into_response(self) -> Response {
        let message = format!("{} may not {:?}", self.operator, self.permission);
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::with_message("forbidden", &message)),
        )
            .into_response()
    }
}

fn bearer_key(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AuthError::NotBearer)
}

impl FromRequestParts<AppState> for Operator {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = bearer_key(parts)?;
        let api_key = state.config.find_api_key(key).ok_or(AuthError::UnknownKey)?;
        log::debug!("{} {} by {}", parts.method, parts.uri.path(), api_key.name);

        Ok(Operator {
            name: api_key.name.clone(),
            permissions: api_key.permissions.clone(),
        })
    }
}
