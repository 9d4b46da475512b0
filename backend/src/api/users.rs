//! User API handlers

use crate::api::utils::{bearer_token, MessageResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Request to confirm a user
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmUserRequest {
    /// Login name
    #[serde(default)]
    pub username: Option<String>,
}

/// Response for logout
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    /// Human-readable message
    pub message: String,
    /// Always true; a stale token counts as logged out
    pub success: bool,
}

/// POST /api/users/confirm - Mark a registered user as confirmed
pub async fn confirm_user(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmUserRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(request) = payload?;
    let username = request
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("username not set".to_string()))?;

    if !state.db.confirm_user(username).await? {
        return Err(AppError::NotFound(format!("User {} not found", username)));
    }

    info!(username, "User confirmed");
    Ok(Json(MessageResponse::new("User confirmed")))
}

/// POST /api/users/logout - Revoke every session of the calling user
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Validation("Missing Authorization header".to_string()))?;

    let message = if state.db.global_sign_out(&token).await? {
        info!("User logged out of all sessions");
        "Successfully logged out"
    } else {
        warn!("Logout with unknown or revoked token");
        "Already logged out"
    };

    Ok(Json(LogoutResponse {
        message: message.to_string(),
        success: true,
    }))
}
