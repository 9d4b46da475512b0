//! Request authentication
//!
//! Resolves the bearer token on a request to the user it was issued to.

use crate::api::utils::bearer_token;
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Authenticated caller, extracted from the `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Subject id of the caller
    pub user_id: String,
}

impl AuthUser {
    /// Create an authenticated user
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

fn unauthenticated() -> AppError {
    AppError::Unauthorized("User not authenticated.".to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(unauthenticated)?;
        let user_id = state
            .db
            .resolve_session(&token)
            .await?
            .ok_or_else(unauthenticated)?;

        tracing::debug!(user_id = %user_id, "Authenticated request");
        Ok(AuthUser { user_id })
    }
}
