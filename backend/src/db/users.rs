//! User directory operations
//!
//! Users, sign-up confirmation and access-token sessions.

use super::models::{format_timestamp, User};
use super::Database;
use crate::error::AppError;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

impl Database {
    /// Create an unconfirmed user
    pub async fn create_user(&self, username: &str) -> Result<User, AppError> {
        let user = User {
            username: username.to_string(),
            user_id: Uuid::new_v4().to_string(),
            confirmed: false,
            created_at: format_timestamp(Utc::now()),
        };

        sqlx::query("INSERT INTO users (username, user_id, confirmed, created_at) VALUES (?, ?, ?, ?)")
            .bind(&user.username)
            .bind(&user.user_id)
            .bind(user.confirmed)
            .bind(&user.created_at)
            .execute(self.pool())
            .await?;

        info!(username = %user.username, user_id = %user.user_id, "Created user");
        Ok(user)
    }

    /// Look up a user by username
    pub async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT username, user_id, confirmed, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    /// Mark a user's sign-up as confirmed
    ///
    /// Returns false when the user does not exist. Confirming twice is a no-op.
    pub async fn confirm_user(&self, username: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET confirmed = 1 WHERE username = ?")
            .bind(username)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Issue a new access token for a confirmed user
    pub async fn create_session(&self, username: &str) -> Result<String, AppError> {
        let user = self
            .get_user(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {}", username)))?;

        if !user.confirmed {
            return Err(AppError::Validation(format!(
                "User is not confirmed: {}",
                username
            )));
        }

        let token = Uuid::new_v4().simple().to_string();
        sqlx::query(
            "INSERT INTO sessions (access_token, user_id, created_at, revoked) VALUES (?, ?, ?, 0)",
        )
        .bind(&token)
        .bind(&user.user_id)
        .bind(format_timestamp(Utc::now()))
        .execute(self.pool())
        .await?;

        debug!(user_id = %user.user_id, "Issued session");
        Ok(token)
    }

    /// Resolve an access token to its user id, if the session is active
    pub async fn resolve_session(&self, token: &str) -> Result<Option<String>, AppError> {
        let user_id = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM sessions WHERE access_token = ? AND revoked = 0",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await?;

        Ok(user_id)
    }

    /// Revoke every session of the user owning `token`
    ///
    /// Returns false when the token is unknown or already revoked.
    pub async fn global_sign_out(&self, token: &str) -> Result<bool, AppError> {
        let Some(user_id) = self.resolve_session(token).await? else {
            return Ok(false);
        };

        let result = sqlx::query("UPDATE sessions SET revoked = 1 WHERE user_id = ? AND revoked = 0")
            .bind(&user_id)
            .execute(self.pool())
            .await?;

        info!(user_id = %user_id, revoked = result.rows_affected(), "Signed out user");
        Ok(true)
    }
}
