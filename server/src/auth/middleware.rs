//! Authentication middleware.
//!
//! Clients send `Authorization: Bearer <user_id>.<secret>`. With no
//! `AUTH_SECRET` configured every request is let through anonymously.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tote_engine::UserId;

use crate::error::{AppError, Result};
use crate::AppState;

/// Caller identity extracted from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// `None` when auth is disabled.
    pub user_id: Option<UserId>,
}

impl AuthUser {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// Check that the caller may touch `owner`'s document.
    pub fn authorize(&self, owner: &str) -> Result<()> {
        match &self.user_id {
            None => Ok(()),
            Some(user_id) if user_id == owner => Ok(()),
            Some(user_id) => {
                tracing::warn!(caller = %user_id, owner = %owner, "Cross-user document access");
                Err(AppError::Forbidden)
            }
        }
    }
}

/// Resolve the caller from an `Authorization` header value.
pub fn authenticate(header: Option<&str>, secret: Option<&str>) -> Result<AuthUser> {
    let Some(secret) = secret else {
        return Ok(AuthUser::anonymous());
    };

    let header = header.ok_or(AppError::Unauthorized("Missing authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized("Invalid authorization header format"))?;

    // User ids may contain dots; the secret is everything after the last one.
    let (user_id, presented) = token
        .rsplit_once('.')
        .ok_or(AppError::Unauthorized("Malformed bearer token"))?;

    if user_id.is_empty() || presented != secret {
        return Err(AppError::Unauthorized("Invalid bearer token"));
    }

    Ok(AuthUser {
        user_id: Some(user_id.to_string()),
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        authenticate(header, state.config.auth_secret.as_deref())
    }
}
