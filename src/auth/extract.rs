use std::sync::Arc;

use anyhow::anyhow;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::token::TokenKeys;
use crate::errors::ApiError;
use crate::models::user::Role;

/// Authenticated caller, extracted from the bearer token. Requires the
/// `TokenKeys` extension layered onto the router.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let keys = parts
            .extensions
            .get::<Arc<TokenKeys>>()
            .cloned()
            .ok_or_else(|| ApiError::Internal(anyhow!("Token keys missing from extensions")))?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Authorization token required".to_string()))?;

        // Accept both "Bearer <token>" and a raw token
        let token = header_value.strip_prefix("Bearer ").unwrap_or(header_value);

        let claims = keys
            .verify(token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: claims.uid,
            email: claims.sub,
            role: claims.role,
        })
    }
}

/// Caller holding the admin role. Non-admins are rejected with 403 before
/// the handler runs.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
