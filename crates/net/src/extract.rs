//! Bearer-token extractors
//!
//! The token is a session id issued at login. `AuthUser` requires one,
//! `MaybeUser` accepts anonymous requests, `AdminUser` requires the admin role.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use playzone_core::{User, UserRepository};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

/// Token from an `Authorization: Bearer <token>` header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a token to an active user
fn resolve_user(state: &ApiState, token: &str) -> ApiResult<User> {
    let invalid = || ApiError::Unauthorized("Token is not valid".into());
    let session_id = Uuid::parse_str(token).map_err(|_| invalid())?;

    let user = state.with_db(|db| {
        let Some(session) = db.find_valid_session(session_id)? else {
            return Ok(None);
        };
        db.find_user_by_id(session.user_id)
    })?;

    match user {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(ApiError::Unauthorized("Account is disabled".into())),
        None => Err(invalid()),
    }
}

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ApiState::from_ref(state);
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".into()))?;
        resolve_user(&state, token).map(AuthUser)
    }
}

/// Caller if a valid token was sent; a bad token reads as anonymous
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ApiState::from_ref(state);
        let user = match bearer_token(&parts.headers) {
            Some(token) => match resolve_user(&state, token) {
                Ok(user) => Some(user),
                Err(ApiError::Unauthorized(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        Ok(MaybeUser(user))
    }
}

/// Authenticated caller with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.is_admin() {
            Ok(AdminUser(user))
        } else {
            Err(ApiError::Forbidden("Admin access required".into()))
        }
    }
}
