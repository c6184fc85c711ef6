/// Request authentication
///
/// Turns an `Authorization: Bearer <jwt>` header into an [`AuthContext`]:
/// the token names the user and workspace, and the role is read from the
/// live membership row so demotions and removals apply immediately.
///
/// The API crate wires [`authenticate`] into an Axum `from_fn_with_state`
/// layer and inserts the resulting context into request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use invisible_pm_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(ctx): Extension<AuthContext>) -> String {
///     format!("{} acting as {} in {}", ctx.user_id, ctx.role, ctx.workspace_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::authorization::Role;
use super::jwt::{validate_access_token, JwtError};
use crate::models::membership::Membership;

/// Who is calling, in which workspace, with which role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub role: Role,
}

impl AuthContext {
    pub fn new(user_id: Uuid, workspace_id: Uuid, role: Role) -> Self {
        Self {
            user_id,
            workspace_id,
            role,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error(transparent)]
    InvalidToken(#[from] JwtError),

    /// User was removed from the workspace, deactivated or deleted
    #[error("No active membership in this workspace")]
    NoMembership,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Pulls the raw token out of the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Validates the bearer token and resolves the caller's current role
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;

    let role = Membership::active_role(pool, claims.workspace_id, claims.sub)
        .await?
        .ok_or(AuthError::NoMembership)?;

    debug!(user_id = %claims.sub, workspace_id = %claims.workspace_id, %role, "Authenticated request");

    Ok(AuthContext::new(claims.sub, claims.workspace_id, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn test_wrong_scheme_or_empty_token() {
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidFormat)
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AuthError::InvalidFormat)
        ));
    }

    #[test]
    fn test_context_is_copy() {
        let ctx = AuthContext::new(Uuid::new_v4(), Uuid::new_v4(), Role::Pm);
        let copy = ctx;
        assert_eq!(ctx, copy);
    }
}
