/// Authentication endpoints
///
/// - `POST /v1/auth/register`: new user, new workspace, Admin membership
/// - `POST /v1/auth/login`: email + password for a token pair
/// - `POST /v1/auth/refresh`: refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use invisible_pm_shared::{
    auth::{
        authorization::Role,
        jwt::{self, TokenPair},
        password,
    },
    models::{
        audit_log::{AuditAction, AuditLog, NewAuditLog},
        membership::{CreateMembership, Membership},
        user::{CreateUser, User},
        workspace::{CreateWorkspace, Workspace},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub full_name: String,

    /// Defaults to "<full_name>'s Workspace"
    #[validate(length(min = 1, max = 255, message = "Workspace name must be 1-255 characters"))]
    pub workspace_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by both register and login
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub role: Role,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// `POST /v1/auth/register`
///
/// User, workspace and membership are created in one transaction.
///
/// # Errors
///
/// - `422`: validation failed
/// - `409`: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    req.validate()?;
    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password(&req.password)?;
    let full_name = req.full_name.trim().to_string();
    let workspace_name = req
        .workspace_name
        .unwrap_or_else(|| format!("{}'s Workspace", full_name));

    let mut tx = state.db.begin().await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            email: req.email,
            password_hash: Some(password_hash),
            full_name,
            hourly_rate: None,
        },
    )
    .await?;

    let workspace = Workspace::create(
        &mut *tx,
        CreateWorkspace {
            name: workspace_name,
            domain: None,
        },
    )
    .await?;

    let membership = Membership::create(
        &mut *tx,
        CreateMembership {
            workspace_id: workspace.id,
            user_id: user.id,
            role: Role::Admin,
        },
    )
    .await?;

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(user.id),
            entity_type: "User",
            entity_id: user.id,
            action: AuditAction::Create,
            changes: Some(json!({ "email": user.email, "workspace_id": workspace.id })),
        },
    )
    .await?;

    tx.commit().await?;

    info!(user_id = %user.id, workspace_id = %workspace.id, "Registered user");

    let tokens = jwt::issue_token_pair(user.id, workspace.id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user_id: user.id,
            workspace_id: workspace.id,
            role: membership.role,
            tokens,
        }),
    ))
}

/// `POST /v1/auth/login`
///
/// Signs into the user's oldest active workspace. Inactive, deleted and
/// SSO-only users get the same `401` as a wrong password.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    let hash = match (&user.password_hash, user.can_login()) {
        (Some(hash), true) => hash,
        _ => return Err(invalid()),
    };

    if !password::verify_password(&req.password, hash)? {
        return Err(invalid());
    }

    let membership = Membership::default_for_user(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User has no workspace membership".to_string()))?;

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, membership.workspace_id, state.jwt_secret())?;

    info!(user_id = %user.id, workspace_id = %membership.workspace_id, "User logged in");

    Ok(Json(SessionResponse {
        user_id: user.id,
        workspace_id: membership.workspace_id,
        role: membership.role,
        tokens,
    }))
}

/// `POST /v1/auth/refresh`
///
/// Refuses to refresh once the membership behind the token is gone.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    if Membership::active_role(&state.db, claims.workspace_id, claims.sub)
        .await?
        .is_none()
    {
        return Err(ApiError::Unauthorized(
            "No active membership in this workspace".to_string(),
        ));
    }

    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer",
    }))
}
