/// The caller's own profile
///
/// - `GET /v1/me`
/// - `PATCH /v1/me/password`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use invisible_pm_shared::{
    auth::{authorization::Role, middleware::AuthContext, password},
    models::{
        audit_log::{AuditAction, AuditLog, NewAuditLog},
        user::User,
        workspace::Workspace,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub hourly_rate: Option<Decimal>,
    pub workspace_id: Uuid,
    pub workspace_name: String,
}

/// Both fields are optional so a missing one is a `400`, not a body rejection
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub updated: bool,
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let workspace = Workspace::find_by_id(&state.db, ctx.workspace_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workspace not found".to_string()))?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.full_name,
        role: ctx.role,
        hourly_rate: user.hourly_rate,
        workspace_id: workspace.id,
        workspace_name: workspace.name,
    }))
}

/// `PATCH /v1/me/password`
///
/// # Errors
///
/// - `400`: a field is missing, the new password is too short or long, or
///   the account has no password (SSO only)
/// - `401`: `current_password` is wrong
pub async fn change_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ChangePasswordResponse>> {
    let (Some(current), Some(new)) = (req.current_password, req.new_password) else {
        return Err(ApiError::BadRequest(
            "current_password and new_password are required".to_string(),
        ));
    };

    password::validate_password_strength(&new).map_err(ApiError::BadRequest)?;

    let user = User::find_by_id(&state.db, ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let hash = user.password_hash.as_deref().ok_or_else(|| {
        ApiError::BadRequest("This account has no password configured".to_string())
    })?;

    if !password::verify_password(&current, hash)? {
        return Err(ApiError::Unauthorized("Current password is incorrect".to_string()));
    }

    let new_hash = password::hash_password(&new)?;

    let mut tx = state.db.begin().await?;
    User::set_password_hash(&mut *tx, user.id, &new_hash).await?;
    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "User",
            entity_id: user.id,
            action: AuditAction::Update,
            changes: Some(json!({ "password": "changed" })),
        },
    )
    .await?;
    tx.commit().await?;

    info!(user_id = %user.id, "Password changed");

    Ok(Json(ChangePasswordResponse { updated: true }))
}
