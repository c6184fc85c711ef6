/// Workspace team management
///
/// - `GET /v1/users` (`user:read`)
/// - `PATCH /v1/users/:id` (`user:manage`): hourly rate and role
///
/// Changing a rate only affects entries logged afterwards; existing entries
/// keep their snapshot.

use super::double_option;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use invisible_pm_shared::{
    auth::{
        authorization::{require_permission, Permission, Role},
        middleware::AuthContext,
    },
    models::{
        audit_log::{AuditAction, AuditLog, NewAuditLog},
        membership::{Membership, WorkspaceMember},
        user::{UpdateUser, User},
    },
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// `null` clears the rate
    #[serde(default, deserialize_with = "double_option")]
    pub hourly_rate: Option<Option<Decimal>>,

    pub role: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Vec<WorkspaceMember>>> {
    require_permission(&ctx, Permission::UserRead)?;

    let members = Membership::list_members(&state.db, ctx.workspace_id).await?;
    Ok(Json(members))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<WorkspaceMember>> {
    require_permission(&ctx, Permission::UserManage)?;

    if let Some(Some(rate)) = req.hourly_rate {
        if rate < Decimal::ZERO {
            return Err(ApiError::invalid_field(
                "hourly_rate",
                "Hourly rate must be zero or positive",
            ));
        }
    }

    let role = req.role.as_deref().map(str::parse::<Role>).transpose()?;

    if req.hourly_rate.is_none() && role.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    Membership::find_member(&state.db, ctx.workspace_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found in this workspace".to_string()))?;

    let mut changes = Map::new();
    let mut tx = state.db.begin().await?;

    if let Some(rate) = req.hourly_rate {
        User::update(
            &mut *tx,
            user_id,
            UpdateUser {
                hourly_rate: Some(rate),
                ..UpdateUser::default()
            },
        )
        .await?;
        changes.insert("hourly_rate".into(), serde_json::to_value(rate).unwrap_or(Value::Null));
    }

    if let Some(role) = role {
        Membership::update_role(&mut *tx, ctx.workspace_id, user_id, role).await?;
        changes.insert("role".into(), Value::String(role.to_string()));
    }

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "User",
            entity_id: user_id,
            action: AuditAction::Update,
            changes: Some(Value::Object(changes)),
        },
    )
    .await?;

    tx.commit().await?;

    info!(target_user = %user_id, workspace_id = %ctx.workspace_id, "Updated member");

    let member = Membership::find_member(&state.db, ctx.workspace_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found in this workspace".to_string()))?;

    Ok(Json(member))
}
