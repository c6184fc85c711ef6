/// Workspace and role listings
///
/// - `GET /v1/workspaces`: every workspace the caller belongs to
/// - `GET /v1/roles`: the four roles and what they may do

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use invisible_pm_shared::{
    auth::{
        authorization::{Permission, Role},
        middleware::AuthContext,
    },
    models::workspace::{MemberWorkspace, Workspace},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct WorkspaceListResponse {
    pub workspaces: Vec<MemberWorkspace>,
    /// The workspace this session is scoped to
    pub current_workspace_id: uuid::Uuid,
}

#[derive(Debug, Serialize)]
pub struct RoleInfo {
    pub name: Role,
    pub description: &'static str,
    pub permissions: &'static [Permission],
}

pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<WorkspaceListResponse>> {
    let workspaces = Workspace::list_for_user(&state.db, ctx.user_id).await?;

    Ok(Json(WorkspaceListResponse {
        workspaces,
        current_workspace_id: ctx.workspace_id,
    }))
}

pub async fn list_roles() -> Json<Vec<RoleInfo>> {
    Json(
        Role::ALL
            .into_iter()
            .map(|role| RoleInfo {
                name: role,
                description: role.description(),
                permissions: role.permissions(),
            })
            .collect(),
    )
}
