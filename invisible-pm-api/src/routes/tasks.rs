/// Kanban task endpoints
///
/// - `GET /v1/tasks?project_id=` (`task:read`)
/// - `GET /v1/tasks/:id` (`task:read`)
/// - `POST /v1/tasks` (`task:create`, plus `task:assign` to set an assignee)
/// - `PATCH /v1/tasks/:id` (`task:update`; Consultores only on their own tasks)
/// - `DELETE /v1/tasks/:id` (`task:delete`)
///
/// New tasks go to the bottom of their status column.

use super::double_option;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use invisible_pm_shared::{
    auth::{
        authorization::{require_permission, require_task_update, Permission},
        middleware::AuthContext,
    },
    models::{
        audit_log::{AuditAction, AuditLog, NewAuditLog},
        membership::Membership,
        project::Project,
        task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 500, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub estimated_hours: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub parent_task_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 500, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0, message = "Position must be zero or positive"))]
    pub position: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn check_estimate(hours: Option<Decimal>) -> ApiResult<()> {
    match hours {
        Some(h) if h < Decimal::ZERO => Err(ApiError::invalid_field(
            "estimated_hours",
            "Estimated hours must be zero or positive",
        )),
        _ => Ok(()),
    }
}

/// Assignees must belong to the caller's workspace
async fn check_assignee(state: &AppState, ctx: &AuthContext, assignee: Option<Uuid>) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if Membership::active_role(&state.db, ctx.workspace_id, user_id)
            .await?
            .is_none()
        {
            return Err(ApiError::invalid_field(
                "assignee_id",
                "Assignee is not a member of this workspace",
            ));
        }
    }
    Ok(())
}

async fn load_task(state: &AppState, ctx: &AuthContext, id: Uuid) -> ApiResult<Task> {
    Task::find_in_workspace(&state.db, ctx.workspace_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    require_permission(&ctx, Permission::TaskRead)?;

    let project_id = query
        .project_id
        .ok_or_else(|| ApiError::BadRequest("project_id is required".to_string()))?;

    Project::find_in_workspace(&state.db, ctx.workspace_id, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let tasks = Task::list_by_project(&state.db, project_id).await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    require_permission(&ctx, Permission::TaskRead)?;
    Ok(Json(load_task(&state, &ctx, id).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    require_permission(&ctx, Permission::TaskCreate)?;
    if req.assignee_id.is_some() {
        require_permission(&ctx, Permission::TaskAssign)?;
    }
    req.validate()?;
    check_estimate(req.estimated_hours)?;

    Project::find_in_workspace(&state.db, ctx.workspace_id, req.project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    check_assignee(&state, &ctx, req.assignee_id).await?;

    if let Some(parent_id) = req.parent_task_id {
        let parent = Task::find_in_workspace(&state.db, ctx.workspace_id, parent_id).await?;
        if parent.map(|p| p.project_id) != Some(req.project_id) {
            return Err(ApiError::invalid_field(
                "parent_task_id",
                "Parent task must belong to the same project",
            ));
        }
    }

    let changes = serde_json::to_value(&req).ok();

    let mut tx = state.db.begin().await?;

    let task = Task::create(
        &mut *tx,
        CreateTask {
            project_id: req.project_id,
            title: req.title.trim().to_string(),
            description: req.description,
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id,
            estimated_hours: req.estimated_hours,
            due_date: req.due_date,
            parent_task_id: req.parent_task_id,
        },
    )
    .await?;

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "Task",
            entity_id: task.id,
            action: AuditAction::Create,
            changes,
        },
    )
    .await?;

    tx.commit().await?;

    info!(task_id = %task.id, project_id = %task.project_id, position = task.position, "Created task");

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    require_permission(&ctx, Permission::TaskUpdate)?;
    req.validate()?;
    check_estimate(req.estimated_hours.flatten())?;

    let existing = load_task(&state, &ctx, id).await?;
    require_task_update(&ctx, existing.assignee_id)?;

    if let Some(assignee) = req.assignee_id {
        if assignee != existing.assignee_id {
            require_permission(&ctx, Permission::TaskAssign)?;
            check_assignee(&state, &ctx, assignee).await?;
        }
    }

    let changes = serde_json::to_value(&req).ok();

    let mut tx = state.db.begin().await?;

    let task = Task::update(
        &mut *tx,
        id,
        UpdateTask {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id,
            estimated_hours: req.estimated_hours,
            due_date: req.due_date,
            position: req.position,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "Task",
            entity_id: task.id,
            action: AuditAction::Update,
            changes,
        },
    )
    .await?;

    tx.commit().await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    require_permission(&ctx, Permission::TaskDelete)?;

    let task = load_task(&state, &ctx, id).await?;

    let mut tx = state.db.begin().await?;
    Task::soft_delete(&mut *tx, task.id).await?;
    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "Task",
            entity_id: task.id,
            action: AuditAction::Delete,
            changes: None,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(DeleteResponse { deleted: true }))
}
