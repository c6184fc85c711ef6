/// Project endpoints
///
/// - `GET /v1/projects?status=` (`project:read`)
/// - `POST /v1/projects` (`project:create`)
/// - `GET /v1/projects/:id` (`project:read`): project plus its board
/// - `PATCH /v1/projects/:id` (`project:update`)
/// - `DELETE /v1/projects/:id` (`project:delete`): soft delete
/// - `GET /v1/projects/:id/budget` (`budget:read`)

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
use chrono::{NaiveDate, Utc};
use invisible_pm_shared::{
    auth::{
        authorization::{require_permission, Permission},
        middleware::AuthContext,
    },
    budget::{self, CostEntry, ProjectBudget},
    models::{
        audit_log::{AuditAction, AuditLog, NewAuditLog},
        project::{CreateProject, Project, ProjectStatus, ProjectWithStats, UpdateProject},
        task::Task,
        time_entry::TimeEntry,
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_budget: Option<Decimal>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub module_budget: Option<bool>,
    pub module_time: Option<bool>,
    pub module_workload: Option<bool>,
}

/// Partial update; explicit `null` clears nullable fields
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<Option<Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_budget: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_workload: Option<bool>,
}

impl UpdateProjectRequest {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.total_budget.is_none()
            && self.currency.is_none()
            && self.module_budget.is_none()
            && self.module_time.is_none()
            && self.module_workload.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

fn check_budget(total_budget: Option<Decimal>) -> ApiResult<()> {
    match total_budget {
        Some(b) if b < Decimal::ZERO => Err(ApiError::invalid_field(
            "total_budget",
            "Budget must be zero or positive",
        )),
        _ => Ok(()),
    }
}

fn check_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ApiResult<()> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(ApiError::invalid_field(
            "end_date",
            "End date must not be before start date",
        )),
        _ => Ok(()),
    }
}

async fn load_project(state: &AppState, ctx: &AuthContext, id: Uuid) -> ApiResult<Project> {
    Project::find_in_workspace(&state.db, ctx.workspace_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<Json<Vec<ProjectWithStats>>> {
    require_permission(&ctx, Permission::ProjectRead)?;

    let projects = Project::list_with_task_counts(&state.db, ctx.workspace_id, query.status).await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    require_permission(&ctx, Permission::ProjectCreate)?;
    req.validate()?;
    check_budget(req.total_budget)?;
    check_dates(req.start_date, req.end_date)?;

    let changes = serde_json::to_value(&req).ok();

    let mut tx = state.db.begin().await?;

    let project = Project::create(
        &mut *tx,
        CreateProject {
            workspace_id: ctx.workspace_id,
            name: req.name.trim().to_string(),
            description: req.description,
            status: req.status,
            start_date: req.start_date,
            end_date: req.end_date,
            total_budget: req.total_budget,
            currency: req.currency.map(|c| c.to_uppercase()),
            module_budget: req.module_budget,
            module_time: req.module_time,
            module_workload: req.module_workload,
        },
    )
    .await?;

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "Project",
            entity_id: project.id,
            action: AuditAction::Create,
            changes,
        },
    )
    .await?;

    tx.commit().await?;

    info!(project_id = %project.id, workspace_id = %ctx.workspace_id, "Created project");

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    require_permission(&ctx, Permission::ProjectRead)?;

    let project = load_project(&state, &ctx, id).await?;
    let tasks = Task::list_by_project(&state.db, project.id).await?;

    Ok(Json(ProjectDetail { project, tasks }))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    require_permission(&ctx, Permission::ProjectUpdate)?;
    req.validate()?;

    if req.is_empty() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }
    check_budget(req.total_budget.flatten())?;

    let existing = load_project(&state, &ctx, id).await?;
    check_dates(
        req.start_date.unwrap_or(existing.start_date),
        req.end_date.unwrap_or(existing.end_date),
    )?;

    let changes = serde_json::to_value(&req).ok();

    let mut tx = state.db.begin().await?;

    let project = Project::update(
        &mut *tx,
        ctx.workspace_id,
        id,
        UpdateProject {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            status: req.status,
            start_date: req.start_date,
            end_date: req.end_date,
            total_budget: req.total_budget,
            currency: req.currency.map(|c| c.to_uppercase()),
            module_budget: req.module_budget,
            module_time: req.module_time,
            module_workload: req.module_workload,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "Project",
            entity_id: project.id,
            action: AuditAction::Update,
            changes,
        },
    )
    .await?;

    tx.commit().await?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    require_permission(&ctx, Permission::ProjectDelete)?;

    let mut tx = state.db.begin().await?;

    if !Project::soft_delete(&mut *tx, ctx.workspace_id, id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "Project",
            entity_id: id,
            action: AuditAction::Delete,
            changes: None,
        },
    )
    .await?;

    tx.commit().await?;

    info!(project_id = %id, "Deleted project");

    Ok(Json(DeleteResponse { deleted: true }))
}

/// `GET /v1/projects/:id/budget`
///
/// # Errors
///
/// - `404`: no such project in the workspace
/// - `403`: the role lacks `budget:read` or the budget module is off
pub async fn get_project_budget(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectBudget>> {
    require_permission(&ctx, Permission::BudgetRead)?;

    let project = load_project(&state, &ctx, id).await?;

    if !project.module_budget {
        return Err(ApiError::Forbidden(
            "Budget module is not enabled for this project".to_string(),
        ));
    }

    let entries: Vec<CostEntry> = TimeEntry::cost_entries_for_projects(&state.db, &[project.id])
        .await?
        .into_iter()
        .map(CostEntry::from)
        .collect();

    let summary = budget::summarize(
        project.total_budget,
        &project.currency,
        &entries,
        Utc::now().date_naive(),
    );

    Ok(Json(ProjectBudget {
        project_id: project.id,
        project_name: project.name,
        summary,
    }))
}
