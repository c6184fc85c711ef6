/// Time tracking endpoints
///
/// - `GET /v1/time-entries?user_id=&task_id=&from=&to=` (`time-entry:read`;
///   another user's entries need `time-entry:read-all`)
/// - `POST /v1/time-entries` (`time-entry:create`)
/// - `DELETE /v1/time-entries/:id` (`time-entry:delete`, own entries only)

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
        authorization::{require_permission, Permission},
        middleware::AuthContext,
    },
    models::{
        audit_log::{AuditAction, AuditLog, NewAuditLog},
        task::{Task, TaskScope},
        time_entry::{
            hours_in_range, CreateTimeEntry, TimeEntry, TimeEntryFilter, TimeEntryListItem,
            TimeEntrySource,
        },
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListTimeEntriesQuery {
    pub user_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTimeEntryRequest {
    pub task_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

pub(crate) fn check_hours(hours: Decimal) -> ApiResult<()> {
    if hours_in_range(hours) {
        Ok(())
    } else {
        Err(ApiError::invalid_field(
            "hours",
            "Hours must be greater than 0 and at most 24",
        ))
    }
}

/// The task, provided it is in the workspace and its project tracks time
pub(crate) async fn trackable_task(
    state: &AppState,
    ctx: &AuthContext,
    task_id: Uuid,
) -> ApiResult<TaskScope> {
    let scope = Task::scope_in_workspace(&state.db, ctx.workspace_id, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if !scope.module_time {
        return Err(ApiError::Forbidden(
            "Time tracking is not enabled for this project".to_string(),
        ));
    }

    Ok(scope)
}

/// Inserts the entry and its audit row in one transaction
pub(crate) async fn record_entry(
    state: &AppState,
    ctx: &AuthContext,
    data: CreateTimeEntry,
) -> ApiResult<TimeEntry> {
    let mut tx = state.db.begin().await?;

    let entry = TimeEntry::create(&mut *tx, data).await?;

    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "TimeEntry",
            entity_id: entry.id,
            action: AuditAction::Create,
            changes: Some(json!({
                "task_id": entry.task_id,
                "date": entry.date,
                "hours": entry.hours,
                "source": entry.source,
                "rate_snapshot": entry.rate_snapshot,
            })),
        },
    )
    .await?;

    tx.commit().await?;

    info!(
        entry_id = %entry.id,
        task_id = %entry.task_id,
        user_id = %entry.user_id,
        source = ?entry.source,
        "Logged time"
    );

    Ok(entry)
}

pub async fn list_time_entries(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListTimeEntriesQuery>,
) -> ApiResult<Json<Vec<TimeEntryListItem>>> {
    require_permission(&ctx, Permission::TimeEntryRead)?;

    let user_id = query.user_id.unwrap_or(ctx.user_id);
    if user_id != ctx.user_id {
        require_permission(&ctx, Permission::TimeEntryReadAll)?;
    }

    let filter = TimeEntryFilter {
        user_id: Some(user_id),
        task_id: query.task_id,
        from: query.from,
        to: query.to,
    };

    let entries = TimeEntry::list(&state.db, ctx.workspace_id, &filter).await?;
    Ok(Json(entries))
}

pub async fn create_time_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<CreateTimeEntryRequest>,
) -> ApiResult<(StatusCode, Json<TimeEntry>)> {
    require_permission(&ctx, Permission::TimeEntryCreate)?;
    check_hours(req.hours)?;

    let task = trackable_task(&state, &ctx, req.task_id).await?;

    let entry = record_entry(
        &state,
        &ctx,
        CreateTimeEntry {
            task_id: task.task_id,
            user_id: ctx.user_id,
            date: req.date,
            hours: req.hours,
            description: req.description,
            source: TimeEntrySource::Manual,
            external_event_id: None,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn delete_time_entry(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    require_permission(&ctx, Permission::TimeEntryDelete)?;

    let entry = TimeEntry::find_own(&state.db, ctx.workspace_id, ctx.user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Time entry not found".to_string()))?;

    let mut tx = state.db.begin().await?;
    TimeEntry::soft_delete(&mut *tx, entry.id).await?;
    AuditLog::record(
        &mut *tx,
        NewAuditLog {
            user_id: Some(ctx.user_id),
            entity_type: "TimeEntry",
            entity_id: entry.id,
            action: AuditAction::Delete,
            changes: None,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(DeleteResponse { deleted: true }))
}
