/// Dashboard endpoints
///
/// - `GET /v1/dashboard/stats`: counters for the caller's home screen
/// - `GET /v1/dashboard/budget` (`budget:read`): budget overview of every
///   ACTIVE project with the budget module enabled

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use invisible_pm_shared::{
    auth::{
        authorization::{require_permission, Permission},
        middleware::AuthContext,
    },
    budget::{self, CostEntry, PortfolioOverview, ProjectBudget},
    models::{
        membership::Membership,
        project::Project,
        task::{RecentTask, Task},
        time_entry::TimeEntry,
    },
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

const RECENT_TASKS: i64 = 5;

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub active_projects: i64,
    pub pending_tasks: i64,
    pub hours_this_week: Decimal,
    pub team_members: i64,
    pub recent_tasks: Vec<RecentTask>,
}

/// Monday of the week containing `today`
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<DashboardStats>> {
    let since = week_start(Utc::now().date_naive());

    let (active_projects, pending_tasks, hours_this_week, team_members, recent_tasks) = tokio::try_join!(
        Project::count_active(&state.db, ctx.workspace_id),
        Task::count_pending_for_assignee(&state.db, ctx.workspace_id, ctx.user_id),
        TimeEntry::hours_since(&state.db, ctx.workspace_id, ctx.user_id, since),
        Membership::count_active(&state.db, ctx.workspace_id),
        Task::recent_for_assignee(&state.db, ctx.workspace_id, ctx.user_id, RECENT_TASKS),
    )?;

    Ok(Json(DashboardStats {
        active_projects,
        pending_tasks,
        hours_this_week,
        team_members,
        recent_tasks,
    }))
}

pub async fn budget_overview(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<PortfolioOverview>> {
    require_permission(&ctx, Permission::BudgetRead)?;

    let projects = Project::list_budgeted(&state.db, ctx.workspace_id).await?;
    let ids: Vec<_> = projects.iter().map(|p| p.id).collect();

    let mut by_project: HashMap<_, Vec<CostEntry>> = HashMap::new();
    for row in TimeEntry::cost_entries_for_projects(&state.db, &ids).await? {
        by_project.entry(row.project_id).or_default().push(row.into());
    }

    let today = Utc::now().date_naive();
    let summaries = projects
        .into_iter()
        .map(|project| {
            let entries = by_project.remove(&project.id).unwrap_or_default();
            ProjectBudget {
                summary: budget::summarize(project.total_budget, &project.currency, &entries, today),
                project_id: project.id,
                project_name: project.name,
            }
        })
        .collect();

    Ok(Json(budget::summarize_portfolio(summaries)))
}
