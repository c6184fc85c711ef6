/// Project model and database operations
///
/// Projects live inside a workspace and own tasks. Three per-project module
/// toggles gate features: `module_budget` (budget endpoint and dashboard
/// overview), `module_time` (logging hours) and `module_workload`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY,
///     workspace_id UUID NOT NULL REFERENCES workspaces(id),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     status project_status NOT NULL DEFAULT 'PLANNING',
///     start_date DATE, end_date DATE,
///     total_budget NUMERIC(12, 2),
///     currency VARCHAR(3) NOT NULL DEFAULT 'USD',
///     module_budget BOOLEAN NOT NULL DEFAULT FALSE,
///     module_time BOOLEAN NOT NULL DEFAULT TRUE,
///     module_workload BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at, updated_at, deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::models::project::{CreateProject, Project};
/// use rust_decimal::Decimal;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, workspace_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create(&pool, CreateProject {
///     workspace_id,
///     name: "Portal de clientes".to_string(),
///     total_budget: Some(Decimal::from(10_000)),
///     module_budget: Some(true),
///     ..CreateProject::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::task::TaskStatus;

const COLUMNS: &str = "id, workspace_id, name, description, status, start_date, end_date, \
                       total_budget, currency, module_budget, module_time, module_workload, \
                       created_at, updated_at, deleted_at";

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Planning,
    Active,
    OnHold,
    Completed,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_budget: Option<Decimal>,
    pub currency: String,
    pub module_budget: bool,
    pub module_time: bool,
    pub module_workload: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// New project; unset toggles fall back to the column defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProject {
    pub workspace_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_budget: Option<Decimal>,
    pub currency: Option<String>,
    pub module_budget: Option<bool>,
    pub module_time: Option<bool>,
    pub module_workload: Option<bool>,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub total_budget: Option<Option<Decimal>>,
    pub currency: Option<String>,
    pub module_budget: Option<bool>,
    pub module_time: Option<bool>,
    pub module_workload: Option<bool>,
}

/// Listing row: the project plus its task counts
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithStats {
    #[serde(flatten)]
    pub project: Project,
    pub task_count: i64,
    pub tasks_by_status: HashMap<TaskStatus, i64>,
}

impl Project {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateProject,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (
                workspace_id, name, description, status, start_date, end_date,
                total_budget, currency, module_budget, module_time, module_workload
            )
            VALUES (
                $1, $2, $3, COALESCE($4, 'PLANNING'::project_status), $5, $6,
                $7, $8, COALESCE($9, FALSE), COALESCE($10, TRUE), COALESCE($11, FALSE)
            )
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.workspace_id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.status)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.total_budget)
        .bind(data.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()))
        .bind(data.module_budget)
        .bind(data.module_time)
        .bind(data.module_workload)
        .fetch_one(executor)
        .await
    }

    /// Non-deleted project inside `workspace_id`
    pub async fn find_in_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM projects
            WHERE id = $1 AND workspace_id = $2 AND deleted_at IS NULL
            "#
        ))
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await
    }

    /// Non-deleted projects, newest first, optionally filtered by status
    pub async fn list(
        pool: &PgPool,
        workspace_id: Uuid,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM projects
            WHERE workspace_id = $1
              AND deleted_at IS NULL
              AND ($2::project_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(workspace_id)
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// [`Project::list`] with per-status task counts attached
    pub async fn list_with_task_counts(
        pool: &PgPool,
        workspace_id: Uuid,
        status: Option<ProjectStatus>,
    ) -> Result<Vec<ProjectWithStats>, sqlx::Error> {
        let projects = Self::list(pool, workspace_id, status).await?;
        let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

        let counts: Vec<(Uuid, TaskStatus, i64)> = sqlx::query_as(
            r#"
            SELECT project_id, status, COUNT(*)
            FROM tasks
            WHERE project_id = ANY($1) AND deleted_at IS NULL
            GROUP BY project_id, status
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut by_project: HashMap<Uuid, HashMap<TaskStatus, i64>> = HashMap::new();
        for (project_id, status, count) in counts {
            by_project.entry(project_id).or_default().insert(status, count);
        }

        Ok(projects
            .into_iter()
            .map(|project| {
                let tasks_by_status = by_project.remove(&project.id).unwrap_or_default();
                ProjectWithStats {
                    task_count: tasks_by_status.values().sum(),
                    tasks_by_status,
                    project,
                }
            })
            .collect())
    }

    /// ACTIVE projects with the budget module on, for the dashboard overview
    pub async fn list_budgeted(pool: &PgPool, workspace_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM projects
            WHERE workspace_id = $1
              AND deleted_at IS NULL
              AND status = $2
              AND module_budget
            ORDER BY name ASC
            "#
        ))
        .bind(workspace_id)
        .bind(ProjectStatus::Active)
        .fetch_all(pool)
        .await
    }

    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        workspace_id: Uuid,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 2;

        let columns = [
            ("name", data.name.is_some()),
            ("description", data.description.is_some()),
            ("status", data.status.is_some()),
            ("start_date", data.start_date.is_some()),
            ("end_date", data.end_date.is_some()),
            ("total_budget", data.total_budget.is_some()),
            ("currency", data.currency.is_some()),
            ("module_budget", data.module_budget.is_some()),
            ("module_time", data.module_time.is_some()),
            ("module_workload", data.module_workload.is_some()),
        ];
        for (column, present) in columns {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(
            " WHERE id = $1 AND workspace_id = $2 AND deleted_at IS NULL RETURNING {COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Project>(&query).bind(id).bind(workspace_id);

        // bind order must match `columns`
        if let Some(v) = data.name {
            q = q.bind(v);
        }
        if let Some(v) = data.description {
            q = q.bind(v);
        }
        if let Some(v) = data.status {
            q = q.bind(v);
        }
        if let Some(v) = data.start_date {
            q = q.bind(v);
        }
        if let Some(v) = data.end_date {
            q = q.bind(v);
        }
        if let Some(v) = data.total_budget {
            q = q.bind(v);
        }
        if let Some(v) = data.currency {
            q = q.bind(v);
        }
        if let Some(v) = data.module_budget {
            q = q.bind(v);
        }
        if let Some(v) = data.module_time {
            q = q.bind(v);
        }
        if let Some(v) = data.module_workload {
            q = q.bind(v);
        }

        q.fetch_optional(executor).await
    }

    /// Marks the project deleted; its tasks and entries drop out of every query
    pub async fn soft_delete<'e>(
        executor: impl PgExecutor<'e>,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND workspace_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(workspace_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_active(pool: &PgPool, workspace_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM projects
            WHERE workspace_id = $1 AND deleted_at IS NULL AND status = $2
            "#,
        )
        .bind(workspace_id)
        .bind(ProjectStatus::Active)
        .fetch_one(pool)
        .await
    }
}
