/// Task model and database operations
///
/// Tasks are kanban cards. Within a project each status is a column, and
/// `position` orders the cards inside a column. New cards go to the bottom
/// of their column: `max(position) + 1`, or 0 for an empty column.
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::models::task::{CreateTask, Task, TaskStatus};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     project_id,
///     title: "Migrar base de datos".to_string(),
///     status: Some(TaskStatus::Todo),
///     ..CreateTask::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const COLUMNS: &str = "id, project_id, title, description, status, priority, assignee_id, \
                       estimated_hours, due_date, parent_task_id, position, \
                       created_at, updated_at, deleted_at";

/// Kanban column; Postgres sorts the enum in declaration order
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Backlog,
    Todo,
    InProgress,
    InReview,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub estimated_hours: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub parent_task_id: Option<Uuid>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub estimated_hours: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub parent_task_id: Option<Uuid>,
}

/// Partial update; `Some(None)` clears a nullable column
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Option<Uuid>>,
    pub estimated_hours: Option<Option<Decimal>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub position: Option<i32>,
}

/// Dashboard card for a recently touched task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecentTask {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: Uuid,
    pub project_name: String,
    pub updated_at: DateTime<Utc>,
}

/// A task together with the project flags that gate work on it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskScope {
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub module_time: bool,
}

impl Task {
    /// Inserts at the bottom of the task's status column
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            WITH col AS (
                SELECT COALESCE($4, 'BACKLOG'::task_status) AS status
            )
            INSERT INTO tasks (
                project_id, title, description, status, priority, assignee_id,
                estimated_hours, due_date, parent_task_id, position
            )
            SELECT
                $1, $2, $3, col.status, COALESCE($5, 'MEDIUM'::task_priority), $6,
                $7, $8, $9,
                COALESCE((
                    SELECT MAX(t.position) + 1
                    FROM tasks t
                    WHERE t.project_id = $1 AND t.status = col.status AND t.deleted_at IS NULL
                ), 0)
            FROM col
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.project_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.assignee_id)
        .bind(data.estimated_hours)
        .bind(data.due_date)
        .bind(data.parent_task_id)
        .fetch_one(executor)
        .await
    }

    /// Non-deleted task whose (non-deleted) project is in `workspace_id`
    pub async fn find_in_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.title, t.description, t.status, t.priority,
                   t.assignee_id, t.estimated_hours, t.due_date, t.parent_task_id, t.position,
                   t.created_at, t.updated_at, t.deleted_at
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE t.id = $1
              AND p.workspace_id = $2
              AND t.deleted_at IS NULL
              AND p.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await
    }

    /// Like [`Task::find_in_workspace`] but returns only what time tracking needs
    pub async fn scope_in_workspace(
        pool: &PgPool,
        workspace_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TaskScope>, sqlx::Error> {
        sqlx::query_as::<_, TaskScope>(
            r#"
            SELECT t.id AS task_id, t.project_id, t.assignee_id, p.module_time
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE t.id = $1
              AND p.workspace_id = $2
              AND t.deleted_at IS NULL
              AND p.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await
    }

    /// Board order: status column, then position
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM tasks
            WHERE project_id = $1 AND deleted_at IS NULL
            ORDER BY status ASC, position ASC, created_at ASC
            "#
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        let columns = [
            ("title", data.title.is_some()),
            ("description", data.description.is_some()),
            ("status", data.status.is_some()),
            ("priority", data.priority.is_some()),
            ("assignee_id", data.assignee_id.is_some()),
            ("estimated_hours", data.estimated_hours.is_some()),
            ("due_date", data.due_date.is_some()),
            ("position", data.position.is_some()),
        ];
        for (column, present) in columns {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        }

        query.push_str(&format!(
            " WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(v) = data.title {
            q = q.bind(v);
        }
        if let Some(v) = data.description {
            q = q.bind(v);
        }
        if let Some(v) = data.status {
            q = q.bind(v);
        }
        if let Some(v) = data.priority {
            q = q.bind(v);
        }
        if let Some(v) = data.assignee_id {
            q = q.bind(v);
        }
        if let Some(v) = data.estimated_hours {
            q = q.bind(v);
        }
        if let Some(v) = data.due_date {
            q = q.bind(v);
        }
        if let Some(v) = data.position {
            q = q.bind(v);
        }

        q.fetch_optional(executor).await
    }

    pub async fn soft_delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tasks assigned to `user_id` in the workspace that are not DONE
    pub async fn count_pending_for_assignee(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE p.workspace_id = $1
              AND t.assignee_id = $2
              AND t.status <> $3
              AND t.deleted_at IS NULL
              AND p.deleted_at IS NULL
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(TaskStatus::Done)
        .fetch_one(pool)
        .await
    }

    pub async fn recent_for_assignee(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentTask>, sqlx::Error> {
        sqlx::query_as::<_, RecentTask>(
            r#"
            SELECT t.id, t.title, t.status, t.priority, t.project_id,
                   p.name AS project_name, t.updated_at
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE p.workspace_id = $1
              AND t.assignee_id = $2
              AND t.deleted_at IS NULL
              AND p.deleted_at IS NULL
            ORDER BY t.updated_at DESC
            LIMIT $3
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
