/// Time entries
///
/// An entry records hours a user spent on a task on a given date. On insert
/// the user's current `hourly_rate` is copied into `rate_snapshot` inside the
/// same statement; the snapshot is never rewritten, which is what keeps
/// historical project cost stable when rates change.
///
/// Entries imported from the calendar carry `source = OUTLOOK` and the Graph
/// event id. A partial unique index allows one live entry per
/// (user, external_event_id).
///
/// # Example
///
/// ```no_run
/// use chrono::NaiveDate;
/// use invisible_pm_shared::models::time_entry::{CreateTimeEntry, TimeEntry, TimeEntrySource};
/// use rust_decimal::Decimal;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, task_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let entry = TimeEntry::create(&pool, CreateTimeEntry {
///     task_id,
///     user_id,
///     date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
///     hours: Decimal::new(75, 1),
///     description: Some("Revisión con cliente".into()),
///     source: TimeEntrySource::Manual,
///     external_event_id: None,
/// }).await?;
/// println!("frozen rate: {:?}", entry.rate_snapshot);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::budget::CostEntry;

const COLUMNS: &str = "id, task_id, user_id, date, hours, description, source, \
                       external_event_id, rate_snapshot, created_at, updated_at, deleted_at";

/// Largest number of hours one entry may hold
pub const MAX_HOURS_PER_ENTRY: i64 = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "time_entry_source", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeEntrySource {
    #[default]
    Manual,
    Outlook,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeEntry {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub description: Option<String>,
    pub source: TimeEntrySource,
    pub external_event_id: Option<String>,
    /// User's hourly rate at creation time
    pub rate_snapshot: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTimeEntry {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub description: Option<String>,
    pub source: TimeEntrySource,
    pub external_event_id: Option<String>,
}

/// Listing filters; `None` means "any"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeEntryFilter {
    pub user_id: Option<Uuid>,
    pub task_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Entry with the task and project it was logged against
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeEntryListItem {
    pub id: Uuid,
    pub task_id: Uuid,
    pub task_title: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub description: Option<String>,
    pub source: TimeEntrySource,
    pub external_event_id: Option<String>,
    pub rate_snapshot: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// Row of the aggregator query, tagged with its project
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectCostRow {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub hours: Decimal,
    pub rate_snapshot: Option<Decimal>,
    pub date: NaiveDate,
}

impl From<ProjectCostRow> for CostEntry {
    fn from(row: ProjectCostRow) -> Self {
        CostEntry {
            user_id: row.user_id,
            user_name: row.user_name,
            hours: row.hours,
            rate_snapshot: row.rate_snapshot,
            date: row.date,
        }
    }
}

/// True when `hours` is within `(0, 24]`
pub fn hours_in_range(hours: Decimal) -> bool {
    hours > Decimal::ZERO && hours <= Decimal::from(MAX_HOURS_PER_ENTRY)
}

impl TimeEntry {
    /// Inserts the entry, snapshotting the user's current hourly rate
    ///
    /// # Errors
    ///
    /// A second live entry for the same calendar event fails with a unique
    /// violation on `idx_time_entries_external_event`.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateTimeEntry,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(&format!(
            r#"
            INSERT INTO time_entries (
                task_id, user_id, date, hours, description, source, external_event_id, rate_snapshot
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7,
                (SELECT hourly_rate FROM users WHERE id = $2)
            )
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.date)
        .bind(data.hours)
        .bind(data.description)
        .bind(data.source)
        .bind(data.external_event_id)
        .fetch_one(executor)
        .await
    }

    /// Entries in the workspace matching `filter`, newest date first
    pub async fn list(
        pool: &PgPool,
        workspace_id: Uuid,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntryListItem>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntryListItem>(
            r#"
            SELECT te.id, te.task_id, t.title AS task_title, p.id AS project_id,
                   p.name AS project_name, te.user_id, te.date, te.hours, te.description,
                   te.source, te.external_event_id, te.rate_snapshot, te.created_at
            FROM time_entries te
            JOIN tasks t ON t.id = te.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE p.workspace_id = $1
              AND te.deleted_at IS NULL
              AND p.deleted_at IS NULL
              AND ($2::uuid IS NULL OR te.user_id = $2)
              AND ($3::uuid IS NULL OR te.task_id = $3)
              AND ($4::date IS NULL OR te.date >= $4)
              AND ($5::date IS NULL OR te.date <= $5)
            ORDER BY te.date DESC, te.created_at DESC
            "#,
        )
        .bind(workspace_id)
        .bind(filter.user_id)
        .bind(filter.task_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(pool)
        .await
    }

    /// A live entry owned by `user_id` inside the workspace
    pub async fn find_own(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT te.id, te.task_id, te.user_id, te.date, te.hours, te.description, te.source,
                   te.external_event_id, te.rate_snapshot, te.created_at, te.updated_at, te.deleted_at
            FROM time_entries te
            JOIN tasks t ON t.id = te.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE te.id = $1
              AND te.user_id = $2
              AND p.workspace_id = $3
              AND te.deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(workspace_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn soft_delete<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE time_entries
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_event_registered(
        pool: &PgPool,
        user_id: Uuid,
        external_event_id: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM time_entries
                WHERE user_id = $1 AND external_event_id = $2 AND deleted_at IS NULL
            )
            "#,
        )
        .bind(user_id)
        .bind(external_event_id)
        .fetch_one(pool)
        .await
    }

    /// Subset of `event_ids` that already have a live entry for `user_id`
    pub async fn registered_event_ids(
        pool: &PgPool,
        user_id: Uuid,
        event_ids: &[String],
    ) -> Result<Vec<String>, sqlx::Error> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_scalar(
            r#"
            SELECT external_event_id
            FROM time_entries
            WHERE user_id = $1
              AND external_event_id = ANY($2)
              AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(event_ids)
        .fetch_all(pool)
        .await
    }

    /// Hours `user_id` logged in the workspace on or after `since`
    pub async fn hours_since(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Decimal, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(te.hours), 0)
            FROM time_entries te
            JOIN tasks t ON t.id = te.task_id
            JOIN projects p ON p.id = t.project_id
            WHERE p.workspace_id = $1
              AND te.user_id = $2
              AND te.date >= $3
              AND te.deleted_at IS NULL
              AND p.deleted_at IS NULL
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Live entries of every live task in `project_ids`, with the author's name
    ///
    /// This is the only input the budget aggregator sees.
    pub async fn cost_entries_for_projects(
        pool: &PgPool,
        project_ids: &[Uuid],
    ) -> Result<Vec<ProjectCostRow>, sqlx::Error> {
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, ProjectCostRow>(
            r#"
            SELECT t.project_id, te.user_id, u.full_name AS user_name,
                   te.hours, te.rate_snapshot, te.date
            FROM time_entries te
            JOIN tasks t ON t.id = te.task_id
            JOIN projects p ON p.id = t.project_id
            JOIN users u ON u.id = te.user_id
            WHERE t.project_id = ANY($1)
              AND te.deleted_at IS NULL
              AND t.deleted_at IS NULL
              AND p.deleted_at IS NULL
            ORDER BY te.date ASC, te.created_at ASC
            "#,
        )
        .bind(project_ids)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_hours_range() {
        assert!(hours_in_range(dec!(0.25)));
        assert!(hours_in_range(dec!(24)));
        assert!(!hours_in_range(dec!(0)));
        assert!(!hours_in_range(dec!(-1)));
        assert!(!hours_in_range(dec!(24.01)));
    }

    #[test]
    fn test_cost_row_converts_to_aggregator_input() {
        let row = ProjectCostRow {
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_name: "Ana".into(),
            hours: dec!(2),
            rate_snapshot: Some(dec!(45)),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };

        let entry = CostEntry::from(row);
        assert_eq!(entry.cost(), dec!(90));
        assert_eq!(entry.user_name, "Ana");
    }

    #[test]
    fn test_source_wire_names() {
        assert_eq!(
            serde_json::to_string(&TimeEntrySource::Outlook).unwrap(),
            "\"OUTLOOK\""
        );
        assert_eq!(TimeEntrySource::default(), TimeEntrySource::Manual);
    }
}
