/// Audit log
///
/// Append-only record of mutations. Handlers write one row per
/// create/update/delete, normally inside the same transaction as the change
/// itself, with the request body (or the fields that changed) in `changes`.
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::models::audit_log::{AuditAction, AuditLog, NewAuditLog};
/// use serde_json::json;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid, project_id: Uuid) -> Result<(), sqlx::Error> {
/// AuditLog::record(&pool, NewAuditLog {
///     user_id: Some(user_id),
///     entity_type: "Project",
///     entity_id: project_id,
///     action: AuditAction::Update,
///     changes: Some(json!({ "status": "ACTIVE" })),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub changes: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub user_id: Option<Uuid>,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub changes: Option<serde_json::Value>,
}

impl AuditLog {
    pub async fn record<'e>(
        executor: impl PgExecutor<'e>,
        entry: NewAuditLog,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, entity_type, entity_id, action, changes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.action)
        .bind(entry.changes)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// History of one entity, oldest first
    pub async fn list_for_entity(
        pool: &PgPool,
        entity_type: &str,
        entity_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, entity_type, entity_id, action, changes, created_at
            FROM audit_logs
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(pool)
        .await
    }
}
