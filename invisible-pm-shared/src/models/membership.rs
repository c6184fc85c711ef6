/// Workspace membership
///
/// `workspace_users` links a user to a workspace and carries the user's
/// [`Role`] there. Removing someone from a workspace soft-deletes the row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE workspace_users (
///     workspace_id UUID NOT NULL REFERENCES workspaces(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     role workspace_role NOT NULL DEFAULT 'Consultor',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ,
///     PRIMARY KEY (workspace_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::auth::authorization::Role;
/// use invisible_pm_shared::models::membership::{CreateMembership, Membership};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, workspace_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// Membership::create(&pool, CreateMembership { workspace_id, user_id, role: Role::Pm }).await?;
/// assert_eq!(Membership::active_role(&pool, workspace_id, user_id).await?, Some(Role::Pm));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::auth::authorization::Role;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

/// One row of the workspace team listing
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkspaceMember {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub hourly_rate: Option<Decimal>,
    pub is_active: bool,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Adds a user to a workspace, reviving a previously removed membership
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateMembership,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO workspace_users (workspace_id, user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (workspace_id, user_id)
            DO UPDATE SET role = EXCLUDED.role, deleted_at = NULL
            RETURNING workspace_id, user_id, role, created_at, deleted_at
            "#,
        )
        .bind(data.workspace_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(executor)
        .await
    }

    /// Role of an active, non-deleted user in a live workspace
    ///
    /// `None` when any of the three has been removed or deactivated.
    pub async fn active_role(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_scalar::<_, Role>(
            r#"
            SELECT wu.role
            FROM workspace_users wu
            JOIN users u ON u.id = wu.user_id
            JOIN workspaces w ON w.id = wu.workspace_id
            WHERE wu.workspace_id = $1
              AND wu.user_id = $2
              AND wu.deleted_at IS NULL
              AND u.deleted_at IS NULL
              AND u.is_active
              AND w.deleted_at IS NULL
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// The workspace a user lands in after login: their oldest active membership
    pub async fn default_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            SELECT wu.workspace_id, wu.user_id, wu.role, wu.created_at, wu.deleted_at
            FROM workspace_users wu
            JOIN workspaces w ON w.id = wu.workspace_id
            WHERE wu.user_id = $1
              AND wu.deleted_at IS NULL
              AND w.deleted_at IS NULL
            ORDER BY wu.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_role<'e>(
        executor: impl PgExecutor<'e>,
        workspace_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(
            r#"
            UPDATE workspace_users
            SET role = $3
            WHERE workspace_id = $1 AND user_id = $2 AND deleted_at IS NULL
            RETURNING workspace_id, user_id, role, created_at, deleted_at
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await
    }

    /// Members of a workspace with their rate and role, by name
    pub async fn list_members(
        pool: &PgPool,
        workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceMember>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(
            r#"
            SELECT u.id, u.email, u.full_name, u.hourly_rate, u.is_active,
                   wu.role, wu.created_at AS joined_at
            FROM workspace_users wu
            JOIN users u ON u.id = wu.user_id
            WHERE wu.workspace_id = $1
              AND wu.deleted_at IS NULL
              AND u.deleted_at IS NULL
            ORDER BY u.full_name ASC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_member(
        pool: &PgPool,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorkspaceMember>, sqlx::Error> {
        sqlx::query_as::<_, WorkspaceMember>(
            r#"
            SELECT u.id, u.email, u.full_name, u.hourly_rate, u.is_active,
                   wu.role, wu.created_at AS joined_at
            FROM workspace_users wu
            JOIN users u ON u.id = wu.user_id
            WHERE wu.workspace_id = $1
              AND wu.user_id = $2
              AND wu.deleted_at IS NULL
              AND u.deleted_at IS NULL
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Active members, as shown on the dashboard
    pub async fn count_active(pool: &PgPool, workspace_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM workspace_users wu
            JOIN users u ON u.id = wu.user_id
            WHERE wu.workspace_id = $1
              AND wu.deleted_at IS NULL
              AND u.deleted_at IS NULL
              AND u.is_active
            "#,
        )
        .bind(workspace_id)
        .fetch_one(pool)
        .await
    }
}
