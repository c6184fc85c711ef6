/// Workspace model
///
/// The workspace is the tenant boundary. Every project belongs to exactly one
/// workspace and every authenticated request is scoped to one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::auth::authorization::Role;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkspace {
    pub name: String,
    pub domain: Option<String>,
}

/// A workspace as seen by one of its members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberWorkspace {
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl Workspace {
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateWorkspace,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(
            r#"
            INSERT INTO workspaces (name, domain)
            VALUES ($1, $2)
            RETURNING id, name, domain, created_at, updated_at, deleted_at
            "#,
        )
        .bind(data.name)
        .bind(data.domain)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, domain, created_at, updated_at, deleted_at
            FROM workspaces
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Workspaces where `user_id` holds an active membership, oldest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<MemberWorkspace>, sqlx::Error> {
        sqlx::query_as::<_, MemberWorkspace>(
            r#"
            SELECT w.id, w.name, w.domain, wu.role, wu.created_at AS joined_at
            FROM workspace_users wu
            JOIN workspaces w ON w.id = wu.workspace_id
            WHERE wu.user_id = $1
              AND wu.deleted_at IS NULL
              AND w.deleted_at IS NULL
            ORDER BY wu.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
