/// Linked external accounts
///
/// One row per external identity linked to a user, holding its OAuth tokens.
/// Microsoft accounts use the provider id [`MICROSOFT_PROVIDER`]; the
/// calendar module reads and refreshes their tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const MICROSOFT_PROVIDER: &str = "microsoft-entra-id";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExternalAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LinkAccount {
    pub user_id: Uuid,
    pub provider: String,
    pub provider_account_id: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub scope: Option<String>,
}

impl ExternalAccount {
    /// Creates or replaces the link for (provider, provider_account_id)
    pub async fn link(pool: &PgPool, data: LinkAccount) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ExternalAccount>(
            r#"
            INSERT INTO accounts (
                user_id, provider, provider_account_id, access_token, refresh_token, expires_at, scope
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (provider, provider_account_id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, accounts.refresh_token),
                expires_at = EXCLUDED.expires_at,
                scope = EXCLUDED.scope,
                updated_at = NOW()
            RETURNING id, user_id, provider, provider_account_id, access_token, refresh_token,
                      expires_at, scope, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.provider)
        .bind(data.provider_account_id)
        .bind(data.access_token)
        .bind(data.refresh_token)
        .bind(data.expires_at)
        .bind(data.scope)
        .fetch_one(pool)
        .await
    }

    /// Most recently updated link of `provider` for a user
    pub async fn find_for_user(
        pool: &PgPool,
        user_id: Uuid,
        provider: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ExternalAccount>(
            r#"
            SELECT id, user_id, provider, provider_account_id, access_token, refresh_token,
                   expires_at, scope, created_at, updated_at
            FROM accounts
            WHERE user_id = $1 AND provider = $2
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(provider)
        .fetch_optional(pool)
        .await
    }

    /// Stores a refreshed token; keeps the old refresh token if none was issued
    pub async fn update_tokens(
        pool: &PgPool,
        id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET access_token = $2,
                refresh_token = COALESCE($3, refresh_token),
                expires_at = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(())
    }
}
