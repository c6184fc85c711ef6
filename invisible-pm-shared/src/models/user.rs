/// User model and database operations
///
/// A user can belong to several workspaces through `workspace_users`. The
/// `hourly_rate` is the user's *current* rate; time entries copy it into
/// their own `rate_snapshot` when they are created, so editing it here never
/// changes historical cost.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,              -- unique on LOWER(email)
///     password_hash VARCHAR(255),               -- NULL for SSO-only users
///     full_name VARCHAR(255) NOT NULL,
///     hourly_rate NUMERIC(10, 2),               -- >= 0
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     sso_provider_id VARCHAR(255),
///     created_at, updated_at, last_login_at, deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::models::user::{UpdateUser, User};
/// use rust_decimal::Decimal;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// if let Some(user) = User::find_by_email(&pool, "ANA@example.com").await? {
///     User::update(&pool, user.id, UpdateUser {
///         hourly_rate: Some(Some(Decimal::new(6500, 2))),
///         ..Default::default()
///     }).await?;
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const COLUMNS: &str = "id, email, password_hash, full_name, hourly_rate, is_active, \
                       sso_provider_id, created_at, updated_at, last_login_at, deleted_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,

    /// Argon2id PHC string; `None` for users that only sign in through SSO
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub full_name: String,

    /// Current rate, copied into each new time entry
    pub hourly_rate: Option<Decimal>,

    pub is_active: bool,
    pub sso_provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub full_name: String,
    pub hourly_rate: Option<Decimal>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub full_name: Option<String>,

    /// `Some(None)` clears the rate
    pub hourly_rate: Option<Option<Decimal>>,

    pub is_active: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.hourly_rate.is_none() && self.is_active.is_none()
    }
}

impl User {
    /// Inserts a user; emails are stored as given and compared case-insensitively
    ///
    /// # Errors
    ///
    /// A duplicate email surfaces as a unique violation on `users_email_key`.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, full_name, hourly_rate)
            VALUES (TRIM($1), $2, $3, $4)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.full_name)
        .bind(data.hourly_rate)
        .fetch_one(executor)
        .await
    }

    /// Finds a non-deleted user by id
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Case-insensitive email lookup over non-deleted users
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users WHERE LOWER(email) = LOWER(TRIM($1)) AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Applies the non-`None` fields of `data` and bumps `updated_at`
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.full_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", full_name = ${}", bind_count));
        }
        if data.hourly_rate.is_some() {
            bind_count += 1;
            query.push_str(&format!(", hourly_rate = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND deleted_at IS NULL RETURNING {COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(full_name) = data.full_name {
            q = q.bind(full_name);
        }
        if let Some(rate) = data.hourly_rate {
            q = q.bind(rate);
        }
        if let Some(active) = data.is_active {
            q = q.bind(active);
        }

        q.fetch_optional(executor).await
    }

    pub async fn set_password_hash<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Whether this user can sign in with a password at all
    pub fn can_login(&self) -> bool {
        self.is_active && self.deleted_at.is_none() && self.password_hash.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            password_hash: Some("$argon2id$...".into()),
            full_name: "Ana".into(),
            hourly_rate: None,
            is_active: true,
            sso_provider_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ana@example.com");
    }

    #[test]
    fn test_can_login() {
        assert!(user().can_login());

        let sso_only = User { password_hash: None, ..user() };
        assert!(!sso_only.can_login());

        let inactive = User { is_active: false, ..user() };
        assert!(!inactive.can_login());

        let deleted = User { deleted_at: Some(Utc::now()), ..user() };
        assert!(!deleted.can_login());
    }

    #[test]
    fn test_update_user_default_is_empty() {
        assert!(UpdateUser::default().is_empty());
        assert!(!UpdateUser {
            hourly_rate: Some(None),
            ..Default::default()
        }
        .is_empty());
    }
}
