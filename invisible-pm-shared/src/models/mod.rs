/// Database models for Invisible PM
///
/// Each model owns its SQL. Tenant scoping happens here: lookups that take a
/// `workspace_id` join through `projects` so a row from another workspace is
/// indistinguishable from a missing one. Deletes are soft (`deleted_at`) and
/// every read filters them out.
///
/// # Models
///
/// - `workspace`: Tenants
/// - `user`: Accounts, hourly rates, password hashes
/// - `membership`: User ↔ workspace link carrying the role
/// - `project`: Projects with budget and module toggles
/// - `task`: Kanban tasks ordered by position within a status column
/// - `time_entry`: Logged hours with a frozen rate snapshot
/// - `audit_log`: Append-only change log
/// - `account`: Linked external identity (Microsoft) and its OAuth tokens
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::db::pool::{create_pool, DatabaseConfig};
/// use invisible_pm_shared::models::user::{CreateUser, User};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "ana@example.com".to_string(),
///     password_hash: None,
///     full_name: "Ana Pérez".to_string(),
///     hourly_rate: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod audit_log;
pub mod membership;
pub mod project;
pub mod task;
pub mod time_entry;
pub mod user;
pub mod workspace;
