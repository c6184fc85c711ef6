/// Integration tests for database migrations
///
/// These tests require a running PostgreSQL database and are skipped when
/// `DATABASE_URL` is not set.
/// Run with: cargo test --test db_migrations_tests -- --test-threads=1

use invisible_pm_shared::db::migrations::{
    ensure_database_exists, get_migration_status, run_migrations,
};
use invisible_pm_shared::db::pool::{close_pool, create_pool, DatabaseConfig};
use sqlx::PgPool;
use std::env;

fn test_database_url() -> Option<String> {
    match env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping");
            None
        }
    }
}

async fn migrated_pool(url: String) -> PgPool {
    ensure_database_exists(&url)
        .await
        .expect("Failed to create database");

    let pool = create_pool(DatabaseConfig::new(url))
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Migrations failed");
    pool
}

#[tokio::test]
async fn test_ensure_database_exists() {
    let Some(url) = test_database_url() else { return };

    // Succeeds whether or not the database already exists
    let result = ensure_database_exists(&url).await;
    assert!(result.is_ok(), "Failed to ensure database exists: {:?}", result.err());
}

#[tokio::test]
async fn test_run_migrations() {
    let Some(url) = test_database_url() else { return };
    let pool = migrated_pool(url).await;

    let status = get_migration_status(&pool)
        .await
        .expect("Failed to get migration status");
    assert!(status.applied_migrations > 0, "No migrations were applied");
    assert!(status.is_up_to_date);
    assert_eq!(status.latest_version, Some(20260301000001));

    close_pool(pool).await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let Some(url) = test_database_url() else { return };
    let pool = migrated_pool(url).await;

    let before = get_migration_status(&pool).await.expect("status");
    run_migrations(&pool).await.expect("Second run failed");
    let after = get_migration_status(&pool).await.expect("status");

    assert_eq!(before, after);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_schema_tables_exist() {
    let Some(url) = test_database_url() else { return };
    let pool = migrated_pool(url).await;

    for table in [
        "workspaces",
        "users",
        "workspace_users",
        "projects",
        "tasks",
        "time_entries",
        "audit_logs",
        "accounts",
    ] {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .expect("Query failed");

        assert!(exists, "Table {table} should exist");
    }

    close_pool(pool).await;
}

#[tokio::test]
async fn test_enum_types_exist() {
    let Some(url) = test_database_url() else { return };
    let pool = migrated_pool(url).await;

    let labels: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT e.enumlabel::text
        FROM pg_enum e
        JOIN pg_type t ON t.oid = e.enumtypid
        WHERE t.typname = 'workspace_role'
        ORDER BY e.enumsortorder
        "#,
    )
    .fetch_all(&pool)
    .await
    .expect("Query failed");

    assert_eq!(labels, vec!["Admin", "PM", "Consultor", "Cliente"]);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_email_uniqueness_is_case_insensitive() {
    let Some(url) = test_database_url() else { return };
    let pool = migrated_pool(url).await;

    let email = format!("case-{}@example.com", uuid::Uuid::new_v4());

    sqlx::query("INSERT INTO users (email, full_name) VALUES ($1, 'Lower')")
        .bind(&email)
        .execute(&pool)
        .await
        .expect("First insert failed");

    let duplicate = sqlx::query("INSERT INTO users (email, full_name) VALUES ($1, 'Upper')")
        .bind(email.to_uppercase())
        .execute(&pool)
        .await;

    let err = duplicate.expect_err("Uppercase duplicate should be rejected");
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.constraint(), Some("users_email_key"));

    sqlx::query("DELETE FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(&email)
        .execute(&pool)
        .await
        .expect("Cleanup failed");

    close_pool(pool).await;
}
