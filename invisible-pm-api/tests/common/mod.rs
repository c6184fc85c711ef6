//! Common test utilities for integration tests
//!
//! - Test database setup and cleanup
//! - Workspace/member seeding and JWT minting
//! - A canned calendar provider standing in for Microsoft Graph
//! - Request helper returning status and parsed JSON
//!
//! Tests are skipped when `DATABASE_URL` is not set.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::{DateTime, Utc};
use invisible_pm_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig, MicrosoftConfig},
};
use invisible_pm_shared::{
    auth::{authorization::Role, jwt::issue_token_pair},
    calendar::{
        CalendarError, CalendarEvent, CalendarProfile, CalendarProvider, CalendarQuery,
        CalendarResult, RefreshedToken,
    },
    db::migrations::run_migrations,
    models::{
        account::{ExternalAccount, LinkAccount, MICROSOFT_PROVIDER},
        membership::{CreateMembership, Membership},
        user::{CreateUser, User},
        workspace::{CreateWorkspace, Workspace},
    },
};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Calendar provider returning whatever events the test loaded
#[derive(Default)]
pub struct MockCalendar {
    events: Mutex<Vec<CalendarEvent>>,
    fail_refresh: AtomicBool,
}

impl MockCalendar {
    pub fn set_events(&self, events: Vec<CalendarEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CalendarProvider for MockCalendar {
    async fn profile(&self, _access_token: &str) -> CalendarResult<CalendarProfile> {
        Ok(CalendarProfile {
            display_name: Some("Test Consultant".to_string()),
            email: Some("consultant@contoso.com".to_string()),
            job_title: Some("Consultant".to_string()),
        })
    }

    async fn calendar_view(
        &self,
        _access_token: &str,
        _query: &CalendarQuery,
    ) -> CalendarResult<Vec<CalendarEvent>> {
        Ok(self.events.lock().unwrap().clone())
    }

    async fn refresh_token(&self, _refresh_token: &str) -> CalendarResult<RefreshedToken> {
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(CalendarError::Refresh("invalid_grant".to_string()));
        }

        Ok(RefreshedToken {
            access_token: "refreshed-access-token".to_string(),
            refresh_token: None,
            expires_at: Utc::now().timestamp() + 3600,
        })
    }
}

pub fn event(id: &str, start: DateTime<Utc>, minutes: i64, is_all_day: bool) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        subject: format!("Meeting {id}"),
        start,
        end: start + chrono::Duration::minutes(minutes),
        is_all_day,
        organizer: Some("Ana Pérez".to_string()),
    }
}

/// A workspace member with a ready-to-use access token
pub struct Member {
    pub user: User,
    pub token: String,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub calendar: Arc<MockCalendar>,
    pub workspace: Workspace,
    /// Admin of `workspace`
    pub admin: Member,
    users: Mutex<Vec<Uuid>>,
    workspaces: Mutex<Vec<Uuid>>,
}

pub fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
        microsoft: MicrosoftConfig {
            client_id: String::new(),
            client_secret: String::new(),
            tenant_id: "common".to_string(),
        },
    }
}

impl TestContext {
    /// Fresh workspace with an Admin, or `None` when no database is configured
    pub async fn try_new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        };

        Some(Self::new(url).await.expect("Failed to create test context"))
    }

    async fn new(database_url: String) -> anyhow::Result<Self> {
        let db = PgPool::connect(&database_url).await?;
        run_migrations(&db).await?;

        let calendar = Arc::new(MockCalendar::default());
        let state = AppState::with_calendar(
            db.clone(),
            test_config(database_url),
            calendar.clone(),
        );
        let app = build_router(state);

        let workspace = Workspace::create(
            &db,
            CreateWorkspace {
                name: format!("Test Workspace {}", Uuid::new_v4()),
                domain: None,
            },
        )
        .await?;

        let admin = seed_member(&db, workspace.id, Role::Admin, Some(Decimal::from(50))).await?;

        Ok(Self {
            users: Mutex::new(vec![admin.user.id]),
            workspaces: Mutex::new(vec![workspace.id]),
            db,
            app,
            calendar,
            workspace,
            admin,
        })
    }

    /// Creates a user with `role` in the test workspace and mints their token
    pub async fn add_member(&self, role: Role, hourly_rate: Option<Decimal>) -> anyhow::Result<Member> {
        let member = seed_member(&self.db, self.workspace.id, role, hourly_rate).await?;
        self.track_user(member.user.id);
        Ok(member)
    }

    /// Links a Microsoft account whose access token expires at `expires_at`
    pub async fn link_microsoft(&self, user_id: Uuid, expires_at: i64) -> anyhow::Result<()> {
        ExternalAccount::link(
            &self.db,
            LinkAccount {
                user_id,
                provider: MICROSOFT_PROVIDER.to_string(),
                provider_account_id: Uuid::new_v4().to_string(),
                access_token: Some("stored-access-token".to_string()),
                refresh_token: Some("stored-refresh-token".to_string()),
                expires_at: Some(expires_at),
                scope: Some("Calendars.Read User.Read offline_access".to_string()),
            },
        )
        .await?;
        Ok(())
    }

    /// Registers rows created through the API so cleanup removes them
    pub fn track_user(&self, id: Uuid) {
        self.users.lock().unwrap().push(id);
    }

    pub fn track_workspace(&self, id: Uuid) {
        self.workspaces.lock().unwrap().push(id);
    }

    /// Sends a request through the router and parses the JSON body
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Removes every row this context created
    ///
    /// Workspaces cascade to memberships, projects, tasks and time entries;
    /// users cascade to accounts.
    pub async fn cleanup(self) -> anyhow::Result<()> {
        let users = self.users.lock().unwrap().clone();
        let workspaces = self.workspaces.lock().unwrap().clone();

        sqlx::query("DELETE FROM audit_logs WHERE user_id = ANY($1)")
            .bind(&users)
            .execute(&self.db)
            .await?;

        sqlx::query("DELETE FROM workspaces WHERE id = ANY($1)")
            .bind(&workspaces)
            .execute(&self.db)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&users)
            .execute(&self.db)
            .await?;

        self.db.close().await;
        Ok(())
    }
}

async fn seed_member(
    db: &PgPool,
    workspace_id: Uuid,
    role: Role,
    hourly_rate: Option<Decimal>,
) -> anyhow::Result<Member> {
    let user = User::create(
        db,
        CreateUser {
            email: format!("{}-{}@example.com", role.as_str().to_lowercase(), Uuid::new_v4()),
            password_hash: None,
            full_name: format!("Test {}", role.as_str()),
            hourly_rate,
        },
    )
    .await?;

    Membership::create(
        db,
        CreateMembership {
            workspace_id,
            user_id: user.id,
            role,
        },
    )
    .await?;

    let token = issue_token_pair(user.id, workspace_id, TEST_JWT_SECRET)?.access_token;
    Ok(Member { user, token })
}

/// Reads a JSON number (decimals serialize as floats)
pub fn num(value: &Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("expected a number, got {value}"))
}
