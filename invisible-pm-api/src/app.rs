/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use invisible_pm_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use invisible_pm_shared::{
    auth::middleware::authenticate,
    calendar::{CalendarProvider, GraphClient, GraphConfig},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Outlook calendar backend; Microsoft Graph unless a test swaps it
    pub calendar: Arc<dyn CalendarProvider>,
}

impl AppState {
    /// State backed by the real Microsoft Graph client
    pub fn new(db: PgPool, config: Config) -> Self {
        let graph = GraphClient::new(GraphConfig::new(
            config.microsoft.client_id.clone(),
            config.microsoft.client_secret.clone(),
            config.microsoft.tenant_id.clone(),
        ));

        Self::with_calendar(db, config, Arc::new(graph))
    }

    pub fn with_calendar(db: PgPool, config: Config, calendar: Arc<dyn CalendarProvider>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            calendar,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// ```text
/// /health                                 public
/// /v1/auth/{register,login,refresh}       public
/// /v1/me, /v1/me/password                 JWT
/// /v1/workspaces, /v1/roles               JWT
/// /v1/users, /v1/users/:id                JWT
/// /v1/projects[/:id[/budget]]             JWT
/// /v1/tasks[/:id]                         JWT
/// /v1/time-entries[/:id]                  JWT
/// /v1/dashboard/{stats,budget}            JWT
/// /v1/integrations/me                     JWT
/// /v1/integrations/calendar[/suggestions|/accept]
/// ```
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let protected_routes = Router::new()
        .route("/me", get(routes::me::get_me))
        .route("/me/password", patch(routes::me::change_password))
        .route("/workspaces", get(routes::workspaces::list_workspaces))
        .route("/roles", get(routes::workspaces::list_roles))
        .route("/users", get(routes::users::list_users))
        .route("/users/:id", patch(routes::users::update_user))
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:id",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/projects/:id/budget", get(routes::projects::get_project_budget))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/time-entries",
            get(routes::time_entries::list_time_entries)
                .post(routes::time_entries::create_time_entry),
        )
        .route(
            "/time-entries/:id",
            axum::routing::delete(routes::time_entries::delete_time_entry),
        )
        .route("/dashboard/stats", get(routes::dashboard::stats))
        .route("/dashboard/budget", get(routes::dashboard::budget_overview))
        .route("/integrations/me", get(routes::integrations::microsoft_profile))
        .route("/integrations/calendar", get(routes::integrations::calendar_events))
        .route(
            "/integrations/calendar/suggestions",
            get(routes::integrations::calendar_suggestions),
        )
        .route(
            "/integrations/calendar/accept",
            post(routes::integrations::accept_suggestion),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Resolves the bearer token into an `AuthContext` request extension
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = authenticate(&state.db, state.jwt_secret(), req.headers()).await?;
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
