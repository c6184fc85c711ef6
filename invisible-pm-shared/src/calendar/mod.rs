/// Outlook calendar integration
///
/// Reads a user's Microsoft 365 calendar so meetings can be turned into time
/// entries with one click. The pieces:
///
/// - [`provider`]: the [`CalendarProvider`] trait the HTTP layer talks to
/// - [`graph`]: [`GraphClient`], the Microsoft Graph implementation
/// - [`token`]: stored OAuth tokens and their refresh
/// - [`suggestions`]: turning raw events into time-entry suggestions
///
/// # Example
///
/// ```no_run
/// use invisible_pm_shared::calendar::{token, CalendarProvider, GraphClient, GraphConfig};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let graph = GraphClient::new(GraphConfig::new("client-id", "client-secret", "common"));
///
/// if let Some(access_token) = token::access_token_for(&pool, &graph, user_id).await? {
///     let me = graph.profile(&access_token).await?;
///     println!("{}", me.display_name.unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```

pub mod graph;
pub mod provider;
pub mod suggestions;
pub mod token;

pub use graph::{GraphClient, GraphConfig};
pub use provider::{CalendarProvider, CalendarQuery, RefreshedToken};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("Calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected calendar payload: {0}")]
    InvalidPayload(String),

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type CalendarResult<T> = Result<T, CalendarError>;

/// Profile of the linked Microsoft account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarProfile {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub job_title: Option<String>,
}

/// A calendar event normalized to UTC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub organizer: Option<String>,
}

impl CalendarEvent {
    /// Length in hours, rounded to two decimals
    pub fn duration_hours(&self) -> Decimal {
        suggestions::duration_hours(self.start, self.end)
    }
}
