/// Calendar provider contract
///
/// Handlers never talk to Microsoft Graph directly; they go through this
/// trait so tests can swap in a canned provider.
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use invisible_pm_shared::calendar::{
///     CalendarEvent, CalendarProfile, CalendarProvider, CalendarQuery, CalendarResult, RefreshedToken,
/// };
///
/// struct EmptyCalendar;
///
/// #[async_trait]
/// impl CalendarProvider for EmptyCalendar {
///     async fn profile(&self, _token: &str) -> CalendarResult<CalendarProfile> {
///         Ok(CalendarProfile { display_name: None, email: None, job_title: None })
///     }
///
///     async fn calendar_view(&self, _token: &str, _q: &CalendarQuery) -> CalendarResult<Vec<CalendarEvent>> {
///         Ok(Vec::new())
///     }
///
///     async fn refresh_token(&self, _refresh_token: &str) -> CalendarResult<RefreshedToken> {
///         unimplemented!()
///     }
/// }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CalendarEvent, CalendarProfile, CalendarResult};

/// A `calendarView` window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    /// Maximum events returned
    pub top: u32,
    /// Newest first when set
    pub descending: bool,
}

/// Result of exchanging a refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Present when the provider rotated the refresh token
    pub refresh_token: Option<String>,
    /// Unix seconds
    pub expires_at: i64,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Profile of the account behind `access_token`
    async fn profile(&self, access_token: &str) -> CalendarResult<CalendarProfile>;

    /// Events overlapping the query window
    async fn calendar_view(
        &self,
        access_token: &str,
        query: &CalendarQuery,
    ) -> CalendarResult<Vec<CalendarEvent>>;

    /// Exchanges a refresh token for a fresh access token
    async fn refresh_token(&self, refresh_token: &str) -> CalendarResult<RefreshedToken>;
}
