/// Microsoft Graph calendar client
///
/// Thin REST wrapper over the three Graph calls the app needs: `/me`,
/// `/me/calendarView` and the Entra ID token endpoint. Event times are
/// requested in UTC (`Prefer: outlook.timezone="UTC"`) so they can be parsed
/// without time-zone tables.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use reqwest::header;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::provider::{CalendarProvider, CalendarQuery, RefreshedToken};
use super::{CalendarError, CalendarEvent, CalendarProfile, CalendarResult};

pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";

/// Scopes requested when refreshing a token
pub const GRAPH_SCOPES: &str = "openid profile email User.Read Calendars.Read offline_access";

const EVENT_FIELDS: &str = "id,subject,start,end,organizer,isAllDay";

/// App registration used for token refresh
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Entra tenant, `common` for multi-tenant apps
    pub tenant_id: String,
    pub graph_base_url: String,
    pub login_base_url: String,
}

impl GraphConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
            graph_base_url: GRAPH_BASE_URL.to_string(),
            login_base_url: LOGIN_BASE_URL.to_string(),
        }
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base_url.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    config: GraphConfig,
}

impl GraphClient {
    pub fn new(config: GraphConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.graph_base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> CalendarResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Graph request failed");
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    display_name: Option<String>,
    mail: Option<String>,
    user_principal_name: Option<String>,
    job_title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: String,
    subject: Option<String>,
    start: GraphDateTime,
    end: GraphDateTime,
    #[serde(default)]
    is_all_day: bool,
    organizer: Option<GraphRecipient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecipient {
    email_address: Option<GraphEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

/// Parses Graph's zone-less `dateTime` (e.g. `2026-03-02T09:00:00.0000000`) as UTC
pub(crate) fn parse_graph_datetime(value: &str) -> CalendarResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| CalendarError::InvalidPayload(format!("bad dateTime {value:?}: {e}")))
}

impl TryFrom<GraphEvent> for CalendarEvent {
    type Error = CalendarError;

    fn try_from(event: GraphEvent) -> Result<Self, Self::Error> {
        Ok(CalendarEvent {
            start: parse_graph_datetime(&event.start.date_time)?,
            end: parse_graph_datetime(&event.end.date_time)?,
            id: event.id,
            subject: event.subject.unwrap_or_default(),
            is_all_day: event.is_all_day,
            organizer: event
                .organizer
                .and_then(|o| o.email_address)
                .and_then(|e| e.name)
                .filter(|n| !n.is_empty()),
        })
    }
}

#[async_trait]
impl CalendarProvider for GraphClient {
    async fn profile(&self, access_token: &str) -> CalendarResult<CalendarProfile> {
        let request = self
            .client
            .get(self.url("/me"))
            .bearer_auth(access_token)
            .query(&[("$select", "displayName,mail,userPrincipalName,jobTitle")]);

        let user: GraphUser = self.get_json(request).await?;

        Ok(CalendarProfile {
            display_name: user.display_name,
            email: user.mail.or(user.user_principal_name),
            job_title: user.job_title,
        })
    }

    async fn calendar_view(
        &self,
        access_token: &str,
        query: &CalendarQuery,
    ) -> CalendarResult<Vec<CalendarEvent>> {
        let orderby = if query.descending {
            "start/dateTime desc"
        } else {
            "start/dateTime"
        };

        let request = self
            .client
            .get(self.url("/me/calendarView"))
            .bearer_auth(access_token)
            .header(header::HeaderName::from_static("prefer"), r#"outlook.timezone="UTC""#)
            .query(&[
                ("startDateTime", query.from.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("endDateTime", query.to.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("$select", EVENT_FIELDS.to_string()),
                ("$orderby", orderby.to_string()),
                ("$top", query.top.to_string()),
            ]);

        let list: GraphList<GraphEvent> = self.get_json(request).await?;
        debug!(count = list.value.len(), "Fetched calendar events");

        list.value.into_iter().map(CalendarEvent::try_from).collect()
    }

    async fn refresh_token(&self, refresh_token: &str) -> CalendarResult<RefreshedToken> {
        let response = self
            .client
            .post(self.config.token_url())
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", GRAPH_SCOPES),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CalendarError::Refresh(format!("{status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: Utc::now().timestamp() + token.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_graph_datetime_without_zone() {
        let dt = parse_graph_datetime("2026-03-02T09:30:00.0000000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_graph_datetime_rfc3339() {
        let dt = parse_graph_datetime("2026-03-02T09:30:00Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap());
        assert!(parse_graph_datetime("yesterday").is_err());
    }

    #[test]
    fn test_event_payload_conversion() {
        let payload = serde_json::json!({
            "value": [{
                "id": "AAMk-1",
                "subject": "Daily",
                "isAllDay": false,
                "start": { "dateTime": "2026-03-02T09:00:00.0000000", "timeZone": "UTC" },
                "end": { "dateTime": "2026-03-02T09:45:00.0000000", "timeZone": "UTC" },
                "organizer": { "emailAddress": { "name": "Marta", "address": "marta@example.com" } }
            }, {
                "id": "AAMk-2",
                "start": { "dateTime": "2026-03-03T00:00:00.0000000", "timeZone": "UTC" },
                "end": { "dateTime": "2026-03-04T00:00:00.0000000", "timeZone": "UTC" },
                "isAllDay": true
            }]
        });

        let list: GraphList<GraphEvent> = serde_json::from_value(payload).unwrap();
        let events: Vec<CalendarEvent> = list
            .value
            .into_iter()
            .map(CalendarEvent::try_from)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].subject, "Daily");
        assert_eq!(events[0].organizer.as_deref(), Some("Marta"));
        assert_eq!(events[0].duration_hours(), rust_decimal::Decimal::new(75, 2));
        assert!(events[1].is_all_day);
        assert_eq!(events[1].subject, "");
    }

    #[test]
    fn test_token_url_uses_tenant() {
        let config = GraphConfig::new("id", "secret", "contoso.onmicrosoft.com");
        assert_eq!(
            config.token_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }
}
