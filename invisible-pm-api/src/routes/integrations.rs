/// Microsoft 365 integration endpoints
///
/// - `GET /v1/integrations/me`: profile of the linked Microsoft account
/// - `GET /v1/integrations/calendar?from=&to=`: timed events in a date range
/// - `GET /v1/integrations/calendar/suggestions`: last week's meetings not yet logged
/// - `POST /v1/integrations/calendar/accept`: log a suggestion as an OUTLOOK entry
///
/// A user without a linked account (or whose token cannot be refreshed) gets
/// `404`; Graph failures surface as `502`.

use super::time_entries::{check_hours, record_entry, trackable_task};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use invisible_pm_shared::{
    auth::{
        authorization::{require_permission, Permission},
        middleware::AuthContext,
    },
    calendar::{
        suggestions::{self, EventSummary, Suggestion},
        token,
    },
    models::time_entry::{CreateTimeEntry, TimeEntry, TimeEntrySource},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct MicrosoftProfileResponse {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub job_title: Option<String>,
    pub connected: bool,
}

#[derive(Debug, Serialize)]
pub struct CalendarEventsResponse {
    pub events: Vec<EventSummary>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptSuggestionRequest {
    pub task_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub external_event_id: String,
    pub description: Option<String>,
}

async fn linked_token(state: &AppState, ctx: &AuthContext) -> ApiResult<String> {
    token::access_token_for(&state.db, state.calendar.as_ref(), ctx.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No Microsoft account linked".to_string()))
}

pub async fn microsoft_profile(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<MicrosoftProfileResponse>> {
    let access_token = linked_token(&state, &ctx).await?;
    let profile = state.calendar.profile(&access_token).await?;

    Ok(Json(MicrosoftProfileResponse {
        display_name: profile.display_name,
        email: profile.email,
        job_title: profile.job_title,
        connected: true,
    }))
}

pub async fn calendar_events(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<CalendarRangeQuery>,
) -> ApiResult<Json<CalendarEventsResponse>> {
    let (Some(from), Some(to)) = (query.from, query.to) else {
        return Err(ApiError::BadRequest("from and to are required".to_string()));
    };
    if to < from {
        return Err(ApiError::BadRequest("to must not be before from".to_string()));
    }

    let access_token = linked_token(&state, &ctx).await?;
    let events = state
        .calendar
        .calendar_view(&access_token, &suggestions::range_window(from, to))
        .await?;

    Ok(Json(CalendarEventsResponse {
        events: suggestions::summarize_events(events),
    }))
}

pub async fn calendar_suggestions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<SuggestionsResponse>> {
    let access_token = linked_token(&state, &ctx).await?;
    let events = state
        .calendar
        .calendar_view(&access_token, &suggestions::suggestion_window(Utc::now()))
        .await?;

    let ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
    let registered: HashSet<String> = TimeEntry::registered_event_ids(&state.db, ctx.user_id, &ids)
        .await?
        .into_iter()
        .collect();

    let suggestions = suggestions::build_suggestions(events, &registered);
    debug!(
        user_id = %ctx.user_id,
        fetched = ids.len(),
        suggested = suggestions.len(),
        "Built calendar suggestions"
    );

    Ok(Json(SuggestionsResponse { suggestions }))
}

/// `POST /v1/integrations/calendar/accept`
///
/// # Errors
///
/// - `409`: the event is already logged
/// - `403`: time tracking is off for the task's project
pub async fn accept_suggestion(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<AcceptSuggestionRequest>,
) -> ApiResult<(StatusCode, Json<TimeEntry>)> {
    require_permission(&ctx, Permission::TimeEntryCreate)?;
    check_hours(req.hours)?;

    let event_id = req.external_event_id.trim();
    if event_id.is_empty() {
        return Err(ApiError::invalid_field(
            "external_event_id",
            "external_event_id is required",
        ));
    }

    let task = trackable_task(&state, &ctx, req.task_id).await?;

    if TimeEntry::is_event_registered(&state.db, ctx.user_id, event_id).await? {
        return Err(ApiError::Conflict(
            "Calendar event already registered".to_string(),
        ));
    }

    let entry = record_entry(
        &state,
        &ctx,
        CreateTimeEntry {
            task_id: task.task_id,
            user_id: ctx.user_id,
            date: req.date,
            hours: req.hours,
            description: req.description,
            source: TimeEntrySource::Outlook,
            external_event_id: Some(event_id.to_string()),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}
