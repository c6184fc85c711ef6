/// Time-entry suggestions from calendar events
///
/// Meetings from the last week that are not all-day and not yet registered
/// as time entries are offered to the user, each with its duration rounded
/// to two decimals and floored at [`MIN_SUGGESTION_HOURS`].

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::provider::CalendarQuery;
use super::CalendarEvent;

/// Lookback of the suggestion window
pub const SUGGESTION_WINDOW_DAYS: i64 = 7;
pub const SUGGESTION_LIMIT: u32 = 50;
/// Upper bound for explicit range queries
pub const RANGE_LIMIT: u32 = 100;
/// Shortest suggestion offered, in hours
pub const MIN_SUGGESTION_HOURS: Decimal = dec!(0.25);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub event_id: String,
    pub subject: String,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub organizer: Option<String>,
}

/// Event as returned by the range endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: String,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_hours: Decimal,
    pub organizer: Option<String>,
}

/// Hours between `start` and `end`, two decimals, half away from zero.
/// Negative spans yield zero.
pub fn duration_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let seconds = (end - start).num_seconds().max(0);
    (Decimal::from(seconds) / dec!(3600))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The last seven days up to `now`, newest first
pub fn suggestion_window(now: DateTime<Utc>) -> CalendarQuery {
    CalendarQuery {
        from: now - Duration::days(SUGGESTION_WINDOW_DAYS),
        to: now,
        top: SUGGESTION_LIMIT,
        descending: true,
    }
}

/// Whole days `from..=to`, oldest first
pub fn range_window(from: NaiveDate, to: NaiveDate) -> CalendarQuery {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);

    CalendarQuery {
        from: from.and_time(NaiveTime::MIN).and_utc(),
        to: to.and_time(end_of_day).and_utc(),
        top: RANGE_LIMIT,
        descending: false,
    }
}

/// Timed events only, with durations
pub fn summarize_events(events: Vec<CalendarEvent>) -> Vec<EventSummary> {
    events
        .into_iter()
        .filter(|e| !e.is_all_day)
        .map(|e| EventSummary {
            duration_hours: e.duration_hours(),
            id: e.id,
            subject: e.subject,
            start: e.start,
            end: e.end,
            organizer: e.organizer,
        })
        .collect()
}

/// Drops all-day events and those whose id is in `registered`
pub fn build_suggestions(
    events: Vec<CalendarEvent>,
    registered: &HashSet<String>,
) -> Vec<Suggestion> {
    events
        .into_iter()
        .filter(|e| !e.is_all_day && !registered.contains(&e.id))
        .map(|e| Suggestion {
            hours: e.duration_hours().max(MIN_SUGGESTION_HOURS),
            date: e.start.date_naive(),
            event_id: e.id,
            subject: e.subject,
            organizer: e.organizer,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(id: &str, start_h: u32, minutes: i64, all_day: bool) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, start_h, 0, 0).unwrap();
        CalendarEvent {
            id: id.to_string(),
            subject: format!("Meeting {id}"),
            start,
            end: start + Duration::minutes(minutes),
            is_all_day: all_day,
            organizer: Some("Ana".to_string()),
        }
    }

    #[test]
    fn test_duration_hours_rounding() {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert_eq!(duration_hours(start, start + Duration::minutes(90)), dec!(1.50));
        // 20 minutes = 0.3333..
        assert_eq!(duration_hours(start, start + Duration::minutes(20)), dec!(0.33));
        // 27 seconds = 0.0075 -> 0.01
        assert_eq!(duration_hours(start, start + Duration::seconds(27)), dec!(0.01));
        assert_eq!(duration_hours(start, start - Duration::minutes(5)), Decimal::ZERO);
    }

    #[test]
    fn test_build_suggestions_filters_and_floors() {
        let events = vec![
            event("a", 9, 60, false),
            event("b", 11, 5, false),
            event("c", 0, 1440, true),
            event("d", 15, 30, false),
        ];
        let registered: HashSet<String> = ["d".to_string()].into_iter().collect();

        let suggestions = build_suggestions(events, &registered);

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].event_id, "a");
        assert_eq!(suggestions[0].hours, dec!(1.00));
        assert_eq!(suggestions[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(suggestions[1].event_id, "b");
        assert_eq!(suggestions[1].hours, MIN_SUGGESTION_HOURS);
    }

    #[test]
    fn test_summarize_events_skips_all_day() {
        let summaries = summarize_events(vec![event("a", 9, 45, false), event("c", 0, 1440, true)]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].duration_hours, dec!(0.75));
    }

    #[test]
    fn test_windows() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let q = suggestion_window(now);
        assert_eq!(q.from, Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap());
        assert_eq!(q.top, 50);
        assert!(q.descending);

        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let q = range_window(d(2), d(6));
        assert_eq!(q.from, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
        assert_eq!(q.to, Utc.with_ymd_and_hms(2026, 3, 6, 23, 59, 59).unwrap());
        assert_eq!(q.top, 100);
        assert!(!q.descending);
    }
}
