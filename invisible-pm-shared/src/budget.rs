//! Budget and cost aggregation
//!
//! Every time entry freezes the author's hourly rate at creation time
//! (`rate_snapshot`). Project cost is therefore a plain fold over entries:
//! `hours × rate_snapshot`, with a missing snapshot counting as zero. Later
//! edits to a user's rate never move historical cost.
//!
//! The functions here are pure. Callers load the non-deleted entries for a
//! project (see `TimeEntry::cost_entries_for_projects`) and check the
//! preconditions (project exists, budget module enabled) themselves.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use invisible_pm_shared::budget::{summarize, CostEntry};
//! use rust_decimal::Decimal;
//! use uuid::Uuid;
//!
//! let ana = Uuid::new_v4();
//! let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
//! let entries = vec![CostEntry {
//!     user_id: ana,
//!     user_name: "Ana".into(),
//!     hours: Decimal::from(8),
//!     rate_snapshot: Some(Decimal::from(50)),
//!     date: today,
//! }];
//!
//! let summary = summarize(Some(Decimal::from(10_000)), "USD", &entries, today);
//! assert_eq!(summary.total_cost, Decimal::from(400));
//! assert_eq!(summary.percentage_used, 4);
//! ```

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Length of the burn-rate window, in days
pub const BURN_WINDOW_DAYS: i64 = 7;

/// One non-deleted time entry as seen by the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct CostEntry {
    pub user_id: Uuid,
    pub user_name: String,
    pub hours: Decimal,
    pub rate_snapshot: Option<Decimal>,
    pub date: NaiveDate,
}

impl CostEntry {
    pub fn cost(&self) -> Decimal {
        self.hours * self.rate_snapshot.unwrap_or(Decimal::ZERO)
    }
}

/// Hours and cost attributed to one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserCost {
    pub user_id: Uuid,
    pub name: String,
    pub hours: Decimal,
    pub cost: Decimal,
}

/// Financial state of a single project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub total_budget: Decimal,
    pub total_cost: Decimal,
    /// Negative when the project is over budget
    pub remaining: Decimal,
    pub total_hours: Decimal,
    pub currency: String,
    /// Whole percent of the budget spent, always within 0..=100
    pub percentage_used: u32,
    /// Cost accrued over the trailing [`BURN_WINDOW_DAYS`] days
    pub weekly_burn: Decimal,
    pub breakdown: Vec<UserCost>,
}

/// Rounds half away from zero, the way spreadsheet users expect
fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn money(value: Decimal) -> Decimal {
    round(value, 2)
}

fn hours(value: Decimal) -> Decimal {
    round(value, 1)
}

/// `round(cost / budget × 100)` clamped to 0..=100; zero without a positive budget
pub fn percentage_used(total_cost: Decimal, total_budget: Decimal) -> u32 {
    if total_budget <= Decimal::ZERO {
        return 0;
    }

    let pct = round(total_cost / total_budget * Decimal::ONE_HUNDRED, 0)
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

    pct.to_u32().unwrap_or(100)
}

/// True when `date` falls in `[today - 7 days, today]`
pub fn in_burn_window(date: NaiveDate, today: NaiveDate) -> bool {
    date <= today && date >= today - Duration::days(BURN_WINDOW_DAYS)
}

/// Folds a project's entries into a [`BudgetSummary`]
///
/// The breakdown lists users in the order they first appear in `entries`.
/// A missing `total_budget` is treated as zero.
pub fn summarize(
    total_budget: Option<Decimal>,
    currency: &str,
    entries: &[CostEntry],
    today: NaiveDate,
) -> BudgetSummary {
    let budget = total_budget.unwrap_or(Decimal::ZERO);

    let mut breakdown: Vec<UserCost> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut total_cost = Decimal::ZERO;
    let mut total_hours = Decimal::ZERO;
    let mut weekly_burn = Decimal::ZERO;

    for entry in entries {
        let cost = entry.cost();

        total_cost += cost;
        total_hours += entry.hours;
        if in_burn_window(entry.date, today) {
            weekly_burn += cost;
        }

        let slot = *index.entry(entry.user_id).or_insert_with(|| {
            breakdown.push(UserCost {
                user_id: entry.user_id,
                name: entry.user_name.clone(),
                hours: Decimal::ZERO,
                cost: Decimal::ZERO,
            });
            breakdown.len() - 1
        });
        breakdown[slot].hours += entry.hours;
        breakdown[slot].cost += cost;
    }

    for user in &mut breakdown {
        user.hours = hours(user.hours);
        user.cost = money(user.cost);
    }

    BudgetSummary {
        total_budget: money(budget),
        total_cost: money(total_cost),
        remaining: money(budget - total_cost),
        total_hours: hours(total_hours),
        currency: currency.to_string(),
        percentage_used: percentage_used(total_cost, budget),
        weekly_burn: money(weekly_burn),
        breakdown,
    }
}

/// A project's summary tagged with its identity, for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectBudget {
    pub project_id: Uuid,
    pub project_name: String,
    #[serde(flatten)]
    pub summary: BudgetSummary,
}

/// Workspace-wide budget overview
///
/// Totals add up raw amounts regardless of currency; workspaces are expected
/// to budget in a single currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioOverview {
    pub projects: Vec<ProjectBudget>,
    pub total_budget: Decimal,
    pub total_cost: Decimal,
    pub total_remaining: Decimal,
    pub total_weekly_burn: Decimal,
    pub percentage_used: u32,
}

pub fn summarize_portfolio(projects: Vec<ProjectBudget>) -> PortfolioOverview {
    let (budget, cost, burn) = projects.iter().fold(
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
        |(b, c, w), p| {
            (
                b + p.summary.total_budget,
                c + p.summary.total_cost,
                w + p.summary.weekly_burn,
            )
        },
    );

    PortfolioOverview {
        total_budget: money(budget),
        total_cost: money(cost),
        total_remaining: money(budget - cost),
        total_weekly_burn: money(burn),
        percentage_used: percentage_used(cost, budget),
        projects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn entry(user: Uuid, name: &str, hours: Decimal, rate: Option<Decimal>, date: NaiveDate) -> CostEntry {
        CostEntry {
            user_id: user,
            user_name: name.to_string(),
            hours,
            rate_snapshot: rate,
            date,
        }
    }

    #[test]
    fn test_reference_project() {
        let (ana, luis) = (Uuid::new_v4(), Uuid::new_v4());
        let entries = vec![
            entry(ana, "Ana", dec!(8), Some(dec!(50)), day(2)),
            entry(ana, "Ana", dec!(6), Some(dec!(50)), day(3)),
            entry(luis, "Luis", dec!(4), Some(dec!(100)), day(4)),
        ];

        let s = summarize(Some(dec!(10000)), "USD", &entries, day(20));

        assert_eq!(s.total_cost, dec!(1100.00));
        assert_eq!(s.percentage_used, 11);
        assert_eq!(s.remaining, dec!(8900.00));
        assert_eq!(s.total_hours, dec!(18.0));
        assert_eq!(s.currency, "USD");
        assert_eq!(s.breakdown.len(), 2);
        assert_eq!(s.breakdown[0].name, "Ana");
        assert_eq!(s.breakdown[0].hours, dec!(14));
        assert_eq!(s.breakdown[0].cost, dec!(700));
        assert_eq!(s.breakdown[1].cost, dec!(400));
    }

    #[test]
    fn test_overrun_clamps_percentage_but_not_remaining() {
        let u = Uuid::new_v4();
        let entries = vec![entry(u, "U", dec!(10), Some(dec!(150)), day(1))];

        let s = summarize(Some(dec!(1000)), "EUR", &entries, day(1));

        assert_eq!(s.total_cost, dec!(1500));
        assert_eq!(s.remaining, dec!(-500));
        assert_eq!(s.percentage_used, 100);
    }

    #[test]
    fn test_no_budget_means_zero_percent() {
        let u = Uuid::new_v4();
        let entries = vec![entry(u, "U", dec!(2), Some(dec!(40)), day(1))];

        let none = summarize(None, "USD", &entries, day(1));
        assert_eq!(none.percentage_used, 0);
        assert_eq!(none.total_budget, Decimal::ZERO);
        assert_eq!(none.remaining, dec!(-80));

        let zero = summarize(Some(Decimal::ZERO), "USD", &entries, day(1));
        assert_eq!(zero.percentage_used, 0);
    }

    #[test]
    fn test_missing_rate_costs_nothing_but_counts_hours() {
        let u = Uuid::new_v4();
        let entries = vec![
            entry(u, "U", dec!(3), None, day(1)),
            entry(u, "U", dec!(2), Some(dec!(10)), day(1)),
        ];

        let s = summarize(Some(dec!(100)), "USD", &entries, day(1));
        assert_eq!(s.total_hours, dec!(5));
        assert_eq!(s.total_cost, dec!(20));
        assert_eq!(s.breakdown[0].hours, dec!(5));
    }

    #[test]
    fn test_percentage_rounds_half_away_from_zero() {
        // 12.5% rounds up, not to even
        assert_eq!(percentage_used(dec!(125), dec!(1000)), 13);
        assert_eq!(percentage_used(dec!(124.99), dec!(1000)), 12);
        assert_eq!(percentage_used(dec!(0.4), dec!(1000)), 0);
    }

    #[test]
    fn test_weekly_burn_window_is_inclusive() {
        let u = Uuid::new_v4();
        let today = day(15);
        let entries = vec![
            entry(u, "U", dec!(1), Some(dec!(10)), day(8)),  // exactly 7 days ago
            entry(u, "U", dec!(1), Some(dec!(20)), day(7)),  // 8 days ago
            entry(u, "U", dec!(1), Some(dec!(40)), day(15)), // today
            entry(u, "U", dec!(1), Some(dec!(80)), day(16)), // future-dated
        ];

        let s = summarize(Some(dec!(1000)), "USD", &entries, today);
        assert_eq!(s.weekly_burn, dec!(50));
        assert_eq!(s.total_cost, dec!(150));
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let entries: Vec<CostEntry> = (0..20)
            .map(|i| {
                entry(
                    users[i % 4],
                    "x",
                    Decimal::new(25 + i as i64 * 5, 1),
                    Some(Decimal::new(4550 + i as i64, 2)),
                    day(1 + (i % 28) as u32),
                )
            })
            .collect();

        let s = summarize(Some(dec!(50000)), "USD", &entries, day(28));
        let sum: Decimal = s.breakdown.iter().map(|u| u.cost).sum();

        // per-user costs are exact to the cent here, so no rounding drift
        assert_eq!(sum, s.total_cost);
        assert_eq!(s.breakdown.iter().map(|u| u.user_id).collect::<Vec<_>>(), users);
    }

    #[test]
    fn test_monetary_rounding() {
        let u = Uuid::new_v4();
        // 1.333 h stored as 1.33; 1.33 × 33.33 = 44.3289
        let entries = vec![entry(u, "U", dec!(1.33), Some(dec!(33.33)), day(1))];

        let s = summarize(Some(dec!(100)), "USD", &entries, day(1));
        assert_eq!(s.total_cost, dec!(44.33));
        assert_eq!(s.remaining, dec!(55.67));
        assert_eq!(s.total_hours, dec!(1.3));
        assert_eq!(s.percentage_used, 44);
    }

    #[test]
    fn test_empty_project() {
        let s = summarize(Some(dec!(500)), "USD", &[], day(1));
        assert_eq!(s.total_cost, Decimal::ZERO);
        assert_eq!(s.remaining, dec!(500));
        assert!(s.breakdown.is_empty());
    }

    #[test]
    fn test_portfolio_totals() {
        let u = Uuid::new_v4();
        let a = summarize(
            Some(dec!(1000)),
            "USD",
            &[entry(u, "U", dec!(5), Some(dec!(20)), day(10))],
            day(10),
        );
        let b = summarize(
            Some(dec!(3000)),
            "USD",
            &[entry(u, "U", dec!(10), Some(dec!(30)), day(1))],
            day(10),
        );

        let overview = summarize_portfolio(vec![
            ProjectBudget {
                project_id: Uuid::new_v4(),
                project_name: "A".into(),
                summary: a,
            },
            ProjectBudget {
                project_id: Uuid::new_v4(),
                project_name: "B".into(),
                summary: b,
            },
        ]);

        assert_eq!(overview.total_budget, dec!(4000));
        assert_eq!(overview.total_cost, dec!(400));
        assert_eq!(overview.total_remaining, dec!(3600));
        assert_eq!(overview.total_weekly_burn, dec!(100));
        assert_eq!(overview.percentage_used, 10);
        assert_eq!(overview.projects.len(), 2);
    }

    #[test]
    fn test_project_budget_serializes_flat() {
        let s = summarize(Some(dec!(10)), "USD", &[], day(1));
        let json = serde_json::to_value(ProjectBudget {
            project_id: Uuid::nil(),
            project_name: "P".into(),
            summary: s,
        })
        .unwrap();

        assert_eq!(json["project_name"], "P");
        assert_eq!(json["percentage_used"], 0);
        assert_eq!(json["total_budget"], 10.0);
    }
}
