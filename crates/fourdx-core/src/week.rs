//! ISO-8601 week identifiers.
//!
//! Every entity in fourdx is partitioned by [`WeekId`], rendered as
//! `YYYY-Www` (`2025-W07`). Weeks start on Monday and belong to the year that
//! contains their Thursday, so `2024-12-31` is in `2025-W01` and `2023-01-01`
//! is in `2022-W52`.
//!
//! Navigation never does arithmetic on the week number directly: it picks an
//! anchor date inside the week, shifts it by whole weeks, and derives the
//! identifier again through [`week_id_of`].

use crate::error::{FourdxError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// WeekId
// ---------------------------------------------------------------------------

/// Canonical week identifier. Ordering matches the lexicographic ordering of
/// the rendered string because the year is four digits and the week is
/// zero-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WeekId {
    year: i32,
    week: u32,
}

impl WeekId {
    /// Build a week id, rejecting weeks the ISO year does not have.
    pub fn new(year: i32, week: u32) -> Result<Self> {
        if !(1000..=9999).contains(&year) || week == 0 || week > weeks_in_year(year) {
            return Err(FourdxError::InvalidWeekId(format!("{year}-W{week:02}")));
        }
        Ok(Self { year, week })
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn week(self) -> u32 {
        self.week
    }

    /// Human-readable form: `2025 Week 07`.
    pub fn display(self) -> String {
        format!("{} Week {:02}", self.year, self.week)
    }

    /// A date guaranteed to fall inside this week (its Thursday).
    fn anchor(self) -> NaiveDate {
        first_thursday(self.year) + Duration::weeks(i64::from(self.week) - 1)
    }

    /// The Monday this week starts on.
    pub fn monday(self) -> NaiveDate {
        self.anchor() - Duration::days(3)
    }

    /// The Sunday this week ends on.
    pub fn sunday(self) -> NaiveDate {
        self.anchor() + Duration::days(3)
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

static WEEK_ID_RE: OnceLock<Regex> = OnceLock::new();

fn week_id_re() -> &'static Regex {
    WEEK_ID_RE.get_or_init(|| Regex::new(r"^(\d{4})-W(\d{2})$").unwrap())
}

impl FromStr for WeekId {
    type Err = FourdxError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FourdxError::InvalidWeekId(s.to_string());
        let caps = week_id_re().captures(s).ok_or_else(invalid)?;
        let year: i32 = caps[1].parse().map_err(|_| invalid())?;
        let week: u32 = caps[2].parse().map_err(|_| invalid())?;
        WeekId::new(year, week).map_err(|_| invalid())
    }
}

impl TryFrom<String> for WeekId {
    type Error = FourdxError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<WeekId> for String {
    fn from(w: WeekId) -> Self {
        w.to_string()
    }
}

// ---------------------------------------------------------------------------
// Calendar functions
// ---------------------------------------------------------------------------

/// The first Thursday on or after Jan 1 of `year`. It always falls in ISO week 1.
fn first_thursday(year: i32) -> NaiveDate {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1).expect("Jan 1 exists for 4-digit years");
    let from_sunday = jan1.weekday().num_days_from_sunday();
    jan1 + Duration::days(i64::from((4 + 7 - from_sunday) % 7))
}

/// Number of ISO weeks in `year` (52 or 53). Dec 28 is always in the last week.
pub fn weeks_in_year(year: i32) -> u32 {
    match NaiveDate::from_ymd_opt(year, 12, 28) {
        Some(d) => week_id_of(d).week,
        None => 0,
    }
}

/// ISO-8601 week identifier of a calendar date.
pub fn week_id_of(date: NaiveDate) -> WeekId {
    let day_offset = date.weekday().num_days_from_monday();
    let thursday = date - Duration::days(i64::from(day_offset)) + Duration::days(3);
    let year = thursday.year();
    let week = 1 + (thursday - first_thursday(year)).num_days() / 7;
    WeekId {
        year,
        week: week as u32,
    }
}

/// Week identifier of an instant, using its UTC calendar date.
pub fn current_week_id(now: DateTime<Utc>) -> WeekId {
    week_id_of(now.date_naive())
}

pub fn previous_week_id(w: WeekId) -> WeekId {
    offset_week_id(w, -1)
}

pub fn next_week_id(w: WeekId) -> WeekId {
    offset_week_id(w, 1)
}

/// Shift `w` by `weeks` whole weeks (negative moves backwards).
pub fn offset_week_id(w: WeekId, weeks: i64) -> WeekId {
    week_id_of(w.anchor() + Duration::weeks(weeks))
}

/// The week 28 days before `w`.
pub fn month_ago_week_id(w: WeekId) -> WeekId {
    week_id_of(w.anchor() - Duration::days(28))
}

/// Same week number one year earlier; week 53 clamps to the prior year's last week.
pub fn year_ago_week_id(w: WeekId) -> WeekId {
    let year = w.year - 1;
    WeekId {
        year,
        week: w.week.min(weeks_in_year(year)),
    }
}

/// `true` when `w` is strictly before `current`.
pub fn is_past(w: WeekId, current: WeekId) -> bool {
    w < current
}

/// String form of [`is_past`] for identifiers read from persisted state.
/// Malformed input is an error, never silently treated as past or current.
pub fn is_past_str(w: &str, current: &str) -> Result<bool> {
    Ok(is_past(w.parse()?, current.parse()?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn w(s: &str) -> WeekId {
        s.parse().unwrap()
    }

    #[test]
    fn year_boundary_dates() {
        assert_eq!(week_id_of(d(2024, 12, 31)).to_string(), "2025-W01");
        assert_eq!(week_id_of(d(2023, 1, 1)).to_string(), "2022-W52");
        assert_eq!(week_id_of(d(2021, 1, 3)).to_string(), "2020-W53");
        assert_eq!(week_id_of(d(2026, 12, 31)).to_string(), "2026-W53");
        assert_eq!(week_id_of(d(2025, 2, 12)).to_string(), "2025-W07");
    }

    #[test]
    fn leap_day_is_in_its_iso_week() {
        assert_eq!(week_id_of(d(2024, 2, 29)).to_string(), "2024-W09");
        assert_eq!(week_id_of(d(2020, 2, 29)).to_string(), "2020-W09");
    }

    #[test]
    fn agrees_with_chrono_iso_week_for_every_day() {
        let mut day = d(1999, 12, 1);
        let end = d(2041, 1, 31);
        while day <= end {
            let iso = day.iso_week();
            let id = week_id_of(day);
            assert_eq!((id.year(), id.week()), (iso.year(), iso.week()), "{day}");
            day += Duration::days(1);
        }
    }

    #[test]
    fn whole_monday_to_sunday_span_shares_an_id() {
        let monday = d(2025, 3, 3);
        assert_eq!(monday.weekday(), Weekday::Mon);
        let id = week_id_of(monday);
        for offset in 0..7 {
            assert_eq!(week_id_of(monday + Duration::days(offset)), id);
        }
        assert_ne!(week_id_of(monday - Duration::days(1)), id);
        assert_eq!(id.monday(), monday);
        assert_eq!(id.sunday(), d(2025, 3, 9));
    }

    #[test]
    fn navigation_round_trips_across_years() {
        let mut id = w("1999-W50");
        let stop = w("2031-W02");
        while id < stop {
            let next = next_week_id(id);
            assert!(next > id);
            assert_eq!(previous_week_id(next), id, "{id}");
            assert_eq!(next_week_id(previous_week_id(id)), id, "{id}");
            id = next;
        }
    }

    #[test]
    fn navigation_handles_week_53() {
        assert_eq!(next_week_id(w("2020-W53")), w("2021-W01"));
        assert_eq!(previous_week_id(w("2021-W01")), w("2020-W53"));
        assert_eq!(previous_week_id(w("2025-W01")), w("2024-W52"));
        assert_eq!(next_week_id(w("2026-W52")), w("2026-W53"));
    }

    #[test]
    fn offsets_and_relative_weeks() {
        assert_eq!(offset_week_id(w("2025-W10"), 0), w("2025-W10"));
        assert_eq!(offset_week_id(w("2025-W10"), -3), w("2025-W07"));
        assert_eq!(offset_week_id(w("2025-W51"), 3), w("2026-W02"));
        assert_eq!(month_ago_week_id(w("2025-W10")), w("2025-W06"));
        assert_eq!(year_ago_week_id(w("2025-W10")), w("2024-W10"));
        assert_eq!(year_ago_week_id(w("2020-W53")), w("2019-W52"));
        assert_eq!(year_ago_week_id(w("2026-W53")), w("2025-W52"));
        assert_eq!(year_ago_week_id(w("2021-W01")), w("2020-W01"));
    }

    #[test]
    fn ordering_matches_past_rule() {
        for s in ["2020-W53", "2025-W01", "2025-W10", "2026-W53"] {
            let id = w(s);
            assert!(is_past(previous_week_id(id), id));
            assert!(!is_past(id, id));
            assert!(!is_past(next_week_id(id), id));
        }
        assert!(is_past_str("2024-W52", "2025-W01").unwrap());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = w("2024-W52");
        let b = w("2025-W01");
        assert_eq!(a < b, a.to_string() < b.to_string());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in [
            "", "2025-7", "2025-W7", "25-W07", "2025-W00", "2025-W54", "2025W07", "2025-w07",
            "2021-W53",
        ] {
            assert!(
                matches!(bad.parse::<WeekId>(), Err(FourdxError::InvalidWeekId(_))),
                "expected invalid: {bad}"
            );
        }
        assert!(is_past_str("garbage", "2025-W01").is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let id = w("2025-W07");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"2025-W07\"");
        let back: WeekId = serde_json::from_str("\"2025-W07\"").unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<WeekId>("\"2025-07\"").is_err());
    }

    #[test]
    fn display_form() {
        assert_eq!(w("2025-W07").display(), "2025 Week 07");
    }

    #[test]
    fn weeks_in_year_values() {
        assert_eq!(weeks_in_year(2020), 53);
        assert_eq!(weeks_in_year(2021), 52);
        assert_eq!(weeks_in_year(2026), 53);
    }
}
