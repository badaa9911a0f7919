//! Named reporting windows resolved against a given day.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;

use crate::error::SharetrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKey {
    All,
    #[default]
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    ThisYear,
}

impl RangeKey {
    pub const ALL: [RangeKey; 6] = [
        Self::All,
        Self::ThisWeek,
        Self::LastWeek,
        Self::ThisMonth,
        Self::LastMonth,
        Self::ThisYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ThisWeek => "this_week",
            Self::LastWeek => "last_week",
            Self::ThisMonth => "this_month",
            Self::LastMonth => "last_month",
            Self::ThisYear => "this_year",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "All Time",
            Self::ThisWeek => "This Week",
            Self::LastWeek => "Last Week",
            Self::ThisMonth => "This Month",
            Self::LastMonth => "Last Month",
            Self::ThisYear => "This Year",
        }
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeKey {
    type Err = SharetrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                SharetrackError::InvalidInput(format!(
                    "unknown range '{}'. Valid values: all, this_week, last_week, this_month, last_month, this_year",
                    s
                ))
            })
    }
}

/// Inclusive date window. `None` leaves that side open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all_time() -> Self {
        Self {
            label: RangeKey::All.label().to_string(),
            start: None,
            end: None,
        }
    }

    /// Whether a `YYYY-MM-DD` date falls inside the window. Unparseable dates
    /// only match a fully open window.
    pub fn contains(&self, date: &str) -> bool {
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            return false;
        };
        self.start.map_or(true, |s| day >= s) && self.end.map_or(true, |e| day <= e)
    }
}

/// Sunday that starts the week containing `date`.
pub fn sunday_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_sunday() as u64;
    date - Days::new(back)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(first: NaiveDate) -> NaiveDate {
    (first + Months::new(1)).pred_opt().unwrap_or(first)
}

/// Resolve a preset to concrete bounds relative to `today`.
pub fn date_range(key: RangeKey, today: NaiveDate) -> DateRange {
    let (start, end) = match key {
        RangeKey::All => return DateRange::all_time(),
        RangeKey::ThisWeek => {
            let start = sunday_start(today);
            (start, start + Days::new(6))
        }
        RangeKey::LastWeek => {
            let start = sunday_start(today) - Days::new(7);
            (start, start + Days::new(6))
        }
        RangeKey::ThisMonth => {
            let start = first_of_month(today);
            (start, last_of_month(start))
        }
        RangeKey::LastMonth => {
            let start = first_of_month(today) - Months::new(1);
            (start, last_of_month(start))
        }
        RangeKey::ThisYear => {
            let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            let end = NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today);
            (start, end)
        }
    };
    DateRange {
        label: key.label().to_string(),
        start: Some(start),
        end: Some(end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn all_time_is_open() {
        let r = date_range(RangeKey::All, d(2024, 5, 15));
        assert_eq!(r.label, "All Time");
        assert_eq!(r.start, None);
        assert_eq!(r.end, None);
        assert!(r.contains("1999-01-01"));
    }

    #[test]
    fn this_week_runs_sunday_to_saturday() {
        // 2024-05-15 is a Wednesday.
        let r = date_range(RangeKey::ThisWeek, d(2024, 5, 15));
        assert_eq!(r.start, Some(d(2024, 5, 12)));
        assert_eq!(r.end, Some(d(2024, 5, 18)));
        assert_eq!(r.label, "This Week");
    }

    #[test]
    fn this_week_on_sunday_starts_today() {
        let r = date_range(RangeKey::ThisWeek, d(2024, 5, 12));
        assert_eq!(r.start, Some(d(2024, 5, 12)));
    }

    #[test]
    fn last_week_crosses_month() {
        let r = date_range(RangeKey::LastWeek, d(2024, 6, 3));
        assert_eq!(r.start, Some(d(2024, 5, 26)));
        assert_eq!(r.end, Some(d(2024, 6, 1)));
    }

    #[test]
    fn month_bounds_handle_leap_february() {
        let r = date_range(RangeKey::ThisMonth, d(2024, 2, 10));
        assert_eq!(r.start, Some(d(2024, 2, 1)));
        assert_eq!(r.end, Some(d(2024, 2, 29)));
    }

    #[test]
    fn last_month_wraps_year() {
        let r = date_range(RangeKey::LastMonth, d(2024, 1, 20));
        assert_eq!(r.start, Some(d(2023, 12, 1)));
        assert_eq!(r.end, Some(d(2023, 12, 31)));
        assert_eq!(r.label, "Last Month");
    }

    #[test]
    fn this_year_bounds() {
        let r = date_range(RangeKey::ThisYear, d(2024, 7, 4));
        assert_eq!(r.start, Some(d(2024, 1, 1)));
        assert_eq!(r.end, Some(d(2024, 12, 31)));
    }

    #[test]
    fn contains_is_inclusive() {
        let r = date_range(RangeKey::ThisWeek, d(2024, 5, 15));
        assert!(r.contains("2024-05-12"));
        assert!(r.contains("2024-05-18"));
        assert!(!r.contains("2024-05-19"));
        assert!(!r.contains("garbage"));
    }

    #[test]
    fn parse_keys() {
        assert_eq!("this-week".parse::<RangeKey>().unwrap(), RangeKey::ThisWeek);
        assert_eq!("ALL".parse::<RangeKey>().unwrap(), RangeKey::All);
        assert!("fortnight".parse::<RangeKey>().is_err());
    }
}
