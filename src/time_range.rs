//! Time Range Resolver.
//!
//! Converts a semantic [`TimeRange`] into a concrete half-open date interval
//! `[start, end)`, anchored to a caller-supplied reference date. The system
//! clock is never read, so resolution is deterministic. All boundaries are
//! whole days in a single calendar; there is no timezone handling.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

use crate::intent::TimeRange;

/// A resolved half-open date interval. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Whether `date` falls inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Number of days covered.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// A time range that cannot be resolved to a non-empty window.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time range: {reason}")]
pub struct InvalidRange {
    pub reason: String,
}

impl InvalidRange {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Resolve `range` against the reference date `now`.
pub fn resolve(range: &TimeRange, now: NaiveDate) -> Result<TimeWindow, InvalidRange> {
    let (start, end) = match *range {
        TimeRange::LastWeek => {
            let this_week = week_start(now)?;
            (sub_days(this_week, 7)?, this_week)
        }
        TimeRange::LastMonth => {
            let this_month = month_start(now.year(), now.month())?;
            (shift_months(this_month, -1)?, this_month)
        }
        TimeRange::LastQuarter => {
            let this_quarter = quarter_start(now)?;
            (shift_months(this_quarter, -3)?, this_quarter)
        }
        TimeRange::LastYear => (year_start(now.year() - 1)?, year_start(now.year())?),
        TimeRange::LastNDays { n } => {
            if n <= 0 {
                return Err(InvalidRange::new(format!(
                    "last_n_days requires n > 0, got {}",
                    n
                )));
            }
            (sub_days(now, n as u64)?, now)
        }
        TimeRange::Custom { start, end } => {
            if start >= end {
                return Err(InvalidRange::new(format!(
                    "custom range start {} must be before end {}",
                    start, end
                )));
            }
            (start, end)
        }
        TimeRange::CurrentWeek => {
            let this_week = week_start(now)?;
            (this_week, add_days(this_week, 7)?)
        }
        TimeRange::CurrentMonth => {
            let this_month = month_start(now.year(), now.month())?;
            (this_month, shift_months(this_month, 1)?)
        }
        TimeRange::CurrentQuarter => {
            let this_quarter = quarter_start(now)?;
            (this_quarter, shift_months(this_quarter, 3)?)
        }
        TimeRange::CurrentYear => (year_start(now.year())?, year_start(now.year() + 1)?),
    };

    Ok(TimeWindow { start, end })
}

/// Resolve an optional range. No range means no window.
pub fn resolve_optional(
    range: Option<&TimeRange>,
    now: NaiveDate,
) -> Result<Option<TimeWindow>, InvalidRange> {
    range.map(|r| resolve(r, now)).transpose()
}

fn out_of_range() -> InvalidRange {
    InvalidRange::new("date arithmetic left the supported calendar range")
}

fn month_start(year: i32, month: u32) -> Result<NaiveDate, InvalidRange> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)
}

fn year_start(year: i32) -> Result<NaiveDate, InvalidRange> {
    month_start(year, 1)
}

fn quarter_start(date: NaiveDate) -> Result<NaiveDate, InvalidRange> {
    let first_month = (date.month0() / 3) * 3 + 1;
    month_start(date.year(), first_month)
}

/// Monday on or before `date`.
fn week_start(date: NaiveDate) -> Result<NaiveDate, InvalidRange> {
    sub_days(date, u64::from(date.weekday().num_days_from_monday()))
}

/// Move a first-of-month date by whole months.
fn shift_months(first_of_month: NaiveDate, months: i32) -> Result<NaiveDate, InvalidRange> {
    let index = first_of_month.year() * 12 + first_of_month.month0() as i32 + months;
    month_start(index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn sub_days(date: NaiveDate, days: u64) -> Result<NaiveDate, InvalidRange> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(out_of_range)
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate, InvalidRange> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(out_of_range)
}
