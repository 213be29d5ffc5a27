//! Canonical period boundaries, ISO week numbering and bucket keys.
//!
//! Every boundary is computed in UTC. Downstream filtering and bucketing
//! compare against these values directly, so the chart skeleton and the
//! record bucketing must go through the same functions here.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::SwdError;

// ──────────────────── period type ────────────────────

/// Granularity selector for both windowing and bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodType {
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Number of buckets in the rolling chart series ending at "now".
    pub const fn series_len(self) -> usize {
        match self {
            Self::Daily => 7,
            Self::Weekly => 52,
            Self::Monthly => 12,
        }
    }

    /// Short noun used in period-info payloads (`day`, `week`, `month`).
    pub const fn period_noun(self) -> &'static str {
        match self {
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = SwdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(SwdError::MalformedInput {
                field: "period",
                details: format!("expected daily, weekly or monthly, got {other:?}"),
            }),
        }
    }
}

// ──────────────────── date range ────────────────────

/// Inclusive `[start, end]` timestamp range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Both bounds as `YYYY-MM-DD` strings.
    pub fn date_strings(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }
}

// ──────────────────── boundaries ────────────────────

/// Truncate to 00:00:00.000 of the same UTC day.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// 23:59:59.999 of the same UTC day.
pub fn end_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(ts) + TimeDelta::days(1) - TimeDelta::milliseconds(1)
}

/// The UTC day containing `now`.
pub fn day_range(now: DateTime<Utc>) -> DateRange {
    DateRange::new(start_of_day(now), end_of_day(now))
}

/// The Monday-start ISO week containing `now`.
pub fn week_range(now: DateTime<Utc>) -> DateRange {
    let start = start_of_day(now) - TimeDelta::days(days_since_monday(now.date_naive()));
    let end = end_of_day(start + TimeDelta::days(6));
    DateRange::new(start, end)
}

/// The calendar month containing `now`, day 1 through the last day.
pub fn month_range(now: DateTime<Utc>) -> DateRange {
    let start = start_of_day(now) - TimeDelta::days(i64::from(now.day0()));
    let last_day = days_in_month(now.year(), now.month());
    let end = end_of_day(start + TimeDelta::days(i64::from(last_day) - 1));
    DateRange::new(start, end)
}

/// Window for the named period containing `now`.
pub fn period_range(period: PeriodType, now: DateTime<Utc>) -> DateRange {
    match period {
        PeriodType::Daily => day_range(now),
        PeriodType::Weekly => week_range(now),
        PeriodType::Monthly => month_range(now),
    }
}

/// Inclusive whole-day range: `from` 00:00:00.000 through `to` 23:59:59.999.
pub fn whole_days(from: NaiveDate, to: NaiveDate) -> DateRange {
    DateRange::new(
        from.and_time(NaiveTime::MIN).and_utc(),
        end_of_day(to.and_time(NaiveTime::MIN).and_utc()),
    )
}

// ──────────────────── ISO weeks ────────────────────

fn days_since_monday(date: NaiveDate) -> i64 {
    i64::from(date.weekday().num_days_from_monday())
}

/// Thursday of the ISO week containing `date`.
fn week_thursday(date: NaiveDate) -> NaiveDate {
    date + TimeDelta::days(3 - days_since_monday(date))
}

/// ISO-8601 week number: the week's Thursday decides the year, and the
/// week number is `ceil(day_of_year(thursday) / 7)`.
pub fn iso_week(date: NaiveDate) -> u32 {
    week_thursday(date).ordinal().div_ceil(7)
}

/// ISO week-numbering year (the calendar year of the week's Thursday).
pub fn iso_week_year(date: NaiveDate) -> i32 {
    week_thursday(date).year()
}

// ──────────────────── bucket keys ────────────────────

/// Canonical key for the period bucket containing `ts`.
///
/// `daily → YYYY-MM-DD`, `weekly → YYYY-Www`, `monthly → YYYY-MM`.
pub fn bucket_key(ts: DateTime<Utc>, period: PeriodType) -> String {
    let date = ts.date_naive();
    match period {
        PeriodType::Daily => day_key(date),
        PeriodType::Weekly => week_key(date),
        PeriodType::Monthly => month_key(date.year(), date.month()),
    }
}

pub(crate) fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn week_key(date: NaiveDate) -> String {
    format!("{:04}-W{:02}", iso_week_year(date), iso_week(date))
}

pub(crate) fn month_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

pub(crate) fn hour_key(ts: DateTime<Utc>) -> String {
    format!("{:02}", ts.hour())
}

// ──────────────────── calendar helpers ────────────────────

pub(crate) const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub(crate) const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Step `(year, month)` back by `offset` months.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub(crate) const fn shift_month_back(year: i32, month: u32, offset: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - offset as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

// ──────────────────── tests ────────────────────
