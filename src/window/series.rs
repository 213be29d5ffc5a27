//! Continuous bucket skeletons for chart series.
//!
//! A skeleton is built before any record is counted. Its slots fix the
//! cardinality and ordering of the output, so periods with no data still
//! appear with zero counts.

#![allow(missing_docs)]

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::Serialize;

use crate::window::ranges::{
    DateRange, PeriodType, bucket_key, day_key, day_range, days_in_month, end_of_day, hour_key,
    iso_week, iso_week_year, month_key, month_range, shift_month_back, start_of_day, week_key,
    week_range,
};

const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// How a timestamp maps onto a slot key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// `YYYY-MM-DD`
    Day,
    /// `YYYY-Www` (ISO week-year + week)
    IsoWeek,
    /// `YYYY-MM`
    Month,
    /// `HH` (UTC hour of day)
    HourOfDay,
}

impl KeyScheme {
    pub fn key_for(self, ts: DateTime<Utc>) -> String {
        match self {
            Self::Day => bucket_key(ts, PeriodType::Daily),
            Self::IsoWeek => bucket_key(ts, PeriodType::Weekly),
            Self::Month => bucket_key(ts, PeriodType::Monthly),
            Self::HourOfDay => hour_key(ts),
        }
    }

    const fn for_period(period: PeriodType) -> Self {
        match period {
            PeriodType::Daily => Self::Day,
            PeriodType::Weekly => Self::IsoWeek,
            PeriodType::Monthly => Self::Month,
        }
    }
}

/// One pre-populated slot: canonical key plus human display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSlot {
    pub key: String,
    pub label: String,
}

/// Ordered slots plus the time window they cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSkeleton {
    pub scheme: KeyScheme,
    pub window: DateRange,
    pub slots: Vec<SeriesSlot>,
}

impl SeriesSkeleton {
    /// Slot key for a timestamp, using the same function that built the slots.
    pub fn key_for(&self, ts: DateTime<Utc>) -> String {
        self.scheme.key_for(ts)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Rolling series of `period.series_len()` buckets ending at the bucket
/// containing `now`, oldest first.
///
/// The window runs from the start of the oldest bucket through the end of
/// the current day.
pub fn continuity_skeleton(period: PeriodType, now: DateTime<Utc>) -> SeriesSkeleton {
    let today = now.date_naive();
    let count = period.series_len();
    let mut slots = Vec::with_capacity(count);

    let window_start = match period {
        PeriodType::Daily => {
            for offset in (0..count).rev() {
                let date = today - TimeDelta::days(offset as i64);
                slots.push(day_slot(date));
            }
            start_of_day(now) - TimeDelta::days(count as i64 - 1)
        }
        PeriodType::Weekly => {
            for offset in (0..count).rev() {
                let date = today - TimeDelta::weeks(offset as i64);
                slots.push(SeriesSlot {
                    key: week_key(date),
                    label: format!("Week {}, {}", iso_week(date), iso_week_year(date)),
                });
            }
            week_range(now).start - TimeDelta::weeks(count as i64 - 1)
        }
        PeriodType::Monthly => {
            for offset in (0..count).rev() {
                let (year, month) = shift_month_back(now.year(), now.month(), offset as u32);
                slots.push(month_slot(year, month));
            }
            let (year, month) = shift_month_back(now.year(), now.month(), count as u32 - 1);
            first_of_month(year, month).unwrap_or_else(|| month_range(now).start)
        }
    };

    SeriesSkeleton {
        scheme: KeyScheme::for_period(period),
        window: DateRange::new(window_start, end_of_day(now)),
        slots,
    }
}

/// Buckets inside the single period containing `now`: 24 hours for a day,
/// Monday..Sunday for a week, every day of the month for a month.
pub fn breakdown_skeleton(period: PeriodType, now: DateTime<Utc>) -> SeriesSkeleton {
    match period {
        PeriodType::Daily => {
            let slots = (0..24)
                .map(|hour| SeriesSlot {
                    key: format!("{hour:02}"),
                    label: format!("{hour:02}:00"),
                })
                .collect();
            SeriesSkeleton {
                scheme: KeyScheme::HourOfDay,
                window: day_range(now),
                slots,
            }
        }
        PeriodType::Weekly => {
            let window = week_range(now);
            let monday = window.start.date_naive();
            let slots = (0..7)
                .map(|offset| day_slot(monday + TimeDelta::days(offset)))
                .collect();
            SeriesSkeleton {
                scheme: KeyScheme::Day,
                window,
                slots,
            }
        }
        PeriodType::Monthly => {
            let window = month_range(now);
            let first = window.start.date_naive();
            let slots = (0..days_in_month(now.year(), now.month()))
                .map(|offset| {
                    let date = first + TimeDelta::days(i64::from(offset));
                    SeriesSlot {
                        key: day_key(date),
                        label: date.day().to_string(),
                    }
                })
                .collect();
            SeriesSkeleton {
                scheme: KeyScheme::Day,
                window,
                slots,
            }
        }
    }
}

/// Full English month name for a 1-based month number.
pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown")
}

fn day_slot(date: NaiveDate) -> SeriesSlot {
    let weekday = WEEKDAY_ABBREVIATIONS[date.weekday().num_days_from_monday() as usize];
    SeriesSlot {
        key: day_key(date),
        label: format!("{weekday} {:02}/{:02}", date.month(), date.day()),
    }
}

fn month_slot(year: i32, month: u32) -> SeriesSlot {
    SeriesSlot {
        key: month_key(year, month),
        label: format!("{} {year}", month_name(month)),
    }
}

fn first_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}
