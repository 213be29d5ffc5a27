//! Log browsing: whole-day date range, level, module and message filters.

#![allow(missing_docs)]

use std::cmp::Reverse;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use regex::{Regex, RegexBuilder};

use crate::core::errors::{Result, SwdError};
use crate::records::model::LogEntry;
use crate::window::ranges::{DateRange, whole_days};

/// Criteria for [`filter_logs`]. Every criterion is optional.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    /// First day included (from 00:00:00.000 UTC).
    pub date_from: Option<NaiveDate>,
    /// Last day included (through 23:59:59.999 UTC).
    pub date_to: Option<NaiveDate>,
    /// Exact level, case-insensitive. `ALL` disables the filter.
    pub level: Option<String>,
    /// Case-insensitive substring of the module name.
    pub module: Option<String>,
    message: Option<Regex>,
}

impl LogFilter {
    /// Restrict messages to those matching `pattern` (case-insensitive).
    pub fn with_message_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| SwdError::MalformedInput {
                field: "message pattern",
                details: e.to_string(),
            })?;
        self.message = Some(regex);
        Ok(self)
    }

    #[must_use]
    pub fn with_dates(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Inclusive timestamp range implied by the date bounds, if any.
    pub fn date_range(&self) -> Option<DateRange> {
        match (self.date_from, self.date_to) {
            (None, None) => None,
            (from, to) => {
                let start = from.map_or(DateTime::<Utc>::MIN_UTC, |d| whole_days(d, d).start);
                let end = to.map_or(DateTime::<Utc>::MAX_UTC, |d| whole_days(d, d).end);
                Some(DateRange::new(start, end))
            }
        }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(range) = self.date_range() {
            if !entry.time.is_some_and(|t| range.contains(t)) {
                return false;
            }
        }
        if let Some(level) = self.level.as_deref().map(str::trim) {
            if !level.is_empty()
                && !level.eq_ignore_ascii_case("all")
                && !level.eq_ignore_ascii_case(entry.level.trim())
            {
                return false;
            }
        }
        if let Some(module) = self.module.as_deref().map(str::trim) {
            if !module.is_empty()
                && !entry
                    .module
                    .to_ascii_lowercase()
                    .contains(&module.to_ascii_lowercase())
            {
                return false;
            }
        }
        self.message
            .as_ref()
            .is_none_or(|regex| regex.is_match(&entry.message))
    }
}

/// Matching entries, newest first. Entries without a time sort last.
pub fn filter_logs(logs: &[LogEntry], filter: &LogFilter) -> Vec<LogEntry> {
    let mut matched: Vec<LogEntry> = logs.iter().filter(|e| filter.matches(e)).cloned().collect();
    matched.sort_by_key(|entry| Reverse(entry.time));
    matched
}

/// Sorted, de-duplicated, upper-cased levels present in `logs`.
pub fn distinct_levels(logs: &[LogEntry]) -> Vec<String> {
    logs.iter()
        .map(|entry| entry.level.trim().to_ascii_uppercase())
        .filter(|level| !level.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
