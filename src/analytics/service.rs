//! `AnalyticsService`: the dashboard query façade.
//!
//! Rolling charts, message lookup and log browsing read the full record set
//! through the [`QueryCache`]. Period-scoped queries (top types, recent
//! messages, error statistics, counts, breakdowns, period listings) fetch the
//! current day/week/month window straight from the source and re-filter the
//! normalized records, since the source is allowed to over-return.

#![allow(missing_docs)]

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analytics::aggregate::{
    CompletionCounts, ErrorStatistics, TimeBucket, TypeRanking, build_breakdown,
    build_time_series, completion_and_direction_counts, error_statistics, rank_types,
};
use crate::analytics::logs::{LogFilter, distinct_levels, filter_logs};
use crate::cache::query_cache::{CacheKey, CachedRecords, QueryCache};
use crate::core::errors::{Result, SwdError};
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::records::model::{ActionKind, DirectionFilter, LogEntry, Message};
use crate::records::normalize::{normalize_logs, normalize_messages};
use crate::records::source::RecordSource;
use crate::window::ranges::{DateRange, PeriodType, period_range};
use crate::window::series::month_name;

// ──────────────────── clock ────────────────────

/// Source of "now" for every window computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for deterministic tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ──────────────────── response shapes ────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    pub top_types_limit: usize,
    pub recent_limit: usize,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            top_types_limit: 7,
            recent_limit: 5,
        }
    }
}

/// Window a period-scoped answer was computed over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodInfo {
    /// `day`, `week` or `month`.
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub month_name: Option<String>,
}

impl PeriodInfo {
    fn new(period: PeriodType, range: &DateRange) -> Self {
        let (start_date, end_date) = range.date_strings();
        Self {
            period: period.period_noun().to_string(),
            start_date,
            end_date,
            month_name: (period == PeriodType::Monthly)
                .then(|| month_name(range.start.month()).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopTypesReport {
    pub types: Vec<TypeRanking>,
    pub period_info: PeriodInfo,
}

/// Summary row for the recent-messages widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMessage {
    pub id: String,
    pub ref_id: String,
    /// `YYYY-MM-DDTHH:MM` (UTC), empty when the message has no date.
    pub time: String,
    pub mt_message_type: String,
    pub status: String,
    pub direction: String,
}

impl From<&Message> for RecentMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            ref_id: message.ref_id.clone(),
            time: message
                .date
                .map(|d| d.format("%Y-%m-%dT%H:%M").to_string())
                .unwrap_or_default(),
            mt_message_type: message.mt_message_type.clone(),
            status: message.status.clone(),
            direction: message.direction.clone(),
        }
    }
}

/// Recent messages never fail: a source error yields an empty list plus
/// `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMessages {
    pub messages: Vec<RecentMessage>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodMessages {
    pub messages: Vec<Message>,
    pub total: usize,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub month_name: Option<String>,
}

// ──────────────────── service ────────────────────

pub struct AnalyticsService {
    source: Arc<dyn RecordSource>,
    cache: Option<Arc<QueryCache>>,
    clock: Arc<dyn Clock>,
    activity: Option<ActivityLoggerHandle>,
    limits: ServiceLimits,
}

impl std::fmt::Debug for AnalyticsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsService")
            .field("source", &self.source.name())
            .field("cache", &self.cache)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl AnalyticsService {
    /// Service over `source` with a default five-minute cache and the system
    /// clock.
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            cache: Some(Arc::new(QueryCache::default())),
            clock: Arc::new(SystemClock),
            activity: None,
            limits: ServiceLimits::default(),
        }
    }

    /// Replace the cache. `None` sends every query to the source.
    #[must_use]
    pub fn with_cache(mut self, cache: Option<Arc<QueryCache>>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ServiceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Attach an activity logger and record a service-start event.
    #[must_use]
    pub fn with_activity(mut self, handle: ActivityLoggerHandle, config_hash: &str) -> Self {
        handle.send(ActivityEvent::ServiceStarted {
            backend: self.source.name().to_string(),
            config_hash: config_hash.to_string(),
        });
        self.activity = Some(handle);
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub const fn limits(&self) -> ServiceLimits {
        self.limits
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ── dashboard queries ──

    /// Rolling chart series for `period`, always `period.series_len()` buckets.
    pub fn message_chart_data(
        &self,
        period: PeriodType,
        direction: &DirectionFilter,
    ) -> Result<Vec<TimeBucket>> {
        self.observe("message_chart_data", || {
            let messages = self.all_messages()?;
            Ok(build_time_series(&messages, period, direction, self.clock.now()))
        })
    }

    /// Type frequency ranking inside the current day/week/month.
    pub fn top_message_types(
        &self,
        period: PeriodType,
        direction: &DirectionFilter,
        limit: Option<usize>,
        include_stats: bool,
    ) -> Result<TopTypesReport> {
        self.observe("top_message_types", || {
            let range = period_range(period, self.clock.now());
            let messages = self.scoped_messages(range, direction)?;
            let limit = limit.unwrap_or(self.limits.top_types_limit);
            Ok(TopTypesReport {
                types: rank_types(&messages, limit, include_stats),
                period_info: PeriodInfo::new(period, &range),
            })
        })
    }

    /// Newest messages inside `period` (current month when `None`).
    ///
    /// Source failures are reported in `error` rather than returned.
    pub fn recent_messages(
        &self,
        limit: Option<usize>,
        direction: &DirectionFilter,
        period: Option<PeriodType>,
    ) -> RecentMessages {
        let outcome = self.observe("recent_messages", || {
            let range = period_range(period.unwrap_or(PeriodType::Monthly), self.clock.now());
            let mut messages = self.scoped_messages(range, direction)?;
            messages.sort_by_key(|message| Reverse(message.date));
            let rows: Vec<RecentMessage> = messages
                .iter()
                .take(limit.unwrap_or(self.limits.recent_limit))
                .map(RecentMessage::from)
                .collect();
            Ok(rows)
        });
        match outcome {
            Ok(messages) => RecentMessages {
                count: messages.len(),
                messages,
                error: None,
            },
            Err(error) => {
                eprintln!("[SWD-SERVICE] recent messages unavailable: {error}");
                RecentMessages {
                    messages: Vec::new(),
                    count: 0,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    /// Error taxonomy of failed messages inside the current period.
    pub fn error_statistics(
        &self,
        period: PeriodType,
        direction: &DirectionFilter,
    ) -> Result<ErrorStatistics> {
        self.observe("error_statistics", || {
            let range = period_range(period, self.clock.now());
            let messages = self.scoped_messages(range, direction)?;
            Ok(error_statistics(&messages))
        })
    }

    /// Completion and direction counts inside the current period.
    ///
    /// The source fetch is unfiltered so inward/outward totals cover both
    /// sides; `direction` restricts only the success/fail tallies.
    pub fn completion_counts(
        &self,
        period: PeriodType,
        direction: &DirectionFilter,
    ) -> Result<CompletionCounts> {
        self.observe("completion_counts", || {
            let range = period_range(period, self.clock.now());
            let messages = self.scoped_messages(range, &DirectionFilter::All)?;
            Ok(completion_and_direction_counts(&messages, direction))
        })
    }

    /// Hour/day buckets within the current period.
    pub fn period_breakdown(
        &self,
        period: PeriodType,
        direction: &DirectionFilter,
    ) -> Result<Vec<TimeBucket>> {
        self.observe("period_breakdown", || {
            let now = self.clock.now();
            let messages = self.scoped_messages(period_range(period, now), direction)?;
            Ok(build_breakdown(&messages, period, direction, now))
        })
    }

    /// Every message of the current period, newest first.
    pub fn period_messages(
        &self,
        period: PeriodType,
        direction: &DirectionFilter,
    ) -> Result<PeriodMessages> {
        self.observe("period_messages", || {
            let range = period_range(period, self.clock.now());
            let mut messages = self.scoped_messages(range, direction)?;
            messages.sort_by_key(|message| Reverse(message.date));
            let info = PeriodInfo::new(period, &range);
            Ok(PeriodMessages {
                total: messages.len(),
                messages,
                period: info.period,
                start_date: info.start_date,
                end_date: info.end_date,
                month_name: info.month_name,
            })
        })
    }

    pub fn message_by_id(&self, id: &str) -> Result<Message> {
        self.observe("message_by_id", || {
            let messages = self.all_messages()?;
            messages
                .iter()
                .find(|message| message.id == id)
                .cloned()
                .ok_or_else(|| SwdError::NotFound {
                    what: "message",
                    id: id.to_string(),
                })
        })
    }

    /// Messages dated within `[from, to]`, newest first. No bounds means
    /// every message, undated ones included.
    pub fn messages_in_range(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        direction: &DirectionFilter,
    ) -> Result<Vec<Message>> {
        self.observe("messages_in_range", || {
            let hits = self.fetch(ActionKind::Message, || {
                self.source
                    .fetch_in_range(ActionKind::Message, from, to, direction.as_param())
            })?;
            let mut messages = normalize_messages(&hits, self.source.layout());
            let bounded = from.is_some() || to.is_some();
            messages.retain(|message| {
                direction.matches(&message.direction)
                    && (!bounded
                        || message.date.is_some_and(|d| {
                            from.is_none_or(|start| d >= start) && to.is_none_or(|end| d <= end)
                        }))
            });
            messages.sort_by_key(|message| Reverse(message.date));
            Ok(messages)
        })
    }

    pub fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        self.observe("logs", || {
            let logs = self.all_logs()?;
            Ok(filter_logs(&logs, filter))
        })
    }

    /// Levels present in the log stream, for a level picker.
    pub fn log_levels(&self) -> Result<Vec<String>> {
        self.observe("log_levels", || Ok(distinct_levels(&self.all_logs()?)))
    }

    /// Drop every cached record set. Returns how many entries were removed.
    pub fn invalidate_cache(&self) -> usize {
        let removed = self
            .cache
            .as_ref()
            .map_or(0, |cache| cache.invalidate(None));
        self.emit(ActivityEvent::CacheInvalidated { entries: removed });
        removed
    }

    // ── record access ──

    fn all_messages(&self) -> Result<Arc<Vec<Message>>> {
        match self.cached_records(ActionKind::Message)? {
            CachedRecords::Messages(messages) => Ok(messages),
            CachedRecords::Logs(_) => Err(kind_mismatch(ActionKind::Message)),
        }
    }

    fn all_logs(&self) -> Result<Arc<Vec<LogEntry>>> {
        match self.cached_records(ActionKind::Log)? {
            CachedRecords::Logs(logs) => Ok(logs),
            CachedRecords::Messages(_) => Err(kind_mismatch(ActionKind::Log)),
        }
    }

    fn cached_records(&self, kind: ActionKind) -> Result<CachedRecords> {
        let key = CacheKey::new(self.source.name(), kind);
        if let Some(cache) = &self.cache {
            if let Some(records) = cache.get_at(&key, self.clock.now()) {
                self.emit(ActivityEvent::CacheHit {
                    backend: key.backend.clone(),
                    kind,
                    records: records.len(),
                });
                return Ok(records);
            }
            self.emit(ActivityEvent::CacheMiss {
                backend: key.backend.clone(),
                kind,
            });
        }

        let hits = self.fetch(kind, || self.source.fetch_all(kind, None))?;
        let layout = self.source.layout();
        let records = match kind {
            ActionKind::Message => CachedRecords::Messages(Arc::new(normalize_messages(&hits, layout))),
            ActionKind::Log => CachedRecords::Logs(Arc::new(normalize_logs(&hits, layout))),
        };
        if let Some(cache) = &self.cache {
            cache.put_at(key, records.clone(), self.clock.now());
        }
        Ok(records)
    }

    /// Messages dated inside `range` that match `direction`.
    fn scoped_messages(&self, range: DateRange, direction: &DirectionFilter) -> Result<Vec<Message>> {
        let hits = self.fetch(ActionKind::Message, || {
            self.source.fetch_in_range(
                ActionKind::Message,
                Some(range.start),
                Some(range.end),
                direction.as_param(),
            )
        })?;
        let mut messages = normalize_messages(&hits, self.source.layout());
        messages.retain(|message| {
            message.date.is_some_and(|d| range.contains(d)) && direction.matches(&message.direction)
        });
        Ok(messages)
    }

    fn fetch<F>(&self, kind: ActionKind, fetch: F) -> Result<Vec<Value>>
    where
        F: FnOnce() -> Result<Vec<Value>>,
    {
        let started = Instant::now();
        match fetch() {
            Ok(hits) => {
                self.emit(ActivityEvent::SourceFetched {
                    backend: self.source.name().to_string(),
                    kind,
                    records: hits.len(),
                    duration_ms: elapsed_ms(started),
                });
                Ok(hits)
            }
            Err(error) => {
                self.emit(ActivityEvent::SourceFailed {
                    backend: self.source.name().to_string(),
                    kind,
                    code: error.code().to_string(),
                    message: error.to_string(),
                });
                Err(error)
            }
        }
    }

    fn observe<T, F>(&self, operation: &'static str, query: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let started = Instant::now();
        let result = query();
        self.emit(ActivityEvent::QueryServed {
            operation,
            duration_ms: elapsed_ms(started),
            ok: result.is_ok(),
        });
        result
    }

    fn emit(&self, event: ActivityEvent) {
        if let Some(handle) = &self.activity {
            handle.send(event);
        }
    }
}

fn kind_mismatch(kind: ActionKind) -> SwdError {
    SwdError::Runtime {
        details: format!("cache entry for {kind} holds the wrong record kind"),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
