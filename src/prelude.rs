//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use swift_dashboard_analytics::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, SwdError};

// Windowing
pub use crate::window::ranges::{DateRange, PeriodType, period_range};

// Records
pub use crate::records::jsonl::JsonlRecordSource;
pub use crate::records::model::{ActionKind, DirectionFilter, LogEntry, Message};
pub use crate::records::normalize::SourceLayout;
pub use crate::records::source::{MemorySource, RecordSource, TimedSource};
#[cfg(feature = "sqlite")]
pub use crate::records::sqlite::SqliteRecordSource;

// Analytics
pub use crate::analytics::aggregate::{
    CompletionCounts, ErrorStatistics, TimeBucket, TypeRanking,
};
pub use crate::analytics::logs::LogFilter;
pub use crate::analytics::service::{AnalyticsService, Clock, FixedClock, SystemClock};

// Cache
pub use crate::cache::query_cache::QueryCache;

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
