#![forbid(unsafe_code)]

//! SWIFT dashboard analytics: windowed charts, type rankings, error
//! taxonomy and log browsing over translated SWIFT message records.
//!
//! Records come from a [`records::source::RecordSource`] (exported JSONL
//! search hits or a local SQLite event store), are normalized into
//! [`records::model::Message`] / [`records::model::LogEntry`], and are
//! aggregated by pure functions in [`analytics::aggregate`]. The
//! [`analytics::service::AnalyticsService`] façade ties these together with
//! a TTL [`cache::query_cache::QueryCache`].
//!
//! # Library usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swift_dashboard_analytics::prelude::*;
//!
//! let source = JsonlRecordSource::new(SourceLayout::OpenSearch, "messages.jsonl".into(), None);
//! let service = AnalyticsService::new(Arc::new(source));
//! let chart = service.message_chart_data(PeriodType::Weekly, &DirectionFilter::All);
//! ```

pub mod prelude;

pub mod analytics;
pub mod cache;
pub mod core;
pub mod logger;
pub mod records;
pub mod window;
