//! The `RecordSource` boundary plus in-memory and time-bounded adapters.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::{RecvTimeoutError, bounded};
use parking_lot::RwLock;
use serde_json::Value;

use crate::core::errors::{Result, SwdError};
use crate::records::model::{ActionKind, DirectionFilter};
use crate::records::normalize::{SourceLayout, record_direction, record_timestamp};

/// Yields raw backend hits for one action kind.
///
/// Implementations own retries and wire formats. The core only relies on the
/// range and direction filters being applied (records outside them may still
/// be returned; callers re-filter normalized records).
pub trait RecordSource: Send + Sync {
    /// Backend identifier, used as the cache key.
    fn name(&self) -> &str;

    /// Shape of the hits this source returns.
    fn layout(&self) -> SourceLayout;

    fn fetch_all(&self, kind: ActionKind, direction: Option<&str>) -> Result<Vec<Value>>;

    fn fetch_in_range(
        &self,
        kind: ActionKind,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        direction: Option<&str>,
    ) -> Result<Vec<Value>>;
}

/// Keep hits whose timestamp lies in `[from, to]` and whose direction matches.
///
/// A hit without a parseable timestamp survives only when no bound is given.
pub fn retain_matching(
    hits: &mut Vec<Value>,
    layout: SourceLayout,
    kind: ActionKind,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    direction: Option<&str>,
) {
    let direction = DirectionFilter::from_param(direction);
    hits.retain(|hit| {
        if kind == ActionKind::Message
            && !direction.is_all()
            && !direction.matches(&record_direction(hit, layout))
        {
            return false;
        }
        if from.is_none() && to.is_none() {
            return true;
        }
        record_timestamp(hit, layout, kind).is_some_and(|ts| {
            from.is_none_or(|start| ts >= start) && to.is_none_or(|end| ts <= end)
        })
    });
}

// ──────────────────── in-memory source ────────────────────

/// Source backed by vectors held in memory. Can be told to fail or stall.
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    layout: SourceLayout,
    messages: RwLock<Vec<Value>>,
    logs: RwLock<Vec<Value>>,
    failing: AtomicBool,
    delay: RwLock<Option<Duration>>,
    fetches: AtomicU64,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, layout: SourceLayout) -> Self {
        Self {
            name: name.into(),
            layout,
            messages: RwLock::new(Vec::new()),
            logs: RwLock::new(Vec::new()),
            failing: AtomicBool::new(false),
            delay: RwLock::new(None),
            fetches: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_messages(self, messages: Vec<Value>) -> Self {
        *self.messages.write() = messages;
        self
    }

    #[must_use]
    pub fn with_logs(self, logs: Vec<Value>) -> Self {
        *self.logs.write() = logs;
        self
    }

    pub fn set_messages(&self, messages: Vec<Value>) {
        *self.messages.write() = messages;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Number of fetch calls served so far, failed ones included.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    fn snapshot(&self, kind: ActionKind) -> Result<Vec<Value>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(SwdError::source_unavailable(
                self.name.clone(),
                "backend marked unavailable",
            ));
        }
        Ok(match kind {
            ActionKind::Message => self.messages.read().clone(),
            ActionKind::Log => self.logs.read().clone(),
        })
    }
}

impl RecordSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout(&self) -> SourceLayout {
        self.layout
    }

    fn fetch_all(&self, kind: ActionKind, direction: Option<&str>) -> Result<Vec<Value>> {
        let mut hits = self.snapshot(kind)?;
        retain_matching(&mut hits, self.layout, kind, None, None, direction);
        Ok(hits)
    }

    fn fetch_in_range(
        &self,
        kind: ActionKind,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        direction: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut hits = self.snapshot(kind)?;
        retain_matching(&mut hits, self.layout, kind, from, to, direction);
        Ok(hits)
    }
}

// ──────────────────── timeout wrapper ────────────────────

/// Runs each fetch on a worker thread and gives up after `timeout`.
///
/// A fetch that times out is abandoned, not cancelled: its worker finishes
/// in the background and the result is discarded.
pub struct TimedSource {
    inner: Arc<dyn RecordSource>,
    timeout: Duration,
}

impl TimedSource {
    pub fn new(inner: Arc<dyn RecordSource>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn run<F>(&self, fetch: F) -> Result<Vec<Value>>
    where
        F: FnOnce(&dyn RecordSource) -> Result<Vec<Value>> + Send + 'static,
    {
        let (tx, rx) = bounded(1);
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("swd-fetch".to_string())
            .spawn(move || {
                // Receiver may already be gone after a timeout.
                let _ = tx.send(fetch(inner.as_ref()));
            })
            .map_err(|e| SwdError::Runtime {
                details: format!("failed to spawn fetch worker: {e}"),
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SwdError::SourceTimeout {
                source_name: self.inner.name().to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(RecvTimeoutError::Disconnected) => Err(SwdError::ChannelClosed {
                component: "fetch-worker",
            }),
        }
    }
}

impl RecordSource for TimedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn layout(&self) -> SourceLayout {
        self.inner.layout()
    }

    fn fetch_all(&self, kind: ActionKind, direction: Option<&str>) -> Result<Vec<Value>> {
        let direction = direction.map(str::to_string);
        self.run(move |source| source.fetch_all(kind, direction.as_deref()))
    }

    fn fetch_in_range(
        &self,
        kind: ActionKind,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        direction: Option<&str>,
    ) -> Result<Vec<Value>> {
        let direction = direction.map(str::to_string);
        self.run(move |source| source.fetch_in_range(kind, from, to, direction.as_deref()))
    }
}
