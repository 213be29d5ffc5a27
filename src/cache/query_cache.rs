//! In-process TTL cache for full record fetches, one entry per (backend, kind).

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::records::model::{ActionKind, LogEntry, Message};

/// Default freshness window: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub backend: String,
    pub kind: ActionKind,
}

impl CacheKey {
    pub fn new(backend: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            backend: backend.into(),
            kind,
        }
    }
}

/// Normalized records held by a cache entry. Shared read-only with callers.
#[derive(Debug, Clone)]
pub enum CachedRecords {
    Messages(Arc<Vec<Message>>),
    Logs(Arc<Vec<LogEntry>>),
}

impl CachedRecords {
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Messages(_) => ActionKind::Message,
            Self::Logs(_) => ActionKind::Log,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Messages(records) => records.len(),
            Self::Logs(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: CachedRecords,
    pub fetched_at: DateTime<Utc>,
}

/// Mutex-guarded map of entries. Staleness is checked lazily on `get`; there
/// is no eviction thread.
#[derive(Debug)]
pub struct QueryCache {
    ttl: TimeDelta,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }

    /// Cached records if the entry is younger than the TTL at wall-clock now.
    pub fn get(&self, key: &CacheKey) -> Option<CachedRecords> {
        self.get_at(key, Utc::now())
    }

    /// Cached records if `now - fetched_at < ttl`.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<CachedRecords> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| now - entry.fetched_at < self.ttl)
            .map(|entry| entry.records.clone())
    }

    pub fn put(&self, key: CacheKey, records: CachedRecords) {
        self.put_at(key, records, Utc::now());
    }

    /// Store `records` fetched at `now`, replacing any existing entry.
    pub fn put_at(&self, key: CacheKey, records: CachedRecords, now: DateTime<Utc>) {
        self.entries.lock().insert(
            key,
            CacheEntry {
                records,
                fetched_at: now,
            },
        );
    }

    /// Drop one entry, or every entry when `key` is `None`. Returns how many
    /// entries were removed.
    pub fn invalidate(&self, key: Option<&CacheKey>) -> usize {
        let mut entries = self.entries.lock();
        match key {
            Some(key) => usize::from(entries.remove(key).is_some()),
            None => {
                let removed = entries.len();
                entries.clear();
                removed
            }
        }
    }

    /// Fetch time of an entry, fresh or stale.
    pub fn fetched_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        self.entries.lock().get(key).map(|entry| entry.fetched_at)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
