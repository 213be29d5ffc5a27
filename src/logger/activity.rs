//! Non-blocking activity logging for the analytics service.
//!
//! A dedicated thread owns the `JsonlWriter`. Callers hold a cloneable
//! `ActivityLoggerHandle` and send `ActivityEvent`s over a bounded crossbeam
//! channel with `try_send`, so a slow disk never stalls a query.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{Result, SwdError};
use crate::logger::jsonl::{ActivityRecord, EventType, JsonlConfig, JsonlWriter, Severity};
use crate::records::model::ActionKind;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum ActivityEvent {
    ServiceStarted {
        backend: String,
        config_hash: String,
    },
    CacheHit {
        backend: String,
        kind: ActionKind,
        records: usize,
    },
    CacheMiss {
        backend: String,
        kind: ActionKind,
    },
    CacheInvalidated {
        entries: usize,
    },
    SourceFetched {
        backend: String,
        kind: ActionKind,
        records: usize,
        duration_ms: u64,
    },
    SourceFailed {
        backend: String,
        kind: ActionKind,
        code: String,
        message: String,
    },
    QueryServed {
        operation: &'static str,
        duration_ms: u64,
        ok: bool,
    },
    /// Stops the logger thread after flushing.
    Shutdown,
}

// ──────────────────── handle ────────────────────

/// Cheaply cloneable sender side. `send` never blocks.
#[derive(Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl std::fmt::Debug for ActivityLoggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLoggerHandle")
            .field("dropped_events", &self.dropped_events())
            .finish_non_exhaustive()
    }
}

impl ActivityLoggerHandle {
    /// Queue an event. A full channel drops it and bumps the dropped counter.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events dropped since the logger last reported them.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit. Blocks only if the queue is full.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

// ──────────────────── spawn ────────────────────

#[derive(Debug, Clone)]
pub struct ActivityLoggerConfig {
    pub jsonl_config: JsonlConfig,
    pub channel_capacity: usize,
}

impl Default for ActivityLoggerConfig {
    fn default() -> Self {
        Self {
            jsonl_config: JsonlConfig::default(),
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

/// Start the logger thread. It runs until `shutdown()` or until every
/// handle has been dropped.
pub fn spawn_logger(
    config: ActivityLoggerConfig,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(config.channel_capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: Arc::clone(&dropped),
    };

    let join = thread::Builder::new()
        .name("swd-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config.jsonl_config, &dropped))
        .map_err(|e| SwdError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

fn logger_thread_main(rx: &Receiver<ActivityEvent>, jsonl_config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(jsonl_config);

    while let Ok(event) = rx.recv() {
        let lost = dropped.swap(0, Ordering::Relaxed);
        if lost > 0 {
            let mut warn = ActivityRecord::new(EventType::LogDropped, Severity::Warning);
            warn.records = Some(lost);
            warn.details = Some(format!("{lost} activity events dropped under back-pressure"));
            jsonl.write_record(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        if let Some(record) = event_to_record(&event) {
            jsonl.write_record(&record);
        }
    }

    jsonl.flush();
    jsonl.fsync();
}

// ──────────────────── conversion ────────────────────

fn event_to_record(event: &ActivityEvent) -> Option<ActivityRecord> {
    let record = match event {
        ActivityEvent::ServiceStarted {
            backend,
            config_hash,
        } => {
            let mut r = ActivityRecord::new(EventType::ServiceStart, Severity::Info);
            r.backend = Some(backend.clone());
            r.details = Some(format!(
                "version={} config_hash={config_hash}",
                env!("CARGO_PKG_VERSION")
            ));
            r.ok = Some(true);
            r
        }
        ActivityEvent::CacheHit {
            backend,
            kind,
            records,
        } => {
            let mut r = ActivityRecord::new(EventType::CacheHit, Severity::Info);
            r.backend = Some(backend.clone());
            r.kind = Some(kind.to_string());
            r.records = Some(*records as u64);
            r
        }
        ActivityEvent::CacheMiss { backend, kind } => {
            let mut r = ActivityRecord::new(EventType::CacheMiss, Severity::Info);
            r.backend = Some(backend.clone());
            r.kind = Some(kind.to_string());
            r
        }
        ActivityEvent::CacheInvalidated { entries } => {
            let mut r = ActivityRecord::new(EventType::CacheInvalidate, Severity::Info);
            r.records = Some(*entries as u64);
            r
        }
        ActivityEvent::SourceFetched {
            backend,
            kind,
            records,
            duration_ms,
        } => {
            let mut r = ActivityRecord::new(EventType::SourceFetch, Severity::Info);
            r.backend = Some(backend.clone());
            r.kind = Some(kind.to_string());
            r.records = Some(*records as u64);
            r.duration_ms = Some(*duration_ms);
            r.ok = Some(true);
            r
        }
        ActivityEvent::SourceFailed {
            backend,
            kind,
            code,
            message,
        } => {
            let mut r = ActivityRecord::new(EventType::SourceFailure, Severity::Error);
            r.backend = Some(backend.clone());
            r.kind = Some(kind.to_string());
            r.ok = Some(false);
            r.error_code = Some(code.clone());
            r.error_message = Some(message.clone());
            r
        }
        ActivityEvent::QueryServed {
            operation,
            duration_ms,
            ok,
        } => {
            let severity = if *ok { Severity::Info } else { Severity::Warning };
            let mut r = ActivityRecord::new(EventType::QueryServed, severity);
            r.operation = Some((*operation).to_string());
            r.duration_ms = Some(*duration_ms);
            r.ok = Some(*ok);
            r
        }
        ActivityEvent::Shutdown => return None,
    };
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path, capacity: usize) -> ActivityLoggerConfig {
        ActivityLoggerConfig {
            jsonl_config: JsonlConfig {
                path: dir.join("activity.jsonl"),
                fallback_path: None,
                max_size_bytes: 10 * 1024 * 1024,
                max_rotated_files: 3,
                fsync_interval_secs: 60,
            },
            channel_capacity: capacity,
        }
    }

    fn read_lines(dir: &std::path::Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(dir.join("activity.jsonl"))
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn spawn_log_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path(), 64)).unwrap();
        handle.send(ActivityEvent::ServiceStarted {
            backend: "opensearch".to_string(),
            config_hash: "abc123".to_string(),
        });
        handle.shutdown();
        join.join().unwrap();

        let lines = read_lines(dir.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["event"], "service_start");
        assert!(lines[0]["details"].as_str().unwrap().contains("abc123"));
    }

    #[test]
    fn every_event_kind_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path(), 64)).unwrap();
        handle.send(ActivityEvent::CacheMiss {
            backend: "memory".to_string(),
            kind: ActionKind::Message,
        });
        handle.send(ActivityEvent::SourceFetched {
            backend: "memory".to_string(),
            kind: ActionKind::Message,
            records: 10,
            duration_ms: 3,
        });
        handle.send(ActivityEvent::CacheHit {
            backend: "memory".to_string(),
            kind: ActionKind::Log,
            records: 4,
        });
        handle.send(ActivityEvent::SourceFailed {
            backend: "memory".to_string(),
            kind: ActionKind::Log,
            code: "SWD-2001".to_string(),
            message: "down".to_string(),
        });
        handle.send(ActivityEvent::CacheInvalidated { entries: 2 });
        handle.send(ActivityEvent::QueryServed {
            operation: "error_statistics",
            duration_ms: 1,
            ok: true,
        });
        handle.shutdown();
        join.join().unwrap();

        let lines = read_lines(dir.path());
        let events: Vec<&str> = lines.iter().map(|l| l["event"].as_str().unwrap()).collect();
        assert_eq!(
            events,
            vec![
                "cache_miss",
                "source_fetch",
                "cache_hit",
                "source_failure",
                "cache_invalidate",
                "query_served"
            ]
        );
        assert_eq!(lines[1]["records"], 10);
        assert_eq!(lines[2]["kind"], "log");
        assert_eq!(lines[3]["error_code"], "SWD-2001");
        assert_eq!(lines[3]["severity"], "error");
        assert_eq!(lines[5]["operation"], "error_statistics");
    }

    #[test]
    fn handles_are_cloneable_across_threads() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path(), 64)).unwrap();
        let clone = handle.clone();
        std::thread::spawn(move || {
            clone.send(ActivityEvent::CacheInvalidated { entries: 0 });
        })
        .join()
        .unwrap();
        handle.send(ActivityEvent::CacheInvalidated { entries: 1 });
        handle.shutdown();
        join.join().unwrap();

        assert_eq!(read_lines(dir.path()).len(), 2);
    }

    #[test]
    fn logger_exits_when_handles_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path(), 8)).unwrap();
        handle.send(ActivityEvent::CacheInvalidated { entries: 3 });
        drop(handle);
        join.join().unwrap();
        assert_eq!(read_lines(dir.path()).len(), 1);
    }

    #[test]
    fn dropped_counter_starts_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let (handle, join) = spawn_logger(test_config(dir.path(), 2)).unwrap();
        assert_eq!(handle.dropped_events(), 0);
        handle.shutdown();
        join.join().unwrap();
    }
}
