//! SQLite event store: imported hits queried offline as a `RecordSource`.
//!
//! Each row keeps the raw hit as JSON plus the few columns needed to filter
//! in SQL (action, direction, event time).

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, params};
use serde_json::Value;

use crate::core::errors::{Result, SwdError};
use crate::records::model::{ActionKind, DirectionFilter};
use crate::records::normalize::{SourceLayout, record_direction, record_id, record_timestamp};
use crate::records::source::RecordSource;

/// Local store of raw hits, shareable across threads.
pub struct SqliteRecordSource {
    conn: Mutex<Connection>,
    path: PathBuf,
    name: String,
    layout: SourceLayout,
}

impl SqliteRecordSource {
    /// Open (or create) the store at `path`, applying schema and PRAGMAs.
    pub fn open(path: &Path, layout: SourceLayout) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SwdError::io(parent, source))?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        apply_pragmas(&conn)?;
        apply_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            name: format!("sqlite:{}", path.display()),
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert raw hits for `kind` in one transaction. Returns rows written.
    pub fn ingest(&self, kind: ActionKind, hits: &[Value]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO record_hits (action, record_id, direction, occurred_at, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for hit in hits {
                let occurred_at = record_timestamp(hit, self.layout, kind).map(format_ts);
                stmt.execute(params![
                    kind.as_str(),
                    record_id(hit, self.layout),
                    record_direction(hit, self.layout).trim(),
                    occurred_at,
                    serde_json::to_string(hit)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(hits.len())
    }

    /// Number of stored hits for `kind`.
    pub fn count(&self, kind: ActionKind) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM record_hits WHERE action = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Remove every stored hit for `kind`. Returns rows deleted.
    pub fn clear(&self, kind: ActionKind) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM record_hits WHERE action = ?1",
            params![kind.as_str()],
        )?;
        Ok(deleted)
    }

    fn query(
        &self,
        kind: ActionKind,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        direction: Option<&str>,
    ) -> Result<Vec<Value>> {
        let direction = match kind {
            ActionKind::Message => DirectionFilter::from_param(direction)
                .as_param()
                .map(str::to_string),
            ActionKind::Log => None,
        };
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT payload FROM record_hits
             WHERE action = ?1
               AND (?2 IS NULL OR occurred_at >= ?2)
               AND (?3 IS NULL OR occurred_at <= ?3)
               AND (?4 IS NULL OR lower(trim(direction, ' ' || char(9, 10, 13))) = lower(?4))
             ORDER BY id ASC",
        )?;
        let payloads = stmt
            .query_map(
                params![
                    kind.as_str(),
                    from.map(format_ts),
                    to.map(format_ts),
                    direction
                ],
                |row| row.get::<_, String>(0),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(SwdError::from))
            .collect()
    }
}

impl RecordSource for SqliteRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout(&self) -> SourceLayout {
        self.layout
    }

    fn fetch_all(&self, kind: ActionKind, direction: Option<&str>) -> Result<Vec<Value>> {
        self.query(kind, None, None, direction)
    }

    fn fetch_in_range(
        &self,
        kind: ActionKind,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        direction: Option<&str>,
    ) -> Result<Vec<Value>> {
        self.query(kind, from, to, direction)
    }
}

/// Fixed-width UTC form so string comparison in SQL orders by time.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         PRAGMA busy_timeout = 5000;",
    )?;
    let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        eprintln!("[SWD-SQLITE] WARNING: requested WAL mode but got '{mode}'");
    }
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS record_hits (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL,
            record_id TEXT NOT NULL DEFAULT '',
            direction TEXT NOT NULL DEFAULT '',
            occurred_at TEXT,
            payload TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_hits_action_time ON record_hits(action, occurred_at);
        CREATE INDEX IF NOT EXISTS idx_hits_record_id ON record_hits(record_id);",
    )?;
    Ok(())
}
