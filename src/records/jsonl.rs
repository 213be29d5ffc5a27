//! File-backed record source: one raw search hit per JSON line.

#![allow(missing_docs)]

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::errors::{Result, SwdError};
use crate::records::model::ActionKind;
use crate::records::normalize::SourceLayout;
use crate::records::source::{RecordSource, retain_matching};

/// Reads exported hits from JSONL files, re-reading on every fetch.
///
/// Blank lines are ignored. Lines that are not valid JSON are skipped with a
/// stderr diagnostic so one corrupt line never hides the rest of the file.
#[derive(Debug, Clone)]
pub struct JsonlRecordSource {
    name: String,
    layout: SourceLayout,
    messages_path: PathBuf,
    logs_path: Option<PathBuf>,
}

impl JsonlRecordSource {
    pub fn new(layout: SourceLayout, messages_path: PathBuf, logs_path: Option<PathBuf>) -> Self {
        Self {
            name: format!("jsonl:{}", messages_path.display()),
            layout,
            messages_path,
            logs_path,
        }
    }

    fn path_for(&self, kind: ActionKind) -> Option<&Path> {
        match kind {
            ActionKind::Message => Some(self.messages_path.as_path()),
            ActionKind::Log => self.logs_path.as_deref(),
        }
    }

    fn read_hits(&self, kind: ActionKind) -> Result<Vec<Value>> {
        let Some(path) = self.path_for(kind) else {
            // No log export configured: an empty stream, not an outage.
            return Ok(Vec::new());
        };
        let file = File::open(path).map_err(|e| {
            SwdError::source_unavailable(self.name.clone(), format!("{}: {e}", path.display()))
        })?;
        read_jsonl_hits(BufReader::new(file), path)
    }
}

/// Parse JSON lines from `reader`, skipping blank and malformed lines.
pub fn read_jsonl_hits(reader: impl BufRead, origin: &Path) -> Result<Vec<Value>> {
    let mut hits = Vec::new();
    let mut skipped = 0_usize;
    for line in reader.lines() {
        let line = line.map_err(|e| SwdError::io(origin, e))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(hit) => hits.push(hit),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        eprintln!(
            "[SWD-JSONL] skipped {skipped} malformed line(s) in {}",
            origin.display()
        );
    }
    Ok(hits)
}

impl RecordSource for JsonlRecordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout(&self) -> SourceLayout {
        self.layout
    }

    fn fetch_all(&self, kind: ActionKind, direction: Option<&str>) -> Result<Vec<Value>> {
        let mut hits = self.read_hits(kind)?;
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
        let mut hits = self.read_hits(kind)?;
        retain_matching(&mut hits, self.layout, kind, from, to, direction);
        Ok(hits)
    }
}
