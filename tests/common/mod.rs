#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_swiftdash") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "swiftdash.exe" } else { "swiftdash" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve swiftdash binary path for integration test"),
    }
}

/// Run the binary with `args`, keeping a transcript of the run on disk.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    let root = std::env::temp_dir().join("swiftdash-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let output = Command::new(&bin_path)
        .args(args)
        .env("SWD_OUTPUT_FORMAT", "json")
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute swiftdash command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Parse the single JSON line a `--json` command prints.
pub fn json_output(result: &CmdResult) -> Value {
    serde_json::from_str(result.stdout.trim()).unwrap_or_else(|e| {
        panic!(
            "stdout is not one JSON document ({e}); log: {}",
            result.log_path.display()
        )
    })
}

// ──────────────────── fixtures ────────────────────

/// OpenSearch-style message hit.
pub fn message_hit(id: &str, mt: &str, direction: &str, status: &str, date: DateTime<Utc>) -> Value {
    json!({
        "_index": "translations",
        "_id": id,
        "_source": {
            "id": id,
            "refId": format!("REF-{id}"),
            "mtMessageType": mt,
            "mxMessageType": "pacs.008.001.08",
            "direction": direction,
            "amount": "1500.00",
            "currency": "EUR",
            "date": date.to_rfc3339_opts(SecondsFormat::Millis, true),
            "status": status,
        }
    })
}

/// OpenSearch-style log hit.
pub fn log_hit(level: &str, module: &str, message: &str, time: DateTime<Utc>) -> Value {
    json!({
        "_source": {
            "time": time.to_rfc3339_opts(SecondsFormat::Millis, true),
            "level": level,
            "module": module,
            "message": message,
        }
    })
}

pub fn write_jsonl(path: &Path, hits: &[Value]) {
    let mut file = fs::File::create(path).expect("create jsonl fixture");
    for hit in hits {
        writeln!(file, "{}", serde_json::to_string(hit).expect("encode hit")).expect("write hit");
    }
}

/// Temp directory holding JSONL exports, a SQLite path and a config file
/// pointing at them.
pub struct Workspace {
    pub dir: TempDir,
    pub config: PathBuf,
    pub messages: PathBuf,
    pub logs: PathBuf,
    pub db: PathBuf,
    pub activity: PathBuf,
}

impl Workspace {
    pub fn new(messages: &[Value], logs: &[Value]) -> Self {
        Self::with_source_kind("jsonl", messages, logs)
    }

    pub fn with_source_kind(kind: &str, messages: &[Value], logs: &[Value]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let messages_path = dir.path().join("messages.jsonl");
        let logs_path = dir.path().join("logs.jsonl");
        let db = dir.path().join("store").join("events.sqlite3");
        let activity = dir.path().join("activity.jsonl");
        write_jsonl(&messages_path, messages);
        write_jsonl(&logs_path, logs);

        let config = dir.path().join("config.toml");
        let body = format!(
            "[source]\nkind = \"{kind}\"\nlayout = \"opensearch\"\nmessages_path = {:?}\nlogs_path = {:?}\nsqlite_db = {:?}\n\n[logging]\nactivity_log = {:?}\n",
            messages_path.display().to_string(),
            logs_path.display().to_string(),
            db.display().to_string(),
            activity.display().to_string(),
        );
        fs::write(&config, body).expect("write config");

        Self {
            dir,
            config,
            messages: messages_path,
            logs: logs_path,
            db,
            activity,
        }
    }

    pub fn config_arg(&self) -> String {
        self.config.display().to_string()
    }
}
