//! Configuration: TOML file, `SWD_*` environment overrides, validated defaults.

#![allow(missing_docs)]

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SwdError};
use crate::logger::jsonl::JsonlConfig;
use crate::records::normalize::SourceLayout;

/// Full configuration model.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub source: SourceConfig,
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
}

/// Backing store for raw hits.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Jsonl,
    Sqlite,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jsonl => "jsonl",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = SwdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Ok(Self::Jsonl),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(SwdError::MalformedInput {
                field: "source kind",
                details: format!("expected jsonl or sqlite, got {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub layout: SourceLayout,
    /// JSONL export of message hits.
    pub messages_path: PathBuf,
    /// JSONL export of log hits. Unset means no logs.
    pub logs_path: Option<PathBuf>,
    /// Local event store used when `kind = "sqlite"` and by `import`.
    pub sqlite_db: PathBuf,
    pub fetch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub top_types_limit: usize,
    pub recent_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub activity_log: PathBuf,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            kind: SourceKind::Jsonl,
            layout: SourceLayout::OpenSearch,
            messages_path: data.join("messages.jsonl"),
            logs_path: None,
            sqlite_db: data.join("events.sqlite3"),
            fetch_timeout_ms: 30_000,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_types_limit: 7,
            recent_limit: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activity_log: data_dir().join("activity.jsonl"),
            max_size_bytes: 20 * 1024 * 1024,
            max_rotated_files: 5,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: home_dir()
                .join(".config")
                .join("swiftdash")
                .join("config.toml"),
        }
    }
}

impl CacheConfig {
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl SourceConfig {
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl LoggingConfig {
    /// Writer settings for the activity log, falling back to the temp dir.
    pub fn jsonl_config(&self) -> JsonlConfig {
        JsonlConfig {
            path: self.activity_log.clone(),
            fallback_path: Some(env::temp_dir().join("swiftdash-activity.jsonl")),
            max_size_bytes: self.max_size_bytes,
            max_rotated_files: self.max_rotated_files,
            ..JsonlConfig::default()
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[SWD-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("swiftdash")
}

impl Config {
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load from `path` (or the default path), apply env overrides, validate.
    ///
    /// A missing file at the default path yields defaults; a missing explicit
    /// path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SwdError::io(&path_buf, source))?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(SwdError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// FNV-1a hash of the effective config, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // cache
        set_parsed(&mut lookup, "SWD_CACHE_ENABLED", &mut self.cache.enabled)?;
        set_parsed(&mut lookup, "SWD_CACHE_TTL_SECONDS", &mut self.cache.ttl_seconds)?;

        // source
        set_parsed(&mut lookup, "SWD_SOURCE_KIND", &mut self.source.kind)?;
        set_parsed(&mut lookup, "SWD_SOURCE_LAYOUT", &mut self.source.layout)?;
        if let Some(raw) = lookup("SWD_SOURCE_MESSAGES_PATH") {
            self.source.messages_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SWD_SOURCE_LOGS_PATH") {
            self.source.logs_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("SWD_SOURCE_SQLITE_DB") {
            self.source.sqlite_db = PathBuf::from(raw);
        }
        set_parsed(
            &mut lookup,
            "SWD_SOURCE_FETCH_TIMEOUT_MS",
            &mut self.source.fetch_timeout_ms,
        )?;

        // analytics
        set_parsed(
            &mut lookup,
            "SWD_ANALYTICS_TOP_TYPES_LIMIT",
            &mut self.analytics.top_types_limit,
        )?;
        set_parsed(
            &mut lookup,
            "SWD_ANALYTICS_RECENT_LIMIT",
            &mut self.analytics.recent_limit,
        )?;

        // logging
        set_parsed(&mut lookup, "SWD_LOGGING_ENABLED", &mut self.logging.enabled)?;
        if let Some(raw) = lookup("SWD_LOGGING_ACTIVITY_LOG") {
            self.logging.activity_log = PathBuf::from(raw);
        }
        set_parsed(
            &mut lookup,
            "SWD_LOGGING_MAX_SIZE_BYTES",
            &mut self.logging.max_size_bytes,
        )?;
        set_parsed(
            &mut lookup,
            "SWD_LOGGING_MAX_ROTATED_FILES",
            &mut self.logging.max_rotated_files,
        )?;

        Ok(())
    }

    /// Expand a leading `~/` in every configured path.
    fn normalize_paths(&mut self) {
        let home = env::var_os("HOME").map(PathBuf::from);
        let Some(home) = home else {
            return;
        };
        let expand = |path: &mut PathBuf| {
            if let Ok(rest) = path.strip_prefix("~") {
                *path = home.join(rest);
            }
        };
        expand(&mut self.source.messages_path);
        if let Some(logs) = self.source.logs_path.as_mut() {
            expand(logs);
        }
        expand(&mut self.source.sqlite_db);
        expand(&mut self.logging.activity_log);
    }

    fn validate(&self) -> Result<()> {
        if self.cache.enabled && self.cache.ttl_seconds == 0 {
            return Err(SwdError::InvalidConfig {
                details: "cache.ttl_seconds must be > 0 when the cache is enabled".to_string(),
            });
        }
        if self.source.fetch_timeout_ms == 0 {
            return Err(SwdError::InvalidConfig {
                details: "source.fetch_timeout_ms must be > 0".to_string(),
            });
        }
        for (name, value) in [
            ("analytics.top_types_limit", self.analytics.top_types_limit),
            ("analytics.recent_limit", self.analytics.recent_limit),
        ] {
            if value == 0 {
                return Err(SwdError::InvalidConfig {
                    details: format!("{name} must be > 0"),
                });
            }
        }
        if self.source.messages_path.as_os_str().is_empty() {
            return Err(SwdError::InvalidConfig {
                details: "source.messages_path must not be empty".to_string(),
            });
        }
        if self.logging.enabled {
            if self.logging.max_size_bytes == 0 {
                return Err(SwdError::InvalidConfig {
                    details: "logging.max_size_bytes must be > 0".to_string(),
                });
            }
            if self.logging.max_rotated_files == 0 {
                return Err(SwdError::InvalidConfig {
                    details: "logging.max_rotated_files must be > 0".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_parsed<F, T>(lookup: &mut F, name: &str, slot: &mut T) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.trim().parse::<T>().map_err(|error| SwdError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    fn apply(cfg: &mut Config, pairs: &[(&str, &str)]) -> Result<()> {
        let env = vars(pairs);
        cfg.apply_env_overrides_from(|name| env.get(name).cloned())
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.cache.ttl(), Duration::from_secs(300));
        assert_eq!(cfg.analytics.top_types_limit, 7);
        assert_eq!(cfg.analytics.recent_limit, 5);
        assert_eq!(cfg.source.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn zero_ttl_rejected_only_when_cache_enabled() {
        let mut cfg = Config::default();
        cfg.cache.ttl_seconds = 0;
        let err = cfg.validate().expect_err("expected invalid ttl");
        assert_eq!(err.code(), "SWD-1001");
        cfg.cache.enabled = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_limits_rejected() {
        let mut cfg = Config::default();
        cfg.analytics.recent_limit = 0;
        match cfg.validate() {
            Err(SwdError::InvalidConfig { details }) => assert!(details.contains("recent_limit")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg = Config::default();
        cfg.source.fetch_timeout_ms = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        apply(
            &mut cfg,
            &[
                ("SWD_CACHE_TTL_SECONDS", "60"),
                ("SWD_CACHE_ENABLED", "false"),
                ("SWD_SOURCE_KIND", "sqlite"),
                ("SWD_SOURCE_LAYOUT", "moesif"),
                ("SWD_SOURCE_LOGS_PATH", "/data/logs.jsonl"),
                ("SWD_ANALYTICS_TOP_TYPES_LIMIT", " 10 "),
            ],
        )
        .expect("overrides should parse");
        assert_eq!(cfg.cache.ttl_seconds, 60);
        assert!(!cfg.cache.enabled);
        assert_eq!(cfg.source.kind, SourceKind::Sqlite);
        assert_eq!(cfg.source.layout, SourceLayout::Moesif);
        assert_eq!(cfg.source.logs_path, Some(PathBuf::from("/data/logs.jsonl")));
        assert_eq!(cfg.analytics.top_types_limit, 10);
    }

    #[test]
    fn env_invalid_values_rejected() {
        let mut cfg = Config::default();
        let err = apply(&mut cfg, &[("SWD_CACHE_ENABLED", "maybe")]).unwrap_err();
        assert_eq!(err.code(), "SWD-1003");
        assert!(err.to_string().contains("SWD_CACHE_ENABLED"));

        let err = apply(&mut cfg, &[("SWD_SOURCE_LAYOUT", "elastic")]).unwrap_err();
        assert_eq!(err.code(), "SWD-1003");
    }

    #[test]
    fn stable_hash_deterministic_and_sensitive() {
        let cfg = Config::default();
        let a = cfg.stable_hash().unwrap();
        assert_eq!(a, cfg.stable_hash().unwrap());
        assert_eq!(a.len(), 16);
        let mut changed = cfg;
        changed.cache.ttl_seconds += 1;
        assert_ne!(a, changed.stable_hash().unwrap());
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let result = Config::load(Some(Path::new("/nonexistent/swiftdash/config.toml")));
        assert!(matches!(result, Err(SwdError::MissingConfig { .. })));
    }

    #[test]
    fn load_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[cache]
ttl_seconds = 120

[source]
layout = "flat"
messages_path = "/srv/export/messages.jsonl"
"#,
        )
        .unwrap();
        let cfg = Config::load(Some(&path)).expect("config should load");
        assert_eq!(cfg.cache.ttl_seconds, 120);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.source.layout, SourceLayout::Flat);
        assert_eq!(cfg.source.kind, SourceKind::Jsonl);
        assert_eq!(
            cfg.source.messages_path,
            PathBuf::from("/srv/export/messages.jsonl")
        );
        assert_eq!(cfg.paths.config_file, path);
    }

    #[test]
    fn load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache\nttl_seconds = ").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code(), "SWD-1003");
    }

    #[test]
    fn tilde_paths_expand_to_home() {
        let mut cfg = Config::default();
        cfg.source.messages_path = PathBuf::from("~/exports/messages.jsonl");
        cfg.normalize_paths();
        if let Some(home) = env::var_os("HOME") {
            assert_eq!(
                cfg.source.messages_path,
                PathBuf::from(home).join("exports/messages.jsonl")
            );
        }
    }

    #[test]
    fn toml_roundtrip_preserves_config() {
        let cfg = Config::default();
        let text = toml::to_string(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&text).expect("parse");
        assert_eq!(parsed, cfg);
    }
}
