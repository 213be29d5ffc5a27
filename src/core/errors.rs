//! SWD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SwdError>;

/// Top-level error type for the SWIFT dashboard analytics core.
#[derive(Debug, Error)]
pub enum SwdError {
    #[error("[SWD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SWD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[SWD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SWD-2001] record source {source_name} unavailable: {details}")]
    SourceUnavailable {
        source_name: String,
        details: String,
    },

    #[error("[SWD-2002] record source {source_name} timed out after {timeout_ms}ms")]
    SourceTimeout {
        source_name: String,
        timeout_ms: u64,
    },

    #[error("[SWD-2003] {what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("[SWD-2004] malformed {field}: {details}")]
    MalformedInput {
        field: &'static str,
        details: String,
    },

    #[error("[SWD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SWD-2102] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[SWD-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SWD-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[SWD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SwdError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SWD-1001",
            Self::MissingConfig { .. } => "SWD-1002",
            Self::ConfigParse { .. } => "SWD-1003",
            Self::SourceUnavailable { .. } => "SWD-2001",
            Self::SourceTimeout { .. } => "SWD-2002",
            Self::NotFound { .. } => "SWD-2003",
            Self::MalformedInput { .. } => "SWD-2004",
            Self::Serialization { .. } => "SWD-2101",
            Self::Sql { .. } => "SWD-2102",
            Self::Io { .. } => "SWD-3002",
            Self::ChannelClosed { .. } => "SWD-3003",
            Self::Runtime { .. } => "SWD-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. }
                | Self::SourceTimeout { .. }
                | Self::Io { .. }
                | Self::ChannelClosed { .. }
                | Self::Sql { .. }
                | Self::Runtime { .. }
        )
    }

    /// Whether the failure came from the backing record store.
    #[must_use]
    pub const fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::SourceTimeout { .. } | Self::Sql { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for a failed backend fetch.
    #[must_use]
    pub fn source_unavailable(source_name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            details: details.into(),
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for SwdError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for SwdError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SwdError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<SwdError> {
        vec![
            SwdError::InvalidConfig {
                details: String::new(),
            },
            SwdError::MissingConfig {
                path: PathBuf::new(),
            },
            SwdError::ConfigParse {
                context: "",
                details: String::new(),
            },
            SwdError::SourceUnavailable {
                source_name: String::new(),
                details: String::new(),
            },
            SwdError::SourceTimeout {
                source_name: String::new(),
                timeout_ms: 0,
            },
            SwdError::NotFound {
                what: "message",
                id: String::new(),
            },
            SwdError::MalformedInput {
                field: "period",
                details: String::new(),
            },
            SwdError::Serialization {
                context: "",
                details: String::new(),
            },
            SwdError::Sql {
                context: "",
                details: String::new(),
            },
            SwdError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            SwdError::ChannelClosed { component: "" },
            SwdError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = all_variants();
        let codes: Vec<&str> = errors.iter().map(SwdError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_swd_prefix() {
        for err in &all_variants() {
            assert!(
                err.code().starts_with("SWD-"),
                "code {} must start with SWD-",
                err.code()
            );
            assert!(
                err.to_string().contains(err.code()),
                "display should contain code: {err}"
            );
        }
    }

    #[test]
    fn not_found_is_not_a_source_failure() {
        let err = SwdError::NotFound {
            what: "message",
            id: "abc-123".to_string(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_source_failure());
        assert!(err.to_string().contains("abc-123"));
    }

    #[test]
    fn source_errors_are_retryable() {
        let unavailable = SwdError::source_unavailable("opensearch", "connection refused");
        assert!(unavailable.is_retryable());
        assert!(unavailable.is_source_failure());
        assert!(unavailable.to_string().contains("connection refused"));

        let timeout = SwdError::SourceTimeout {
            source_name: "moesif".to_string(),
            timeout_ms: 30_000,
        };
        assert!(timeout.is_retryable());
        assert!(timeout.to_string().contains("30000ms"));
    }

    #[test]
    fn malformed_input_not_retryable() {
        let err = SwdError::MalformedInput {
            field: "direction",
            details: "sideways".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "SWD-2004");
    }

    #[test]
    fn io_convenience_constructor() {
        let err = SwdError::io(
            "/tmp/messages.jsonl",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "SWD-3002");
        assert!(err.to_string().contains("/tmp/messages.jsonl"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: SwdError = json_err.into();
        assert_eq!(err.code(), "SWD-2101");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: SwdError = toml_err.into();
        assert_eq!(err.code(), "SWD-1003");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn from_rusqlite_error() {
        let sql_err =
            rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(1), Some("test".to_string()));
        let err: SwdError = sql_err.into();
        assert_eq!(err.code(), "SWD-2102");
    }
}
