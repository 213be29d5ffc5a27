//! Normalized record shapes shared by every backend.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::SwdError;

/// Label used for messages that carry no MT type.
pub const UNKNOWN_TYPE: &str = "Unknown";

// ──────────────────── action kind ────────────────────

/// Which stored event stream a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Message,
    Log,
}

impl ActionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────── direction / outcome ────────────────────

/// Message flow relative to the institution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Inward,
    Outward,
}

impl Direction {
    /// Case-insensitive parse; anything else is not a recognized flow.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("inward") {
            Some(Self::Inward)
        } else if raw.eq_ignore_ascii_case("outward") {
            Some(Self::Outward)
        } else {
            None
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inward => "Inward",
            Self::Outward => "Outward",
        }
    }
}

/// Translation result, folded from the free-form status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Successful,
    Failed,
    Other,
}

impl Outcome {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("successful") {
            Self::Successful
        } else if raw.eq_ignore_ascii_case("failed") {
            Self::Failed
        } else {
            Self::Other
        }
    }
}

// ──────────────────── direction filter ────────────────────

/// Caller-supplied direction restriction. `All` (or no value) keeps everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DirectionFilter {
    #[default]
    All,
    /// Keep records whose direction equals this value, ignoring case.
    Only(String),
}

impl DirectionFilter {
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            None | Some("") => Self::All,
            Some(value) if value.eq_ignore_ascii_case("all") => Self::All,
            Some(value) => Self::Only(value.to_string()),
        }
    }

    pub fn matches(&self, direction: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted.eq_ignore_ascii_case(direction.trim()),
        }
    }

    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Value to forward to a record source, `None` meaning unfiltered.
    pub fn as_param(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(value) => Some(value.as_str()),
        }
    }
}

impl FromStr for DirectionFilter {
    type Err = SwdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let filter = Self::from_param(Some(s));
        match &filter {
            Self::Only(value) if Direction::parse(value).is_none() => {
                Err(SwdError::MalformedInput {
                    field: "direction",
                    details: format!("expected All, Inward or Outward, got {value:?}"),
                })
            }
            _ => Ok(filter),
        }
    }
}

impl fmt::Display for DirectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Only(value) => f.write_str(value),
        }
    }
}

// ──────────────────── records ────────────────────

/// One translated SWIFT message. Every string field is present, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub ref_id: String,
    pub mt_message_type: String,
    pub mx_message_type: String,
    pub direction: String,
    pub amount: String,
    pub currency: String,
    pub date: Option<DateTime<Utc>>,
    pub status: String,
    pub original_message: String,
    pub translated_message: String,
    pub field_error: String,
    pub not_supported_error: String,
    pub invalid_error: String,
    pub other_error: String,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            id: String::new(),
            ref_id: String::new(),
            mt_message_type: String::new(),
            mx_message_type: String::new(),
            direction: String::new(),
            amount: "0".to_string(),
            currency: String::new(),
            date: None,
            status: String::new(),
            original_message: String::new(),
            translated_message: String::new(),
            field_error: String::new(),
            not_supported_error: String::new(),
            invalid_error: String::new(),
            other_error: String::new(),
        }
    }
}

impl Message {
    pub fn flow(&self) -> Option<Direction> {
        Direction::parse(&self.direction)
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::parse(&self.status)
    }

    /// MT type used for rankings, `Unknown` when empty. Whitespace-only
    /// values are kept as their own type.
    pub fn type_label(&self) -> &str {
        if self.mt_message_type.is_empty() {
            UNKNOWN_TYPE
        } else {
            &self.mt_message_type
        }
    }
}

/// One structured log line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub time: Option<DateTime<Utc>>,
    pub level: String,
    pub module: String,
    pub message: String,
}
