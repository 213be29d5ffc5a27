//! Coerce raw backend hits into complete `Message` / `LogEntry` values.
//!
//! Normalization never fails. Each field is looked up independently and
//! defaulted when absent, null, or of an unexpected JSON type.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::SwdError;
use crate::records::model::{ActionKind, LogEntry, Message};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Where the record body lives inside a raw hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLayout {
    /// Search-index hit: fields under `_source`.
    #[default]
    OpenSearch,
    /// API-analytics hit: fields under `_source.metadata`.
    Moesif,
    /// Fields at the top level.
    Flat,
}

impl SourceLayout {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenSearch => "opensearch",
            Self::Moesif => "moesif",
            Self::Flat => "flat",
        }
    }

    /// The object holding record fields, if the hit has one.
    pub fn body(self, raw: &Value) -> Option<&Map<String, Value>> {
        match self {
            Self::Flat => raw.as_object(),
            Self::OpenSearch => raw
                .get("_source")
                .and_then(Value::as_object)
                .or_else(|| raw.as_object()),
            Self::Moesif => raw
                .get("_source")
                .and_then(|source| source.get("metadata"))
                .or_else(|| raw.get("metadata"))
                .and_then(Value::as_object),
        }
    }
}

impl fmt::Display for SourceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceLayout {
    type Err = SwdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opensearch" => Ok(Self::OpenSearch),
            "moesif" => Ok(Self::Moesif),
            "flat" => Ok(Self::Flat),
            other => Err(SwdError::MalformedInput {
                field: "layout",
                details: format!("expected opensearch, moesif or flat, got {other:?}"),
            }),
        }
    }
}

// ──────────────────── normalization ────────────────────

pub fn normalize_message(raw: &Value, layout: SourceLayout) -> Message {
    let Some(body) = layout.body(raw) else {
        return Message::default();
    };
    let amount = text(body, "amount");
    Message {
        id: text(body, "id"),
        ref_id: text(body, "refId"),
        mt_message_type: text(body, "mtMessageType"),
        mx_message_type: text(body, "mxMessageType"),
        direction: text(body, "direction"),
        amount: if amount.is_empty() {
            "0".to_string()
        } else {
            amount
        },
        currency: text(body, "currency"),
        date: body.get("date").and_then(parse_timestamp),
        status: text(body, "status"),
        original_message: text(body, "originalMessage"),
        translated_message: text(body, "translatedMessage"),
        field_error: text(body, "fieldError"),
        not_supported_error: text(body, "notSupportedError"),
        invalid_error: text(body, "invalidError"),
        other_error: text(body, "otherError"),
    }
}

pub fn normalize_log(raw: &Value, layout: SourceLayout) -> LogEntry {
    let Some(body) = layout.body(raw) else {
        return LogEntry::default();
    };
    LogEntry {
        time: log_time(body),
        level: text(body, "level"),
        module: text(body, "module"),
        message: text(body, "message"),
    }
}

pub fn normalize_messages(raw: &[Value], layout: SourceLayout) -> Vec<Message> {
    raw.iter().map(|hit| normalize_message(hit, layout)).collect()
}

pub fn normalize_logs(raw: &[Value], layout: SourceLayout) -> Vec<LogEntry> {
    raw.iter().map(|hit| normalize_log(hit, layout)).collect()
}

/// Event timestamp of a raw hit: `date` for messages, `time` for logs.
pub fn record_timestamp(raw: &Value, layout: SourceLayout, kind: ActionKind) -> Option<DateTime<Utc>> {
    let body = layout.body(raw)?;
    match kind {
        ActionKind::Message => body.get("date").and_then(parse_timestamp),
        ActionKind::Log => log_time(body),
    }
}

/// Raw `direction` field of a hit, empty when absent.
pub fn record_direction(raw: &Value, layout: SourceLayout) -> String {
    layout
        .body(raw)
        .map(|body| text(body, "direction"))
        .unwrap_or_default()
}

/// Raw `id` field of a hit, empty when absent.
pub fn record_id(raw: &Value, layout: SourceLayout) -> String {
    layout
        .body(raw)
        .map(|body| text(body, "id"))
        .unwrap_or_default()
}

fn log_time(body: &Map<String, Value>) -> Option<DateTime<Utc>> {
    body.get("time")
        .and_then(parse_timestamp)
        .or_else(|| body.get("timestamp").and_then(parse_timestamp))
}

fn text(body: &Map<String, Value>, field: &str) -> String {
    match body.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

// ──────────────────── timestamps ────────────────────

/// Tolerant timestamp parse.
///
/// Accepts RFC 3339, naive date-times (read as UTC), bare dates (midnight
/// UTC), and epoch milliseconds as a number or digit string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn opensearch_hit_is_read_from_source() {
        let hit = json!({
            "_id": "x",
            "_source": {
                "id": "m-1",
                "refId": "REF-1",
                "mtMessageType": "MT103",
                "direction": "Inward",
                "amount": "1500.00",
                "currency": "EUR",
                "date": "2025-03-14T10:30:00Z",
                "status": "Successful"
            }
        });
        let message = normalize_message(&hit, SourceLayout::OpenSearch);
        assert_eq!(message.id, "m-1");
        assert_eq!(message.ref_id, "REF-1");
        assert_eq!(message.amount, "1500.00");
        assert_eq!(
            message.date,
            Some(Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap())
        );
        assert_eq!(message.field_error, "");
    }

    #[test]
    fn moesif_hit_is_read_from_metadata() {
        let hit = json!({
            "_source": {
                "request": {"verb": "POST"},
                "metadata": {"id": "m-2", "status": "Failed", "fieldError": "bad :20:"}
            }
        });
        let message = normalize_message(&hit, SourceLayout::Moesif);
        assert_eq!(message.id, "m-2");
        assert_eq!(message.status, "Failed");
        assert_eq!(message.field_error, "bad :20:");
        assert_eq!(message.amount, "0");
    }

    #[test]
    fn missing_body_gives_defaults() {
        let message = normalize_message(&json!({"_source": {}}), SourceLayout::Moesif);
        assert_eq!(message, Message::default());
        let message = normalize_message(&json!("not an object"), SourceLayout::Flat);
        assert_eq!(message, Message::default());
    }

    #[test]
    fn wrong_typed_fields_are_defaulted() {
        let hit = json!({
            "id": 42,
            "amount": null,
            "direction": {"nested": true},
            "status": ["Failed"],
            "date": false
        });
        let message = normalize_message(&hit, SourceLayout::Flat);
        assert_eq!(message.id, "42");
        assert_eq!(message.amount, "0");
        assert_eq!(message.direction, "");
        assert_eq!(message.status, "");
        assert_eq!(message.date, None);
    }

    #[test]
    fn log_time_falls_back_to_timestamp_field() {
        let hit = json!({"_source": {"timestamp": "2025-03-14 08:00:00", "level": "ERROR"}});
        let log = normalize_log(&hit, SourceLayout::OpenSearch);
        assert_eq!(log.level, "ERROR");
        assert_eq!(
            log.time,
            Some(Utc.with_ymd_and_hms(2025, 3, 14, 8, 0, 0).unwrap())
        );
        assert_eq!(log.module, "");
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp_str("2025-03-14T10:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp_str("2025-03-14T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp_str("2025-03-14T10:30:00.000"), Some(expected));
        assert_eq!(parse_timestamp_str("2025-03-14 10:30:00"), Some(expected));
        assert_eq!(parse_timestamp_str("2025-03-14T10:30"), Some(expected));
        assert_eq!(
            parse_timestamp_str("2025-03-14"),
            Some(Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap())
        );
        let millis = expected.timestamp_millis();
        assert_eq!(parse_timestamp(&json!(millis)), Some(expected));
        assert_eq!(parse_timestamp_str(&millis.to_string()), Some(expected));
    }

    #[test]
    fn unparseable_timestamps_are_none() {
        assert_eq!(parse_timestamp_str(""), None);
        assert_eq!(parse_timestamp_str("yesterday"), None);
        assert_eq!(parse_timestamp_str("2025-13-40"), None);
        assert_eq!(parse_timestamp(&json!(null)), None);
    }

    #[test]
    fn record_helpers_follow_layout() {
        let hit = json!({"_source": {"metadata": {"id": "m-9", "direction": "Outward", "time": "2025-01-01"}}});
        assert_eq!(record_id(&hit, SourceLayout::Moesif), "m-9");
        assert_eq!(record_direction(&hit, SourceLayout::Moesif), "Outward");
        assert!(record_timestamp(&hit, SourceLayout::Moesif, ActionKind::Log).is_some());
        assert!(record_timestamp(&hit, SourceLayout::Moesif, ActionKind::Message).is_none());
    }

    #[test]
    fn layout_parses() {
        assert_eq!("OpenSearch".parse::<SourceLayout>().unwrap(), SourceLayout::OpenSearch);
        assert_eq!("moesif".parse::<SourceLayout>().unwrap(), SourceLayout::Moesif);
        assert!("elastic".parse::<SourceLayout>().is_err());
    }
}
