//! The flattened event record written one-per-line to the event log.
//!
//! A single record shape covers both span transitions and `message_sent` point
//! events. Fields that do not apply to a given kind are omitted on write and
//! default to `None` on read, so older or partially written records still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tracer::{SpanStatus, SYSTEM_METRICS};

/// `event_type` of the point event recorded for every bus publish.
pub const MESSAGE_SENT: &str = "message_sent";

/// Log level assigned to records with an error status.
pub const LEVEL_ERROR: &str = "ERROR";

/// Log level assigned to every other record.
pub const LEVEL_INFO: &str = "INFO";

/// Immutable projection of a span transition or a message-sent notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Point-in-time stamp for `message_sent` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Present only on finalized spans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpanStatus>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    /// Host resource fields, present only on `system_metrics` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_memory_mb: Option<f64>,
}

impl EventRecord {
    pub fn is_message(&self) -> bool {
        self.event_type == MESSAGE_SENT
    }

    pub fn is_system_metrics(&self) -> bool {
        self.event_type == SYSTEM_METRICS
    }

    /// A span transition: anything carrying a trace id that is not a message event.
    pub fn is_span(&self) -> bool {
        !self.is_message() && !self.is_system_metrics() && self.trace_id.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.status == Some(SpanStatus::Error)
    }

    /// The agent this record is attributed to (the sender for message events).
    pub fn agent(&self) -> Option<&str> {
        if self.is_message() {
            self.sender.as_deref()
        } else {
            self.agent_name.as_deref()
        }
    }

    pub fn level(&self) -> &'static str {
        if self.is_error() {
            LEVEL_ERROR
        } else {
            LEVEL_INFO
        }
    }

    /// The most specific timestamp string the record carries.
    ///
    /// Finalized spans are dated by their end, started spans by their start.
    pub fn occurred_at(&self) -> Option<&str> {
        self.timestamp
            .as_deref()
            .or(self.end_time.as_deref())
            .or(self.start_time.as_deref())
    }

    /// Chronological sort key: message time or span start.
    pub fn sort_key(&self) -> &str {
        self.timestamp
            .as_deref()
            .or(self.start_time.as_deref())
            .unwrap_or("")
    }

    /// Ordering key for chronological sorts.
    ///
    /// Parsed instants compare as time, so timestamps written with different
    /// precision or offsets still order correctly. Unparseable keys sort first,
    /// by their raw text.
    pub fn chronological_key(&self) -> (Option<DateTime<Utc>>, String) {
        let key = self.sort_key();
        (parse_timestamp(key), key.to_string())
    }

    /// Parsed [`occurred_at`](Self::occurred_at), `None` when absent or unparseable.
    pub fn occurred_at_utc(&self) -> Option<DateTime<Utc>> {
        self.occurred_at().and_then(parse_timestamp)
    }

    /// One-line human readable description of the record.
    pub fn summary(&self) -> String {
        if self.is_message() {
            let mut summary = format!(
                "message_sent {} -> {}",
                self.sender.as_deref().unwrap_or("?"),
                self.receiver.as_deref().unwrap_or("?")
            );
            if let Some(preview) = &self.content_preview {
                summary.push_str(&format!(": {}", preview));
            }
            return summary;
        }
        if self.is_system_metrics() {
            return format!(
                "system_metrics cpu {:.2}% memory {:.2}% ({:.2} MB available)",
                self.cpu_percent.unwrap_or_default(),
                self.memory_percent.unwrap_or_default(),
                self.available_memory_mb.unwrap_or_default()
            );
        }

        let mut summary = format!(
            "{} {}",
            self.event_type,
            self.status.map(|s| s.as_str()).unwrap_or("unknown")
        );
        if let Some(duration) = self.duration_ms {
            summary.push_str(&format!(" in {:.2}ms", duration));
        }
        if let Some(error) = &self.error {
            summary.push_str(&format!(" ({})", error));
        }
        summary
    }
}

/// Parse an ISO-8601 timestamp as written by the tracer.
///
/// Accepts RFC 3339 with an offset, and naive timestamps (assumed UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way every record field is written.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_record() -> EventRecord {
        EventRecord {
            event_type: MESSAGE_SENT.to_string(),
            timestamp: Some("2025-01-22T10:30:00Z".to_string()),
            sender: Some("UserAgent".to_string()),
            receiver: Some("TaskManager".to_string()),
            message_id: Some("msg_1".to_string()),
            content_length: Some(17),
            content_preview: Some("Process this task".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_message_record_serializes_only_message_fields() {
        let value = serde_json::to_value(message_record()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();

        assert!(keys.iter().all(|k| ![
            "trace_id",
            "duration_ms",
            "status",
            "metadata",
            "start_time"
        ]
        .contains(&k.as_str())));
        assert_eq!(value["sender"], "UserAgent");
    }

    #[test]
    fn test_reads_span_record_with_missing_fields() {
        let line = r#"{"trace_id":"t1","agent_name":"A","event_type":"work","status":"completed","duration_ms":2000}"#;
        let record: EventRecord = serde_json::from_str(line).unwrap();

        assert!(record.is_span());
        assert_eq!(record.status, Some(SpanStatus::Completed));
        assert_eq!(record.duration_ms, Some(2000.0));
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn test_wrongly_typed_field_is_rejected() {
        let line = r#"{"event_type":"work","duration_ms":"slow"}"#;
        assert!(serde_json::from_str::<EventRecord>(line).is_err());
    }

    #[test]
    fn test_agent_attribution() {
        assert_eq!(message_record().agent(), Some("UserAgent"));

        let span = EventRecord {
            trace_id: Some("t".to_string()),
            agent_name: Some("Worker".to_string()),
            event_type: "work".to_string(),
            ..Default::default()
        };
        assert_eq!(span.agent(), Some("Worker"));
    }

    #[test]
    fn test_level_from_status() {
        let mut record = EventRecord {
            status: Some(SpanStatus::Error),
            ..Default::default()
        };
        assert_eq!(record.level(), LEVEL_ERROR);

        record.status = Some(SpanStatus::Completed);
        assert_eq!(record.level(), LEVEL_INFO);
    }

    #[test]
    fn test_summary_mentions_participants_and_duration() {
        assert_eq!(
            message_record().summary(),
            "message_sent UserAgent -> TaskManager: Process this task"
        );

        let span = EventRecord {
            trace_id: Some("t".to_string()),
            event_type: "message_received".to_string(),
            status: Some(SpanStatus::Error),
            duration_ms: Some(12.5),
            error: Some("boom".to_string()),
            metadata: json!({"k": 1}).as_object().cloned().unwrap(),
            ..Default::default()
        };
        assert_eq!(span.summary(), "message_received error in 12.50ms (boom)");
    }

    #[test]
    fn test_system_metrics_summary() {
        let record = EventRecord {
            event_type: SYSTEM_METRICS.to_string(),
            cpu_percent: Some(12.5),
            memory_percent: Some(40.0),
            available_memory_mb: Some(2048.0),
            ..Default::default()
        };

        assert!(record.is_system_metrics());
        assert!(!record.is_span());
        assert_eq!(
            record.summary(),
            "system_metrics cpu 12.50% memory 40.00% (2048.00 MB available)"
        );
    }

    #[test]
    fn test_chronological_key_compares_time_not_text() {
        let whole = EventRecord {
            timestamp: Some("2025-01-22T10:30:00Z".to_string()),
            ..Default::default()
        };
        let fractional = EventRecord {
            start_time: Some("2025-01-22T10:30:00.500000Z".to_string()),
            ..Default::default()
        };

        assert!(whole.sort_key() > fractional.sort_key());
        assert!(whole.chronological_key() < fractional.chronological_key());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2025-01-22T10:30:00Z").is_some());
        assert!(parse_timestamp("2025-01-22T10:30:00.123456+00:00").is_some());
        assert!(parse_timestamp("2025-01-22T10:30:00.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_occurred_at_prefers_end_time_for_spans() {
        let span = EventRecord {
            start_time: Some("2025-01-22T10:30:01Z".to_string()),
            end_time: Some("2025-01-22T10:30:03Z".to_string()),
            ..Default::default()
        };
        assert_eq!(span.occurred_at(), Some("2025-01-22T10:30:03Z"));
        assert_eq!(span.sort_key(), "2025-01-22T10:30:01Z");
    }
}
