//! Tabular log row shared by the mirrored store and the query surface.

use super::record::EventRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Row id; only set for rows read back from the mirror.
    pub id: Option<i64>,
    pub timestamp: String,
    pub agent_name: String,
    pub level: String,
    pub message: String,
    pub extra_data: Value,
    pub created_at: Option<String>,
}

impl LogEntry {
    /// Project an event record into a log row.
    ///
    /// The full record travels in `extra_data` so nothing is lost by the projection.
    pub fn from_record(record: &EventRecord) -> Self {
        Self {
            id: None,
            timestamp: record.occurred_at().unwrap_or_default().to_string(),
            agent_name: record.agent().unwrap_or("Unknown").to_string(),
            level: record.level().to_string(),
            message: record.summary(),
            extra_data: serde_json::to_value(record).unwrap_or(Value::Null),
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::MESSAGE_SENT;
    use crate::tracer::SpanStatus;

    #[test]
    fn test_projects_message_record() {
        let record = EventRecord {
            event_type: MESSAGE_SENT.to_string(),
            timestamp: Some("2025-01-22T10:30:00Z".to_string()),
            sender: Some("A".to_string()),
            receiver: Some("B".to_string()),
            ..Default::default()
        };

        let entry = LogEntry::from_record(&record);
        assert_eq!(entry.agent_name, "A");
        assert_eq!(entry.level, "INFO");
        assert_eq!(entry.timestamp, "2025-01-22T10:30:00Z");
        assert_eq!(entry.extra_data["receiver"], "B");
        assert!(entry.id.is_none());
    }

    #[test]
    fn test_error_span_projects_error_level() {
        let record = EventRecord {
            trace_id: Some("t".to_string()),
            event_type: "work".to_string(),
            status: Some(SpanStatus::Error),
            ..Default::default()
        };

        let entry = LogEntry::from_record(&record);
        assert_eq!(entry.level, "ERROR");
        assert_eq!(entry.agent_name, "Unknown");
    }
}
