//! Spans: time-bounded units of work tracked by a start/end pair.

use crate::store::record::{format_timestamp, EventRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle state of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    Started,
    Completed,
    Error,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

/// An open or finalized span.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub trace_id: String,
    pub agent_name: String,
    pub event_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<f64>,
    pub status: SpanStatus,
    pub metadata: Map<String, Value>,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl Span {
    pub(crate) fn start(
        trace_id: String,
        agent_name: String,
        event_type: String,
        metadata: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            trace_id,
            agent_name,
            event_type,
            start_time: now,
            end_time: None,
            duration_ms: None,
            status: SpanStatus::Started,
            metadata,
            result: None,
            error: None,
        }
    }

    /// Finalize the span at `now`. An empty error string counts as success.
    pub(crate) fn finish(
        mut self,
        result: Option<Value>,
        error: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let error = error.filter(|e| !e.is_empty());
        self.end_time = Some(now);
        self.duration_ms = Some(elapsed_ms(self.start_time, now));
        self.status = if error.is_some() {
            SpanStatus::Error
        } else {
            SpanStatus::Completed
        };
        self.result = result;
        self.error = error;
        self
    }

    /// Milliseconds the span has been open as of `now`.
    pub fn age_ms(&self, now: DateTime<Utc>) -> f64 {
        elapsed_ms(self.start_time, now)
    }

    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            trace_id: Some(self.trace_id.clone()),
            event_type: self.event_type.clone(),
            agent_name: Some(self.agent_name.clone()),
            start_time: Some(format_timestamp(self.start_time)),
            end_time: self.end_time.map(format_timestamp),
            duration_ms: self.duration_ms,
            status: Some(self.status),
            metadata: self.metadata.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            ..Default::default()
        }
    }
}

/// Non-negative milliseconds between two instants.
///
/// A clock that stepped backwards yields 0 rather than a negative duration.
pub fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let micros = (end - start).num_microseconds().unwrap_or(0);
    (micros.max(0) as f64) / 1000.0
}

/// Milliseconds between two serialized timestamps, 0 if either fails to parse.
pub fn duration_between(start: &str, end: &str) -> f64 {
    use crate::store::record::parse_timestamp;

    match (parse_timestamp(start), parse_timestamp(end)) {
        (Some(start), Some(end)) => elapsed_ms(start, end),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn open_span(now: DateTime<Utc>) -> Span {
        Span::start(
            "t-1".to_string(),
            "Worker".to_string(),
            "message_received".to_string(),
            Map::new(),
            now,
        )
    }

    #[test]
    fn test_finish_success_sets_completed() {
        let start = Utc::now();
        let span = open_span(start).finish(
            Some(json!({"status": "processed"})),
            None,
            start + Duration::milliseconds(250),
        );

        assert_eq!(span.status, SpanStatus::Completed);
        assert_eq!(span.duration_ms, Some(250.0));
        assert_eq!(span.result, Some(json!({"status": "processed"})));
    }

    #[test]
    fn test_finish_with_error_sets_error() {
        let start = Utc::now();
        let span = open_span(start).finish(None, Some("boom".to_string()), start);

        assert_eq!(span.status, SpanStatus::Error);
        assert_eq!(span.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_empty_error_counts_as_success() {
        let start = Utc::now();
        let span = open_span(start).finish(None, Some(String::new()), start);

        assert_eq!(span.status, SpanStatus::Completed);
        assert!(span.error.is_none());
    }

    #[test]
    fn test_backwards_clock_clamps_to_zero() {
        let start = Utc::now();
        assert_eq!(elapsed_ms(start, start - Duration::seconds(5)), 0.0);
    }

    #[test]
    fn test_duration_between_unparseable_is_zero() {
        assert_eq!(duration_between("garbage", "2025-01-22T10:30:03Z"), 0.0);
        assert_eq!(
            duration_between("2025-01-22T10:30:01Z", "2025-01-22T10:30:03Z"),
            2000.0
        );
    }

    #[test]
    fn test_started_record_has_no_duration() {
        let record = open_span(Utc::now()).to_record();

        assert_eq!(record.status, Some(SpanStatus::Started));
        assert!(record.duration_ms.is_none());
        assert!(record.end_time.is_none());
        assert_eq!(record.trace_id.as_deref(), Some("t-1"));
    }
}
