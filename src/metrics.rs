//! Aggregate performance metrics folded from the event log.

use crate::store::EventRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Summary counters over a set of event records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Number of `message_sent` events.
    pub total_messages: usize,
    /// Number of events carrying a `duration_ms`.
    pub total_processing_events: usize,
    /// Mean of the positive durations, rounded to 2 decimals.
    pub average_duration_ms: f64,
    pub error_count: usize,
    /// `error_count / max(total_processing_events, 1) * 100`, rounded to 2 decimals.
    pub error_rate: f64,
}

/// Folds event records into [`Metrics`].
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Compute metrics over every record given.
    ///
    /// An empty slice yields all zeros.
    pub fn compute(records: &[EventRecord]) -> Metrics {
        let mut total_messages = 0;
        let mut total_processing_events = 0;
        let mut error_count = 0;
        let mut duration_sum = 0.0;
        let mut duration_count = 0usize;

        for record in records {
            if record.is_message() {
                total_messages += 1;
            }
            if let Some(duration) = record.duration_ms {
                total_processing_events += 1;
                if duration > 0.0 {
                    duration_sum += duration;
                    duration_count += 1;
                }
            }
            if record.is_error() {
                error_count += 1;
            }
        }

        let average_duration_ms = if duration_count == 0 {
            0.0
        } else {
            round2(duration_sum / duration_count as f64)
        };
        let error_rate =
            round2(error_count as f64 / total_processing_events.max(1) as f64 * 100.0);

        Metrics {
            total_messages,
            total_processing_events,
            average_duration_ms,
            error_count,
            error_rate,
        }
    }

    /// Compute metrics over the records that occurred within `window` of `now`.
    ///
    /// Records without a parseable timestamp are left out.
    pub fn compute_recent(records: &[EventRecord], window: Duration, now: DateTime<Utc>) -> Metrics {
        let cutoff = now - window;
        let recent: Vec<EventRecord> = records
            .iter()
            .filter(|record| record.occurred_at_utc().is_some_and(|at| at >= cutoff))
            .cloned()
            .collect();
        Self::compute(&recent)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MESSAGE_SENT;
    use crate::tracer::SpanStatus;

    fn message(at: &str) -> EventRecord {
        EventRecord {
            event_type: MESSAGE_SENT.to_string(),
            timestamp: Some(at.to_string()),
            sender: Some("A".to_string()),
            receiver: Some("B".to_string()),
            ..Default::default()
        }
    }

    fn finished(duration_ms: f64, status: SpanStatus, end: &str) -> EventRecord {
        EventRecord {
            trace_id: Some("t".to_string()),
            event_type: "message_received".to_string(),
            agent_name: Some("B".to_string()),
            start_time: Some(end.to_string()),
            end_time: Some(end.to_string()),
            duration_ms: Some(duration_ms),
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_log_is_all_zero() {
        let metrics = MetricsAggregator::compute(&[]);

        assert_eq!(metrics, Metrics::default());
        assert_eq!(metrics.average_duration_ms, 0.0);
        assert_eq!(metrics.error_rate, 0.0);
    }

    #[test]
    fn test_counts_and_averages() {
        let at = "2025-01-22T10:30:00Z";
        let records = vec![
            message(at),
            message(at),
            finished(100.0, SpanStatus::Completed, at),
            finished(200.0, SpanStatus::Completed, at),
            finished(50.5, SpanStatus::Error, at),
        ];

        let metrics = MetricsAggregator::compute(&records);

        assert_eq!(metrics.total_messages, 2);
        assert_eq!(metrics.total_processing_events, 3);
        assert_eq!(metrics.average_duration_ms, 116.83);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.error_rate, 33.33);
    }

    #[test]
    fn test_zero_durations_excluded_from_average() {
        let at = "2025-01-22T10:30:00Z";
        let records = vec![
            finished(0.0, SpanStatus::Completed, at),
            finished(10.0, SpanStatus::Completed, at),
        ];

        let metrics = MetricsAggregator::compute(&records);

        assert_eq!(metrics.total_processing_events, 2);
        assert_eq!(metrics.average_duration_ms, 10.0);
    }

    #[test]
    fn test_errors_without_processing_do_not_divide_by_zero() {
        let mut started_error = finished(0.0, SpanStatus::Error, "2025-01-22T10:30:00Z");
        started_error.duration_ms = None;

        let metrics = MetricsAggregator::compute(&[started_error]);

        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.error_rate, 100.0);
    }

    #[test]
    fn test_recent_window_excludes_old_and_undated() {
        let now = DateTime::parse_from_rfc3339("2025-01-22T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut undated = message("");
        undated.timestamp = None;
        let records = vec![
            message("2025-01-22T11:55:00Z"),
            message("2025-01-22T09:00:00Z"),
            undated,
        ];

        let metrics = MetricsAggregator::compute_recent(&records, Duration::minutes(10), now);

        assert_eq!(metrics.total_messages, 1);
    }
}
