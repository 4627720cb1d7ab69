//! Read-only query surface over the event log.
//!
//! [`QueryService`] is what a dashboard or other presentation layer talks to.
//! Every view is recomputed from storage on each call, and storage failures
//! degrade to empty results with a warning instead of an error.

use crate::graph::{GraphBuilder, GraphData};
use crate::metrics::{Metrics, MetricsAggregator};
use crate::store::record::format_timestamp;
use crate::store::{EventLog, EventRecord, LogEntry, LogSnapshot, LogStats, SqliteMirror};
use crate::tracer::SpanStatus;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// One chronological entry of the interaction timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimelineEntry {
    Message {
        timestamp: Option<String>,
        sender: Option<String>,
        receiver: Option<String>,
        content_preview: Option<String>,
        message_id: Option<String>,
    },
    Processing {
        timestamp: Option<String>,
        agent: Option<String>,
        event_type: String,
        duration_ms: Option<f64>,
        status: Option<SpanStatus>,
        trace_id: Option<String>,
    },
    Error {
        timestamp: Option<String>,
        agent: Option<String>,
        event_type: String,
        duration_ms: Option<f64>,
        error: Option<String>,
        trace_id: Option<String>,
    },
}

impl TimelineEntry {
    /// Project a record, `None` for records that are neither messages nor spans.
    pub fn from_record(record: &EventRecord) -> Option<Self> {
        if record.is_message() {
            return Some(Self::Message {
                timestamp: record.timestamp.clone(),
                sender: record.sender.clone(),
                receiver: record.receiver.clone(),
                content_preview: record.content_preview.clone(),
                message_id: record.message_id.clone(),
            });
        }
        if !record.is_span() {
            return None;
        }

        if record.is_error() {
            Some(Self::Error {
                timestamp: record.start_time.clone(),
                agent: record.agent_name.clone(),
                event_type: record.event_type.clone(),
                duration_ms: record.duration_ms,
                error: record.error.clone(),
                trace_id: record.trace_id.clone(),
            })
        } else {
            Some(Self::Processing {
                timestamp: record.start_time.clone(),
                agent: record.agent_name.clone(),
                event_type: record.event_type.clone(),
                duration_ms: record.duration_ms,
                status: record.status,
                trace_id: record.trace_id.clone(),
            })
        }
    }
}

/// Read API exposed to collaborators.
#[derive(Clone)]
pub struct QueryService {
    event_log: Arc<EventLog>,
    mirror: Option<Arc<SqliteMirror>>,
}

impl QueryService {
    /// A service reading `event_log` only.
    pub fn new(event_log: Arc<EventLog>) -> Self {
        Self {
            event_log,
            mirror: None,
        }
    }

    /// Serve `get_logs` from an indexed mirror instead of scanning the log.
    pub fn with_mirror(mut self, mirror: Arc<SqliteMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Log rows most-recent-first.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum rows returned
    /// * `agent_filter` - Keep rows attributed to this agent
    /// * `level_filter` - Keep rows at this level (`INFO` or `ERROR`)
    pub fn get_logs(
        &self,
        limit: usize,
        agent_filter: Option<&str>,
        level_filter: Option<&str>,
    ) -> Vec<LogEntry> {
        if let Some(mirror) = &self.mirror {
            match mirror.get_logs(limit, agent_filter, level_filter) {
                Ok(rows) => return rows,
                Err(e) => warn!(error = %e, "Mirror query failed, falling back to event log"),
            }
        }

        match self.event_log.read(agent_filter, level_filter, limit) {
            Ok(records) => records.iter().map(LogEntry::from_record).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to read event log");
                Vec::new()
            }
        }
    }

    /// Row counts from the mirror. All zero without a mirror or when it fails.
    pub fn get_log_stats(&self) -> LogStats {
        let Some(mirror) = &self.mirror else {
            debug!("No log mirror configured, log stats are empty");
            return LogStats::default();
        };

        match mirror.stats() {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Mirror stats query failed");
                LogStats::default()
            }
        }
    }

    /// Metrics over the whole log.
    pub fn get_metrics(&self) -> Metrics {
        MetricsAggregator::compute(&self.snapshot().records)
    }

    /// Metrics over the records from the last `window`.
    pub fn get_recent_metrics(&self, window: Duration) -> Metrics {
        MetricsAggregator::compute_recent(&self.snapshot().records, window, Utc::now())
    }

    /// Messages and spans in chronological order.
    pub fn get_timeline(&self) -> Vec<TimelineEntry> {
        self.get_traces()
            .iter()
            .filter_map(TimelineEntry::from_record)
            .collect()
    }

    /// Interaction graph, optionally bounded to the last `window`.
    pub fn get_graph(&self, window: Option<Duration>) -> GraphData {
        let builder = match window {
            Some(window) => GraphBuilder::new().with_window(window),
            None => GraphBuilder::new(),
        };

        match self.event_log.read_all() {
            Ok(snapshot) => builder.build_graph_data(&snapshot),
            Err(e) => {
                warn!(error = %e, "Failed to read event log for graph");
                GraphData::empty(
                    window.map(|w| w.num_minutes()),
                    format_timestamp(Utc::now()),
                )
            }
        }
    }

    /// Every record, ordered by message time or span start.
    pub fn get_traces(&self) -> Vec<EventRecord> {
        let mut records = self.snapshot().records;
        records.sort_by_cached_key(EventRecord::chronological_key);
        records
    }

    /// Every event of one span, in order.
    pub fn get_trace(&self, trace_id: &str) -> Vec<EventRecord> {
        self.get_traces()
            .into_iter()
            .filter(|record| record.trace_id.as_deref() == Some(trace_id))
            .collect()
    }

    /// Distinct agent names that appear anywhere in the log, sorted.
    pub fn agents(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for record in self.snapshot().records {
            let is_message = record.is_message();
            names.extend(record.agent_name);
            names.extend(record.sender);
            if is_message {
                names.extend(record.receiver);
            }
        }
        names.into_iter().collect()
    }

    /// Distinct log levels present, sorted.
    pub fn log_levels(&self) -> Vec<String> {
        if let Some(mirror) = &self.mirror {
            match mirror.levels() {
                Ok(levels) => return levels,
                Err(e) => warn!(error = %e, "Mirror level query failed, falling back to event log"),
            }
        }

        let levels: BTreeSet<String> = self
            .snapshot()
            .records
            .iter()
            .map(|record| record.level().to_string())
            .collect();
        levels.into_iter().collect()
    }

    fn snapshot(&self) -> LogSnapshot {
        match self.event_log.read_all() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, path = %self.event_log.path().display(), "Failed to read event log");
                LogSnapshot::default()
            }
        }
    }
}
