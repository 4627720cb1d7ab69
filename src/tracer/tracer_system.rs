//! Span tracer for agent processing and message events
//!
//! This module provides the central system for opening and closing spans and
//! recording message sends. Every transition is appended to the event log (and
//! mirrored when a mirror is configured); storage failures are logged and never
//! reach the calling agent.

use super::span::Span;
use super::system_metrics::{SystemSnapshot, SYSTEM_METRICS};
use crate::store::log_entry::LogEntry;
use crate::store::record::{format_timestamp, EventRecord, MESSAGE_SENT};
use crate::store::{EventLog, SqliteMirror};
use crate::text::{truncate, PREVIEW_CHARS};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Error text recorded on spans force-closed by [`TracerSystem::reap_stale`].
pub const ABANDONED_SPAN_ERROR: &str = "span abandoned";

/// Central system for recording spans and message events
///
/// The open-span table is owned here and guarded by its own lock; nothing
/// outside the tracer mutates a span.
pub struct TracerSystem {
    event_log: Arc<EventLog>,
    mirror: Option<Arc<SqliteMirror>>,
    open_spans: Mutex<HashMap<String, Span>>,
    enabled: AtomicBool,
}

impl TracerSystem {
    /// Create a new tracer system
    ///
    /// # Arguments
    ///
    /// * `event_log` - The authoritative log every event is appended to
    /// * `enabled` - Whether events are recorded
    pub fn new(event_log: Arc<EventLog>, enabled: bool) -> Self {
        Self {
            event_log,
            mirror: None,
            open_spans: Mutex::new(HashMap::new()),
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Mirror every appended event into a structured store.
    pub fn with_mirror(mut self, mirror: Arc<SqliteMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// The authoritative log events are appended to.
    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.event_log
    }

    /// The structured mirror, when one is configured.
    pub fn mirror(&self) -> Option<&Arc<SqliteMirror>> {
        self.mirror.as_ref()
    }

    /// Check if the tracer is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Enable the tracer system
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Disable the tracer system
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// Open a span and record its `started` event.
    ///
    /// # Arguments
    ///
    /// * `agent_name` - The agent doing the work
    /// * `event_type` - What kind of work the span covers
    /// * `metadata` - Free-form context stored with every event of the span
    ///
    /// # Returns
    ///
    /// A trace id unique for the process lifetime. A disabled tracer still
    /// returns a fresh id but keeps no span for it.
    pub fn start_trace(
        &self,
        agent_name: impl Into<String>,
        event_type: impl Into<String>,
        metadata: Option<Map<String, Value>>,
    ) -> String {
        let trace_id = Uuid::new_v4().to_string();
        if !self.is_enabled() {
            return trace_id;
        }

        let span = Span::start(
            trace_id.clone(),
            agent_name.into(),
            event_type.into(),
            metadata.unwrap_or_default(),
            Utc::now(),
        );
        let record = span.to_record();
        self.open_spans.lock().insert(trace_id.clone(), span);

        debug!(trace_id = %trace_id, agent = ?record.agent_name, "Span started");
        self.record(&record);
        trace_id
    }

    /// Close a span and record its finalized event.
    ///
    /// Unknown or already closed ids are ignored and nothing is written.
    ///
    /// # Returns
    ///
    /// The finalized span, or `None` when the call was a no-op.
    pub fn end_trace(
        &self,
        trace_id: &str,
        result: Option<Value>,
        error: Option<String>,
    ) -> Option<Span> {
        let span = self.open_spans.lock().remove(trace_id)?;
        let span = span.finish(result, error, Utc::now());

        debug!(
            trace_id = %trace_id,
            status = span.status.as_str(),
            duration_ms = span.duration_ms.unwrap_or_default(),
            "Span finished"
        );
        self.record(&span.to_record());
        Some(span)
    }

    /// Record a `message_sent` point event.
    ///
    /// # Arguments
    ///
    /// * `sender` - The sending agent
    /// * `receiver` - The receiving agent or topic
    /// * `content` - The message content; only a bounded preview is stored
    /// * `message_id` - Correlation id to record; generated when `None`
    ///
    /// # Returns
    ///
    /// The message id written to the event.
    pub fn log_message_event(
        &self,
        sender: &str,
        receiver: &str,
        content: &str,
        message_id: Option<String>,
    ) -> String {
        let message_id = message_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        if !self.is_enabled() {
            return message_id;
        }

        let (preview, _) = truncate(content, PREVIEW_CHARS);
        let record = EventRecord {
            event_type: MESSAGE_SENT.to_string(),
            timestamp: Some(format_timestamp(Utc::now())),
            sender: Some(sender.to_string()),
            receiver: Some(receiver.to_string()),
            message_id: Some(message_id.clone()),
            content_length: Some(content.chars().count()),
            content_preview: Some(preview),
            ..Default::default()
        };

        self.record(&record);
        message_id
    }

    /// Sample host CPU and memory and record a `system_metrics` point event.
    ///
    /// Blocks briefly while CPU usage is measured.
    ///
    /// # Returns
    ///
    /// The sample, or `None` when the tracer is disabled and nothing was sampled.
    pub fn log_system_metrics(&self) -> Option<SystemSnapshot> {
        if !self.is_enabled() {
            return None;
        }
        let snapshot = SystemSnapshot::sample();
        self.record_system_snapshot(&snapshot);
        Some(snapshot)
    }

    /// Record an already taken host sample as a `system_metrics` event.
    ///
    /// # Returns
    ///
    /// Whether the event was appended to the log. A disabled tracer records
    /// nothing and returns `false`.
    pub fn record_system_snapshot(&self, snapshot: &SystemSnapshot) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let record = EventRecord {
            event_type: SYSTEM_METRICS.to_string(),
            timestamp: Some(format_timestamp(Utc::now())),
            cpu_percent: Some(snapshot.cpu_percent),
            memory_percent: Some(snapshot.memory_percent),
            available_memory_mb: Some(snapshot.available_memory_mb),
            ..Default::default()
        };
        debug!(
            cpu_percent = snapshot.cpu_percent,
            memory_percent = snapshot.memory_percent,
            "System metrics sampled"
        );
        self.record(&record)
    }

    /// Number of spans started but not yet finalized.
    pub fn open_span_count(&self) -> usize {
        self.open_spans.lock().len()
    }

    /// Snapshot of an open span.
    pub fn open_span(&self, trace_id: &str) -> Option<Span> {
        self.open_spans.lock().get(trace_id).cloned()
    }

    /// Force-close spans that have been open longer than `max_age`.
    ///
    /// Reaped spans finish with status `error`, the [`ABANDONED_SPAN_ERROR`] text
    /// and `metadata.reaped = true`.
    ///
    /// # Returns
    ///
    /// The ids of the spans that were closed.
    pub fn reap_stale(&self, max_age: Duration) -> Vec<String> {
        let now = Utc::now();
        let max_age_ms = max_age.as_secs_f64() * 1000.0;

        let stale: Vec<Span> = {
            let mut spans = self.open_spans.lock();
            let ids: Vec<String> = spans
                .values()
                .filter(|span| span.age_ms(now) > max_age_ms)
                .map(|span| span.trace_id.clone())
                .collect();
            ids.iter().filter_map(|id| spans.remove(id)).collect()
        };

        let mut reaped = Vec::with_capacity(stale.len());
        for mut span in stale {
            span.metadata.insert("reaped".to_string(), json!(true));
            let span = span.finish(None, Some(ABANDONED_SPAN_ERROR.to_string()), now);
            warn!(
                trace_id = %span.trace_id,
                agent = %span.agent_name,
                age_ms = span.duration_ms.unwrap_or_default(),
                "Reaped abandoned span"
            );
            self.record(&span.to_record());
            reaped.push(span.trace_id);
        }
        reaped
    }

    /// Append to the log, then the mirror. Failures are logged, never propagated.
    ///
    /// # Returns
    ///
    /// The append status of the authoritative log: `false` when the record was
    /// not written. Mirror failures do not affect it.
    fn record(&self, record: &EventRecord) -> bool {
        let appended = match self.event_log.append(record) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    error = %e,
                    event_type = %record.event_type,
                    path = %self.event_log.path().display(),
                    "Failed to append trace event"
                );
                false
            }
        };

        if let Some(mirror) = &self.mirror {
            if let Err(e) = mirror.insert(&LogEntry::from_record(record)) {
                warn!(error = %e, event_type = %record.event_type, "Failed to mirror trace event");
            }
        }
        appended
    }
}
