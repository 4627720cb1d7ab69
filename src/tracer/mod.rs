//! Span tracer for agent observability
//!
//! The tracer records what agents do as spans and point events, appending each
//! transition to the event log. Everything the metrics aggregator and graph
//! builder know is reconstructed from that log.
//!
//! # Architecture
//!
//! - **Span**: a start/end pair with computed duration and terminal status
//! - **TracerSystem**: owns the open-span table and writes events to the log
//! - **SpanReaper**: optional background sweep closing abandoned spans
//! - **SystemSnapshot**: host CPU and memory sample for `system_metrics` events
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use agent_observatory::store::EventLog;
//! use agent_observatory::tracer::TracerSystem;
//! use std::sync::Arc;
//!
//! let log = Arc::new(EventLog::new("agent_traces.jsonl")?);
//! let tracer = TracerSystem::new(log, true);
//!
//! let trace_id = tracer.start_trace("Summarizer", "message_received", None);
//! // ... do the work ...
//! tracer.end_trace(&trace_id, None, None);
//! ```
//!
//! # Correlation
//!
//! `log_message_event` returns the message id it recorded. The bus attaches that
//! same id to the delivered message's metadata, so the receiver's processing
//! span can be joined back to the edge that caused it.

pub mod reaper;
pub mod span;
pub mod system_metrics;
pub mod tracer_system;

pub use reaper::SpanReaper;
pub use span::{Span, SpanStatus};
pub use system_metrics::{SystemSnapshot, SYSTEM_METRICS};
pub use tracer_system::{TracerSystem, ABANDONED_SPAN_ERROR};
