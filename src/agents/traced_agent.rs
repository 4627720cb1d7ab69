//! Wrapper that records a processing span around another agent's handler.

use super::agent::Agent;
use crate::message::Message;
use crate::tracer::TracerSystem;
use crate::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// `event_type` of the span recorded around each delivered message.
pub const MESSAGE_RECEIVED: &str = "message_received";

/// Records a `message_received` span for every message the inner agent handles.
///
/// The span metadata carries the sender, the bus-attached `message_id` and the
/// content length, which is what joins the span to the sender's edge in the
/// interaction graph. Handler errors close the span as `error` and are then
/// returned unchanged.
pub struct TracedAgent<A: Agent> {
    inner: A,
    tracer: Arc<TracerSystem>,
}

impl<A: Agent> TracedAgent<A> {
    /// Wrap `inner`, recording its handling through `tracer`.
    pub fn new(inner: A, tracer: Arc<TracerSystem>) -> Self {
        Self { inner, tracer }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: Agent> Agent for TracedAgent<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn handle(&self, message: &Message) -> Result<()> {
        let mut metadata = Map::new();
        metadata.insert("sender".to_string(), json!(message.sender()));
        metadata.insert(
            "message_id".to_string(),
            message.message_id().map_or(Value::Null, |id| json!(id)),
        );
        metadata.insert(
            "content_length".to_string(),
            json!(message.content().chars().count()),
        );

        let trace_id = self
            .tracer
            .start_trace(self.inner.name(), MESSAGE_RECEIVED, Some(metadata));

        match self.inner.handle(message) {
            Ok(()) => {
                self.tracer
                    .end_trace(&trace_id, Some(json!({"status": "processed"})), None);
                Ok(())
            }
            Err(e) => {
                self.tracer.end_trace(&trace_id, None, Some(e.to_string()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{EchoAgent, MemoryAgent};
    use crate::message::MESSAGE_ID_KEY;
    use crate::store::EventLog;
    use crate::tracer::SpanStatus;
    use tempfile::TempDir;

    fn tracer(dir: &TempDir) -> Arc<TracerSystem> {
        let log = EventLog::new(dir.path().join("traces.jsonl")).unwrap();
        Arc::new(TracerSystem::new(Arc::new(log), true))
    }

    #[test]
    fn test_successful_handle_records_completed_span() {
        let dir = TempDir::new().unwrap();
        let tracer = tracer(&dir);
        let agent = TracedAgent::new(MemoryAgent::new("Memory"), tracer.clone());

        let message =
            Message::new("Sender", "Memory", "Test").with_metadata(MESSAGE_ID_KEY, json!("m-1"));
        agent.handle(&message).unwrap();

        let records = tracer.event_log().read_all().unwrap().records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_type, MESSAGE_RECEIVED);
        assert_eq!(records[0].agent_name.as_deref(), Some("Memory"));
        assert_eq!(records[0].metadata["sender"], "Sender");
        assert_eq!(records[0].metadata["message_id"], "m-1");
        assert_eq!(records[0].metadata["content_length"], 4);
        assert_eq!(records[1].status, Some(SpanStatus::Completed));
        assert_eq!(records[1].result, Some(json!({"status": "processed"})));
        assert_eq!(agent.inner().memory(), vec!["Test"]);
    }

    #[test]
    fn test_failed_handle_records_error_and_propagates() {
        let dir = TempDir::new().unwrap();
        let tracer = tracer(&dir);
        let agent = TracedAgent::new(EchoAgent::new("Echo"), tracer.clone());

        let result = agent.handle(&Message::new("Sender", "Echo", ""));
        assert!(result.is_err());

        let records = tracer.event_log().read_all().unwrap().records;
        assert_eq!(records[1].status, Some(SpanStatus::Error));
        assert!(records[1].error.as_deref().unwrap().contains("empty"));
        assert_eq!(tracer.open_span_count(), 0);
    }

    #[test]
    fn test_name_comes_from_inner_agent() {
        let dir = TempDir::new().unwrap();
        let agent = TracedAgent::new(EchoAgent::new("Echo"), tracer(&dir));
        assert_eq!(agent.name(), "Echo");
    }
}
