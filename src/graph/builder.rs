//! Folds event records into an agent interaction graph.

use super::model::{node_size, AgentNode, GraphData, GraphEdge, GraphMetadata, NodeStatus};
use crate::store::record::format_timestamp;
use crate::store::{EventRecord, LogSnapshot};
use crate::tracer::span::duration_between;
use crate::tracer::SpanStatus;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Builds [`GraphData`] from a log snapshot.
///
/// Nodes appear in the order their agent is first seen; edges follow record
/// order. Records missing the fields they need (a message without sender or
/// receiver, a span without an agent) are skipped.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    window: Option<Duration>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only fold records that occurred within `window` of build time.
    ///
    /// Filtering is best-effort: records whose timestamps cannot be parsed are
    /// kept rather than dropped.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = Some(window);
        self
    }

    /// Build the graph as of now.
    pub fn build_graph_data(&self, snapshot: &LogSnapshot) -> GraphData {
        self.build_graph_data_at(snapshot, Utc::now())
    }

    /// Build the graph as of `now`.
    pub fn build_graph_data_at(&self, snapshot: &LogSnapshot, now: DateTime<Utc>) -> GraphData {
        let cutoff = self.window.map(|window| now - window);
        let mut fold = GraphFold::default();
        let mut scanned = 0;

        for record in &snapshot.records {
            if let Some(cutoff) = cutoff {
                if record.occurred_at_utc().is_some_and(|at| at < cutoff) {
                    continue;
                }
            }
            scanned += 1;

            if record.is_message() {
                fold.message(record);
            } else if record.is_span() {
                fold.span(record);
            }
        }

        if fold.skipped > 0 {
            debug!(skipped = fold.skipped, "Graph build skipped incomplete records");
        }

        let mut nodes = fold.nodes;
        for node in &mut nodes {
            node.size = node_size(node.message_count);
        }

        GraphData {
            metadata: GraphMetadata {
                total_agents: nodes.len(),
                total_edges: fold.edges.len(),
                events_scanned: scanned,
                malformed_records: snapshot.malformed,
                window_minutes: self.window.map(|window| window.num_minutes()),
                generated_at: format_timestamp(now),
            },
            nodes,
            edges: fold.edges,
        }
    }
}

#[derive(Default)]
struct GraphFold {
    nodes: Vec<AgentNode>,
    index: HashMap<String, usize>,
    edges: Vec<GraphEdge>,
    skipped: usize,
}

impl GraphFold {
    fn node_mut(&mut self, id: &str) -> &mut AgentNode {
        let idx = match self.index.get(id) {
            Some(&idx) => idx,
            None => {
                self.nodes.push(AgentNode::new(id));
                self.index.insert(id.to_string(), self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[idx]
    }

    fn message(&mut self, record: &EventRecord) {
        let (Some(sender), Some(receiver)) = (record.sender.as_deref(), record.receiver.as_deref())
        else {
            self.skipped += 1;
            return;
        };

        for id in [sender, receiver] {
            let node = self.node_mut(id);
            node.message_count += 1;
            touch(node, record.timestamp.as_deref());
        }

        self.edges.push(GraphEdge {
            source: sender.to_string(),
            target: receiver.to_string(),
            timestamp: record.timestamp.clone(),
            content_preview: record.content_preview.clone(),
            content_length: record.content_length,
            message_id: record.message_id.clone(),
        });
    }

    fn span(&mut self, record: &EventRecord) {
        let Some(agent) = record.agent_name.as_deref() else {
            self.skipped += 1;
            return;
        };

        let node = self.node_mut(agent);
        touch(node, record.occurred_at());

        match record.status {
            Some(SpanStatus::Started) => {
                if node.status != NodeStatus::Error {
                    node.status = NodeStatus::Processing;
                }
            }
            Some(SpanStatus::Completed) => {
                if node.status != NodeStatus::Error {
                    node.status = NodeStatus::Active;
                }
            }
            Some(SpanStatus::Error) => {
                node.status = NodeStatus::Error;
                node.error_count += 1;
            }
            None => {}
        }

        if let Some(duration) = finished_duration(record) {
            node.avg_duration_ms = (node.avg_duration_ms + duration) / 2.0;
        }
    }
}

/// Duration of a finished span, recomputed from its bounds when not recorded.
fn finished_duration(record: &EventRecord) -> Option<f64> {
    if let Some(duration) = record.duration_ms {
        return Some(duration.max(0.0));
    }
    match (record.start_time.as_deref(), record.end_time.as_deref()) {
        (Some(start), Some(end)) => Some(duration_between(start, end)),
        _ => None,
    }
}

/// Advance `last_seen` to `at` when it is later than the current value.
fn touch(node: &mut AgentNode, at: Option<&str>) {
    let Some(at) = at else {
        return;
    };
    let later = match node.last_seen.as_deref() {
        None => true,
        Some(current) => later_than(at, current),
    };
    if later {
        node.last_seen = Some(at.to_string());
    }
}

fn later_than(candidate: &str, current: &str) -> bool {
    use crate::store::record::parse_timestamp;

    match (parse_timestamp(candidate), parse_timestamp(current)) {
        (Some(candidate), Some(current)) => candidate > current,
        _ => candidate > current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MESSAGE_SENT;

    fn message(sender: &str, receiver: &str, at: &str, preview: &str) -> EventRecord {
        EventRecord {
            event_type: MESSAGE_SENT.to_string(),
            timestamp: Some(at.to_string()),
            sender: Some(sender.to_string()),
            receiver: Some(receiver.to_string()),
            message_id: Some(format!("msg-{}", at)),
            content_preview: Some(preview.to_string()),
            content_length: Some(preview.chars().count()),
            ..Default::default()
        }
    }

    fn span(agent: &str, status: SpanStatus, duration_ms: Option<f64>) -> EventRecord {
        EventRecord {
            trace_id: Some(format!("trace-{}", agent)),
            event_type: "message_received".to_string(),
            agent_name: Some(agent.to_string()),
            start_time: Some("2025-01-22T10:30:01Z".to_string()),
            end_time: duration_ms.map(|_| "2025-01-22T10:30:03Z".to_string()),
            duration_ms,
            status: Some(status),
            ..Default::default()
        }
    }

    fn snapshot(records: Vec<EventRecord>) -> LogSnapshot {
        LogSnapshot {
            records,
            malformed: 0,
        }
    }

    #[test]
    fn test_message_and_completed_span() {
        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![
            message("UserAgent", "TaskManager", "2025-01-22T10:30:00Z", "Process this task"),
            span("TaskManager", SpanStatus::Completed, Some(2000.0)),
        ]));

        let task_manager = graph.node("TaskManager").unwrap();
        assert_eq!(task_manager.status, NodeStatus::Active);
        assert_eq!(task_manager.message_count, 1);
        assert_eq!(task_manager.avg_duration_ms, 1000.0);
        assert!(graph.node("UserAgent").is_some());

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "UserAgent");
        assert_eq!(graph.edges[0].target, "TaskManager");
        assert_eq!(graph.edges[0].content_preview.as_deref(), Some("Process this task"));
    }

    #[test]
    fn test_edges_are_not_merged() {
        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![
            message("A", "B", "2025-01-22T10:30:00Z", "one"),
            message("A", "B", "2025-01-22T10:30:01Z", "two"),
        ]));

        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.node("A").unwrap().message_count, 2);
        assert_eq!(graph.node("B").unwrap().size, 26);
        assert_eq!(graph.metadata.total_edges, 2);
        assert_eq!(graph.metadata.total_agents, 2);
    }

    #[test]
    fn test_duration_fold_is_pairwise_average() {
        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![
            span("W", SpanStatus::Completed, Some(100.0)),
            span("W", SpanStatus::Completed, Some(300.0)),
        ]));

        // (0 + 100) / 2 = 50, then (50 + 300) / 2
        assert_eq!(graph.node("W").unwrap().avg_duration_ms, 175.0);
    }

    #[test]
    fn test_missing_duration_uses_span_bounds() {
        let mut record = span("W", SpanStatus::Completed, Some(0.0));
        record.duration_ms = None;

        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![record]));

        assert_eq!(graph.node("W").unwrap().avg_duration_ms, 1000.0);
    }

    #[test]
    fn test_status_transitions() {
        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![
            span("W", SpanStatus::Started, None),
        ]));
        assert_eq!(graph.node("W").unwrap().status, NodeStatus::Processing);

        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![
            span("W", SpanStatus::Started, None),
            span("W", SpanStatus::Completed, Some(10.0)),
        ]));
        assert_eq!(graph.node("W").unwrap().status, NodeStatus::Active);
    }

    #[test]
    fn test_error_status_is_sticky() {
        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![
            span("W", SpanStatus::Error, Some(5.0)),
            span("W", SpanStatus::Started, None),
            span("W", SpanStatus::Completed, Some(10.0)),
        ]));

        let node = graph.node("W").unwrap();
        assert_eq!(node.status, NodeStatus::Error);
        assert_eq!(node.error_count, 1);
    }

    #[test]
    fn test_message_only_agent_is_idle() {
        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![message(
            "A",
            "B",
            "2025-01-22T10:30:00Z",
            "hi",
        )]));

        assert_eq!(graph.node("B").unwrap().status, NodeStatus::Idle);
        assert_eq!(
            graph.node("B").unwrap().last_seen.as_deref(),
            Some("2025-01-22T10:30:00Z")
        );
    }

    #[test]
    fn test_incomplete_records_skipped() {
        let mut no_receiver = message("A", "B", "2025-01-22T10:30:00Z", "hi");
        no_receiver.receiver = None;
        let mut no_agent = span("W", SpanStatus::Completed, Some(10.0));
        no_agent.agent_name = None;

        let graph = GraphBuilder::new().build_graph_data(&snapshot(vec![
            no_receiver,
            no_agent,
            message("C", "D", "2025-01-22T10:30:00Z", "ok"),
        ]));

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.metadata.events_scanned, 3);
    }

    #[test]
    fn test_window_filters_old_records() {
        let now = DateTime::parse_from_rfc3339("2025-01-22T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut undated = message("X", "Y", "", "undated");
        undated.timestamp = Some("not a time".to_string());

        let graph = GraphBuilder::new()
            .with_window(Duration::minutes(30))
            .build_graph_data_at(
                &snapshot(vec![
                    message("Old", "Older", "2025-01-22T09:00:00Z", "stale"),
                    message("A", "B", "2025-01-22T11:45:00Z", "fresh"),
                    undated,
                ]),
                now,
            );

        assert!(graph.node("Old").is_none());
        assert!(graph.node("A").is_some());
        assert!(graph.node("X").is_some());
        assert_eq!(graph.metadata.window_minutes, Some(30));
        assert_eq!(graph.metadata.events_scanned, 2);
    }

    #[test]
    fn test_malformed_count_carried_into_metadata() {
        let graph = GraphBuilder::new().build_graph_data(&LogSnapshot {
            records: Vec::new(),
            malformed: 4,
        });

        assert!(graph.nodes.is_empty());
        assert_eq!(graph.metadata.malformed_records, 4);
    }
}
