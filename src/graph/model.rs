//! Graph output types.

use serde::{Deserialize, Serialize};

/// Smallest presentation size of a node.
pub const BASE_NODE_SIZE: u32 = 20;

/// Size added per message the node took part in.
pub const NODE_SIZE_STEP: u32 = 3;

/// Largest presentation size of a node.
pub const MAX_NODE_SIZE: u32 = 60;

/// Presentation size for a node with `message_count` messages.
pub fn node_size(message_count: usize) -> u32 {
    let count = u32::try_from(message_count).unwrap_or(u32::MAX);
    BASE_NODE_SIZE
        .saturating_add(count.saturating_mul(NODE_SIZE_STEP))
        .min(MAX_NODE_SIZE)
}

/// Last observed state of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Seen only in message events.
    #[default]
    Idle,
    /// Has a span that started and has not been seen to finish.
    Processing,
    /// Finished at least one span successfully.
    Active,
    /// Had a span fail. Sticky for the rest of the scan.
    Error,
}

/// Per-agent aggregate, recomputed on every build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNode {
    pub id: String,
    pub message_count: usize,
    pub error_count: usize,
    /// Smoothed duration: each finished span folds in as `(old + new) / 2`.
    pub avg_duration_ms: f64,
    pub last_seen: Option<String>,
    pub status: NodeStatus,
    pub size: u32,
}

impl AgentNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message_count: 0,
            error_count: 0,
            avg_duration_ms: 0.0,
            last_seen: None,
            status: NodeStatus::Idle,
            size: node_size(0),
        }
    }
}

/// One `message_sent` event. Edges between the same pair are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub timestamp: Option<String>,
    pub content_preview: Option<String>,
    pub content_length: Option<usize>,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub total_agents: usize,
    pub total_edges: usize,
    /// Records inside the window that were folded into the graph.
    pub events_scanned: usize,
    /// Log lines that failed to parse.
    pub malformed_records: usize,
    pub window_minutes: Option<i64>,
    pub generated_at: String,
}

/// Agent interaction multigraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<AgentNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: GraphMetadata,
}

impl GraphData {
    /// A graph with no nodes or edges, used when the log cannot be read.
    pub fn empty(window_minutes: Option<i64>, generated_at: String) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            metadata: GraphMetadata {
                total_agents: 0,
                total_edges: 0,
                events_scanned: 0,
                malformed_records: 0,
                window_minutes,
                generated_at,
            },
        }
    }

    pub fn node(&self, id: &str) -> Option<&AgentNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_size_scales_and_caps() {
        assert_eq!(node_size(0), 20);
        assert_eq!(node_size(1), 23);
        assert_eq!(node_size(13), 59);
        assert_eq!(node_size(14), 60);
        assert_eq!(node_size(1_000), 60);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(NodeStatus::Active).unwrap(), json!("active"));
        assert_eq!(
            serde_json::to_value(NodeStatus::Processing).unwrap(),
            json!("processing")
        );
    }

    #[test]
    fn test_graph_serializes_nodes_edges_metadata() {
        let graph = GraphData::empty(Some(60), "2025-01-22T10:30:00Z".to_string());
        let value = serde_json::to_value(&graph).unwrap();

        assert!(value["nodes"].as_array().unwrap().is_empty());
        assert!(value["edges"].as_array().unwrap().is_empty());
        assert_eq!(value["metadata"]["window_minutes"], json!(60));
    }
}
