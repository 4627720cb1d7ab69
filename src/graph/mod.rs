//! Agent interaction graph reconstructed from the event log.
//!
//! Every `message_sent` event becomes one directed edge and bumps the message
//! count of both endpoints. Span events drive each node's status and its
//! smoothed duration. Nothing here is persisted; the graph is rebuilt from the
//! log on every request.

mod builder;
mod model;

pub use builder::GraphBuilder;
pub use model::{
    node_size, AgentNode, GraphData, GraphEdge, GraphMetadata, NodeStatus, BASE_NODE_SIZE,
    MAX_NODE_SIZE, NODE_SIZE_STEP,
};
