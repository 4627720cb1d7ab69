//! In-process agent messaging with built-in tracing.
//!
//! Agents exchange [`Message`](message::Message)s over a synchronous
//! [`MessageBus`](bus::MessageBus). Every send and every traced unit of work is
//! appended to a JSON-lines event log, and the metrics, timeline and interaction
//! graph served by [`QueryService`](query::QueryService) are rebuilt from that
//! log on demand.
//!
//! Start with [`Observatory`](context::Observatory), which wires everything
//! together from an [`ObservabilityConfig`](config::ObservabilityConfig).

pub mod agents;
pub mod bus;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod logging;
pub mod message;
pub mod metrics;
pub mod query;
pub mod store;
pub mod text;
pub mod tracer;

pub use error::{ObservatoryError, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agents::{Agent, TracedAgent};
    pub use crate::bus::MessageBus;
    pub use crate::config::ObservabilityConfig;
    pub use crate::context::Observatory;
    pub use crate::error::{ObservatoryError, Result};
    pub use crate::message::{Message, MessageType};
    pub use crate::query::QueryService;
    pub use crate::tracer::TracerSystem;
}
