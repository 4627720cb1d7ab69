//! In-process message bus.
//!
//! This module provides synchronous agent-to-agent delivery:
//!
//! - [`MessageBus`]: name-keyed agent registry with point-to-point publish
//! - [`TopicRegistry`]: topic subscriptions used for fan-out publish
//!
//! Every publish records one `message_sent` event through the bus's
//! [`TracerSystem`](crate::tracer::TracerSystem).

mod message_bus;
mod topics;

pub use message_bus::{AgentHandle, MessageBus};
pub use topics::{SubscriptionId, TopicCallback, TopicRegistry};
