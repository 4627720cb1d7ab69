//! Agents that participate on the message bus.
//!
//! # Agent Types
//!
//! - [`Agent`] - The capability contract: a name and a synchronous `handle`
//! - [`TracedAgent`] - Wraps any agent in a `message_received` processing span
//!
//! # Implementations
//!
//! - [`EchoAgent`] - Echoes message content back as a reply
//! - [`MemoryAgent`] - Remembers everything it receives

pub mod agent;
pub mod echo_agent;
pub mod memory_agent;
pub mod traced_agent;

pub use agent::Agent;
pub use echo_agent::EchoAgent;
pub use memory_agent::MemoryAgent;
pub use traced_agent::{TracedAgent, MESSAGE_RECEIVED};
