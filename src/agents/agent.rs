//! The capability every bus participant implements.
//!
//! Agents are registered on the [`MessageBus`](crate::bus::MessageBus) by name
//! and receive the messages addressed to them synchronously, on the
//! publisher's thread.

use crate::message::Message;
use crate::Result;

/// A named participant capable of handling messages.
///
/// Returning an error from [`handle`](Agent::handle) propagates straight back
/// to whoever published the message; the bus does not swallow it.
///
/// # Examples
///
/// ```
/// use agent_observatory::agents::Agent;
/// use agent_observatory::message::Message;
/// use agent_observatory::Result;
///
/// struct Logger;
///
/// impl Agent for Logger {
///     fn name(&self) -> &str {
///         "Logger"
///     }
///
///     fn handle(&self, message: &Message) -> Result<()> {
///         println!("{} says {}", message.sender(), message.content());
///         Ok(())
///     }
/// }
/// ```
pub trait Agent: Send + Sync {
    /// Unique name the agent is registered and addressed under.
    fn name(&self) -> &str;

    /// Process one delivered message.
    fn handle(&self, message: &Message) -> Result<()>;
}
