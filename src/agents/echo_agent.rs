//! Agent that answers every message with an echo of its content.

use super::agent::Agent;
use crate::message::Message;
use crate::{ObservatoryError, Result};
use parking_lot::Mutex;
use tracing::debug;

/// Replies with `Echo: <content>` and keeps every reply for inspection.
///
/// Empty content is rejected with [`ObservatoryError::Agent`].
pub struct EchoAgent {
    name: String,
    replies: Mutex<Vec<String>>,
}

impl EchoAgent {
    /// An echo agent registered under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            replies: Mutex::new(Vec::new()),
        }
    }

    /// Every echo produced so far, oldest first.
    pub fn replies(&self) -> Vec<String> {
        self.replies.lock().clone()
    }
}

impl Agent for EchoAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, message: &Message) -> Result<()> {
        if message.content().is_empty() {
            return Err(ObservatoryError::Agent(format!(
                "{} cannot echo an empty message from {}",
                self.name,
                message.sender()
            )));
        }

        let reply = format!("Echo: {}", message.content());
        debug!(agent = %self.name, echo_length = reply.len(), "Message echoed");
        self.replies.lock().push(reply);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echoes_content() {
        let agent = EchoAgent::new("Echo");
        agent.handle(&Message::new("A", "Echo", "hello")).unwrap();

        assert_eq!(agent.replies(), vec!["Echo: hello"]);
    }

    #[test]
    fn test_rejects_empty_content() {
        let agent = EchoAgent::new("Echo");
        let err = agent.handle(&Message::new("A", "Echo", "")).unwrap_err();

        assert!(matches!(err, ObservatoryError::Agent(_)));
        assert!(agent.replies().is_empty());
    }
}
