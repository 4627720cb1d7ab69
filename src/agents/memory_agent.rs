//! Agent that remembers the content of everything it receives.

use super::agent::Agent;
use crate::message::Message;
use crate::Result;
use parking_lot::Mutex;
use tracing::debug;

/// Stores the content of every message it receives, in arrival order.
pub struct MemoryAgent {
    name: String,
    memory: Mutex<Vec<String>>,
}

impl MemoryAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            memory: Mutex::new(Vec::new()),
        }
    }

    pub fn memory(&self) -> Vec<String> {
        self.memory.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.memory.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.lock().is_empty()
    }
}

impl Agent for MemoryAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, message: &Message) -> Result<()> {
        let mut memory = self.memory.lock();
        memory.push(message.content().to_string());
        debug!(agent = %self.name, memory_size = memory.len(), "Memory stored");
        Ok(())
    }
}
