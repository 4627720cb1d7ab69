//! Topic subscriptions for fan-out delivery.
//!
//! This module provides the `TopicRegistry` type that maps topic names to the
//! callbacks subscribed to them. The bus consults it on every topic publish.

use crate::message::Message;
use crate::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every message published to a subscribed topic.
pub type TopicCallback = Arc<dyn Fn(&Message) -> Result<()> + Send + Sync>;

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Routes topic publishes to subscribed callbacks.
///
/// Callbacks are kept in subscription order per topic. Multiple callbacks can
/// be registered for the same topic.
pub struct TopicRegistry {
    routes: HashMap<String, Vec<(SubscriptionId, TopicCallback)>>,
    next_id: u64,
}

impl TopicRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            next_id: 0,
        }
    }

    /// Append a callback to a topic's subscriber list
    pub fn subscribe(&mut self, topic: impl Into<String>, callback: TopicCallback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.routes.entry(topic.into()).or_default().push((id, callback));
        id
    }

    /// Remove one subscription. Returns whether it existed.
    pub fn unsubscribe(&mut self, topic: &str, id: SubscriptionId) -> bool {
        let Some(callbacks) = self.routes.get_mut(topic) else {
            return false;
        };

        let before = callbacks.len();
        callbacks.retain(|(sub_id, _)| *sub_id != id);
        let removed = callbacks.len() != before;

        if callbacks.is_empty() {
            self.routes.remove(topic);
        }
        removed
    }

    /// Snapshot of a topic's callbacks, in subscription order
    pub fn callbacks(&self, topic: &str) -> Vec<(SubscriptionId, TopicCallback)> {
        self.routes.get(topic).cloned().unwrap_or_default()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.routes.get(topic).map_or(0, Vec::len)
    }

    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.routes.keys().cloned().collect();
        topics.sort();
        topics
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}
