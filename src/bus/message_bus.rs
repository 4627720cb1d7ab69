//! Synchronous in-process message bus.
//!
//! Two delivery modes share one bus:
//!
//! - **Point-to-point** ([`MessageBus::publish`]): the message goes to the agent
//!   registered under its receiver name. Handler errors propagate to the caller.
//! - **Topic fan-out** ([`MessageBus::publish_topic`]): every subscribed callback
//!   runs in subscription order; a failing callback is logged and skipped.
//!
//! Both modes record exactly one `message_sent` event per publish before
//! delivering, and both run on the caller's thread with no queueing.

use super::topics::{SubscriptionId, TopicCallback, TopicRegistry};
use crate::agents::Agent;
use crate::message::{Message, MESSAGE_ID_KEY};
use crate::tracer::TracerSystem;
use crate::Result;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared handle under which agents are registered.
pub type AgentHandle = Arc<dyn Agent>;

/// In-process router for point-to-point messages and topic broadcasts.
///
/// Every publish is recorded through the tracer before delivery.
pub struct MessageBus {
    agents: RwLock<HashMap<String, AgentHandle>>,
    topics: RwLock<TopicRegistry>,
    tracer: Arc<TracerSystem>,
}

impl MessageBus {
    /// An empty bus recording its traffic with `tracer`.
    pub fn new(tracer: Arc<TracerSystem>) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            topics: RwLock::new(TopicRegistry::new()),
            tracer,
        }
    }

    /// The tracer this bus records to.
    pub fn tracer(&self) -> &Arc<TracerSystem> {
        &self.tracer
    }

    /// Register an agent under its name. A later registration with the same
    /// name replaces the earlier one.
    pub fn register(&self, agent: AgentHandle) {
        let name = agent.name().to_string();
        let replaced = self.agents.write().insert(name.clone(), agent).is_some();
        if replaced {
            info!(agent = %name, "Agent re-registered, previous handler replaced");
        } else {
            info!(agent = %name, "Agent registered");
        }
    }

    /// Remove an agent. Returns whether one was registered under `name`.
    pub fn unregister(&self, name: &str) -> bool {
        self.agents.write().remove(name).is_some()
    }

    /// Whether an agent is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.agents.read().contains_key(name)
    }

    /// Registered agent names, sorted.
    pub fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Deliver a message to its receiver.
    ///
    /// The `message_sent` event is recorded first, then the handler runs on the
    /// calling thread. The delivered copy carries the recorded id under
    /// `metadata.message_id`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(message_id))` - the receiver handled the message
    /// * `Ok(None)` - no agent is registered under the receiver name; the message
    ///   was dropped
    /// * `Err(e)` - the receiver's handler failed; `e` is its error, unchanged
    pub fn publish(&self, message: Message) -> Result<Option<String>> {
        let (message_id, message) = self.record_send(message, None);

        // Clone the handle out so the registry lock is not held while the
        // handler runs; handlers may publish or register in turn.
        let agent = self.agents.read().get(message.receiver()).cloned();
        let Some(agent) = agent else {
            warn!(
                receiver = %message.receiver(),
                sender = %message.sender(),
                message_id = %message_id,
                "No agent registered for receiver, message dropped"
            );
            return Ok(None);
        };

        debug!(receiver = %message.receiver(), message_id = %message_id, "Delivering message");
        agent.handle(&message)?;
        Ok(Some(message_id))
    }

    /// Build a text message and [`publish`](Self::publish) it.
    pub fn send(
        &self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Option<String>> {
        self.publish(Message::new(sender, receiver, content))
    }

    /// Subscribe a callback to a topic.
    pub fn subscribe(&self, topic: impl Into<String>, callback: TopicCallback) -> SubscriptionId {
        let topic = topic.into();
        let id = self.topics.write().subscribe(topic.clone(), callback);
        debug!(topic = %topic, subscription = %id, "Subscribed to topic");
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, topic: &str, id: SubscriptionId) -> bool {
        self.topics.write().unsubscribe(topic, id)
    }

    /// Current number of subscriptions on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().subscriber_count(topic)
    }

    /// Fan a message out to every current subscriber of `topic`.
    ///
    /// Callbacks run in subscription order. A callback error is logged and does
    /// not stop the remaining callbacks.
    ///
    /// # Returns
    ///
    /// The number of callbacks that completed without error.
    pub fn publish_topic(&self, topic: &str, message: Message) -> usize {
        let (message_id, message) = self.record_send(message, Some(topic));
        let callbacks = self.topics.read().callbacks(topic);

        if callbacks.is_empty() {
            debug!(topic = %topic, message_id = %message_id, "No subscribers for topic");
            return 0;
        }

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match callback(&message) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    topic = %topic,
                    subscription = %id,
                    message_id = %message_id,
                    error = %e,
                    "Topic subscriber failed"
                ),
            }
        }
        delivered
    }

    /// Record the `message_sent` event and attach its id to the message.
    ///
    /// An id already attached upstream is reused, otherwise the message's own id.
    fn record_send(&self, message: Message, topic: Option<&str>) -> (String, Message) {
        let candidate = message.message_id().unwrap_or(message.id()).to_string();
        let message_id = self.tracer.log_message_event(
            message.sender(),
            topic.unwrap_or(message.receiver()),
            message.content(),
            Some(candidate),
        );
        let message = message.with_metadata(MESSAGE_ID_KEY, json!(message_id));
        (message_id, message)
    }
}
