use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::topic::{DispatchMode, TopicRegistry};

/// What happened to one inbound message
#[derive(Debug)]
pub enum Dispatched {
    Inline,
    /// Callback is running on its own blocking task
    Detached(JoinHandle<()>),
    UnknownTopic,
}

/// Routes inbound messages to topic callbacks by exact name
#[derive(Clone, Debug)]
pub struct Dispatcher {
    topics: Arc<TopicRegistry>,
}

impl Dispatcher {
    pub fn new(topics: Arc<TopicRegistry>) -> Self {
        Self { topics }
    }

    /// Must be called from within a tokio runtime when detached topics exist.
    pub fn dispatch(&self, topic_name: &str, payload: Bytes) -> Dispatched {
        debug!(topic = topic_name, payload_size = payload.len(), "Dispatching MQTT message");

        let topic = self.topics.get(topic_name);
        // Only subscribed names can arrive here.
        debug_assert!(
            topic.is_some(),
            "message for unregistered topic '{topic_name}'"
        );
        let Some(topic) = topic else {
            warn!(topic = topic_name, "Dropping message for unregistered topic");
            return Dispatched::UnknownTopic;
        };

        match topic.dispatch() {
            DispatchMode::Inline => {
                (topic.callback())(topic_name, &payload);
                Dispatched::Inline
            }
            DispatchMode::Detached => {
                let callback = topic.callback().clone();
                let name = topic_name.to_owned();
                Dispatched::Detached(tokio::task::spawn_blocking(move || {
                    callback(&name, &payload)
                }))
            }
        }
    }
}
