//! Topic registry
//!
//! A [`Topic`] names one channel the session subscribes or publishes to. The
//! [`TopicRegistry`] is filled while the session is built and then frozen, so
//! detached callbacks can read it from any thread without locking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rumqttc::QoS;

/// Callback invoked with the topic name and the raw payload
pub type MessageCallback = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// How an inbound message reaches its topic callback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Runs on the loop's delivery context; a slow callback stalls delivery
    #[default]
    Inline,
    /// Runs on its own blocking task; the loop continues immediately
    Detached,
}

#[derive(Clone)]
pub struct Topic {
    name: String,
    qos: QoS,
    dispatch: DispatchMode,
    callback: MessageCallback,
}

impl Topic {
    /// Creates a topic with QoS 0, inline dispatch and a no-op callback.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qos: QoS::AtMostOnce,
            dispatch: DispatchMode::Inline,
            callback: Arc::new(|_, _| {}),
        }
    }

    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn on_message<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        self.callback = Arc::new(callback);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qos(&self) -> QoS {
        self.qos
    }

    pub fn dispatch(&self) -> DispatchMode {
        self.dispatch
    }

    pub fn callback(&self) -> &MessageCallback {
        &self.callback
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.qos == other.qos && self.dispatch == other.dispatch
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Topic[name = {}, qos = {}]", self.name, self.qos as u8)
    }
}

/// Name-keyed set of subscribed topics
#[derive(Clone, Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Topic>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a topic, replacing any earlier topic with the same name.
    pub fn insert(&mut self, topic: Topic) -> Option<Topic> {
        self.topics.insert(topic.name.clone(), topic)
    }

    pub fn get(&self, name: &str) -> Option<&Topic> {
        self.topics.get(name)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.values()
    }

    /// `(name, qos)` pairs in map iteration order, as sent in one subscribe batch
    pub fn filters(&self) -> Vec<(String, QoS)> {
        self.iter()
            .map(|topic| (topic.name.clone(), topic.qos))
            .collect()
    }
}

impl FromIterator<Topic> for TopicRegistry {
    fn from_iter<I: IntoIterator<Item = Topic>>(iter: I) -> Self {
        let mut registry = TopicRegistry::new();
        for topic in iter {
            registry.insert(topic);
        }
        registry
    }
}

impl fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.topics.values()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_qos_zero_inline() {
        let topic = Topic::new("doorbell/ring");
        assert_eq!(topic.qos(), QoS::AtMostOnce);
        assert_eq!(topic.dispatch(), DispatchMode::Inline);
        assert_eq!(format!("{topic:?}"), "Topic[name = doorbell/ring, qos = 0]");
    }

    #[test]
    fn equality_ignores_callback() {
        let a = Topic::new("a").with_qos(QoS::AtLeastOnce);
        let b = Topic::new("a")
            .with_qos(QoS::AtLeastOnce)
            .on_message(|_, _| panic!("never called"));
        assert_eq!(a, b);
        assert_ne!(a, Topic::new("a"));
    }

    #[test]
    fn registry_keys_by_name() {
        let mut registry: TopicRegistry = [Topic::new("a"), Topic::new("b")].into_iter().collect();
        assert_eq!(registry.len(), 2);

        let replaced = registry.insert(Topic::new("a").with_qos(QoS::ExactlyOnce));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a").unwrap().qos(), QoS::ExactlyOnce);

        let mut filters = registry.filters();
        filters.sort_by(|l, r| l.0.cmp(&r.0));
        assert_eq!(
            filters,
            vec![
                ("a".to_owned(), QoS::ExactlyOnce),
                ("b".to_owned(), QoS::AtMostOnce)
            ]
        );
    }
}
