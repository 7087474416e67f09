//! The doorbell itself: one publish-only MQTT session announcing each press
//!
//! A doorbell without a usable `[mqtt]` configuration still runs; presses are
//! then only logged.

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::config::{Config, MqttSettings};
use crate::mqtt::{LoopMode, Session, SessionBuilder, SessionError, Topic, Transport};

/// Payload layout for ring announcements, local time with microseconds
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub struct Doorbell<T: Transport> {
    session: Option<Session<T>>,
    topic: Topic,
}

impl<T: Transport> Doorbell<T> {
    pub fn new(settings: &MqttSettings, transport: T) -> Self {
        let session = SessionBuilder::new(&settings.client_id_prefix, settings.address.clone())
            .loop_mode(LoopMode::Background)
            .use_websockets(settings.use_websockets)
            .on_connect_error(|code| warn!(%code, "Doorbell could not reach MQTT broker"))
            .build(transport);
        info!(client_id = session.id(), topic = %settings.pub_topic, "Doorbell publishes over MQTT");

        Self {
            session: Some(session),
            topic: Topic::new(&settings.pub_topic).with_qos(settings.qos),
        }
    }

    /// Presses are logged only.
    pub fn without_mqtt() -> Self {
        Self {
            session: None,
            topic: Topic::new(crate::config::DEFAULT_PUB_TOPIC),
        }
    }

    /// Falls back to [`Doorbell::without_mqtt`] when the MQTT sections are
    /// missing or invalid.
    pub fn from_config(config: &Config, transport: T) -> Self {
        match config.mqtt_settings() {
            Ok(settings) => Self::new(&settings, transport),
            Err(e) => {
                warn!(error = %e, "Running doorbell without MQTT");
                Self::without_mqtt()
            }
        }
    }

    pub fn session(&self) -> Option<&Session<T>> {
        self.session.as_ref()
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Connects and starts the background loop.
    pub async fn enter(&self) -> Result<(), SessionError> {
        if let Some(session) = &self.session {
            session.enter().await?;
            session.start_loop().await;
        }
        Ok(())
    }

    pub async fn ring(&self) {
        self.ring_at(Local::now()).await;
    }

    /// Announces a press that happened at `at`.
    pub async fn ring_at(&self, at: DateTime<Local>) {
        let payload = at.format(TIMESTAMP_FORMAT).to_string();
        info!(at = %payload, "Ding dong");

        match &self.session {
            Some(session) => session.publish(&self.topic, payload).await,
            None => debug!("No MQTT session, press not announced"),
        }
    }

    pub async fn exit(&self) {
        if let Some(session) = &self.session {
            session.exit().await;
        }
    }
}
