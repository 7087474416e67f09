//! Seam between the session and the MQTT protocol engine
//!
//! The session never touches sockets or packets. It opens a link through a
//! [`Transport`], submits requests through the link's [`Requester`] half and
//! pumps the link's [`Driver`] half for [`TransportEvent`]s. The production
//! implementation lives in [`super::rumqtt`]; tests plug in scripted fakes.

use std::future::Future;

use bytes::Bytes;
use rumqttc::QoS;

use super::address::BrokerAddress;
use super::error::SessionError;
use super::response_code::ResponseCode;

/// Everything the transport needs to open one connection
#[derive(Clone, Debug)]
pub struct ConnectOptions {
    pub client_id: String,
    pub address: BrokerAddress,
    pub use_websockets: bool,
}

/// Events surfaced by a driver, already decoded into session terms
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// Outcome of a connect attempt. A network failure before the broker
    /// answered is reported here as a non-success code.
    ConnAck(ResponseCode),
    Message {
        topic: String,
        payload: Bytes,
    },
    SubscribeRejected {
        rejected: usize,
    },
    /// The established connection dropped without being asked to
    Disconnected(ResponseCode),
    /// The link finished after a requested disconnect. Benign secure-channel
    /// teardown noise is folded into this variant by the transport.
    Closed,
}

pub trait Transport: Send + Sync + 'static {
    type Requester: Requester;
    type Driver: Driver;

    /// Prepares a link and queues the connect request.
    ///
    /// Must not wait for the broker's CONNACK; that arrives later through the
    /// driver as [`TransportEvent::ConnAck`].
    fn open(
        &self,
        options: &ConnectOptions,
    ) -> impl Future<Output = Result<(Self::Requester, Self::Driver), SessionError>> + Send;
}

/// Request half of a link. All calls hand the request over and return at once.
pub trait Requester: Send + Sync + 'static {
    fn publish(&self, topic: &str, qos: QoS, payload: Bytes) -> ResponseCode;

    fn subscribe(&self, filters: &[(String, QoS)]) -> ResponseCode;

    fn disconnect(&self) -> ResponseCode;
}

/// Event half of a link
pub trait Driver: Send + 'static {
    /// Waits for the next event.
    fn poll(&mut self) -> impl Future<Output = TransportEvent> + Send;

    /// Single non-blocking pump step; `None` when nothing was ready.
    fn step(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;
}
