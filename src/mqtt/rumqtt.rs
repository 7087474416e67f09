//! `rumqttc` backed transport
//!
//! Wraps [`rumqttc::AsyncClient`] and [`rumqttc::EventLoop`] behind the
//! session's transport traits. Besides translating events, this is the one
//! place that knows which connection errors are harmless noise after we asked
//! to disconnect (closed TLS channel, reset socket); those are folded into
//! [`TransportEvent::Closed`] so the session only ever sees a clean result.
//!
//! The driver keeps exactly one `EventLoop::poll` future alive until it
//! resolves. Connecting is not cancel safe, so a pump step that finds nothing
//! ready leaves the attempt in flight instead of dropping it.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use bytes::Bytes;
use futures::future::poll_fn;
use futures::FutureExt;
use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions,
    Outgoing, Packet, QoS, StateError, SubscribeFilter, SubscribeReasonCode, TlsConfiguration,
};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::address::BrokerAddress;
use super::error::SessionError;
use super::response_code::ResponseCode;
use super::transport::{ConnectOptions, Driver, Requester, Transport, TransportEvent};

pub const WEBSOCKET_PATH: &str = "/mqtt";

#[derive(Clone, Debug)]
pub struct RumqttSettings {
    pub keep_alive: Duration,
    /// Capacity of the request channel between client and event loop
    pub capacity: usize,
    /// Pause before the event loop reconnects after a dropped connection
    pub reconnect_delay: Duration,
}

impl Default for RumqttSettings {
    fn default() -> Self {
        Self {
            keep_alive: Duration::from_secs(5),
            capacity: 100,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RumqttTransport {
    settings: RumqttSettings,
}

impl RumqttTransport {
    pub fn new(settings: RumqttSettings) -> Self {
        Self { settings }
    }
}

impl Transport for RumqttTransport {
    type Requester = RumqttRequester;
    type Driver = RumqttDriver;

    async fn open(
        &self,
        options: &ConnectOptions,
    ) -> Result<(RumqttRequester, RumqttDriver), SessionError> {
        let address = &options.address;
        resolve(address).await?;

        let ca = match address.tls_cert_path() {
            Some(path) => Some(tokio::fs::read(path).await.map_err(|e| {
                SessionError::Transport(format!(
                    "cannot read TLS certificate {}: {e}",
                    path.display()
                ))
            })?),
            None => None,
        };

        let mqtt_options = build_options(options, ca, &self.settings);
        let (client, event_loop) = AsyncClient::new(mqtt_options, self.settings.capacity);
        let closing = CancellationToken::new();
        let acknowledged = Arc::new(AtomicBool::new(false));

        debug!(client_id = %options.client_id, broker = %address, "Opened rumqttc link");
        Ok((
            RumqttRequester {
                client,
                closing: closing.clone(),
                acknowledged: acknowledged.clone(),
            },
            RumqttDriver {
                pending: start_poll(event_loop),
                closing,
                acknowledged,
                finished: false,
                resume_at: None,
                reconnect_delay: self.settings.reconnect_delay,
            },
        ))
    }
}

async fn resolve(address: &BrokerAddress) -> Result<(), SessionError> {
    let host = address
        .host()
        .trim_start_matches('[')
        .trim_end_matches(']');
    let resolution_error = |source: io::Error| SessionError::AddressResolution {
        host: address.host().to_owned(),
        port: address.port(),
        source,
    };

    let mut resolved = tokio::net::lookup_host((host, address.port()))
        .await
        .map_err(resolution_error)?;
    if resolved.next().is_none() {
        return Err(resolution_error(io::Error::new(
            io::ErrorKind::NotFound,
            "no socket addresses",
        )));
    }
    Ok(())
}

fn build_options(
    options: &ConnectOptions,
    ca: Option<Vec<u8>>,
    settings: &RumqttSettings,
) -> MqttOptions {
    let address = &options.address;
    let secure = address.is_secure();

    // rumqttc expects the full URL as host for websocket transports
    let broker = if options.use_websockets {
        let scheme = if secure { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}{WEBSOCKET_PATH}",
            address.host(),
            address.port()
        )
    } else {
        address.host().to_owned()
    };

    let mut mqtt_options = MqttOptions::new(options.client_id.clone(), broker, address.port());
    mqtt_options.set_keep_alive(settings.keep_alive);

    if let Some((user, password)) = address.credentials() {
        mqtt_options.set_credentials(user, password);
    }

    let tls = ca.map(|ca| TlsConfiguration::Simple {
        ca,
        alpn: None,
        client_auth: None,
    });
    match (options.use_websockets, tls) {
        (true, Some(tls)) => {
            mqtt_options.set_transport(rumqttc::Transport::wss_with_config(tls));
        }
        (true, None) if secure => {
            mqtt_options.set_transport(rumqttc::Transport::wss_with_default_config());
        }
        (true, None) => {
            mqtt_options.set_transport(rumqttc::Transport::Ws);
        }
        (false, Some(tls)) => {
            mqtt_options.set_transport(rumqttc::Transport::tls_with_config(tls));
        }
        (false, None) if secure => {
            mqtt_options.set_transport(rumqttc::Transport::tls_with_default_config());
        }
        (false, None) => {}
    }

    mqtt_options
}

#[derive(Clone)]
pub struct RumqttRequester {
    client: AsyncClient,
    closing: CancellationToken,
    /// Set by the driver while the broker has acknowledged the connection
    acknowledged: Arc<AtomicBool>,
}

impl Requester for RumqttRequester {
    /// Fails with `ConnLost` while the link is not acknowledged. rumqttc would
    /// otherwise accept the request into its queue on a dead connection.
    fn publish(&self, topic: &str, qos: QoS, payload: Bytes) -> ResponseCode {
        if !self.acknowledged.load(Ordering::SeqCst) {
            debug!(topic, "Publish on a link without CONNACK");
            return ResponseCode::ConnLost;
        }
        request_status(self.client.try_publish(topic, qos, false, payload.to_vec()))
    }

    fn subscribe(&self, filters: &[(String, QoS)]) -> ResponseCode {
        let filters = filters
            .iter()
            .map(|(name, qos)| SubscribeFilter::new(name.clone(), *qos));
        request_status(self.client.try_subscribe_many(filters))
    }

    fn disconnect(&self) -> ResponseCode {
        self.closing.cancel();
        request_status(self.client.try_disconnect())
    }
}

fn request_status(result: Result<(), ClientError>) -> ResponseCode {
    match result {
        Ok(()) => ResponseCode::NoError,
        Err(e) => {
            debug!(error = %e, "rumqttc rejected request");
            ResponseCode::ConnLost
        }
    }
}

type Notification = Result<Event, ConnectionError>;
type PendingPoll = Pin<Box<dyn Future<Output = (EventLoop, Notification)> + Send>>;

/// Moves the event loop into a poll future that hands it back on completion.
fn start_poll(mut event_loop: EventLoop) -> PendingPoll {
    Box::pin(async move {
        let notification = event_loop.poll().await;
        (event_loop, notification)
    })
}

pub struct RumqttDriver {
    pending: PendingPoll,
    closing: CancellationToken,
    acknowledged: Arc<AtomicBool>,
    finished: bool,
    resume_at: Option<Instant>,
    reconnect_delay: Duration,
}

impl RumqttDriver {
    async fn next_event(&mut self) -> TransportEvent {
        if self.finished {
            return TransportEvent::Closed;
        }
        if let Some(resume_at) = self.resume_at {
            // no reconnect just to deliver a disconnect
            let closing = self.closing.clone();
            let interrupted = tokio::select! {
                _ = time::sleep_until(resume_at) => false,
                _ = closing.cancelled() => true,
            };
            if interrupted {
                return self.finish();
            }
            self.resume_at = None;
        }
        loop {
            let (event_loop, notification) = (&mut self.pending).await;
            self.pending = start_poll(event_loop);
            if let Some(event) = self.translate(notification) {
                return event;
            }
        }
    }

    /// Like `next_event`, but returns `None` as soon as nothing is ready.
    async fn try_next_event(&mut self) -> Option<TransportEvent> {
        if self.finished {
            return Some(TransportEvent::Closed);
        }
        if let Some(resume_at) = self.resume_at {
            if self.closing.is_cancelled() {
                return Some(self.finish());
            }
            if Instant::now() < resume_at {
                return None;
            }
            self.resume_at = None;
        }
        loop {
            let ready = poll_fn(|cx| match self.pending.poll_unpin(cx) {
                Poll::Ready(output) => Poll::Ready(Some(output)),
                Poll::Pending => Poll::Ready(None),
            })
            .await;
            let (event_loop, notification) = ready?;
            self.pending = start_poll(event_loop);
            if let Some(event) = self.translate(notification) {
                return Some(event);
            }
        }
    }

    fn finish(&mut self) -> TransportEvent {
        self.finished = true;
        self.acknowledged.store(false, Ordering::SeqCst);
        TransportEvent::Closed
    }

    fn translate(
        &mut self,
        notification: Result<Event, ConnectionError>,
    ) -> Option<TransportEvent> {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                self.acknowledged
                    .store(ack.code == ConnectReturnCode::Success, Ordering::SeqCst);
                Some(TransportEvent::ConnAck(ack.code.into()))
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => Some(TransportEvent::Message {
                topic: publish.topic,
                payload: publish.payload,
            }),
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let rejected = ack
                    .return_codes
                    .iter()
                    .filter(|code| matches!(code, SubscribeReasonCode::Failure))
                    .count();
                (rejected > 0).then_some(TransportEvent::SubscribeRejected { rejected })
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                self.acknowledged.store(false, Ordering::SeqCst);
                self.resume_at = Some(Instant::now() + self.reconnect_delay);
                Some(TransportEvent::Disconnected(ResponseCode::ConnLost))
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => Some(self.finish()),
            Ok(other) => {
                trace!(event = ?other, "MQTT notification");
                None
            }
            Err(err) => Some(self.on_error(err)),
        }
    }

    fn on_error(&mut self, err: ConnectionError) -> TransportEvent {
        if self.closing.is_cancelled() || matches!(err, ConnectionError::RequestsDone) {
            if is_ignorable_shutdown(&err) {
                debug!(error = %err, "Ignoring connection teardown after disconnect");
            } else {
                warn!(error = %err, "Connection error while disconnecting");
            }
            return self.finish();
        }

        let code = error_code(&err);
        debug!(error = %err, %code, "rumqttc event loop error");
        // rumqttc reconnects on the next poll
        self.resume_at = Some(Instant::now() + self.reconnect_delay);
        if self.acknowledged.swap(false, Ordering::SeqCst) {
            TransportEvent::Disconnected(code)
        } else {
            TransportEvent::ConnAck(code)
        }
    }
}

impl Driver for RumqttDriver {
    async fn poll(&mut self) -> TransportEvent {
        self.next_event().await
    }

    async fn step(&mut self) -> Option<TransportEvent> {
        self.try_next_event().await
    }
}

/// Teardown conditions expected once a disconnect has been requested
fn is_ignorable_shutdown(err: &ConnectionError) -> bool {
    match err {
        ConnectionError::Io(e) | ConnectionError::MqttState(StateError::Io(e)) => matches!(
            e.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        ),
        ConnectionError::Tls(_)
        | ConnectionError::RequestsDone => true,
        _ => false,
    }
}

fn error_code(err: &ConnectionError) -> ResponseCode {
    match err {
        ConnectionError::ConnectionRefused(code) => (*code).into(),
        ConnectionError::NetworkTimeout => ResponseCode::ConnackTimeout,
        ConnectionError::MqttState(StateError::AwaitPingResp) => ResponseCode::PingrespTimeout,
        ConnectionError::MqttState(StateError::Deserialization(_))
        | ConnectionError::NotConnAck(_) => ResponseCode::MalformedPacket,
        ConnectionError::Io(e)
            if matches!(
                e.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::NotFound
            ) =>
        {
            ResponseCode::ProblemPort
        }
        ConnectionError::Tls(_) => ResponseCode::ProblemPort,
        _ => ResponseCode::ConnLost,
    }
}
