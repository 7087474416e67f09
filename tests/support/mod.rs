#![allow(dead_code)]

pub mod broker;

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use rumqttc::QoS;
use smartdoorbell::mqtt::{
    ConnectOptions, Driver, Requester, ResponseCode, SessionError, Transport, TransportEvent,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Every request the session made, in order
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Connect { client_id: String },
    Publish { topic: String, qos: QoS, payload: Bytes },
    Subscribe(Vec<(String, QoS)>),
    Disconnect,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    publish_status: VecDeque<ResponseCode>,
    links: Vec<mpsc::UnboundedSender<TransportEvent>>,
    fail_resolution: bool,
    connack: Option<ResponseCode>,
}

/// Scripted in-memory transport
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<State>>,
}

impl FakeTransport {
    /// Links stay silent until events are emitted by hand.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every opened link answers its connect request with `code`.
    pub fn acknowledging(code: ResponseCode) -> Self {
        let transport = Self::default();
        transport.state().connack = Some(code);
        transport
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn fail_resolution(&self) {
        self.state().fail_resolution = true;
    }

    pub fn refuse_next_publish(&self, code: ResponseCode) {
        self.state().publish_status.push_back(code);
    }

    /// Pushes `event` to the most recently opened link.
    pub fn emit(&self, event: TransportEvent) {
        let state = self.state();
        let link = state.links.last().expect("no link opened yet");
        link.send(event).unwrap();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn connects(&self) -> usize {
        self.count(|call| matches!(call, Call::Connect { .. }))
    }

    pub fn disconnects(&self) -> usize {
        self.count(|call| matches!(call, Call::Disconnect))
    }

    pub fn publishes(&self) -> Vec<Call> {
        self.filtered(|call| matches!(call, Call::Publish { .. }))
    }

    pub fn subscribes(&self) -> Vec<Vec<(String, QoS)>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Subscribe(filters) => Some(filters),
                _ => None,
            })
            .collect()
    }

    fn filtered(&self, predicate: impl Fn(&Call) -> bool) -> Vec<Call> {
        self.calls().into_iter().filter(|call| predicate(call)).collect()
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.filtered(predicate).len()
    }
}

impl Transport for FakeTransport {
    type Requester = FakeRequester;
    type Driver = FakeDriver;

    async fn open(
        &self,
        options: &ConnectOptions,
    ) -> Result<(FakeRequester, FakeDriver), SessionError> {
        let mut state = self.state();
        if state.fail_resolution {
            return Err(SessionError::AddressResolution {
                host: options.address.host().to_owned(),
                port: options.address.port(),
                source: io::Error::new(io::ErrorKind::NotFound, "unknown host"),
            });
        }

        state.calls.push(Call::Connect {
            client_id: options.client_id.clone(),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(code) = state.connack {
            let _ = tx.send(TransportEvent::ConnAck(code));
        }
        state.links.push(tx.clone());

        Ok((
            FakeRequester {
                state: self.state.clone(),
                link: tx,
            },
            FakeDriver { rx },
        ))
    }
}

pub struct FakeRequester {
    state: Arc<Mutex<State>>,
    link: mpsc::UnboundedSender<TransportEvent>,
}

impl Requester for FakeRequester {
    fn publish(&self, topic: &str, qos: QoS, payload: Bytes) -> ResponseCode {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Publish {
            topic: topic.to_owned(),
            qos,
            payload,
        });
        state.publish_status.pop_front().unwrap_or(ResponseCode::NoError)
    }

    fn subscribe(&self, filters: &[(String, QoS)]) -> ResponseCode {
        let mut filters = filters.to_vec();
        filters.sort_by(|a, b| a.0.cmp(&b.0));
        self.state.lock().unwrap().calls.push(Call::Subscribe(filters));
        ResponseCode::NoError
    }

    fn disconnect(&self) -> ResponseCode {
        self.state.lock().unwrap().calls.push(Call::Disconnect);
        let _ = self.link.send(TransportEvent::Closed);
        ResponseCode::NoError
    }
}

pub struct FakeDriver {
    rx: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Driver for FakeDriver {
    async fn poll(&mut self) -> TransportEvent {
        self.rx.recv().await.unwrap_or(TransportEvent::Closed)
    }

    async fn step(&mut self) -> Option<TransportEvent> {
        self.rx.try_recv().ok()
    }
}

/// Polls `condition` until it holds, panicking after two seconds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
