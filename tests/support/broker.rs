use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use smartdoorbell::mqtt::BrokerAddress;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// CONNACK, session not present, accepted
const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

/// Minimal MQTT 3.1.1 broker on a loopback port
///
/// Answers every CONNECT with a CONNACK after `connack_delay`. The first
/// `drop_first` connections are closed right after the CONNACK; later ones
/// stay open and ignore everything the client sends.
pub struct LoopbackBroker {
    port: u16,
    accepts: Arc<AtomicUsize>,
}

impl LoopbackBroker {
    pub async fn start(connack_delay: Duration, drop_first: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepts = Arc::new(AtomicUsize::new(0));
        let counter = accepts.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let nth = counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    if socket.read(&mut buf).await.unwrap_or(0) == 0 {
                        return;
                    }
                    tokio::time::sleep(connack_delay).await;
                    if socket.write_all(&CONNACK).await.is_err() || nth < drop_first {
                        return;
                    }
                    while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
                });
            }
        });

        Self { port, accepts }
    }

    pub fn address(&self) -> BrokerAddress {
        BrokerAddress::new("mqtt", "127.0.0.1", self.port)
    }

    /// TCP connections accepted so far
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}
