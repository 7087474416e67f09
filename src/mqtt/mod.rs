//! # MQTT Session Module
//!
//! Client-side MQTT plumbing for the doorbell: one [`Session`] per broker
//! connection, with a fixed set of subscribed topics, a selectable loop
//! strategy and a single reconnect cycle whenever a publish is rejected.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── address.rs        - Broker address, credentials and TLS material
//! ├── response_code.rs  - Numeric result codes shared by every layer
//! ├── error.rs          - SessionError
//! ├── topic.rs          - Topic, callbacks and the frozen registry
//! ├── dispatch.rs       - Routes inbound messages to topic callbacks
//! ├── status.rs         - Observable connection state
//! ├── transport.rs      - Seam between session and protocol engine
//! ├── rumqtt.rs         - rumqttc implementation of that seam
//! └── session.rs        - Lifecycle, loop strategies and recovery
//! ```
//!
//! ## Design Notes
//!
//! - The session is built inert and only touches the network in `enter`
//! - Inbound messages are matched by exact topic name, no wildcards
//! - A failed publish is never retried, the payload is dropped after one
//!   disconnect and reconnect request
//! - Connection health is published on a `watch` channel for observers

pub mod address;
pub mod dispatch;
pub mod error;
pub mod response_code;
pub mod rumqtt;
pub mod session;
pub mod status;
pub mod topic;
pub mod transport;

pub use address::BrokerAddress;
pub use error::SessionError;
pub use response_code::ResponseCode;
pub use rumqtt::{RumqttSettings, RumqttTransport};
pub use session::{LoopMode, Session, SessionBuilder};
pub use status::{ConnectionState, SessionStatus};
pub use topic::{DispatchMode, Topic, TopicRegistry};
pub use transport::{ConnectOptions, Driver, Requester, Transport, TransportEvent};
