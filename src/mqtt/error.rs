use thiserror::Error;

use super::response_code::ResponseCode;

/// Errors raised or logged by the MQTT session layer
///
/// Only the setup-time variants (`AddressParse`, `AddressResolution`,
/// `Transport`) are ever returned to callers. The remaining variants describe
/// conditions after the handshake; the session logs them and carries on.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The broker URL could not be parsed
    #[error("Invalid broker address '{address}': {reason}")]
    AddressParse { address: String, reason: String },

    /// Host and port did not resolve to any socket address
    #[error("Could not resolve broker {host}:{port}: {source}")]
    AddressResolution {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Socket or TLS setup failed before the connect request was sent
    #[error("Transport setup failed: {0}")]
    Transport(String),

    #[error("Connection refused by broker: {0}")]
    ConnectRefused(ResponseCode),

    #[error("Unexpected disconnection: {0}")]
    UnexpectedDisconnection(ResponseCode),

    #[error("Failed to publish to topic '{topic}': {code}")]
    PublishFailure { topic: String, code: ResponseCode },

    #[error("Broker rejected {rejected} subscription filter(s)")]
    SubscriptionFailure { rejected: usize },

    #[error("Unknown response code: {0}")]
    UnknownResponseCode(i32),
}

impl SessionError {
    pub(crate) fn address_parse(address: &str, reason: impl ToString) -> Self {
        SessionError::AddressParse {
            address: address.to_owned(),
            reason: reason.to_string(),
        }
    }
}
