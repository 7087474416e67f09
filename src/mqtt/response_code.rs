//! Broker and client response codes
//!
//! Closed set of result codes reported by the transport for connect, publish,
//! subscribe and disconnect requests. Every code carries a human readable
//! description; two codes are equal when their numeric values are equal.

use std::fmt;

use rumqttc::ConnectReturnCode;

use super::error::SessionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    NoError = 0,
    ConnRefused = 1,
    ConnRefusedIdRejected = 2,
    ConnRefusedServerUnavailable = 3,
    ConnRefusedBadUserPass = 4,
    ConnRefusedAuthError = 5,
    ConnLost = 6,
    LengthBytesTimeout = 7,
    PayloadTimeout = 8,
    ConnackTimeout = 9,
    SubackTimeout = 10,
    UnsubackTimeout = 11,
    PingrespTimeout = 12,
    MalformedLength = 13,
    ProblemPort = 14,
    AddrNotParsed = 15,
    MalformedPacket = 16,
    SubFailure = 17,
    PayloadDecodingFailure = 18,
    CompileDecoderFail = 19,
    PacketTypeNotSupported = 20,
    PubackTimeout = 21,
    PubrecTimeout = 22,
    PubcompTimeout = 23,
}

const ALL: [ResponseCode; 24] = [
    ResponseCode::NoError,
    ResponseCode::ConnRefused,
    ResponseCode::ConnRefusedIdRejected,
    ResponseCode::ConnRefusedServerUnavailable,
    ResponseCode::ConnRefusedBadUserPass,
    ResponseCode::ConnRefusedAuthError,
    ResponseCode::ConnLost,
    ResponseCode::LengthBytesTimeout,
    ResponseCode::PayloadTimeout,
    ResponseCode::ConnackTimeout,
    ResponseCode::SubackTimeout,
    ResponseCode::UnsubackTimeout,
    ResponseCode::PingrespTimeout,
    ResponseCode::MalformedLength,
    ResponseCode::ProblemPort,
    ResponseCode::AddrNotParsed,
    ResponseCode::MalformedPacket,
    ResponseCode::SubFailure,
    ResponseCode::PayloadDecodingFailure,
    ResponseCode::CompileDecoderFail,
    ResponseCode::PacketTypeNotSupported,
    ResponseCode::PubackTimeout,
    ResponseCode::PubrecTimeout,
    ResponseCode::PubcompTimeout,
];

impl ResponseCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ResponseCode::NoError
    }

    /// Decodes a numeric code, failing for anything outside the known set.
    pub fn decode(code: i32) -> Result<Self, SessionError> {
        usize::try_from(code)
            .ok()
            .and_then(|index| ALL.get(index).copied())
            .ok_or(SessionError::UnknownResponseCode(code))
    }

    pub fn description(self) -> &'static str {
        match self {
            ResponseCode::NoError => "No error",
            ResponseCode::ConnRefused => "Connection refused: unacceptable protocol version",
            ResponseCode::ConnRefusedIdRejected => "Connection refused: identifier rejected",
            ResponseCode::ConnRefusedServerUnavailable => "Connection refused: server unavailable",
            ResponseCode::ConnRefusedBadUserPass => "Connection refused: bad username or password",
            ResponseCode::ConnRefusedAuthError => "Connection refused: authorization error",
            ResponseCode::ConnLost => "Connection lost or bad",
            ResponseCode::LengthBytesTimeout => "Timeout waiting for length bytes",
            ResponseCode::PayloadTimeout => "Timeout waiting for payload",
            ResponseCode::ConnackTimeout => "Timeout waiting for CONNACK",
            ResponseCode::SubackTimeout => "Timeout waiting for SUBACK",
            ResponseCode::UnsubackTimeout => "Timeout waiting for UNSUBACK",
            ResponseCode::PingrespTimeout => "Timeout waiting for PINGRESP",
            ResponseCode::MalformedLength => "Malformed remaining length",
            ResponseCode::ProblemPort => "Problem with the underlying communication port",
            ResponseCode::AddrNotParsed => "Address could not be parsed",
            ResponseCode::MalformedPacket => "Malformed received MQTT packet",
            ResponseCode::SubFailure => "Subscription failure",
            ResponseCode::PayloadDecodingFailure => "Payload decoding failure",
            ResponseCode::CompileDecoderFail => "Failed to compile a decoder",
            ResponseCode::PacketTypeNotSupported => {
                "The received MQTT packet type is not supported on this client"
            }
            ResponseCode::PubackTimeout => "Timeout waiting for PUBACK",
            ResponseCode::PubrecTimeout => "Timeout waiting for PUBREC",
            ResponseCode::PubcompTimeout => "Timeout waiting for PUBCOMP",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ERR_CODE = {}. {}", self.code(), self.description())
    }
}

impl TryFrom<i32> for ResponseCode {
    type Error = SessionError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        ResponseCode::decode(code)
    }
}

impl From<ConnectReturnCode> for ResponseCode {
    fn from(code: ConnectReturnCode) -> Self {
        match code {
            ConnectReturnCode::Success => ResponseCode::NoError,
            ConnectReturnCode::RefusedProtocolVersion => ResponseCode::ConnRefused,
            ConnectReturnCode::BadClientId => ResponseCode::ConnRefusedIdRejected,
            ConnectReturnCode::ServiceUnavailable => ResponseCode::ConnRefusedServerUnavailable,
            ConnectReturnCode::BadUserNamePassword => ResponseCode::ConnRefusedBadUserPass,
            ConnectReturnCode::NotAuthorized => ResponseCode::ConnRefusedAuthError,
        }
    }
}
