use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Errors raised by the bus layer
#[derive(Debug)]
pub enum BusError {
    /// Bus unreachable or authentication failure. Fatal at startup; after
    /// startup the transport's own reconnection policy takes over.
    Connection(String),
    /// Payload bytes are not valid JSON for the expected shape. The message
    /// is dropped and processing continues.
    MalformedPayload(String),
    /// A value could not be serialized into a payload.
    Encode(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Connection(reason) => write!(f, "bus connection failed: {}", reason),
            BusError::MalformedPayload(reason) => write!(f, "malformed payload: {}", reason),
            BusError::Encode(reason) => write!(f, "payload encoding failed: {}", reason),
        }
    }
}

impl std::error::Error for BusError {}

/// The (topic, payload) unit of transport
///
/// Constructed per message and immutable. The payload is always a byte
/// sequence; a decode attempt on bytes that are not valid JSON for the
/// requested type fails with `BusError::MalformedPayload` rather than
/// silently no-opping.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Envelope {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Serialize a structured value into an envelope for `topic`
    ///
    /// JSON round-trips every value shape the pipeline uses: strings,
    /// floats, integers, booleans, lists, and nested string-keyed mappings.
    pub fn encode<T: Serialize>(topic: &str, value: &T) -> Result<Self, BusError> {
        let payload = serde_json::to_vec(value).map_err(|e| BusError::Encode(e.to_string()))?;
        Ok(Self {
            topic: topic.to_string(),
            payload,
        })
    }

    /// Deserialize the payload back into a structured value
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| BusError::MalformedPayload(e.to_string()))
    }
}
