//! Errors raised while decoding or encoding frames.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Not a JSON object with a string `e` field.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Well-formed frame with an event name this client does not know.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Known event whose `d` does not match the expected shape.
    #[error("invalid {event} payload: {source}")]
    InvalidPayload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Telemetry without an entity id.
    #[error("{0} payload has no uuid")]
    MissingEntityId(&'static str),

    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),
}
