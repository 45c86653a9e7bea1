//! The `{ e, d }` frame envelope.
//!
//! One frame per WebSocket text message:
//!
//! ```text
//! { "e": "machineData", "d": { "uuid": "...", "cau": 12.5, ... } }
//! { "e": "heartbeat" }
//! { "e": "login", "d": { "auth_token": "..." } }
//! ```
//!
//! A missing `d` decodes as `null`. Encoding always writes both fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Event name.
    pub e: String,

    /// Event data; shape depends on `e`.
    #[serde(default)]
    pub d: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Frame {
            e: event.into(),
            d: data,
        }
    }
}

pub fn decode_frame(text: &str) -> Result<Frame, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

pub fn encode_frame(frame: &Frame) -> Result<String, ProtocolError> {
    serde_json::to_string(frame).map_err(ProtocolError::Encode)
}
