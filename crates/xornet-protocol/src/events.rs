//! Typed events carried by frames.
//!
//! - [`ServerEvent`]: what the backend pushes (closed set).
//! - [`ClientEvent`]: what the client sends.

use serde::{Deserialize, Serialize};
use serde_json::json;
use xornet_core::{EntityId, EventKind, Kinded, MachineDynamicData};

use crate::error::ProtocolError;
use crate::frame::{decode_frame, encode_frame, Frame};
use crate::wire_types::LOGIN_EVENT;

/// `machineData` payload: telemetry for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineUpdate {
    pub uuid: EntityId,

    #[serde(flatten)]
    pub data: MachineDynamicData,
}

/// A decoded server-to-client event.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Liveness signal. Any payload is ignored.
    Heartbeat,

    /// Dynamic telemetry for one machine.
    MachineData(MachineUpdate),
}

impl ServerEvent {
    /// Decode one socket text message.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::from_frame(decode_frame(text)?)
    }

    pub fn from_frame(frame: Frame) -> Result<Self, ProtocolError> {
        let kind =
            EventKind::from_name(&frame.e).ok_or_else(|| ProtocolError::UnknownEvent(frame.e))?;

        match kind {
            EventKind::Heartbeat => Ok(ServerEvent::Heartbeat),
            EventKind::MachineData => {
                let update: MachineUpdate =
                    serde_json::from_value(frame.d).map_err(|source| {
                        ProtocolError::InvalidPayload {
                            event: kind.as_str(),
                            source,
                        }
                    })?;

                if update.uuid.is_empty() {
                    return Err(ProtocolError::MissingEntityId(kind.as_str()));
                }
                Ok(ServerEvent::MachineData(update))
            }
        }
    }

    pub fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let d = match self {
            ServerEvent::Heartbeat => serde_json::Value::Null,
            ServerEvent::MachineData(update) => {
                serde_json::to_value(update).map_err(ProtocolError::Encode)?
            }
        };
        Ok(Frame::new(self.kind().as_str(), d))
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        encode_frame(&self.to_frame()?)
    }
}

impl Kinded for ServerEvent {
    fn kind(&self) -> EventKind {
        match self {
            ServerEvent::Heartbeat => EventKind::Heartbeat,
            ServerEvent::MachineData(_) => EventKind::MachineData,
        }
    }
}

/// A client-to-server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Authenticate the socket with the stored token.
    Login { auth_token: String },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Login { .. } => LOGIN_EVENT,
        }
    }

    pub fn to_frame(&self) -> Frame {
        match self {
            ClientEvent::Login { auth_token } => {
                Frame::new(self.name(), json!({ "auth_token": auth_token }))
            }
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        encode_frame(&self.to_frame())
    }
}
