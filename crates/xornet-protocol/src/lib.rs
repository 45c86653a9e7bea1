//! xornet-protocol
//!
//! Wire-level encoding/decoding for the client socket.
//!
//! Every frame is a JSON object `{ "e": <event name>, "d": <data> }`.
//! This crate turns frames into typed events and back:
//!
//! - [`wire_types`] : event names, socket path, URL helpers
//! - [`frame`]      : the raw `{ e, d }` envelope
//! - [`events`]     : typed server/client events

pub mod wire_types;
pub mod frame;
pub mod events;
pub mod error;

pub use error::ProtocolError;
pub use frame::{decode_frame, encode_frame, Frame};
pub use events::{ClientEvent, MachineUpdate, ServerEvent};
pub use wire_types::{socket_url, SOCKET_PATH};
