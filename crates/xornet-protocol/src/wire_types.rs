//! Low-level wire constants.
//!
//! Inbound event names are owned by [`EventKind`] in `xornet-core`;
//! this module adds the outbound names and the socket location.

pub use xornet_core::EventKind;

/// Path of the client socket on the backend.
pub const SOCKET_PATH: &str = "/client";

/// Outbound event: authenticate the socket.
pub const LOGIN_EVENT: &str = "login";

/// Derive the socket URL from the REST base URL.
///
/// `https://host` becomes `wss://host/client`, `http://host` becomes
/// `ws://host/client`. URLs already using `ws(s)` only get the path.
pub fn socket_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');

    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };

    format!("{}{}", ws_base, SOCKET_PATH)
}
