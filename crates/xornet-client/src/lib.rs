//! xornet-client
//!
//! The I/O side of the Xornet client:
//! - REST client and users service
//! - token persistence
//! - WebSocket transport and the sync driver that feeds the stores
//! - host bridge
//! - the [`XornetClient`] context tying it all together
//!
//! The `xornet` binary adds a terminal dashboard on top.

pub mod api;
pub mod bridge;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod format;
pub mod token;
pub mod transport;
pub mod users;

pub use api::{ApiClient, RestFetcher, UNSET_TOKEN};
pub use bridge::{BridgeEvent, ChannelBridge, LogBridge, UiBridge, CLEAR_PRESENCE};
pub use client::XornetClient;
pub use config::ClientConfig;
pub use driver::{SyncCommand, SyncDriver, SyncHandle, SyncSettings, SyncState, SyncStatus};
pub use error::{ApiError, ConfigError, TokenError};
pub use token::{FileTokenHolder, MemoryTokenHolder, TokenHolder};
pub use transport::{
    Connector, TransportEvent, TransportEventKind, TransportEventTx, TransportHandle, WsConnector,
};
pub use users::{LoginForm, SignupForm, UsersService};
