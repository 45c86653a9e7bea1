//! xornet-core
//!
//! Pure live-state sync logic for the Xornet client:
//! - entity types (users, machines) and their ids
//! - keyed entity store with change notification
//! - request coalescer for on-demand entity fetches
//! - session state machine (generation-tagged)
//! - liveness watchdog
//! - inbound event buffer with fixed-cadence draining
//! - typed event dispatch
//!
//! Nothing in here opens a socket; the client crate drives these
//! pieces from a single loop.

pub mod ids;
pub mod entity;
pub mod store;
pub mod coalescer;
pub mod session;
pub mod watchdog;
pub mod buffer;
pub mod dispatch;
pub mod error;

pub use ids::EntityId;

pub use entity::{Entity, Gpu, Machine, MachineDynamicData, Ram, User};

pub use store::{EntityStore, SharedStore, StoreEvent};
pub use coalescer::{EntityFetcher, RequestCoalescer};
pub use session::{ConnectionState, Generation, SessionManager};
pub use watchdog::{Watchdog, WatchdogVerdict};
pub use buffer::{BufferedEvent, InboundBuffer};
pub use dispatch::{EventDispatch, EventKind, Kinded};
pub use error::FetchError;
