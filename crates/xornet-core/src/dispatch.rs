//! Typed publish/subscribe for decoded server events.
//!
//! Handlers are keyed by [`EventKind`], a closed set, instead of free
//! form event-name strings. Emitting calls every handler registered for
//! the event's kind, synchronously, in registration order, with the
//! same event reference. Kinds with no handler are dropped quietly.
//!
//! Handlers receive a mutable context `C` alongside the event so they
//! can update state owned by whoever drives the dispatch, without
//! shared mutability.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

/// Every server-to-client event the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Liveness ping; carries no payload.
    Heartbeat,
    /// Dynamic telemetry for one machine.
    MachineData,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Heartbeat, EventKind::MachineData];

    /// Wire name (`e` field).
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Heartbeat => "heartbeat",
            EventKind::MachineData => "machineData",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "heartbeat" => Some(EventKind::Heartbeat),
            "machineData" => Some(EventKind::MachineData),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that know their own kind.
pub trait Kinded {
    fn kind(&self) -> EventKind;
}

pub type Handler<C, E> = Box<dyn FnMut(&mut C, &E) + Send>;

pub struct EventDispatch<C, E> {
    handlers: HashMap<EventKind, Vec<Handler<C, E>>>,
}

impl<C, E> Default for EventDispatch<C, E> {
    fn default() -> Self {
        EventDispatch {
            handlers: HashMap::new(),
        }
    }
}

impl<C, E: Kinded> EventDispatch<C, E> {
    pub fn new() -> Self {
        EventDispatch::default()
    }

    /// Register `handler` for `kind`. Handlers run in registration order.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&mut C, &E) + Send + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Deliver `event` to every handler for its kind. Returns how many
    /// handlers ran.
    pub fn emit(&mut self, ctx: &mut C, event: &E) -> usize {
        let kind = event.kind();
        match self.handlers.get_mut(&kind) {
            Some(handlers) => {
                for handler in handlers.iter_mut() {
                    handler(ctx, event);
                }
                handlers.len()
            }
            None => {
                trace!("No handler for {}", kind);
                0
            }
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl<C, E> fmt::Debug for EventDispatch<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(kind, hs)| (*kind, hs.len()))
            .collect();
        f.debug_struct("EventDispatch").field("handlers", &counts).finish()
    }
}
