//! Session state machine.
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Live
//!       ^             |               |             |
//!       +-------------+---------------+-------------+  (close / error / supersede)
//! ```
//!
//! This is sans-I/O: the client driver opens transports and feeds
//! their events back in. Every connection attempt gets a fresh
//! [`Generation`]; events tagged with any other generation belong to a
//! superseded transport and are rejected.
//!
//! Reconnecting is never done here. A close only moves the session to
//! `Disconnected`; the watchdog (or an explicit call) decides when to
//! connect again.

use std::fmt;

use tracing::{debug, info};

/// Identifies one connection attempt. Strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Generation {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Authenticating,
    Live,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Live => "live",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the connection state and the current session generation.
#[derive(Debug, Default)]
pub struct SessionManager {
    state: ConnectionState,
    generation: Generation,
    ever_live: bool,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Generation of the current (or most recent) session.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// True once any session has reached `Live`.
    pub fn has_been_live(&self) -> bool {
        self.ever_live
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    /// Begin a new session.
    ///
    /// Only valid from `Disconnected`: returns the generation the caller
    /// must open a transport for. Anywhere else this is a no-op and
    /// returns `None`, so at most one transport exists at a time.
    pub fn connect(&mut self) -> Option<Generation> {
        if self.state != ConnectionState::Disconnected {
            debug!("connect() ignored while {}", self.state);
            return None;
        }

        self.generation = self.generation.next();
        self.state = ConnectionState::Connecting;
        info!("Session {} connecting", self.generation);
        Some(self.generation)
    }

    /// Transport for `generation` is open; the login frame goes out next.
    pub fn on_open(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) || self.state != ConnectionState::Connecting {
            return false;
        }

        self.state = ConnectionState::Authenticating;
        info!("Session {} open, authenticating", generation);
        true
    }

    /// A decoded frame arrived on `generation`. Returns whether it
    /// should be dispatched.
    pub fn on_frame(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        match self.state {
            ConnectionState::Authenticating => {
                self.state = ConnectionState::Live;
                self.ever_live = true;
                info!("Session {} live", generation);
                true
            }
            ConnectionState::Live => true,
            ConnectionState::Disconnected | ConnectionState::Connecting => false,
        }
    }

    /// Transport for `generation` closed or failed.
    pub fn on_closed(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) || self.state == ConnectionState::Disconnected {
            return false;
        }

        info!("Session {} closed (was {})", generation, self.state);
        self.state = ConnectionState::Disconnected;
        true
    }

    /// Abandon the current session without waiting for its transport to
    /// report anything. Bumps the generation so late events from the
    /// old transport are rejected.
    ///
    /// Returns the abandoned generation, or `None` if already
    /// `Disconnected`.
    pub fn supersede(&mut self) -> Option<Generation> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }

        let abandoned = self.generation;
        self.generation = self.generation.next();
        self.state = ConnectionState::Disconnected;
        info!("Session {} superseded", abandoned);
        Some(abandoned)
    }
}
