//! Liveness watchdog.
//!
//! Polled on a fixed interval by the driver. Detection latency is
//! bounded by the poll interval, not instantaneous.
//!
//! The reference point is the later of the last heartbeat and the last
//! reconnect attempt. Expiry resets the reference point, so a silent
//! peer produces exactly one `Expired` per threshold crossing rather
//! than one per poll.

use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default silence allowed before the peer is presumed dead.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// Not armed; nothing to watch.
    Idle,
    /// Heard from the peer recently enough.
    Healthy,
    /// Threshold crossed; reconnect now.
    Expired,
}

#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    armed: bool,
    last_heartbeat: Option<Instant>,
    reference: Option<Instant>,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Watchdog {
            timeout,
            armed: false,
            last_heartbeat: None,
            reference: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn last_heartbeat(&self) -> Option<Instant> {
        self.last_heartbeat
    }

    /// Start watching. The silence window starts at `now`.
    pub fn arm(&mut self, now: Instant) {
        self.armed = true;
        self.reference = Some(now);
    }

    /// Stop watching (logout / shutdown).
    pub fn disarm(&mut self) {
        self.armed = false;
        self.reference = None;
        self.last_heartbeat = None;
    }

    pub fn record_heartbeat(&mut self, now: Instant) {
        self.last_heartbeat = Some(now);
        self.reference = Some(now);
    }

    /// A reconnect attempt was made; restart the silence window.
    pub fn record_attempt(&mut self, now: Instant) {
        self.reference = Some(now);
    }

    /// Time since the later of the last heartbeat and the last attempt.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.reference.map(|at| now.saturating_duration_since(at))
    }

    pub fn poll(&mut self, now: Instant) -> WatchdogVerdict {
        if !self.armed {
            return WatchdogVerdict::Idle;
        }

        match self.elapsed(now) {
            Some(elapsed) if elapsed > self.timeout => {
                warn!(
                    "No heartbeat for {} ms (limit {} ms)",
                    elapsed.as_millis(),
                    self.timeout.as_millis()
                );
                self.reference = Some(now);
                WatchdogVerdict::Expired
            }
            _ => WatchdogVerdict::Healthy,
        }
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Watchdog::new(DEFAULT_HEARTBEAT_TIMEOUT)
    }
}
