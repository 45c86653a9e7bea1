//! Inbound event buffer.
//!
//! High-frequency push events (telemetry) are queued here and applied
//! on a fixed cadence, decoupling arrival rate from update cost.
//!
//! - no de-duplication: repeated updates for one id are all applied,
//!   in arrival order, intermediate snapshots included
//! - a drain cycle processes exactly the elements present when it
//!   starts; anything pushed later waits for the next cycle

use std::collections::VecDeque;
use std::time::Duration;

use crate::ids::EntityId;

/// Default drain cadence.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_millis(1000);

/// One queued update.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedEvent<P> {
    pub entity_id: EntityId,
    pub payload: P,
    /// Position in arrival order, starting at 0 for the buffer's life.
    pub arrival: u64,
}

#[derive(Debug)]
pub struct InboundBuffer<P> {
    queue: VecDeque<BufferedEvent<P>>,
    next_arrival: u64,
}

impl<P> Default for InboundBuffer<P> {
    fn default() -> Self {
        InboundBuffer {
            queue: VecDeque::new(),
            next_arrival: 0,
        }
    }
}

impl<P> InboundBuffer<P> {
    pub fn new() -> Self {
        InboundBuffer::default()
    }

    /// Append to the tail. Returns the arrival number.
    pub fn push(&mut self, entity_id: EntityId, payload: P) -> u64 {
        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.queue.push_back(BufferedEvent {
            entity_id,
            payload,
            arrival,
        });
        arrival
    }

    /// Run one drain cycle: pop from the head, one at a time, exactly as
    /// many elements as were queued when the cycle started, handing
    /// each to `apply`. Returns how many were applied.
    pub fn drain_cycle<F>(&mut self, mut apply: F) -> usize
    where
        F: FnMut(BufferedEvent<P>),
    {
        let observed = self.queue.len();
        let mut applied = 0;

        while applied < observed {
            match self.queue.pop_front() {
                Some(event) => apply(event),
                None => break,
            }
            applied += 1;
        }

        applied
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything queued (logout). Arrival numbering continues.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &BufferedEvent<P>> {
        self.queue.iter()
    }
}
