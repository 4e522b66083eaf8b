//! Shared edge buffer and the interrupt-side entry point.
//!
//! Two execution contexts touch the timing queue: the producer (on
//! hardware, a CHANGE interrupt on the input pin; here, the feeder thread
//! standing in for it) and the polling drain loop. The [`TimingRing`] is
//! the only state they share. [`EdgeBuffer`] wraps it in the critical
//! section both sides must take — the mutex is held only for the O(1)
//! buffer operation itself, never around classifier or framer work, so
//! the producer is excluded for the minimum possible window.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::ring::{TimeDelta, TimingRing};

/// The timing queue plus the producer-side edge counter.
pub struct EdgeBuffer {
    ring: Mutex<TimingRing>,
    /// Edge callbacks observed, including the first (unpushed) one.
    /// Readable from the consumer side without taking the lock.
    edges_seen: AtomicU32,
}

impl EdgeBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            ring: Mutex::new(TimingRing::new()),
            edges_seen: AtomicU32::new(0),
        }
    }

    // A poisoned lock only means the other context panicked while holding
    // it; the ring's cursors are always internally consistent, so keep
    // going with the inner value.
    fn ring(&self) -> MutexGuard<'_, TimingRing> {
        match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Producer side: append one delta.
    pub fn push(&self, delta: TimeDelta) {
        self.ring().add(delta);
    }

    /// Consumer side: pop the oldest delta, if any.
    pub fn pop(&self) -> Option<TimeDelta> {
        self.ring().get()
    }

    /// Consumer side: return-and-clear the latched overflow flag.
    pub fn take_overflow(&self) -> bool {
        self.ring().take_overflow()
    }

    /// Count one edge callback.
    pub fn count_edge(&self) {
        self.edges_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Edge callbacks observed so far.
    pub fn edges_seen(&self) -> u32 {
        self.edges_seen.load(Ordering::Relaxed)
    }

    /// Drop buffered deltas and zero the edge counter.
    pub fn clear(&self) {
        let mut ring = self.ring();
        ring.clear();
        ring.take_overflow();
        drop(ring);
        self.edges_seen.store(0, Ordering::Relaxed);
    }
}

impl Default for EdgeBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// The edge-interrupt entry point.
///
/// On target hardware this is the body registered against the CHANGE
/// interrupt vector for the input pin: read the clock, compute the delta
/// from the previous edge, push it. Bounded time, no locks beyond the
/// buffer's own critical section, no allocation — every other piece of
/// decode logic is deferred to the polling context.
///
/// Timestamp 0 is reserved as "no edge seen yet", so the very first edge
/// only records its timestamp and pushes nothing.
pub struct EdgeIrq {
    buffer: Arc<EdgeBuffer>,
    last_edge_us: u32,
}

impl EdgeIrq {
    /// Create an entry point feeding the given buffer.
    pub fn new(buffer: Arc<EdgeBuffer>) -> Self {
        Self {
            buffer,
            last_edge_us: 0,
        }
    }

    /// Called once per edge transition with the current time in µs.
    pub fn on_edge(&mut self, now_us: u32) {
        self.buffer.count_edge();
        if self.last_edge_us == 0 {
            self.last_edge_us = now_us;
            return;
        }
        let delta = now_us.wrapping_sub(self.last_edge_us);
        self.last_edge_us = now_us;
        self.buffer.push(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_edge_pushes_nothing() {
        let buffer = Arc::new(EdgeBuffer::new());
        let mut irq = EdgeIrq::new(buffer.clone());
        irq.on_edge(1000);
        assert_eq!(buffer.pop(), None);
        assert_eq!(buffer.edges_seen(), 1);
    }

    #[test]
    fn test_deltas_from_timestamps() {
        let buffer = Arc::new(EdgeBuffer::new());
        let mut irq = EdgeIrq::new(buffer.clone());
        irq.on_edge(1000);
        irq.on_edge(1058);
        irq.on_edge(1158);
        assert_eq!(buffer.pop(), Some(58));
        assert_eq!(buffer.pop(), Some(100));
        assert_eq!(buffer.pop(), None);
        assert_eq!(buffer.edges_seen(), 3);
    }

    #[test]
    fn test_clock_wraparound() {
        let buffer = Arc::new(EdgeBuffer::new());
        let mut irq = EdgeIrq::new(buffer.clone());
        irq.on_edge(u32::MAX - 20);
        irq.on_edge(37);
        assert_eq!(buffer.pop(), Some(58));
    }

    #[test]
    fn test_clear_resets_counter_and_contents() {
        let buffer = Arc::new(EdgeBuffer::new());
        let mut irq = EdgeIrq::new(buffer.clone());
        irq.on_edge(100);
        irq.on_edge(200);
        buffer.clear();
        assert_eq!(buffer.pop(), None);
        assert_eq!(buffer.edges_seen(), 0);
    }
}
