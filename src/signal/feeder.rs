//! Producer thread standing in for the edge interrupt.
//!
//! Plays a delta stream into [`EdgeIrq`] against a virtual microsecond
//! clock: one leading edge, then one edge per delta (a capture of N
//! intervals came from N+1 transitions). Pacing sleeps are taken in
//! chunks and scaled by a time-dilation factor so the polling loop's
//! drain cadence sees a realistic ring occupancy; dilation 0 plays
//! flat-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::decoder::{EdgeBuffer, EdgeIrq, TimeDelta};

use super::LineEvent;

/// Edges delivered between pacing sleeps.
const CHUNK_EDGES: usize = 64;

/// Longest single sleep, so a stop request never waits long for the join.
const MAX_SLEEP_SLICE_US: u64 = 50_000;

/// Handle to a running playback thread.
pub struct LineFeeder {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LineFeeder {
    /// Start playing `deltas` into the given edge buffer. `dilation`
    /// multiplies real-line time (16 means 16x slower than the wire).
    pub fn spawn(
        buffer: Arc<EdgeBuffer>,
        deltas: Vec<TimeDelta>,
        dilation: u32,
        events: Sender<LineEvent>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            tracing::info!(
                "playback started: {} deltas, dilation {}x",
                deltas.len(),
                dilation
            );
            let mut irq = EdgeIrq::new(buffer);
            // Virtual clock; 0 is reserved for "no edge seen yet".
            let mut now_us: u32 = 1;
            irq.on_edge(now_us);
            let mut edges = 1usize;
            let mut chunk_us: u64 = 0;

            for &delta in &deltas {
                if stop_flag.load(Ordering::Relaxed) {
                    tracing::info!("playback stopped after {} edges", edges);
                    let _ = events.send(LineEvent::PlaybackStopped { edges });
                    return;
                }
                now_us = now_us.wrapping_add(delta);
                if now_us == 0 {
                    now_us = 1;
                }
                irq.on_edge(now_us);
                edges += 1;
                chunk_us += delta as u64;
                if edges % CHUNK_EDGES == 0 && dilation > 0 {
                    let mut remaining_us = chunk_us * dilation as u64;
                    while remaining_us > 0 && !stop_flag.load(Ordering::Relaxed) {
                        let slice = remaining_us.min(MAX_SLEEP_SLICE_US);
                        thread::sleep(Duration::from_micros(slice));
                        remaining_us -= slice;
                    }
                    chunk_us = 0;
                }
            }
            tracing::info!("playback finished: {} edges", edges);
            let _ = events.send(LineEvent::PlaybackFinished { edges });
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Whether the playback thread is still running.
    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Request a stop and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LineFeeder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_playback_delivers_all_edges() {
        let buffer = Arc::new(EdgeBuffer::new());
        let (tx, rx) = mpsc::channel();
        let deltas = vec![58u32; 100];

        let mut feeder = LineFeeder::spawn(Arc::clone(&buffer), deltas.clone(), 0, tx);
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(LineEvent::PlaybackFinished { edges }) => {
                assert_eq!(edges, deltas.len() + 1)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        feeder.stop();

        assert_eq!(buffer.edges_seen(), deltas.len() as u32 + 1);
        let mut drained = 0;
        while buffer.pop().is_some() {
            drained += 1;
        }
        assert_eq!(drained, deltas.len());
        assert!(!buffer.take_overflow());
    }

    #[test]
    fn test_stop_interrupts_playback() {
        let buffer = Arc::new(EdgeBuffer::new());
        let (tx, _rx) = mpsc::channel();
        // Large dilation keeps the thread sleeping so stop lands mid-stream.
        let mut feeder = LineFeeder::spawn(buffer, vec![10_000u32; 100_000], 1_000, tx);
        feeder.stop();
        assert!(!feeder.is_running());
    }
}
