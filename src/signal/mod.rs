//! Signal source layer: everything that stands in for the physical DCC
//! input line.
//!
//! On target hardware the decode core is fed by a CHANGE interrupt on a
//! digital input pin. Here the producer context is a background thread
//! ([`feeder::LineFeeder`]) playing edge-timing streams into the same
//! entry point — either a `.tim` capture recorded on a microcontroller
//! ([`replay`]) or a synthesized waveform ([`generator`]).

pub mod feeder;
pub mod generator;
pub mod replay;

pub use feeder::LineFeeder;
pub use generator::WaveformGenerator;

/// Events from the feeder thread to the application loop.
#[derive(Debug)]
pub enum LineEvent {
    /// Playback ran to the end of the stream
    PlaybackFinished {
        /// Edge callbacks delivered
        edges: usize,
    },
    /// Playback was stopped early
    PlaybackStopped {
        /// Edge callbacks delivered before the stop
        edges: usize,
    },
}
