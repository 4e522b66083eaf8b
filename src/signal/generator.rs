//! DCC waveform synthesis.
//!
//! Builds edge-delta streams the decode pipeline can consume: every bit is
//! two equal half-pulses, a packet is a preamble of ONE bits, then per
//! byte a ZERO start bit and eight data bits MSB-first, closed by a ONE.
//! Used by the demo playback action and by tests.

use crate::decoder::TimeDelta;

/// Nominal half-pulse period of a "1" bit.
pub const ONE_HALF_US: TimeDelta = 58;

/// Nominal half-pulse period of a "0" bit.
pub const ZERO_HALF_US: TimeDelta = 100;

/// Preamble length command stations typically transmit (minimum is 10).
pub const PREAMBLE_ONES: usize = 14;

/// Generator for DCC edge-timing streams.
pub struct WaveformGenerator {
    /// Half-pulse period used for "1" bits
    pub one_half_us: TimeDelta,
    /// Half-pulse period used for "0" bits
    pub zero_half_us: TimeDelta,
}

impl WaveformGenerator {
    /// Create a generator with the nominal DCC periods.
    pub fn new() -> Self {
        Self {
            one_half_us: ONE_HALF_US,
            zero_half_us: ZERO_HALF_US,
        }
    }

    /// Create a generator with explicit half-pulse periods, for producing
    /// off-nominal or deliberately invalid streams.
    #[allow(dead_code)] // exercised by pipeline tests
    pub fn with_half_periods(one_half_us: TimeDelta, zero_half_us: TimeDelta) -> Self {
        Self {
            one_half_us,
            zero_half_us,
        }
    }

    /// Append the two half-pulses of one bit.
    pub fn push_bit(&self, out: &mut Vec<TimeDelta>, bit: bool) {
        let half = if bit { self.one_half_us } else { self.zero_half_us };
        out.push(half);
        out.push(half);
    }

    /// A preamble of `ones` ONE bits.
    pub fn preamble_deltas(&self, ones: usize) -> Vec<TimeDelta> {
        let mut out = Vec::with_capacity(ones * 2);
        for _ in 0..ones {
            self.push_bit(&mut out, true);
        }
        out
    }

    /// A complete packet: preamble, per-byte start bit and data bits,
    /// final ONE.
    pub fn packet_deltas(&self, bytes: &[u8]) -> Vec<TimeDelta> {
        let mut out = self.preamble_deltas(PREAMBLE_ONES);
        for &byte in bytes {
            self.push_bit(&mut out, false);
            for bit in (0..8).rev() {
                self.push_bit(&mut out, (byte >> bit) & 1 != 0);
            }
        }
        self.push_bit(&mut out, true);
        out
    }

    /// Concatenate a stream repeating each packet `repeats` times, the way
    /// a command station refreshes its packets continuously.
    pub fn stream_deltas(&self, packets: &[&[u8]], repeats: usize) -> Vec<TimeDelta> {
        let mut out = Vec::new();
        for _ in 0..repeats {
            for bytes in packets {
                out.extend(self.packet_deltas(bytes));
            }
        }
        out
    }
}

impl Default for WaveformGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_delta_count() {
        let generator = WaveformGenerator::new();
        let deltas = generator.packet_deltas(&[0xAA, 0xEA]);
        // (14 preamble + 2 * (1 + 8) + 1 final) bits, two deltas per bit
        assert_eq!(deltas.len(), (PREAMBLE_ONES + 2 * 9 + 1) * 2);
        assert_eq!(deltas[0], ONE_HALF_US);
        // First delta after the preamble is the start bit of byte 0.
        assert_eq!(deltas[PREAMBLE_ONES * 2], ZERO_HALF_US);
        assert_eq!(*deltas.last().unwrap(), ONE_HALF_US);
    }

    #[test]
    fn test_stream_repeats() {
        let generator = WaveformGenerator::new();
        let one = generator.packet_deltas(&[0xFF, 0x00, 0xFF]);
        let stream = generator.stream_deltas(&[&[0xFF, 0x00, 0xFF]], 5);
        assert_eq!(stream.len(), one.len() * 5);
    }
}
