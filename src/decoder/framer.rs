//! Preamble detection and byte framing.
//!
//! Every DCC packet opens with a run of at least ten "1" bits. The "0"
//! that ends the run doubles as the first packet start bit; after it, each
//! byte is eight data bits followed by one framing bit — "0" when another
//! byte follows, "1" when the packet is complete.

use crate::packet::Packet;

use super::halfbit::BitEvent;

/// Minimum run of ONE bits that constitutes a valid preamble.
pub const PREAMBLE_MIN_ONES: u8 = 10;

/// Framer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Counting consecutive ONE bits
    Preamble,
    /// Accumulating data bytes and framing bits
    Data,
}

/// Assembles the classified bit stream into packets.
pub struct PacketFramer {
    state: State,
    /// Consecutive ONE bits since the last ZERO; saturates, never wraps.
    preamble_ones: u8,
    /// The packet currently being assembled.
    packet: Packet,
    /// Data bits accumulated for the byte in progress (0..=8). At 8 the
    /// next bit is a framing bit, not data.
    bits_in_byte: u8,
}

impl PacketFramer {
    /// Create a framer in preamble search.
    pub fn new() -> Self {
        Self {
            state: State::Preamble,
            preamble_ones: 0,
            packet: Packet::new(),
            bits_in_byte: 0,
        }
    }

    /// Route one bit event. Returns the completed packet when this event
    /// closed one.
    pub fn feed(&mut self, event: BitEvent) -> Option<Packet> {
        match event {
            BitEvent::One => self.one(),
            BitEvent::Zero => self.zero(),
            BitEvent::Invalid => {
                self.invalid();
                None
            }
        }
    }

    /// A ONE bit arrived.
    pub fn one(&mut self) -> Option<Packet> {
        match self.state {
            State::Preamble => {
                self.preamble_ones = self.preamble_ones.saturating_add(1);
                None
            }
            State::Data => {
                if self.bits_in_byte < 8 {
                    self.packet.add_bit(true);
                    self.bits_in_byte += 1;
                    None
                } else {
                    // Framing bit 1: packet complete.
                    let finished = self.packet;
                    self.reset();
                    Some(finished)
                }
            }
        }
    }

    /// A ZERO bit arrived.
    pub fn zero(&mut self) -> Option<Packet> {
        match self.state {
            State::Preamble => {
                let run = self.preamble_ones;
                // A zero always restarts preamble counting, valid or not.
                self.preamble_ones = 0;
                if run >= PREAMBLE_MIN_ONES {
                    self.state = State::Data;
                    self.packet.clear();
                    self.bits_in_byte = 0;
                }
                None
            }
            State::Data => {
                if self.bits_in_byte < 8 {
                    self.packet.add_bit(false);
                    self.bits_in_byte += 1;
                } else if self.packet.is_full() {
                    // Framing bit 0 with no byte capacity left: the line
                    // is carrying more than this decoder models. Treat as
                    // a framing error.
                    self.invalid();
                } else {
                    // Framing bit 0: another byte follows.
                    self.bits_in_byte = 0;
                }
                None
            }
        }
    }

    /// The classifier lost synchronization: drop everything and return to
    /// preamble search. Safe to call in any state, any number of times.
    pub fn invalid(&mut self) {
        self.reset();
    }

    /// Unconditional reset to preamble search.
    pub fn reset(&mut self) {
        self.state = State::Preamble;
        self.preamble_ones = 0;
        self.packet.clear();
        self.bits_in_byte = 0;
    }

    /// Whether the framer is mid-packet.
    pub fn in_data(&self) -> bool {
        self.state == State::Data
    }
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_bits(framer: &mut PacketFramer, bits: &[u8]) -> Vec<Packet> {
        let mut completed = Vec::new();
        for &bit in bits {
            let event = if bit != 0 { BitEvent::One } else { BitEvent::Zero };
            if let Some(p) = framer.feed(event) {
                completed.push(p);
            }
        }
        completed
    }

    #[test]
    fn test_short_preamble_rejected() {
        let mut framer = PacketFramer::new();
        feed_bits(&mut framer, &[1, 1, 1, 1, 1, 1, 1, 1, 1, 0]);
        assert!(!framer.in_data());
    }

    #[test]
    fn test_minimum_preamble_accepted() {
        let mut framer = PacketFramer::new();
        feed_bits(&mut framer, &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0]);
        assert!(framer.in_data());
    }

    #[test]
    fn test_zero_restarts_preamble_count() {
        let mut framer = PacketFramer::new();
        // Two short runs don't add up to a valid preamble.
        feed_bits(&mut framer, &[1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 0]);
        assert!(!framer.in_data());
    }

    #[test]
    fn test_two_byte_packet() {
        let mut framer = PacketFramer::new();
        let mut bits = vec![1; 10];
        bits.push(0);
        bits.extend([1, 0, 1, 0, 1, 0, 1, 0]); // 0xAA
        bits.push(0);
        bits.extend([1, 1, 1, 0, 1, 0, 1, 0]); // 0xEA
        bits.push(1);
        let completed = feed_bits(&mut framer, &bits);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].data(), &[0xAA, 0xEA]);
        assert_eq!(completed[0].bit_count(), 16);
        // Handoff returned the framer to preamble search.
        assert!(!framer.in_data());
    }

    #[test]
    fn test_back_to_back_packets() {
        let mut framer = PacketFramer::new();
        let mut bits = Vec::new();
        for _ in 0..2 {
            bits.extend(std::iter::repeat(1).take(12));
            bits.push(0);
            bits.extend([0, 0, 0, 0, 0, 0, 1, 1]); // 0x03
            bits.push(0);
            bits.extend([0, 0, 0, 0, 0, 0, 1, 1]); // 0x03
            bits.push(1);
        }
        let completed = feed_bits(&mut framer, &bits);
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0], completed[1]);
    }

    #[test]
    fn seventh_byte_resets_to_preamble() {
        let mut framer = PacketFramer::new();
        let mut bits = vec![1; 10];
        bits.push(0);
        for _ in 0..6 {
            bits.extend([0, 1, 0, 1, 0, 1, 0, 1]);
            bits.push(0); // continuation after every byte, incl. the sixth
        }
        let completed = feed_bits(&mut framer, &bits);
        assert!(completed.is_empty());
        assert!(!framer.in_data());
        // And the framer still decodes a normal packet afterwards.
        let mut bits = vec![1; 10];
        bits.push(0);
        bits.extend([1, 1, 1, 1, 1, 1, 1, 1]); // 0xFF
        bits.push(1);
        let completed = feed_bits(&mut framer, &bits);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].data(), &[0xFF]);
    }

    #[test]
    fn test_invalid_is_idempotent() {
        let mut framer = PacketFramer::new();
        // From every phase: preamble, mid-byte, at a framing bit.
        feed_bits(&mut framer, &[1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 0, 1]);
        for _ in 0..3 {
            framer.invalid();
            assert!(!framer.in_data());
        }
        // Preamble counter restarted from zero: nine ones are not enough.
        feed_bits(&mut framer, &[1, 1, 1, 1, 1, 1, 1, 1, 1, 0]);
        assert!(!framer.in_data());
    }

    #[test]
    fn test_preamble_counter_saturates() {
        let mut framer = PacketFramer::new();
        for _ in 0..1000 {
            framer.one();
        }
        framer.zero();
        assert!(framer.in_data());
    }
}
