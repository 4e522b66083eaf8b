//! Packet-log export — JSON snapshot of the observed-packet store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::packet::{PacketStore, StoredPacket};

/// Top-level packet-log file structure
#[derive(Serialize, Deserialize)]
pub struct LogFile {
    pub version: String,
    pub format: String,
    pub exported_at: DateTime<Utc>,
    pub session: SessionInfo,
    pub packets: Vec<LogEntry>,
}

/// Where the decoded packets came from and how they were classified
#[derive(Serialize, Deserialize)]
pub struct SessionInfo {
    /// Capture file name or "demo" for the synthesized waveform
    pub source: String,
    /// Input pin from configuration (target hardware)
    pub pin: u8,
    /// [min, max] µs accepted as a short half-pulse
    pub short_window_us: [u32; 2],
    /// [min, max] µs accepted as a long half-pulse
    pub long_window_us: [u32; 2],
    /// Distinct packets held in the store
    pub distinct_packets: usize,
    /// Total receives across all stored packets
    pub total_received: u64,
    /// Distinct packets dropped after the store filled
    pub dropped_distinct: u32,
}

/// One observed packet in the log
#[derive(Serialize, Deserialize)]
pub struct LogEntry {
    pub bytes_hex: String,
    pub bit_count: usize,
    pub kind: String,
    pub checksum: String,
    pub times_received: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl LogEntry {
    fn from_stored(entry: &StoredPacket) -> Self {
        Self {
            bytes_hex: entry.packet.data_hex(),
            bit_count: entry.packet.bit_count(),
            kind: entry.packet.kind().to_string(),
            checksum: entry.packet.checksum_status().to_string(),
            times_received: entry.times_received,
            first_seen: entry.first_seen,
            last_seen: entry.last_seen,
        }
    }
}

/// Default export filename, timestamped to avoid collisions.
pub fn default_filename() -> String {
    format!("packets-{}.json", Utc::now().format("%Y%m%d-%H%M%S"))
}

/// Write the store as a pretty-printed JSON packet log.
pub fn export_packet_log(store: &PacketStore, session: SessionInfo, path: &Path) -> Result<()> {
    let log = LogFile {
        version: "1.0".to_string(),
        format: "dccmon-packets".to_string(),
        exported_at: Utc::now(),
        session,
        packets: store.entries().iter().map(LogEntry::from_stored).collect(),
    };

    let json = serde_json::to_string_pretty(&log).context("Failed to serialize packet log")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write packet log to {:?}", path))?;
    tracing::info!("Exported {} packet(s) to {:?}", store.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    #[test]
    fn test_export_round_trips_as_json() {
        let mut store = PacketStore::new();
        store.record(&Packet::from_bytes(&[0x03, 0x5A, 0x59]));
        store.record(&Packet::from_bytes(&[0x03, 0x5A, 0x59]));
        store.record(&Packet::from_bytes(&[0xFF, 0x00, 0xFF]));

        let path = std::env::temp_dir().join(format!(
            "dccmon-export-{}.json",
            std::process::id()
        ));
        let session = SessionInfo {
            source: "unit.tim".to_string(),
            pin: 2,
            short_window_us: [52, 64],
            long_window_us: [90, 119],
            distinct_packets: store.len(),
            total_received: store.total_received(),
            dropped_distinct: store.dropped(),
        };
        export_packet_log(&store, session, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: LogFile = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.format, "dccmon-packets");
        assert_eq!(parsed.packets.len(), 2);
        assert_eq!(parsed.packets[0].bytes_hex, "03 5A 59");
        assert_eq!(parsed.packets[0].times_received, 2);
        assert_eq!(parsed.session.total_received, 3);
        std::fs::remove_file(&path).ok();
    }
}
