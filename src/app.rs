//! Application state management.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::decoder::DccDecoder;
use crate::export::{self, SessionInfo};
use crate::packet::PacketStore;
use crate::signal::{replay, LineEvent, LineFeeder, WaveformGenerator};
use crate::storage::Storage;

/// Distinct packets a monitoring session keeps before dropping new ones.
const APP_STORE_CAPACITY: usize = 64;

/// How many times the demo stream repeats its packet set.
const DEMO_REPEATS: usize = 10;

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Command input mode (after pressing :)
    Command,
    /// Capture file browser (load .tim for replay)
    LoadFileBrowser,
    /// Help overlay (centered box)
    Help,
}

/// Signal line state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    /// No playback running
    Idle,
    /// A capture or the demo stream is being played
    Playing,
}

impl std::fmt::Display for LineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineState::Idle => write!(f, "IDLE"),
            LineState::Playing => write!(f, "PLAY"),
        }
    }
}

/// Main application state
pub struct App {
    /// Current input mode
    pub input_mode: InputMode,
    /// Command input buffer
    pub command_input: String,
    /// Currently selected packet index in the store
    pub selected_packet: Option<usize>,
    /// Scroll offset for the packet table
    pub scroll_offset: usize,
    /// Signal line state
    pub line_state: LineState,
    /// Name of the stream being (or last) played
    pub source_name: Option<String>,
    /// Last error message
    pub last_error: Option<String>,
    /// Last status message
    pub status_message: Option<String>,
    /// Scroll offset for the help overlay (lines)
    pub overlay_scroll: usize,
    /// Quit flag set by :q
    pub quit_requested: bool,

    // -- Load browser state --
    /// .tim files found in the capture directory
    pub load_browser_entries: Vec<PathBuf>,
    /// Selected browser entry
    pub load_browser_selected: usize,
    /// Browser scroll offset
    pub load_browser_scroll: usize,

    /// Storage manager
    pub storage: Storage,
    /// The decode pipeline with its store-backed handler
    decoder: DccDecoder<PacketStore>,
    /// Playback thread handle, when a stream is running
    feeder: Option<LineFeeder>,
    /// Channel for line events
    line_event_rx: Receiver<LineEvent>,
    /// Sender for line events (cloned to the feeder thread)
    line_event_tx: Sender<LineEvent>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        let storage = Storage::new()?;
        let windows = storage.config.windows();
        tracing::info!(
            "decoder windows: short [{}, {}] µs, long [{}, {}] µs, pin {}",
            windows.short_min,
            windows.short_max,
            windows.long_min,
            windows.long_max,
            storage.config.pin
        );

        let decoder = DccDecoder::new(windows, PacketStore::with_capacity(APP_STORE_CAPACITY));
        let (line_event_tx, line_event_rx) = mpsc::channel();

        Ok(Self {
            input_mode: InputMode::Normal,
            command_input: String::new(),
            selected_packet: None,
            scroll_offset: 0,
            line_state: LineState::Idle,
            source_name: None,
            last_error: None,
            status_message: None,
            overlay_scroll: 0,
            quit_requested: false,
            load_browser_entries: Vec::new(),
            load_browser_selected: 0,
            load_browser_scroll: 0,
            storage,
            decoder,
            feeder: None,
            line_event_rx,
            line_event_tx,
        })
    }

    /// The observed-packet store.
    pub fn store(&self) -> &PacketStore {
        self.decoder.handler()
    }

    /// The decode pipeline, for the stats panel.
    pub fn decoder(&self) -> &DccDecoder<PacketStore> {
        &self.decoder
    }

    // ─── Per-tick pump ───────────────────────────────────────────────────

    /// Called once per UI tick: pick up feeder events, then drain every
    /// buffered edge delta through the decode pipeline.
    pub fn pump(&mut self) {
        self.process_line_events();
        self.decoder.poll();
        // Keep the selection inside the store if entries appeared.
        if let Some(idx) = self.selected_packet {
            if idx >= self.store().len() {
                self.selected_packet = None;
            }
        }
    }

    /// Drain pending events from the feeder thread.
    fn process_line_events(&mut self) {
        while let Ok(event) = self.line_event_rx.try_recv() {
            match event {
                LineEvent::PlaybackFinished { edges } => {
                    self.line_state = LineState::Idle;
                    self.feeder = None;
                    self.status_message = Some(format!("Playback finished ({} edges)", edges));
                }
                LineEvent::PlaybackStopped { edges } => {
                    self.line_state = LineState::Idle;
                    self.status_message = Some(format!("Playback stopped ({} edges)", edges));
                }
            }
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select the next packet in the table
    pub fn next_packet(&mut self) {
        let len = self.store().len();
        if len == 0 {
            return;
        }
        self.selected_packet = Some(match self.selected_packet {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        });
        self.ensure_selection_visible();
    }

    /// Select the previous packet in the table
    pub fn previous_packet(&mut self) {
        if self.store().is_empty() {
            return;
        }
        self.selected_packet = Some(match self.selected_packet {
            Some(i) => i.saturating_sub(1),
            None => 0,
        });
        self.ensure_selection_visible();
    }

    /// Ensure the selected packet is visible in the scroll view
    fn ensure_selection_visible(&mut self) {
        if let Some(selected) = self.selected_packet {
            let visible_rows = 15;
            if selected < self.scroll_offset {
                self.scroll_offset = selected;
            } else if selected >= self.scroll_offset + visible_rows {
                self.scroll_offset = selected.saturating_sub(visible_rows - 1);
            }
        }
    }

    // ─── Playback control ────────────────────────────────────────────────

    /// Start playing a delta stream, stopping any current playback first.
    fn start_playback(&mut self, deltas: Vec<u32>, name: &str) {
        self.stop_playback();
        self.last_error = None;
        let dilation = self.storage.config.replay_dilation;
        self.feeder = Some(LineFeeder::spawn(
            self.decoder.edge_buffer(),
            deltas,
            dilation,
            self.line_event_tx.clone(),
        ));
        self.line_state = LineState::Playing;
        self.source_name = Some(name.to_string());
        self.status_message = Some(format!("Playing {} ({}x dilation)", name, dilation));
    }

    /// Stop any running playback.
    pub fn stop_playback(&mut self) {
        if let Some(mut feeder) = self.feeder.take() {
            feeder.stop();
        }
        self.line_state = LineState::Idle;
    }

    /// Play the built-in demo stream: a handful of well-formed packets
    /// repeated the way a command station refreshes them.
    pub fn play_demo(&mut self) {
        let generator = WaveformGenerator::new();
        let deltas = generator.stream_deltas(
            &[
                &[0x03, 0x78, 0x7B], // loco 3, forward half speed
                &[0x03, 0x90, 0x93], // loco 3, headlight on
                &[0x81, 0xF1, 0x70], // accessory decoder 1
                &[0xFF, 0x00, 0xFF], // idle
            ],
            DEMO_REPEATS,
        );
        self.start_playback(deltas, "demo");
    }

    /// Load a capture file and start replaying it.
    pub fn load_capture_file(&mut self, path: &Path) {
        match replay::load_capture(path) {
            Ok(deltas) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.start_playback(deltas, &name);
            }
            Err(e) => {
                tracing::warn!("capture load failed: {}", e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Clear the store, counters, and any in-flight decode state.
    pub fn clear_session(&mut self) {
        self.stop_playback();
        self.decoder.reset_pipeline();
        self.decoder.handler_mut().clear();
        self.selected_packet = None;
        self.scroll_offset = 0;
        self.status_message = Some("Session cleared".to_string());
    }

    // ─── Load browser ────────────────────────────────────────────────────

    /// Scan the capture directory and open the file browser.
    pub fn open_load_browser(&mut self) {
        let dir = self.storage.capture_dir().clone();
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.extension()
                            .map(|ext| ext.eq_ignore_ascii_case("tim"))
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default();
        entries.sort();

        if entries.is_empty() {
            self.status_message = Some(format!("No .tim captures in {}", dir.display()));
            return;
        }
        self.load_browser_entries = entries;
        self.load_browser_selected = 0;
        self.load_browser_scroll = 0;
        self.input_mode = InputMode::LoadFileBrowser;
    }

    /// Close the browser without loading.
    pub fn close_load_browser(&mut self) {
        self.load_browser_entries.clear();
        self.input_mode = InputMode::Normal;
    }

    /// Replay the selected browser entry.
    pub fn load_browser_enter(&mut self) {
        if let Some(path) = self
            .load_browser_entries
            .get(self.load_browser_selected)
            .cloned()
        {
            self.load_capture_file(&path);
        }
        self.close_load_browser();
    }

    // ─── Export ──────────────────────────────────────────────────────────

    /// Export the observed-packet store as JSON. `name` is an optional
    /// filename (".json" appended if missing); default is timestamped.
    pub fn export_log(&mut self, name: Option<&str>) {
        if self.store().is_empty() {
            self.last_error = Some("Nothing to export — no packets decoded".to_string());
            return;
        }
        let filename = match name {
            Some(n) if n.ends_with(".json") => n.to_string(),
            Some(n) => format!("{}.json", n),
            None => export::default_filename(),
        };
        let path = self.storage.export_dir().join(&filename);
        let windows = self.decoder.windows();
        let session = SessionInfo {
            source: self
                .source_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            pin: self.storage.config.pin,
            short_window_us: [windows.short_min, windows.short_max],
            long_window_us: [windows.long_min, windows.long_max],
            distinct_packets: self.store().len(),
            total_received: self.store().total_received(),
            dropped_distinct: self.store().dropped(),
        };
        match export::export_packet_log(self.store(), session, &path) {
            Ok(()) => {
                self.status_message = Some(format!("Exported to {}", path.display()));
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!("export failed: {:#}", e);
                self.last_error = Some(format!("Export failed: {}", e));
            }
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Execute a `:` command.
    pub fn execute_command(&mut self, command: &str) -> Result<()> {
        let command = command.trim();
        let (verb, rest) = match command.split_once(char::is_whitespace) {
            Some((v, r)) => (v, r.trim()),
            None => (command, ""),
        };

        match verb {
            "" => {}
            "q" | "quit" => self.quit_requested = true,
            "clear" => self.clear_session(),
            "demo" => self.play_demo(),
            "stop" => {
                self.stop_playback();
                self.status_message = Some("Playback stopped".to_string());
            }
            "export" => {
                let name = if rest.is_empty() { None } else { Some(rest) };
                self.export_log(name);
            }
            "load" => {
                if rest.is_empty() {
                    self.open_load_browser();
                } else {
                    // Relative paths resolve against the capture directory.
                    let mut path = PathBuf::from(rest);
                    if path.is_relative() {
                        path = self.storage.capture_dir().join(path);
                    }
                    self.load_capture_file(&path);
                }
            }
            other => {
                self.last_error = Some(format!("Unknown command: {}", other));
            }
        }
        Ok(())
    }
}
