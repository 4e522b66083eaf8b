//! Storage management for configuration, captures, and exports.
//!
//! All application data lives under `~/.config/dccmon/`:
//!
//! ```text
//! ~/.config/dccmon/
//!   config.ini          — User configuration
//!   captures/           — .tim edge-timing captures offered for replay
//!   exports/            — Exported packet logs (.json)
//! ```
//!
//! Decoded packets are **in-memory only** and are discarded when dccmon
//! exits. Only explicitly exported packet logs persist between runs.

use anyhow::{Context, Result};
use configparser::ini::Ini;
use std::fs;
use std::path::PathBuf;

use crate::decoder::PulseWindows;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Application configuration loaded from `~/.config/dccmon/config.ini`
#[derive(Debug, Clone)]
pub struct Config {
    // [general]
    /// Directory scanned for .tim captures to replay
    pub capture_directory: PathBuf,
    /// Directory for exported packet logs (.json)
    pub export_directory: PathBuf,
    /// Playback time dilation: 1 = real line rate, higher = slower
    pub replay_dilation: u32,

    // [input]
    /// Digital input pin the edge interrupt is attached to on the target
    pub pin: u8,

    // [timing]
    /// Shortest accepted short half-pulse in µs
    pub short_min_us: u32,
    /// Longest accepted short half-pulse in µs
    pub short_max_us: u32,
    /// Shortest accepted long half-pulse in µs
    pub long_min_us: u32,
    /// Longest accepted long half-pulse in µs
    pub long_max_us: u32,
}

impl Config {
    /// Build the default config, using the given config_dir as the base.
    /// This keeps everything under `~/.config/dccmon/` by default.
    fn default_for(config_dir: &PathBuf) -> Self {
        Self {
            capture_directory: config_dir.join("captures"),
            export_directory: config_dir.join("exports"),
            replay_dilation: 16,
            pin: 2,
            short_min_us: PulseWindows::DCC.short_min,
            short_max_us: PulseWindows::DCC.short_max,
            long_min_us: PulseWindows::DCC.long_min,
            long_max_us: PulseWindows::DCC.long_max,
        }
    }

    /// Load config from an INI file, falling back to defaults for missing keys.
    fn load_from_ini(path: &std::path::Path, config_dir: &PathBuf) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let defaults = Config::default_for(config_dir);

        let capture_directory = ini
            .get("general", "capture_directory")
            .map(|s| expand_tilde(&s))
            .unwrap_or(defaults.capture_directory);

        let export_directory = ini
            .get("general", "export_directory")
            .map(|s| expand_tilde(&s))
            .unwrap_or(defaults.export_directory);

        let replay_dilation = ini
            .getuint("general", "replay_dilation")
            .ok()
            .flatten()
            .map(|v| v as u32)
            .unwrap_or(defaults.replay_dilation);

        let pin = ini
            .getuint("input", "pin")
            .ok()
            .flatten()
            .map(|v| v as u8)
            .unwrap_or(defaults.pin);

        let short_min_us = ini
            .getuint("timing", "short_min_us")
            .ok()
            .flatten()
            .map(|v| v as u32)
            .unwrap_or(defaults.short_min_us);

        let short_max_us = ini
            .getuint("timing", "short_max_us")
            .ok()
            .flatten()
            .map(|v| v as u32)
            .unwrap_or(defaults.short_max_us);

        let long_min_us = ini
            .getuint("timing", "long_min_us")
            .ok()
            .flatten()
            .map(|v| v as u32)
            .unwrap_or(defaults.long_min_us);

        let long_max_us = ini
            .getuint("timing", "long_max_us")
            .ok()
            .flatten()
            .map(|v| v as u32)
            .unwrap_or(defaults.long_max_us);

        Ok(Self {
            capture_directory,
            export_directory,
            replay_dilation,
            pin,
            short_min_us,
            short_max_us,
            long_min_us,
            long_max_us,
        })
    }

    /// Save config to an INI-style file with comments explaining each field.
    fn save_to_ini(&self, path: &std::path::Path) -> Result<()> {
        let capture_str = self.capture_directory.to_string_lossy();
        let export_str = self.export_directory.to_string_lossy();

        let content = format!(
            r#"; dccmon — DCC Signal Monitor configuration
; Location: {path}
;
; Edit this file to change default settings.
; Lines starting with ; or # are comments.

[general]
; Directory scanned for .tim edge-timing captures to replay.
; Supports ~ for home directory.
capture_directory = {capture_dir}

; Directory where exported packet logs (.json) are saved.
; Supports ~ for home directory.
export_directory = {export_dir}

; Playback time dilation. 1 plays captures at the real line rate,
; higher values slow them down so the screen keeps up. At 1, coarse
; polling will exercise the timing-buffer overflow recovery path.
replay_dilation = {dilation}

[input]
; Digital input pin the edge interrupt is attached to on the target
; hardware. Recorded in exports; not used during replay.
pin = {pin}

[timing]
; Half-pulse acceptance windows in microseconds. A half-pulse inside
; the short window contributes to a "1" bit (nominal 58), one inside
; the long window to a "0" bit (nominal 100). Anything else is noise.
; The windows must not overlap; invalid values fall back to defaults.
short_min_us = {short_min}
short_max_us = {short_max}
long_min_us = {long_min}
long_max_us = {long_max}
"#,
            path = path.display(),
            capture_dir = capture_str,
            export_dir = export_str,
            dilation = self.replay_dilation,
            pin = self.pin,
            short_min = self.short_min_us,
            short_max = self.short_max_us,
            long_min = self.long_min_us,
            long_max = self.long_max_us,
        );

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// The configured half-pulse windows, validated. Overlapping or
    /// inverted windows would make classification ambiguous, so they fall
    /// back to the nominal DCC windows with a warning.
    pub fn windows(&self) -> PulseWindows {
        let windows = PulseWindows {
            short_min: self.short_min_us,
            short_max: self.short_max_us,
            long_min: self.long_min_us,
            long_max: self.long_max_us,
        };
        if windows.short_min == 0
            || windows.short_min > windows.short_max
            || windows.long_min > windows.long_max
            || windows.short_max >= windows.long_min
        {
            tracing::warn!("invalid [timing] windows {:?}; using DCC defaults", windows);
            return PulseWindows::DCC;
        }
        windows
    }
}

/// Fallback Default (without knowing config_dir). Only used if something
/// goes very wrong and we need a Config without a Storage instance.
impl Default for Config {
    fn default() -> Self {
        let fallback = resolve_config_dir()
            .unwrap_or_else(|| PathBuf::from(".").join("dccmon"));
        Config::default_for(&fallback)
    }
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(s: &str) -> PathBuf {
    if s.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&s[2..]);
        }
    }
    PathBuf::from(s)
}

/// Resolve the dccmon config directory to `~/.config/dccmon/` regardless of OS.
pub fn resolve_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("dccmon"))
}

// ─── Storage ─────────────────────────────────────────────────────────────────

/// Storage manager for configuration, captures, and exports.
///
/// On construction it ensures the directory tree exists:
///
/// ```text
/// ~/.config/dccmon/
///   config.ini
///   captures/
///   exports/
/// ```
pub struct Storage {
    /// Base config directory (~/.config/dccmon)
    config_dir: PathBuf,
    /// Configuration
    pub config: Config,
}

impl Storage {
    /// Create a new storage manager.
    ///
    /// 1. Resolves the config directory (`~/.config/dccmon`).
    /// 2. Creates it if missing.
    /// 3. Loads `config.ini` if it exists, otherwise writes a default one.
    /// 4. Creates the capture and export directories if missing.
    pub fn new() -> Result<Self> {
        // ── 1. Resolve base path ─────────────────────────────────────────
        let config_dir = resolve_config_dir()
            .context("Could not determine home directory (is $HOME set?)")?;

        let config_path = config_dir.join("config.ini");

        // ── 2. Ensure directory tree exists ──────────────────────────────
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config dir: {:?}", config_dir))?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }

        // ── 3. Load or create config.ini ─────────────────────────────────
        let config = if config_path.exists() {
            tracing::info!("Loading config from {:?}", config_path);
            match Config::load_from_ini(&config_path, &config_dir) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse config.ini, using defaults: {}", e);
                    Config::default_for(&config_dir)
                }
            }
        } else {
            tracing::info!(
                "No config.ini found — creating default at {:?}",
                config_path
            );
            let config = Config::default_for(&config_dir);
            if let Err(e) = config.save_to_ini(&config_path) {
                tracing::warn!("Could not write default config.ini: {}", e);
            }
            config
        };

        // ── 4. Ensure capture directory exists ───────────────────────────
        if !config.capture_directory.exists() {
            fs::create_dir_all(&config.capture_directory).with_context(|| {
                format!(
                    "Failed to create capture dir: {:?}",
                    config.capture_directory
                )
            })?;
            tracing::info!(
                "Created capture directory: {:?}",
                config.capture_directory
            );
        }

        // ── 5. Ensure export directory exists ────────────────────────────
        if !config.export_directory.exists() {
            fs::create_dir_all(&config.export_directory).with_context(|| {
                format!(
                    "Failed to create export dir: {:?}",
                    config.export_directory
                )
            })?;
            tracing::info!("Created export directory: {:?}", config.export_directory);
        }

        // ── 6. Log resolved paths ───────────────────────────────────────
        tracing::info!("Config dir: {:?}", config_dir);
        tracing::info!("Capture dir: {:?}", config.capture_directory);
        tracing::info!("Export dir: {:?}", config.export_directory);

        Ok(Self { config_dir, config })
    }

    /// Save the current configuration back to `config.ini`.
    #[allow(dead_code)]
    pub fn save_config(&self) -> Result<()> {
        let config_path = self.config_dir.join("config.ini");
        self.config.save_to_ini(&config_path)?;
        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    // ─── Path accessors ──────────────────────────────────────────────────

    /// Get the config directory path (`~/.config/dccmon`)
    #[allow(dead_code)]
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Get the capture directory path (from config, default `~/.config/dccmon/captures`)
    pub fn capture_dir(&self) -> &PathBuf {
        &self.config.capture_directory
    }

    /// Get the export directory path (from config, default `~/.config/dccmon/exports`)
    pub fn export_dir(&self) -> &PathBuf {
        &self.config.export_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_windows_are_valid() {
        let config = Config::default_for(&PathBuf::from("/tmp/dccmon-test"));
        assert_eq!(config.windows(), PulseWindows::DCC);
    }

    #[test]
    fn test_overlapping_windows_fall_back() {
        let mut config = Config::default_for(&PathBuf::from("/tmp/dccmon-test"));
        config.short_max_us = 95;
        config.long_min_us = 90;
        assert_eq!(config.windows(), PulseWindows::DCC);
    }
}
