//! Configuration for the playback daemon.

use std::path::Path;

use serde::{Deserialize, Serialize};

use linsn_core::OutputConfig;

use crate::pattern::Pattern;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Tick rate and test pattern.
    pub playback: PlaybackConfig,
    /// Preview model registration.
    pub preview: PreviewConfig,
    /// The Linsn channel output, same keys as the JSON object.
    pub output: OutputConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

/// Playback loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Output ticks per second.
    pub fps: u32,
    /// Pattern drawn on the canvas.
    pub pattern: Pattern,
    /// Seconds each colour of the cycle pattern is held.
    pub hold_secs: u32,
    /// Zero-based channel where the output's canvas starts.
    pub start_channel: usize,
    /// Channel buffer size. Grown if the output needs more.
    pub channel_count: usize,
}

/// Preview model registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Register the canvas as an auto-created model at startup.
    pub auto_model: bool,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            playback: PlaybackConfig::default(),
            preview: PreviewConfig::default(),
            output: OutputConfig::single_chain(2),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: 40,
            pattern: Pattern::Cycle,
            hold_secs: 1,
            start_channel: 0,
            channel_count: 0,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { auto_model: true }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Tick rate clamped to 1..=1000.
    pub fn fps(&self) -> u32 {
        self.playback.fps.clamp(1, 1000)
    }

    /// Ticks each cycle colour stays on screen.
    pub fn hold_ticks(&self) -> u64 {
        u64::from(self.fps()) * u64::from(self.playback.hold_secs.max(1))
    }

    /// Channel buffer length covering the output and every sub-matrix.
    pub fn buffer_len(&self, output_channels: usize) -> usize {
        let subs = self
            .output
            .sub_matrices
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.start_channel.saturating_sub(1) + s.width * s.height * 3)
            .max()
            .unwrap_or(0);
        (self.playback.start_channel + output_channels)
            .max(subs)
            .max(self.playback.channel_count)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&DaemonConfig::default()).unwrap();
        assert!(text.contains("fps"));
        assert!(text.contains("panelWidth"));
        assert!(text.contains("[[output.panels]]"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&DaemonConfig::default()).unwrap();
        let parsed: DaemonConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.playback.fps, 40);
        assert_eq!(parsed.output.panels.len(), 2);
        assert_eq!(parsed.output.interface, "eth1");
    }

    #[test]
    fn load_reads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[playback]
fps = 25
pattern = "outline"

[output]
interface = "enp1s0"
gamma = "2.2"
invertedData = 1

[[output.panels]]
outputNumber = 0
panelNumber = 0
orientation = "U"
"#
        )
        .unwrap();

        let cfg = DaemonConfig::load(file.path());
        assert_eq!(cfg.fps(), 25);
        assert_eq!(cfg.playback.pattern, Pattern::Outline);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.output.interface, "enp1s0");
        assert!(cfg.output.inverted_data);
        assert_eq!(cfg.output.panels.len(), 1);
        assert!((cfg.output.gamma_value() - 2.2).abs() < 1e-6);
    }

    #[test]
    fn load_falls_back_on_missing_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DaemonConfig::load(&dir.path().join("absent.toml"));
        assert_eq!(cfg.playback.fps, 40);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "playback = [").unwrap();
        assert_eq!(DaemonConfig::load(&bad).output.panels.len(), 2);
    }

    #[test]
    fn write_default_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linsn-output.toml");
        DaemonConfig::write_default(&path).unwrap();
        let cfg = DaemonConfig::load(&path);
        assert_eq!(cfg.output.panel_width, 32);
        assert!(cfg.preview.auto_model);
    }

    #[test]
    fn fps_is_clamped_and_hold_scales() {
        let mut cfg = DaemonConfig::default();
        cfg.playback.fps = 0;
        assert_eq!(cfg.fps(), 1);
        cfg.playback.fps = 20;
        cfg.playback.hold_secs = 3;
        assert_eq!(cfg.hold_ticks(), 60);
    }

    #[test]
    fn buffer_len_covers_sub_matrices() {
        let mut cfg = DaemonConfig::default();
        cfg.playback.start_channel = 10;
        assert_eq!(cfg.buffer_len(3072), 3082);

        cfg.output.sub_matrices.push(linsn_core::SubMatrixConfig {
            enabled: true,
            start_channel: 5001,
            width: 4,
            height: 2,
            ..Default::default()
        });
        assert_eq!(cfg.buffer_len(3072), 5000 + 24);

        cfg.playback.channel_count = 8192;
        assert_eq!(cfg.buffer_len(3072), 8192);
    }
}
