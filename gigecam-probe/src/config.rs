//! Probe configuration.

use std::path::Path;

use gigecam_core::DeviceConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the probe.
///
/// The device sections (`[network]`, `[buffers]`, `[monitor]`) sit at
/// the top level of the file next to the probe's own sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Client settings for the camera.
    #[serde(flatten)]
    pub device: DeviceConfig,
    /// What the probe does once connected.
    pub run: RunConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Probe run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Frames to grab. Zero only checks reachability.
    pub frames: u32,
    /// Keep the connection open across commands.
    pub keep_alive: bool,
    /// Properties applied before grabbing.
    pub properties: Vec<PropertySetting>,
}

/// One `SET` issued before the grab loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySetting {
    pub id: u32,
    pub value: f64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 120,
            keep_alive: true,
            properties: Vec::new(),
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

// ── Loading ──────────────────────────────────────────────────────

impl ProbeConfig {
    /// Load from a TOML file, falling back to defaults.
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

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ProbeConfig::default()).unwrap();
        assert!(text.contains("[network]"));
        assert!(text.contains("[run]"));
        assert!(text.contains("level"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&ProbeConfig::default()).unwrap();
        let parsed: ProbeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.device.network.port, 4001);
        assert_eq!(parsed.run.frames, 120);
        assert!(parsed.run.keep_alive);
    }

    #[test]
    fn properties_parse() {
        let text = r#"
            [network]
            host = "10.0.0.7"

            [[run.properties]]
            id = 5
            value = 30.0

            [[run.properties]]
            id = 3
            value = 640.0
        "#;
        let parsed: ProbeConfig = toml::from_str(text).unwrap();
        assert_eq!(parsed.device.network.host, "10.0.0.7");
        assert_eq!(parsed.device.network.port, 4001);
        assert_eq!(parsed.run.frames, 120);
        assert_eq!(
            parsed.run.properties,
            vec![
                PropertySetting { id: 5, value: 30.0 },
                PropertySetting { id: 3, value: 640.0 },
            ]
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = ProbeConfig::load(Path::new("/nonexistent/gigecam-probe.toml"));
        assert_eq!(cfg.logging.level, "info");
    }
}
