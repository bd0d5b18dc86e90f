//! Client configuration.
//!
//! Every section is `#[serde(default)]`, so a partial TOML file only
//! overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::IMAGE_META_SIZE;
use crate::error::{CameraError, Result};
use crate::network::Endpoint;
use crate::network::connector::DEFAULT_CONNECT_TIMEOUT;
use crate::network::session::{DEFAULT_MAX_PAYLOAD, DEFAULT_READ_TIMEOUT};

/// Top-level configuration for a [`Device`](crate::Device).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Where the camera server lives and how long to wait for it.
    pub network: NetworkConfig,
    /// Receive limits.
    pub buffers: BufferConfig,
    /// Throughput reporting.
    pub monitor: MonitorConfig,
}

/// How requests reach the camera server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Raw TCP stream.
    #[default]
    Tcp,
    /// Binary WebSocket messages.
    WebSocket,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Transport to the camera server.
    pub transport: Transport,
    /// Camera server host name or IP.
    pub host: String,
    /// Camera server port.
    pub port: u16,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-read timeout in milliseconds.
    pub read_timeout_ms: u64,
}

/// Receive buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Largest response body accepted, in bytes.
    pub max_payload_bytes: usize,
}

/// Throughput monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples per reporting window.
    pub cycle_count: u32,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            host: "192.168.2.3".into(),
            port: 4001,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { cycle_count: 120 }
    }
}

// ── Accessors ────────────────────────────────────────────────────

impl DeviceConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.network.host.clone(), self.network.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.network.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.network.read_timeout_ms)
    }

    /// Reject values that would make every call fail.
    pub fn validate(&self) -> Result<()> {
        if self.network.host.is_empty() {
            return Err(CameraError::InvalidConfig("network.host is empty".into()));
        }
        if self.network.connect_timeout_ms == 0 || self.network.read_timeout_ms == 0 {
            return Err(CameraError::InvalidConfig(
                "network timeouts must be positive".into(),
            ));
        }
        if self.buffers.max_payload_bytes <= IMAGE_META_SIZE {
            return Err(CameraError::InvalidConfig(format!(
                "buffers.max_payload_bytes must exceed {IMAGE_META_SIZE}"
            )));
        }
        if self.monitor.cycle_count == 0 {
            return Err(CameraError::InvalidConfig(
                "monitor.cycle_count must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
