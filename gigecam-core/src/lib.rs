//! # gigecam-core
//!
//! Client library for remote cameras served over a length-framed TCP
//! protocol.
//!
//! This crate contains:
//! - **Codec**: request encoding and response decoding (`Command`, `Status`, `ResponseHeader`)
//! - **Network**: `Session` owning the connection and receive buffer, behind a `Connector` (TCP or WebSocket)
//! - **Device**: `Device`, the command surface (`ping`, `open`, `set`, `get`, `read`, ...)
//! - **Image**: `Image`, an owned frame decoded from a `GRAB` reply
//! - **Monitor**: `ThroughputMonitor` for fps and mean frame size
//! - **Config**: `DeviceConfig`, serde-backed client settings
//! - **Error**: `CameraError`, the `thiserror`-based error type

pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod image;
pub mod monitor;
pub mod network;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{Command, HEADER_SIZE, PropertyId, ResponseHeader, Status};
pub use config::DeviceConfig;
pub use device::Device;
pub use error::{CameraError, Result};
pub use image::Image;
pub use monitor::{ThroughputMonitor, ThroughputReport, UNMEASURED};
pub use network::{Connector, Endpoint, Session, TcpConnector, WsConnector};
