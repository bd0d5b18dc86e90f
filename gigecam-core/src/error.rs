//! Error types for the camera protocol session.
//!
//! Fallible internals return `Result<T, CameraError>`. The public
//! [`Device`](crate::Device) surface converts these into soft failures
//! (`false` / `None`), while the `try_*` methods surface them as-is.

use std::time::Duration;

use thiserror::Error;

use crate::codec::Status;

/// The canonical error type for the camera client.
#[derive(Debug, Error)]
pub enum CameraError {
    // ── Connection Errors ────────────────────────────────────────
    /// The connect, send or receive call reported an error.
    #[error("connection failure: {0}")]
    ConnectionFailure(#[from] std::io::Error),

    /// An operation needed a live connection but the session had none.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the stream before delivering the declared bytes.
    #[error("peer closed connection after {received} of {expected} bytes")]
    PeerClosed { expected: usize, received: usize },

    /// No data arrived within the bounded window.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Response Errors ──────────────────────────────────────────
    /// Header or payload was shorter than declared, or the frame
    /// geometry disagrees with the payload length.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The declared payload exceeds the configured receive limit.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A well-formed response carried a non-success status.
    #[error("camera replied with status {status}")]
    ProtocolFailure { status: Status },

    // ── Configuration Errors ─────────────────────────────────────
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CameraError {
    /// Returns `true` for failures of the underlying transport, after
    /// which the connection can no longer be trusted.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailure(_) | Self::NotConnected | Self::PeerClosed { .. } | Self::Timeout(_)
        )
    }
}

/// Result type alias using [`CameraError`].
pub type Result<T> = std::result::Result<T, CameraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = CameraError::PayloadTooLarge {
            size: 1000,
            max: 500,
        };
        assert!(e.to_string().contains("1000"));
        assert!(e.to_string().contains("500"));

        let e = CameraError::ProtocolFailure {
            status: Status::new(*b"0404"),
        };
        assert!(e.to_string().contains("0404"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let e: CameraError = io_err.into();
        assert!(matches!(e, CameraError::ConnectionFailure(_)));
        assert!(e.is_connection_error());
    }

    #[test]
    fn response_errors_are_not_connection_errors() {
        assert!(!CameraError::MalformedResponse("short".into()).is_connection_error());
        assert!(CameraError::Timeout(Duration::from_secs(1)).is_connection_error());
    }
}
