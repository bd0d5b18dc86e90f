//! Camera endpoints and the connectors that open streams to them.

use std::io;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::CameraError;

/// Default bound on establishing a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ── Endpoint ─────────────────────────────────────────────────────

/// Address of the remote camera server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = CameraError;

    /// Parse `host:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| CameraError::InvalidConfig(format!("endpoint `{s}` has no port")))?;
        if host.is_empty() {
            return Err(CameraError::InvalidConfig(format!("endpoint `{s}` has no host")));
        }
        let port = port
            .parse()
            .map_err(|e| CameraError::InvalidConfig(format!("endpoint `{s}`: {e}")))?;
        Ok(Self::new(host, port))
    }
}

// ── Connector ────────────────────────────────────────────────────

/// Opens byte streams to an [`Endpoint`].
///
/// The session only needs an ordered, reliable byte stream, so anything
/// implementing `AsyncRead + AsyncWrite` can carry the protocol.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Self::Stream>;
}

/// Plain TCP connector.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((endpoint.host(), endpoint.port())),
        )
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {endpoint} timed out after {:?}", self.connect_timeout),
            )
        })??;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_display_and_parse() {
        let ep: Endpoint = "192.168.2.3:4001".parse().unwrap();
        assert_eq!(ep.host(), "192.168.2.3");
        assert_eq!(ep.port(), 4001);
        assert_eq!(ep.to_string(), "192.168.2.3:4001");
    }

    #[test]
    fn endpoint_parse_errors() {
        assert!("camera".parse::<Endpoint>().is_err());
        assert!(":4001".parse::<Endpoint>().is_err());
        assert!("camera:port".parse::<Endpoint>().is_err());
    }

    #[tokio::test]
    async fn tcp_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpConnector::default()
            .connect(&Endpoint::new("127.0.0.1", port))
            .await;
        assert!(result.is_err());
    }
}
