//! WebSocket transport.
//!
//! Some camera servers carry the same request/response protocol inside
//! binary WebSocket messages. [`WsStream`] turns such a connection back
//! into a byte stream so the [`Session`](crate::Session) runs unchanged:
//!
//! - each flush sends everything written since the previous flush as
//!   one binary message, so one request is one message;
//! - incoming binary messages are concatenated, so a response split
//!   across several messages is reassembled by the usual exact reads.
//!
//! A close frame reads as end of stream.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use futures::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::trace;

use crate::network::connector::{Connector, DEFAULT_CONNECT_TIMEOUT, Endpoint};

// ── WsConnector ──────────────────────────────────────────────────

/// Opens `ws://host:port/path` connections.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
    path: String,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            path: "/".into(),
        }
    }

    /// Request path used in the handshake. Defaults to `/`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn url(&self, endpoint: &Endpoint) -> String {
        format!("ws://{endpoint}{}", self.path)
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Stream = WsStream<MaybeTlsStream<TcpStream>>;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Self::Stream> {
        let url = self.url(endpoint);
        let (socket, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url.as_str()))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("websocket connect to {url} timed out after {:?}", self.connect_timeout),
                    )
                })?
                .map_err(into_io)?;
        Ok(WsStream::new(socket))
    }
}

// ── WsStream ─────────────────────────────────────────────────────

/// Byte-stream view of a WebSocket connection.
pub struct WsStream<S> {
    socket: WebSocketStream<S>,
    inbound: BytesMut,
    outbound: BytesMut,
    closed: bool,
}

impl<S> WsStream<S> {
    pub fn new(socket: WebSocketStream<S>) -> Self {
        Self {
            socket,
            inbound: BytesMut::new(),
            outbound: BytesMut::new(),
            closed: false,
        }
    }
}

impl<S> AsyncRead for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            if !this.inbound.is_empty() {
                let n = this.inbound.len().min(buf.remaining());
                buf.put_slice(&this.inbound[..n]);
                this.inbound.advance(n);
                return Poll::Ready(Ok(()));
            }
            if this.closed {
                return Poll::Ready(Ok(()));
            }
            match ready!(Pin::new(&mut this.socket).poll_next(cx)) {
                Some(Ok(Message::Binary(data))) => this.inbound.extend_from_slice(&data),
                Some(Ok(Message::Close(_))) | None => this.closed = true,
                Some(Ok(other)) => trace!(len = other.len(), "skipping non-binary websocket message"),
                Some(Err(e)) => return Poll::Ready(Err(into_io(e))),
            }
        }
    }
}

impl<S> AsyncWrite for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.get_mut().outbound.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.outbound.is_empty() {
            ready!(Pin::new(&mut this.socket).poll_ready(cx)).map_err(into_io)?;
            let message = Message::binary(this.outbound.split().to_vec());
            Pin::new(&mut this.socket).start_send(message).map_err(into_io)?;
        }
        Pin::new(&mut this.socket).poll_flush(cx).map_err(into_io)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        ready!(self.as_mut().poll_flush(cx))?;
        Pin::new(&mut self.get_mut().socket).poll_close(cx).map_err(into_io)
    }
}

fn into_io(e: WsError) -> io::Error {
    match e {
        WsError::Io(e) => e,
        closed @ (WsError::ConnectionClosed | WsError::AlreadyClosed) => {
            io::Error::new(io::ErrorKind::ConnectionAborted, closed)
        }
        other => io::Error::other(other),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CameraError, Device};
    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpListener;

    fn reply(status: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = status.to_vec();
        out.push(0);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    /// WebSocket camera on an ephemeral port. Replies are split into
    /// 5-byte messages; the task returns every request message it saw.
    async fn spawn_ws_camera() -> (Endpoint, tokio::task::JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let mut requests = Vec::new();
            while let Some(Ok(message)) = ws.next().await {
                let Message::Binary(request) = message else {
                    continue;
                };
                let request = request.to_vec();
                let response = match &request[..4] {
                    b"PING" => reply(b"PONG", b""),
                    b"GRAB" => {
                        let mut body = Vec::new();
                        body.extend_from_slice(&2u32.to_le_bytes());
                        body.extend_from_slice(&1u32.to_le_bytes());
                        body.extend_from_slice(&16u32.to_le_bytes());
                        body.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
                        reply(b"0200", &body)
                    }
                    _ => reply(b"0200", b""),
                };
                for chunk in response.chunks(5) {
                    if ws.send(Message::binary(chunk.to_vec())).await.is_err() {
                        return requests;
                    }
                }
                requests.push(request);
            }
            requests
        });
        (Endpoint::new(addr.ip().to_string(), addr.port()), handle)
    }

    #[test]
    fn url_includes_path() {
        let ep = Endpoint::new("192.168.2.3", 4001);
        assert_eq!(WsConnector::default().url(&ep), "ws://192.168.2.3:4001/");
        assert_eq!(
            WsConnector::default().with_path("camera").url(&ep),
            "ws://192.168.2.3:4001/camera"
        );
    }

    #[tokio::test]
    async fn device_over_websocket() {
        let (endpoint, server) = spawn_ws_camera().await;
        let mut dev = Device::websocket(endpoint);

        assert!(dev.ping(true).await);
        let image = dev.read(true).await.expect("frame");
        assert_eq!((image.rows, image.cols), (2, 1));
        assert_eq!(image.data, vec![1, 2, 3, 4, 5, 6]);
        assert!(dev.release(false).await);
        assert!(!dev.is_connected());

        // One request per message, whatever the reply chunking.
        let requests = server.await.unwrap();
        assert_eq!(
            requests,
            vec![
                b"PING1\0\0\0\0".to_vec(),
                b"GRAB1\0\0\0\0".to_vec(),
                b"CLOS0\0\0\0\0".to_vec(),
            ]
        );
    }

    #[tokio::test]
    async fn websocket_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut dev = Device::websocket(Endpoint::new("127.0.0.1", port));
        assert!(matches!(
            dev.try_ping(false).await,
            Err(CameraError::ConnectionFailure(_))
        ));
    }
}
