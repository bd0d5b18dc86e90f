//! Single-connection protocol session.
//!
//! A [`Session`] owns at most one stream to the camera server. It
//! connects lazily, keeps the stream across keep-alive calls and tears
//! it down after a non-keep-alive call or any failure, so the stream is
//! always either aligned on a response boundary or gone.
//!
//! Every blocking read is bounded by the read timeout. A single read on
//! a stream socket may return any prefix of a logical message, so
//! payloads are reassembled by looping until the declared length has
//! arrived.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::time;
use tracing::{debug, trace, warn};

use crate::codec::{HEADER_SIZE, IMAGE_META_SIZE};
use crate::error::{CameraError, Result};
use crate::image::CHANNELS;
use crate::network::connector::{Connector, Endpoint, TcpConnector};

/// Default bound on every read from the camera.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Largest response body accepted by default: a 1920x1080 frame.
pub const DEFAULT_MAX_PAYLOAD: usize = IMAGE_META_SIZE + 1920 * 1080 * CHANNELS;

const DISCARD_CHUNK: usize = 8 * 1024;

// ── Session ──────────────────────────────────────────────────────

/// Owns the connection to one camera endpoint.
pub struct Session<C: Connector = TcpConnector> {
    endpoint: Endpoint,
    connector: C,
    stream: Option<C::Stream>,
    read_timeout: Duration,
    max_payload: usize,
    /// Reused across calls; only meaningful right after a successful
    /// [`receive_exact`](Self::receive_exact).
    recv_buf: BytesMut,
}

impl Session<TcpConnector> {
    /// A TCP session with default timeouts.
    pub fn tcp(endpoint: Endpoint) -> Self {
        Self::new(endpoint, TcpConnector::default())
    }
}

impl<C: Connector> Session<C> {
    pub fn new(endpoint: Endpoint, connector: C) -> Self {
        Self {
            endpoint,
            connector,
            stream: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_payload: DEFAULT_MAX_PAYLOAD,
            recv_buf: BytesMut::new(),
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Change the read timeout; applies to the live stream immediately.
    pub fn set_read_timeout(&mut self, read_timeout: Duration) {
        self.read_timeout = read_timeout;
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Bytes of the last successful [`receive_exact`](Self::receive_exact).
    pub(crate) fn body(&self) -> &[u8] {
        &self.recv_buf
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Connect if there is no live stream yet.
    pub async fn try_connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self.connector.connect(&self.endpoint).await?;
        debug!(endpoint = %self.endpoint, "connected");
        self.stream = Some(stream);
        Ok(())
    }

    /// Connect if needed. Failures are logged and reported as `false`.
    pub async fn ensure_connected(&mut self) -> bool {
        match self.try_connect().await {
            Ok(()) => true,
            Err(e) => {
                warn!(endpoint = %self.endpoint, "connect failed: {e}");
                false
            }
        }
    }

    /// Drop the stream unless the caller asked to keep it alive.
    pub async fn close_if_not_kept_alive(&mut self, keep_alive: bool) {
        if !keep_alive {
            self.disconnect().await;
        }
    }

    /// Shut down and release the stream. Idempotent; shutdown errors
    /// are ignored and the session always ends up disconnected.
    pub async fn disconnect(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };
        match time::timeout(self.read_timeout, stream.shutdown()).await {
            Ok(Ok(())) => trace!(endpoint = %self.endpoint, "disconnected"),
            Ok(Err(e)) => trace!(endpoint = %self.endpoint, "shutdown failed: {e}"),
            Err(_) => trace!(endpoint = %self.endpoint, "shutdown timed out"),
        }
    }

    // ── I/O ──────────────────────────────────────────────────────

    /// Send `request` and read up to [`HEADER_SIZE`] bytes back.
    ///
    /// Returns fewer bytes if the peer closes early; the caller decides
    /// whether that is enough.
    pub async fn try_send_and_receive_header(&mut self, request: &[u8]) -> Result<Bytes> {
        let limit = self.read_timeout;
        let stream = self.stream.as_mut().ok_or(CameraError::NotConnected)?;

        match time::timeout(limit, async {
            stream.write_all(request).await?;
            stream.flush().await
        })
        .await
        {
            Ok(sent) => sent?,
            Err(_) => return Err(CameraError::Timeout(limit)),
        }

        let mut header = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            let got = read_some(stream, &mut header[filled..], limit).await?;
            if got == 0 {
                break;
            }
            filled += got;
        }
        trace!(sent = request.len(), received = filled, "header exchange");
        Ok(Bytes::copy_from_slice(&header[..filled]))
    }

    /// Soft form of [`try_send_and_receive_header`](Self::try_send_and_receive_header).
    /// On failure the stream is torn down and `None` is returned.
    pub async fn send_and_receive_header(&mut self, request: &[u8]) -> Option<Bytes> {
        match self.try_send_and_receive_header(request).await {
            Ok(header) => Some(header),
            Err(e) => {
                debug!(endpoint = %self.endpoint, "request failed: {e}");
                self.disconnect().await;
                None
            }
        }
    }

    /// Read exactly `n` bytes into the session buffer.
    ///
    /// Fails if the peer closes before `n` bytes arrived, on timeout,
    /// or when `n` exceeds the payload limit. On failure the buffer is
    /// cleared so partial data is never observable.
    pub async fn try_receive_exact(&mut self, n: usize) -> Result<&[u8]> {
        if n > self.max_payload {
            return Err(CameraError::PayloadTooLarge {
                size: n,
                max: self.max_payload,
            });
        }
        let limit = self.read_timeout;
        let stream = self.stream.as_mut().ok_or(CameraError::NotConnected)?;

        let filled = fill_exact(stream, &mut self.recv_buf, n, limit).await;
        if let Err(e) = filled {
            self.recv_buf.clear();
            return Err(e);
        }
        Ok(&self.recv_buf[..])
    }

    /// Soft form of [`try_receive_exact`](Self::try_receive_exact).
    /// On failure the stream is torn down and `None` is returned.
    pub async fn receive_exact(&mut self, n: usize) -> Option<&[u8]> {
        let received = self.try_receive_exact(n).await.map(|_| ());
        if let Err(e) = received {
            debug!(endpoint = %self.endpoint, "receive of {n} bytes failed: {e}");
            self.disconnect().await;
            return None;
        }
        Some(&self.recv_buf[..])
    }

    /// Consume and drop `n` bytes so the stream stays aligned.
    pub async fn try_discard(&mut self, n: usize) -> Result<()> {
        if n > self.max_payload {
            return Err(CameraError::PayloadTooLarge {
                size: n,
                max: self.max_payload,
            });
        }
        let limit = self.read_timeout;
        let stream = self.stream.as_mut().ok_or(CameraError::NotConnected)?;

        let mut scratch = [0u8; DISCARD_CHUNK];
        let mut remaining = n;
        while remaining > 0 {
            let want = remaining.min(DISCARD_CHUNK);
            let got = read_some(stream, &mut scratch[..want], limit).await?;
            if got == 0 {
                return Err(CameraError::PeerClosed {
                    expected: n,
                    received: n - remaining,
                });
            }
            remaining -= got;
        }
        Ok(())
    }
}

impl<C: Connector> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.stream.is_some())
            .field("read_timeout", &self.read_timeout)
            .field("max_payload", &self.max_payload)
            .finish()
    }
}

// ── Internal ─────────────────────────────────────────────────────

async fn read_some<S>(stream: &mut S, buf: &mut [u8], limit: Duration) -> Result<usize>
where
    S: AsyncRead + Unpin,
{
    match time::timeout(limit, stream.read(buf)).await {
        Ok(read) => Ok(read?),
        Err(_) => Err(CameraError::Timeout(limit)),
    }
}

async fn fill_exact<S>(stream: &mut S, buf: &mut BytesMut, n: usize, limit: Duration) -> Result<()>
where
    S: AsyncRead + Unpin,
{
    buf.clear();
    buf.resize(n, 0);

    let mut filled = 0;
    let mut reads = 0u32;
    while filled < n {
        let got = read_some(stream, &mut buf[filled..], limit).await?;
        if got == 0 {
            return Err(CameraError::PeerClosed {
                expected: n,
                received: filled,
            });
        }
        filled += got;
        reads += 1;
    }
    trace!(bytes = n, reads, "payload reassembled");
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
