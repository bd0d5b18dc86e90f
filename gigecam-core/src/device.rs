//! Public command surface for a remote camera.
//!
//! Every operation follows the same shape: connect if needed, encode
//! the request, exchange it over the [`Session`], decode the reply and
//! drop the connection unless `keep_alive` was requested.
//!
//! Two flavours are offered per command. The plain methods (`ping`,
//! `open`, `read`, ...) never fail: they return `false` / `None` and log
//! the cause, which suits poll-and-check loops. The `try_*` methods
//! return the [`CameraError`] instead.

use std::time::Duration;

use tracing::{debug, warn};

use crate::codec::{
    self, Command, HEADER_SIZE, IMAGE_META_SIZE, PropertyId, ResponseHeader, STATUS_SIZE, Status,
    VALUE_SIZE,
};
use crate::config::{DeviceConfig, Transport};
use crate::error::{CameraError, Result};
use crate::image::Image;
use crate::network::{Connector, Endpoint, Session, TcpConnector, WsConnector};

// ── Device ───────────────────────────────────────────────────────

/// Client handle for one remote camera.
///
/// Not meant to be shared: every call takes `&mut self`. Wrap it in a
/// mutex, or use one `Device` per task, when several tasks need it.
#[derive(Debug)]
pub struct Device<C: Connector = TcpConnector> {
    session: Session<C>,
}

impl Device<TcpConnector> {
    /// TCP device with default timeouts and payload limit.
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_session(Session::tcp(endpoint))
    }

    /// TCP device configured from `config`.
    pub fn from_config(config: &DeviceConfig) -> Result<Self> {
        let connector = TcpConnector::new(config.connect_timeout());
        configured(config, Transport::Tcp, connector)
    }
}

impl Device<WsConnector> {
    /// WebSocket device with default timeouts and payload limit.
    pub fn websocket(endpoint: Endpoint) -> Self {
        Self::with_session(Session::new(endpoint, WsConnector::default()))
    }

    /// WebSocket device configured from `config`.
    pub fn websocket_from_config(config: &DeviceConfig) -> Result<Self> {
        let connector = WsConnector::new(config.connect_timeout());
        configured(config, Transport::WebSocket, connector)
    }
}

fn configured<C: Connector>(
    config: &DeviceConfig,
    transport: Transport,
    connector: C,
) -> Result<Device<C>> {
    config.validate()?;
    if config.network.transport != transport {
        return Err(CameraError::InvalidConfig(format!(
            "network.transport is {:?}, expected {transport:?}",
            config.network.transport
        )));
    }
    let session = Session::new(config.endpoint(), connector)
        .with_read_timeout(config.read_timeout())
        .with_max_payload(config.buffers.max_payload_bytes);
    Ok(Device::with_session(session))
}

impl<C: Connector> Device<C> {
    pub fn with_session(session: Session<C>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.session.endpoint()
    }

    /// Whether a kept-alive connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn set_read_timeout(&mut self, read_timeout: Duration) {
        self.session.set_read_timeout(read_timeout);
    }

    /// Close a kept-alive connection, if any.
    pub async fn disconnect(&mut self) {
        self.session.disconnect().await;
    }

    // ── Commands ─────────────────────────────────────────────────

    /// `true` if the server acknowledges with `PONG`.
    pub async fn ping(&mut self, keep_alive: bool) -> bool {
        let result = self.try_ping(keep_alive).await;
        self.soften(Command::Ping, result).is_some()
    }

    /// Succeeds on any reply starting with `PONG`, however short.
    pub async fn try_ping(&mut self, keep_alive: bool) -> Result<()> {
        let request = codec::encode_request(Command::Ping, keep_alive, &[]);
        let outcome = self.ping_exchange(&request, keep_alive).await;
        self.settle(keep_alive, outcome.is_ok()).await;
        outcome
    }

    /// `true` if the camera reports itself open on the server.
    pub async fn is_opened(&mut self, keep_alive: bool) -> bool {
        let result = self.try_is_opened(keep_alive).await;
        self.soften(Command::IsOpened, result).unwrap_or(false)
    }

    /// `Ok(false)` when the server answered with a non-success status.
    pub async fn try_is_opened(&mut self, keep_alive: bool) -> Result<bool> {
        let request = codec::encode_request(Command::IsOpened, keep_alive, &[]);
        let header = self.call(&request, keep_alive, |_| false).await?;
        Ok(header.is_success())
    }

    pub async fn open(&mut self, keep_alive: bool) -> bool {
        let result = self.try_open(keep_alive).await;
        self.soften(Command::Open, result).is_some()
    }

    pub async fn try_open(&mut self, keep_alive: bool) -> Result<()> {
        self.simple_command(Command::Open, keep_alive).await
    }

    /// Close the camera on the server side.
    pub async fn release(&mut self, keep_alive: bool) -> bool {
        let result = self.try_release(keep_alive).await;
        self.soften(Command::Close, result).is_some()
    }

    pub async fn try_release(&mut self, keep_alive: bool) -> Result<()> {
        self.simple_command(Command::Close, keep_alive).await
    }

    pub async fn set(&mut self, property: PropertyId, value: f64, keep_alive: bool) -> bool {
        let result = self.try_set(property, value, keep_alive).await;
        self.soften(Command::Set, result).is_some()
    }

    pub async fn try_set(&mut self, property: PropertyId, value: f64, keep_alive: bool) -> Result<()> {
        let request = codec::encode_set(property, value, keep_alive);
        let header = self.call(&request, keep_alive, |_| false).await?;
        ensure_success(&header)
    }

    /// Current value of `property`, or `None` on any failure.
    pub async fn get(&mut self, property: PropertyId, keep_alive: bool) -> Option<f64> {
        let result = self.try_get(property, keep_alive).await;
        self.soften(Command::Get, result)
    }

    pub async fn try_get(&mut self, property: PropertyId, keep_alive: bool) -> Result<f64> {
        let request = codec::encode_get(property, keep_alive);
        let header = self
            .call(&request, keep_alive, |h| {
                h.is_success() && h.payload_len() >= VALUE_SIZE
            })
            .await?;
        ensure_success(&header)?;
        if header.payload_len() < VALUE_SIZE {
            return Err(CameraError::MalformedResponse(format!(
                "GET reply carries {} bytes, need {VALUE_SIZE}",
                header.payload_len(),
            )));
        }
        codec::decode_double(self.session.body())
    }

    /// Grab one frame. Returns an owned copy; the session's receive
    /// buffer is reused by the next call.
    pub async fn read(&mut self, keep_alive: bool) -> Option<Image> {
        let result = self.try_read(keep_alive).await;
        self.soften(Command::Grab, result)
    }

    pub async fn try_read(&mut self, keep_alive: bool) -> Result<Image> {
        let request = codec::encode_request(Command::Grab, keep_alive, &[]);
        let header = self
            .call(&request, keep_alive, |h| {
                h.is_success() && h.payload_len() > IMAGE_META_SIZE
            })
            .await?;
        ensure_success(&header)?;
        let payload = codec::decode_frame(self.session.body(), header.payload_len())?;
        Image::from_payload(payload)
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn simple_command(&mut self, command: Command, keep_alive: bool) -> Result<()> {
        let request = codec::encode_request(command, keep_alive, &[]);
        let header = self.call(&request, keep_alive, |_| false).await?;
        ensure_success(&header)
    }

    /// Run one exchange and settle the connection: keep it only if the
    /// exchange succeeded and the caller asked for keep-alive.
    async fn call(
        &mut self,
        request: &[u8],
        keep_alive: bool,
        wants_body: fn(&ResponseHeader) -> bool,
    ) -> Result<ResponseHeader> {
        let outcome = self.exchange(request, keep_alive, wants_body).await;
        self.settle(keep_alive, outcome.is_ok()).await;
        outcome
    }

    async fn settle(&mut self, keep_alive: bool, succeeded: bool) {
        if succeeded {
            self.session.close_if_not_kept_alive(keep_alive).await;
        } else {
            self.session.disconnect().await;
        }
    }

    async fn ping_exchange(&mut self, request: &[u8], keep_alive: bool) -> Result<()> {
        self.session.try_connect().await?;
        let raw = self.session.try_send_and_receive_header(request).await?;

        if !raw.starts_with(Status::PONG.as_bytes()) {
            return match raw.get(..STATUS_SIZE) {
                Some(code) => {
                    let mut status = [0u8; STATUS_SIZE];
                    status.copy_from_slice(code);
                    Err(CameraError::ProtocolFailure {
                        status: Status::new(status),
                    })
                }
                None => Err(CameraError::MalformedResponse(format!(
                    "ping reply too short: {} bytes",
                    raw.len()
                ))),
            };
        }

        if raw.len() < HEADER_SIZE {
            // The peer closed mid-header; nothing left to align with.
            self.session.disconnect().await;
        } else if keep_alive {
            let len = codec::decode_header(&raw)?.payload_len();
            if let Err(e) = self.session.try_discard(len).await {
                debug!(endpoint = %self.endpoint(), "dropping connection, pong trailer not drained: {e}");
                self.session.disconnect().await;
            }
        }
        Ok(())
    }

    async fn exchange(
        &mut self,
        request: &[u8],
        keep_alive: bool,
        wants_body: fn(&ResponseHeader) -> bool,
    ) -> Result<ResponseHeader> {
        self.session.try_connect().await?;
        let raw = self.session.try_send_and_receive_header(request).await?;
        let header = codec::decode_header(&raw)?;

        let len = header.payload_len();
        if wants_body(&header) {
            self.session.try_receive_exact(len).await?;
        } else if len > 0 && keep_alive {
            // Unread bytes would be taken for the next header.
            if let Err(e) = self.session.try_discard(len).await {
                debug!(endpoint = %self.endpoint(), "dropping connection, body not drained: {e}");
                self.session.disconnect().await;
            }
        }
        Ok(header)
    }

    fn soften<T>(&self, command: Command, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) if e.is_connection_error() => {
                warn!(endpoint = %self.endpoint(), %command, "{e}");
                None
            }
            Err(e) => {
                debug!(endpoint = %self.endpoint(), %command, "{e}");
                None
            }
        }
    }
}

fn ensure_success(header: &ResponseHeader) -> Result<()> {
    if header.is_success() {
        Ok(())
    } else {
        Err(CameraError::ProtocolFailure {
            status: header.status,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
