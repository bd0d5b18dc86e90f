//! Byte layouts for requests, response headers and frame metadata.
//!
//! Every integer on the wire is little-endian.
//!
//! ## Wire format
//!
//! **Request** (9 byte prefix + payload):
//! ```text
//! command:        [u8; 4]  ASCII, e.g. PING / GRAB / SET0
//! keep_alive:     u8       b'1' or b'0'
//! payload_length: u32
//! payload:        [u8]     payload_length bytes
//! ```
//!
//! **Response header** (9 bytes):
//! ```text
//! status:         [u8; 4]  b"0200" on success, b"PONG" for ping
//! reserved:       u8
//! payload_length: u32
//! ```
//!
//! **GRAB body** (12 byte metadata + pixels):
//! ```text
//! rows:           u32
//! cols:           u32
//! pixel_type:     u32
//! pixels:         [u8]     payload_length - 12 bytes
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{CameraError, Result};

// ── Constants ────────────────────────────────────────────────────

/// Size of the status / command field.
pub const STATUS_SIZE: usize = 4;

/// Offset of the keep-alive indicator in a request prefix.
pub const KEEP_ALIVE_OFFSET: usize = 4;

/// Offset of the little-endian payload length in prefix and header.
pub const LENGTH_OFFSET: usize = 5;

/// Request prefix and response header size.
pub const HEADER_SIZE: usize = STATUS_SIZE + 1 + 4;

/// `rows`, `cols` and `pixel_type` preceding the pixels of a GRAB body.
pub const IMAGE_META_SIZE: usize = 3 * 4;

/// Encoded size of a property value.
pub const VALUE_SIZE: usize = 8;

// ── Command ──────────────────────────────────────────────────────

/// Request commands understood by the camera server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Ping,
    IsOpened,
    Open,
    Close,
    Set,
    Get,
    Grab,
}

impl Command {
    /// The four command bytes sent on the wire.
    pub const fn code(self) -> [u8; STATUS_SIZE] {
        match self {
            Command::Ping => *b"PING",
            Command::IsOpened => *b"ISOP",
            Command::Open => *b"OPEN",
            Command::Close => *b"CLOS",
            Command::Set => *b"SET0",
            Command::Get => *b"GET0",
            Command::Grab => *b"GRAB",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.code()))
    }
}

// ── Status ───────────────────────────────────────────────────────

/// Four byte status code leading every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status([u8; STATUS_SIZE]);

impl Status {
    /// Generic success.
    pub const SUCCESS: Status = Status(*b"0200");
    /// Ping acknowledgement.
    pub const PONG: Status = Status(*b"PONG");

    pub const fn new(code: [u8; STATUS_SIZE]) -> Self {
        Self(code)
    }

    pub const fn as_bytes(&self) -> &[u8; STATUS_SIZE] {
        &self.0
    }

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    pub fn is_pong(&self) -> bool {
        *self == Self::PONG
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{}", std::ascii::escape_default(b))?;
        }
        Ok(())
    }
}

// ── PropertyId ───────────────────────────────────────────────────

/// Opaque camera property identifier.
///
/// The meaning of each id (width, fps, fourcc, ...) belongs to the
/// camera server; the client only moves the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyId(pub u32);

impl From<u32> for PropertyId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PropertyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── ResponseHeader ───────────────────────────────────────────────

/// Decoded 9 byte response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub status: Status,
    pub payload_length: u32,
}

impl ResponseHeader {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Declared body length in bytes.
    pub fn payload_len(&self) -> usize {
        self.payload_length as usize
    }
}

// ── FramePayload ─────────────────────────────────────────────────

/// Borrowed view of a GRAB body.
#[derive(Debug, Clone, Copy)]
pub struct FramePayload<'a> {
    pub rows: u32,
    pub cols: u32,
    pub pixel_type: u32,
    /// Exactly `payload_length - 12` bytes.
    pub pixel_data: &'a [u8],
}

// ── Encoding ─────────────────────────────────────────────────────

/// Encode a request: the 9 byte prefix followed by `payload`.
pub fn encode_request(command: Command, keep_alive: bool, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(&command.code());
    buf.put_u8(if keep_alive { b'1' } else { b'0' });
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Encode a SET request carrying `property` and `value`.
pub fn encode_set(property: PropertyId, value: f64, keep_alive: bool) -> Bytes {
    let mut payload = [0u8; 4 + VALUE_SIZE];
    payload[0..4].copy_from_slice(&property.0.to_le_bytes());
    payload[4..12].copy_from_slice(&value.to_le_bytes());
    encode_request(Command::Set, keep_alive, &payload)
}

/// Encode a GET request for `property`.
pub fn encode_get(property: PropertyId, keep_alive: bool) -> Bytes {
    encode_request(Command::Get, keep_alive, &property.0.to_le_bytes())
}

// ── Decoding ─────────────────────────────────────────────────────

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

/// Decode a response header from the first 9 bytes of `data`.
pub fn decode_header(data: &[u8]) -> Result<ResponseHeader> {
    if data.len() < HEADER_SIZE {
        return Err(CameraError::MalformedResponse(format!(
            "header too short: {} < {}",
            data.len(),
            HEADER_SIZE,
        )));
    }
    let mut status = [0u8; STATUS_SIZE];
    status.copy_from_slice(&data[..STATUS_SIZE]);
    Ok(ResponseHeader {
        status: Status(status),
        payload_length: read_u32_le(data, LENGTH_OFFSET),
    })
}

/// Decode a little-endian IEEE-754 double from the first 8 bytes.
pub fn decode_double(data: &[u8]) -> Result<f64> {
    if data.len() < VALUE_SIZE {
        return Err(CameraError::MalformedResponse(format!(
            "value too short: {} < {}",
            data.len(),
            VALUE_SIZE,
        )));
    }
    let mut raw = [0u8; VALUE_SIZE];
    raw.copy_from_slice(&data[..VALUE_SIZE]);
    Ok(f64::from_le_bytes(raw))
}

/// Split a GRAB body into metadata and pixel bytes.
///
/// `data` starts at the `rows` field; `payload_length` is the value
/// declared in the response header.
pub fn decode_frame(data: &[u8], payload_length: usize) -> Result<FramePayload<'_>> {
    if payload_length <= IMAGE_META_SIZE {
        return Err(CameraError::MalformedResponse(format!(
            "frame payload length {payload_length} leaves no pixel data",
        )));
    }
    let pixel_len = payload_length - IMAGE_META_SIZE;
    if data.len() < IMAGE_META_SIZE || data.len() - IMAGE_META_SIZE < pixel_len {
        return Err(CameraError::MalformedResponse(format!(
            "frame body truncated: {} bytes for declared length {payload_length}",
            data.len(),
        )));
    }
    Ok(FramePayload {
        rows: read_u32_le(data, 0),
        cols: read_u32_le(data, 4),
        pixel_type: read_u32_le(data, 8),
        pixel_data: &data[IMAGE_META_SIZE..IMAGE_META_SIZE + pixel_len],
    })
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_payload_commands_are_nine_bytes() {
        for command in [
            Command::Ping,
            Command::IsOpened,
            Command::Open,
            Command::Close,
            Command::Grab,
        ] {
            let req = encode_request(command, false, &[]);
            assert_eq!(req.len(), HEADER_SIZE);
            assert_eq!(&req[..4], &command.code());
            assert_eq!(&req[5..9], &[0, 0, 0, 0]);
        }
        assert_eq!(&encode_request(Command::Ping, false, &[])[..], b"PING0\0\0\0\0");
    }

    #[test]
    fn keep_alive_indicator() {
        assert_eq!(encode_request(Command::Grab, true, &[])[KEEP_ALIVE_OFFSET], b'1');
        assert_eq!(encode_request(Command::Grab, false, &[])[KEEP_ALIVE_OFFSET], b'0');
    }

    #[test]
    fn set_layout() {
        let req = encode_set(PropertyId(3), 640.0, true);
        assert_eq!(req.len(), HEADER_SIZE + 12);
        assert_eq!(&req[..5], b"SET01");
        assert_eq!(&req[5..9], &12u32.to_le_bytes());
        assert_eq!(&req[9..13], &3u32.to_le_bytes());
        assert_eq!(&req[13..21], &640.0f64.to_le_bytes());
    }

    #[test]
    fn get_layout() {
        let req = encode_get(PropertyId(5), false);
        assert_eq!(req.len(), HEADER_SIZE + 4);
        assert_eq!(&req[..5], b"GET00");
        assert_eq!(&req[5..9], &4u32.to_le_bytes());
        assert_eq!(&req[9..13], &5u32.to_le_bytes());
    }

    #[test]
    fn set_value_survives_decode() {
        for v in [0.0, -1.0, 30.0, 1_196_444_237.0, f64::MIN_POSITIVE, f64::MAX] {
            let req = encode_set(PropertyId(42), v, false);
            let body = &req[HEADER_SIZE..];
            assert_eq!(decode_double(&body[4..12]).unwrap(), v);
        }
    }

    #[test]
    fn header_decoding() {
        let mut raw = b"0200\0".to_vec();
        raw.extend_from_slice(&16u32.to_le_bytes());
        let header = decode_header(&raw).unwrap();
        assert!(header.is_success());
        assert_eq!(header.payload_len(), 16);

        let header = decode_header(b"PONG\0\0\0\0\0trailing").unwrap();
        assert!(header.status.is_pong());
        assert_eq!(header.payload_length, 0);
    }

    #[test]
    fn header_too_short() {
        let err = decode_header(b"0200\0\0\0").unwrap_err();
        assert!(matches!(err, CameraError::MalformedResponse(_)));
    }

    #[test]
    fn double_too_short() {
        assert!(matches!(
            decode_double(&[0u8; 7]),
            Err(CameraError::MalformedResponse(_))
        ));
    }

    #[test]
    fn frame_requires_pixels() {
        let body = [0u8; 12];
        assert!(decode_frame(&body, 12).is_err());
        assert!(decode_frame(&body, 0).is_err());
    }

    #[test]
    fn frame_pixel_span_matches_declared_length() {
        let mut body = Vec::new();
        body.extend_from_slice(&1u32.to_le_bytes());
        body.extend_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(&16u32.to_le_bytes());
        body.extend_from_slice(&[7u8; 6]);

        let frame = decode_frame(&body, 18).unwrap();
        assert_eq!(frame.rows, 1);
        assert_eq!(frame.cols, 2);
        assert_eq!(frame.pixel_type, 16);
        assert_eq!(frame.pixel_data.len(), 6);

        assert!(decode_frame(&body, 19).is_err());
    }

    #[test]
    fn status_display_escapes_binary() {
        assert_eq!(Status::SUCCESS.to_string(), "0200");
        assert_eq!(Status::new([b'E', 0, b'R', b'R']).to_string(), "E\\x00RR");
    }
}
