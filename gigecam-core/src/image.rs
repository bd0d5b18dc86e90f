//! Owned image returned by a successful grab.
//!
//! An [`Image`] is always a copy: it never borrows the session's
//! receive buffer, which is overwritten by the next `read`.

use crate::codec::FramePayload;
use crate::error::{CameraError, Result};

/// Interleaved 8-bit channels per pixel carried by this protocol.
pub const CHANNELS: usize = 3;

// ── Image ────────────────────────────────────────────────────────

/// A decoded camera frame with tightly packed rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Frame height in pixels.
    pub rows: u32,
    /// Frame width in pixels.
    pub cols: u32,
    /// Server-side pixel type tag, passed through untouched.
    pub pixel_type: u32,
    /// `rows * cols * 3` bytes.
    pub data: Vec<u8>,
}

impl Image {
    /// Build an owned image after checking that the declared geometry
    /// accounts for every pixel byte.
    pub fn from_payload(payload: FramePayload<'_>) -> Result<Self> {
        let expected = (payload.rows as usize)
            .checked_mul(payload.cols as usize)
            .and_then(|px| px.checked_mul(CHANNELS));

        if expected != Some(payload.pixel_data.len()) {
            return Err(CameraError::MalformedResponse(format!(
                "frame geometry {}x{}x{CHANNELS} does not match {} pixel bytes",
                payload.rows,
                payload.cols,
                payload.pixel_data.len(),
            )));
        }

        Ok(Self {
            rows: payload.rows,
            cols: payload.cols,
            pixel_type: payload.pixel_type,
            data: payload.pixel_data.to_vec(),
        })
    }

    /// Total byte size of the pixel buffer.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.cols as usize * CHANNELS
    }

    /// Row slice, or `None` when `y` is out of bounds.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.rows {
            return None;
        }
        let start = y as usize * self.stride();
        self.data.get(start..start + self.stride())
    }

    /// Channel bytes at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.cols {
            return None;
        }
        let offset = x as usize * CHANNELS;
        self.row(y)?.get(offset..offset + CHANNELS)
    }
}
