//! Hardware frame formats and resolution negotiation.
//!
//! A receiver card accepts a small set of frame variants, each keyed by
//! the largest canvas it can carry. The driver picks the smallest one
//! that covers the configured panel layout.

use std::fmt;

use crate::error::LinsnError;

// ── FormatCode ───────────────────────────────────────────────────

/// Descriptor for one hardware frame variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCode {
    /// Value written to frame byte 45.
    pub code: u8,
    /// Widest canvas this variant carries, in pixels.
    pub max_width: usize,
    /// Tallest canvas this variant carries, in pixels.
    pub max_height: usize,
    /// Bytes of leading padding before pixel data in the frame buffer.
    pub payload_offset: usize,
    /// Value written to frame byte 27.
    pub status_byte: u8,
}

impl FormatCode {
    /// Whether a `width` x `height` canvas fits this variant.
    pub const fn covers(&self, width: usize, height: usize) -> bool {
        self.max_width >= width && self.max_height >= height
    }

    /// Logical size of the hardware frame buffer for this variant.
    pub const fn frame_buffer_len(&self) -> usize {
        self.max_width * self.max_height * 3 + self.payload_offset
    }
}

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#04x} ({}x{}, offset {}, status {:#04x})",
            self.code, self.max_width, self.max_height, self.payload_offset, self.status_byte
        )
    }
}

/// Known frame variants, strictly ascending by capacity.
///
/// Smaller variants (`0xe0` 32x32, `0xe1` 64x32) exist on some cards but
/// their payload offsets have not been confirmed.
pub const FORMAT_CODES: &[FormatCode] = &[
    FormatCode {
        code: 0xd2,
        max_width: 512,
        max_height: 256,
        payload_offset: 96,
        status_byte: 0x0f,
    },
    FormatCode {
        code: 0xc2,
        max_width: 1024,
        max_height: 512,
        payload_offset: 1632,
        status_byte: 0x1f,
    },
];

// ── Negotiation ──────────────────────────────────────────────────

/// Select the first entry of `table` that covers the canvas.
pub fn negotiate_in(
    table: &[FormatCode],
    width: usize,
    height: usize,
) -> Result<FormatCode, LinsnError> {
    table
        .iter()
        .find(|fc| fc.covers(width, height))
        .copied()
        .ok_or(LinsnError::NoFormatAvailable { width, height })
}

/// Select the smallest known format that covers the canvas.
pub fn negotiate(width: usize, height: usize) -> Result<FormatCode, LinsnError> {
    negotiate_in(FORMAT_CODES, width, height)
}
