//! Pixel remap and gamma correction into the hardware frame buffer.
//!
//! The receiver expects one band of rows per output, with the panels of
//! that output laid side by side in reverse chain order: the panel at the
//! far end of the chain is written first.

use crate::error::LinsnError;
use crate::format::FormatCode;
use crate::gamma::GammaCurve;
use crate::panel::PanelMatrix;

// ── RemapLayout ──────────────────────────────────────────────────

/// Geometry needed to place a panel pixel in the hardware frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapLayout {
    pub panel_width: usize,
    pub panel_height: usize,
    /// Hardware row width in pixels (the format's `max_width`).
    pub row_width: usize,
    pub payload_offset: usize,
}

impl RemapLayout {
    /// Pixels the output bands span in the hardware frame: the longest
    /// chain laid end to end, by one panel height per output.
    pub fn extent(matrix: &PanelMatrix) -> (usize, usize) {
        (
            matrix.longest_chain() * matrix.panel_width(),
            matrix.output_count() * matrix.panel_height(),
        )
    }

    /// Check that every output band and chain fits inside `format`.
    pub fn new(matrix: &PanelMatrix, format: &FormatCode) -> Result<Self, LinsnError> {
        let (row_pixels, rows) = Self::extent(matrix);
        if rows > format.max_height || row_pixels > format.max_width {
            return Err(LinsnError::Geometry(format!(
                "{} outputs with chains of {} panels need {}x{} pixels, format {:#04x} carries {}x{}",
                matrix.output_count(),
                matrix.longest_chain(),
                row_pixels,
                rows,
                format.code,
                format.max_width,
                format.max_height
            )));
        }
        Ok(Self {
            panel_width: matrix.panel_width(),
            panel_height: matrix.panel_height(),
            row_width: format.max_width,
            payload_offset: format.payload_offset,
        })
    }

    /// Byte offset of a panel pixel in the hardware frame buffer.
    ///
    /// `chain_slot` counts from the start of the hardware row, which is
    /// the far end of the physical chain.
    #[inline]
    pub const fn offset(&self, output: usize, row: usize, chain_slot: usize, local_x: usize) -> usize {
        let y = output * self.panel_height + row;
        let x = chain_slot * self.panel_width + local_x;
        (y * self.row_width + x) * 3 + self.payload_offset
    }
}

/// Position of a panel along its hardware row.
#[inline]
pub const fn chain_slot(chain_length: usize, chain: usize) -> usize {
    chain_length - 1 - chain
}

// ── HardwareFrame ────────────────────────────────────────────────

/// Full-canvas image in device order, rebuilt every tick.
///
/// Storage may extend past the logical length so that a final payload
/// window can always be read in full.
pub struct HardwareFrame {
    data: Vec<u8>,
    len: usize,
}

impl HardwareFrame {
    /// Allocate `len` logical bytes backed by at least `storage` bytes.
    pub fn with_slack(len: usize, storage: usize) -> Self {
        Self {
            data: vec![0; len.max(storage)],
            len,
        }
    }

    /// Logical size: `max_width * max_height * 3 + payload_offset`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated size including trailing slack.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..self.len]
    }

    /// `len` bytes starting at `start`, reading into the slack if needed.
    pub fn window(&self, start: usize, len: usize) -> &[u8] {
        &self.data[start..start + len]
    }
}

impl std::fmt::Debug for HardwareFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareFrame")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

// ── Remap ────────────────────────────────────────────────────────

/// Rewrite `channels` (starting at the canvas's first channel) into the
/// hardware frame, applying `gamma` to every byte.
///
/// `channels` must hold at least `matrix.channel_count()` bytes.
pub fn remap(
    matrix: &PanelMatrix,
    layout: &RemapLayout,
    gamma: &GammaCurve,
    channels: &[u8],
    frame: &mut [u8],
) {
    let row_bytes = layout.panel_width * 3;

    for output in 0..matrix.output_count() {
        let chain_length = matrix.chain_length(output);
        for panel in matrix.output_panels(output) {
            let slot = chain_slot(chain_length, panel.chain);
            for (y, map_row) in panel.pixel_map.chunks_exact(row_bytes).enumerate() {
                let dst = layout.offset(output, y, slot, 0);
                for (out, &src) in frame[dst..dst + row_bytes].iter_mut().zip(map_row) {
                    *out = gamma.apply(channels[src]);
                }
            }
        }
    }
}
