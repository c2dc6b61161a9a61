//! Sub-region compositor.
//!
//! A sub-region is a secondary virtual canvas living elsewhere in the
//! channel buffer. Before remapping, each enabled sub-region is copied
//! row by row onto the main canvas at its configured offset.

use tracing::warn;

// ── SubRegion ────────────────────────────────────────────────────

/// A secondary canvas overlaid onto the main one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRegion {
    pub enabled: bool,
    /// Zero-based channel where the sub-region's data starts.
    pub start_channel: usize,
    pub width: usize,
    pub height: usize,
    pub x_offset: usize,
    pub y_offset: usize,
}

// ── Canvas ───────────────────────────────────────────────────────

/// Main canvas plus the sub-regions composited onto it.
#[derive(Debug, Clone)]
pub struct Canvas {
    start_channel: usize,
    width: usize,
    height: usize,
    regions: Vec<SubRegion>,
}

impl Canvas {
    pub fn new(start_channel: usize, width: usize, height: usize) -> Self {
        Self {
            start_channel,
            width,
            height,
            regions: Vec::new(),
        }
    }

    pub fn add_sub_region(&mut self, region: SubRegion) {
        if region.x_offset >= self.width || region.y_offset >= self.height {
            warn!(
                "sub-region at ({}, {}) lies outside the {}x{} canvas",
                region.x_offset, region.y_offset, self.width, self.height
            );
        }
        self.regions.push(region);
    }

    pub fn sub_regions(&self) -> &[SubRegion] {
        &self.regions
    }

    /// Copy every enabled sub-region onto the canvas inside `buffer`.
    ///
    /// Rows are clipped to the canvas and to the end of `buffer`.
    pub fn apply_overlays(&self, buffer: &mut [u8]) {
        for region in self.regions.iter().filter(|r| r.enabled) {
            if region.x_offset >= self.width {
                continue;
            }
            let row_bytes = region.width.min(self.width - region.x_offset) * 3;
            let rows = region.height.min(self.height.saturating_sub(region.y_offset));

            for y in 0..rows {
                let src = region.start_channel + y * region.width * 3;
                let dst = self.start_channel
                    + ((region.y_offset + y) * self.width + region.x_offset) * 3;
                if src + row_bytes > buffer.len() || dst + row_bytes > buffer.len() {
                    break;
                }
                buffer.copy_within(src..src + row_bytes, dst);
            }
        }
    }
}
