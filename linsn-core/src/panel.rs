//! Panel geometry: where each physical panel sits on the logical canvas.
//!
//! Panels are attached to numbered outputs (physical data lines) and
//! daisy-chained along each output. Every panel carries a pixel map
//! that turns a panel-local pixel into channel offsets on the canvas,
//! accounting for orientation, placement and colour order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LinsnError;

// ── ColorOrder ───────────────────────────────────────────────────

/// Order in which a panel expects the three colour components.
///
/// Deserializing an unknown order yields [`ColorOrder::Rgb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorOrder {
    #[default]
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ColorOrder {
    /// For each wire byte, the index of the source component (R=0, G=1, B=2).
    pub const fn source_indices(self) -> [usize; 3] {
        match self {
            ColorOrder::Rgb => [0, 1, 2],
            ColorOrder::Rbg => [0, 2, 1],
            ColorOrder::Grb => [1, 0, 2],
            ColorOrder::Gbr => [1, 2, 0],
            ColorOrder::Brg => [2, 0, 1],
            ColorOrder::Bgr => [2, 1, 0],
        }
    }
}

impl FromStr for ColorOrder {
    type Err = LinsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "RGB" => Ok(ColorOrder::Rgb),
            "RBG" => Ok(ColorOrder::Rbg),
            "GRB" => Ok(ColorOrder::Grb),
            "GBR" => Ok(ColorOrder::Gbr),
            "BRG" => Ok(ColorOrder::Brg),
            "BGR" => Ok(ColorOrder::Bgr),
            _ => Err(LinsnError::InvalidConfig(format!("unknown color order {s:?}"))),
        }
    }
}

impl From<String> for ColorOrder {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|e| {
            warn!("{e}, using RGB");
            ColorOrder::Rgb
        })
    }
}

impl From<ColorOrder> for String {
    fn from(order: ColorOrder) -> Self {
        order.to_string()
    }
}

impl fmt::Display for ColorOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColorOrder::Rgb => "RGB",
            ColorOrder::Rbg => "RBG",
            ColorOrder::Grb => "GRB",
            ColorOrder::Gbr => "GBR",
            ColorOrder::Brg => "BRG",
            ColorOrder::Bgr => "BGR",
        };
        f.write_str(s)
    }
}

// ── Orientation ──────────────────────────────────────────────────

/// How a panel is mounted relative to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// Upright.
    #[default]
    Normal,
    /// Rotated 180 degrees.
    UpsideDown,
    /// Rotated 90 degrees clockwise.
    Right,
    /// Rotated 90 degrees counter-clockwise.
    Left,
}

impl Orientation {
    /// Parse the first character of a config value (`N`, `U`, `R`, `L`).
    pub fn from_char(c: char) -> Result<Self, LinsnError> {
        match c.to_ascii_uppercase() {
            'N' => Ok(Orientation::Normal),
            'U' => Ok(Orientation::UpsideDown),
            'R' => Ok(Orientation::Right),
            'L' => Ok(Orientation::Left),
            other => Err(LinsnError::InvalidConfig(format!(
                "unknown panel orientation {other:?}"
            ))),
        }
    }

    /// Whether the panel's footprint on the canvas is transposed.
    pub const fn is_rotated(self) -> bool {
        matches!(self, Orientation::Right | Orientation::Left)
    }

    /// Canvas coordinates of panel-local pixel `(x, y)`, relative to the
    /// panel's top-left corner on the canvas.
    pub const fn transform(self, x: usize, y: usize, width: usize, height: usize) -> (usize, usize) {
        match self {
            Orientation::Normal => (x, y),
            Orientation::UpsideDown => (width - 1 - x, height - 1 - y),
            Orientation::Right => (height - 1 - y, x),
            Orientation::Left => (y, width - 1 - x),
        }
    }
}

// ── Panel ────────────────────────────────────────────────────────

/// Placement request for one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelPlacement {
    pub output: usize,
    pub chain: usize,
    pub orientation: Orientation,
    pub x_offset: usize,
    pub y_offset: usize,
    pub color_order: ColorOrder,
}

/// A placed panel with its resolved pixel map.
#[derive(Debug, Clone)]
pub struct Panel {
    pub output: usize,
    pub chain: usize,
    pub orientation: Orientation,
    pub x_offset: usize,
    pub y_offset: usize,
    pub color_order: ColorOrder,
    /// Three channel offsets per panel-local pixel, row-major, in wire
    /// byte order. Offsets are relative to the canvas start channel.
    pub pixel_map: Vec<usize>,
}

impl Panel {
    /// Channel offsets for panel-local pixel `(x, y)`.
    pub fn channels_at(&self, x: usize, y: usize, panel_width: usize) -> [usize; 3] {
        let i = (y * panel_width + x) * 3;
        [self.pixel_map[i], self.pixel_map[i + 1], self.pixel_map[i + 2]]
    }
}

// ── PanelMatrixBuilder ───────────────────────────────────────────

/// Collects panel placements and resolves them into a [`PanelMatrix`].
#[derive(Debug, Clone)]
pub struct PanelMatrixBuilder {
    panel_width: usize,
    panel_height: usize,
    inverted: bool,
    placements: Vec<PanelPlacement>,
}

impl PanelMatrixBuilder {
    pub fn new(panel_width: usize, panel_height: usize, inverted: bool) -> Result<Self, LinsnError> {
        if panel_width == 0 || panel_height == 0 {
            return Err(LinsnError::Geometry(format!(
                "panel size {panel_width}x{panel_height} is empty"
            )));
        }
        Ok(Self {
            panel_width,
            panel_height,
            inverted,
            placements: Vec::new(),
        })
    }

    /// Attach a panel. Duplicate chain positions on one output are rejected.
    pub fn add_panel(&mut self, placement: PanelPlacement) -> Result<&mut Self, LinsnError> {
        if self
            .placements
            .iter()
            .any(|p| p.output == placement.output && p.chain == placement.chain)
        {
            return Err(LinsnError::Geometry(format!(
                "output {} already has a panel at chain position {}",
                placement.output, placement.chain
            )));
        }
        self.placements.push(placement);
        Ok(self)
    }

    pub fn panel_count(&self) -> usize {
        self.placements.len()
    }

    fn footprint(&self, orientation: Orientation) -> (usize, usize) {
        if orientation.is_rotated() {
            (self.panel_height, self.panel_width)
        } else {
            (self.panel_width, self.panel_height)
        }
    }

    /// Resolve every pixel map against the final canvas size.
    pub fn build(self) -> Result<PanelMatrix, LinsnError> {
        if self.placements.is_empty() {
            return Err(LinsnError::Geometry("no panels configured".into()));
        }

        let (mut width, mut height) = (0, 0);
        for p in &self.placements {
            let (w, h) = self.footprint(p.orientation);
            width = width.max(p.x_offset + w);
            height = height.max(p.y_offset + h);
        }

        let output_count = self.placements.iter().map(|p| p.output).max().unwrap_or(0) + 1;
        let mut output_panels = vec![Vec::new(); output_count];
        let mut chain_lengths = vec![0usize; output_count];

        let mut panels = Vec::with_capacity(self.placements.len());
        for (index, p) in self.placements.iter().enumerate() {
            let mut pixel_map = Vec::with_capacity(self.panel_width * self.panel_height * 3);
            let order = p.color_order.source_indices();
            for y in 0..self.panel_height {
                for x in 0..self.panel_width {
                    let (dx, dy) = p
                        .orientation
                        .transform(x, y, self.panel_width, self.panel_height);
                    let cx = p.x_offset + dx;
                    let mut cy = p.y_offset + dy;
                    if self.inverted {
                        cy = height - 1 - cy;
                    }
                    let base = (cy * width + cx) * 3;
                    pixel_map.extend(order.iter().map(|&c| base + c));
                }
            }

            output_panels[p.output].push(index);
            chain_lengths[p.output] = chain_lengths[p.output].max(p.chain + 1);
            panels.push(Panel {
                output: p.output,
                chain: p.chain,
                orientation: p.orientation,
                x_offset: p.x_offset,
                y_offset: p.y_offset,
                color_order: p.color_order,
                pixel_map,
            });
        }

        Ok(PanelMatrix {
            panel_width: self.panel_width,
            panel_height: self.panel_height,
            inverted: self.inverted,
            width,
            height,
            panels,
            output_panels,
            chain_lengths,
        })
    }
}

// ── PanelMatrix ──────────────────────────────────────────────────

/// Resolved panel layout, read-only during streaming.
#[derive(Debug, Clone)]
pub struct PanelMatrix {
    panel_width: usize,
    panel_height: usize,
    inverted: bool,
    width: usize,
    height: usize,
    panels: Vec<Panel>,
    output_panels: Vec<Vec<usize>>,
    chain_lengths: Vec<usize>,
}

impl PanelMatrix {
    /// Canvas width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn panel_width(&self) -> usize {
        self.panel_width
    }

    pub fn panel_height(&self) -> usize {
        self.panel_height
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn output_count(&self) -> usize {
        self.output_panels.len()
    }

    /// Panels attached to `output`, in configuration order.
    pub fn output_panels(&self, output: usize) -> impl Iterator<Item = &Panel> {
        self.output_panels
            .get(output)
            .into_iter()
            .flatten()
            .map(|&i| &self.panels[i])
    }

    /// One past the highest chain position used on `output`.
    pub fn chain_length(&self, output: usize) -> usize {
        self.chain_lengths.get(output).copied().unwrap_or(0)
    }

    /// Longest chain across all outputs.
    pub fn longest_chain(&self) -> usize {
        self.chain_lengths.iter().copied().max().unwrap_or(0)
    }

    /// Channels covered by the canvas.
    pub fn channel_count(&self) -> usize {
        self.width * self.height * 3
    }
}
