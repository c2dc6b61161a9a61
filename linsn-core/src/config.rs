//! Channel-output configuration object.
//!
//! Deserialized from the host's JSON channel-output entry (camelCase
//! keys). Every field has a default so a sparse object is valid; the
//! panel list is the only thing a working output must supply.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::discovery::DiscoverySchedule;
use crate::error::LinsnError;
use crate::gamma::{DEFAULT_GAMMA, GammaCurve};
use crate::mac::MacAddr;
use crate::model::DEFAULT_MODEL_NAME;
use crate::overlay::{Canvas, SubRegion};
use crate::panel::{ColorOrder, Orientation, PanelMatrix, PanelMatrixBuilder, PanelPlacement};

/// Interface used when none is configured.
pub const DEFAULT_INTERFACE: &str = "eth1";

/// Panel size used when `panelWidth`/`panelHeight` are missing or zero.
pub const DEFAULT_PANEL_WIDTH: usize = 32;
pub const DEFAULT_PANEL_HEIGHT: usize = 16;

// ── OutputConfig ─────────────────────────────────────────────────

/// Static configuration for one Linsn output instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    pub panel_width: usize,
    pub panel_height: usize,
    #[serde(deserialize_with = "bool_or_int")]
    pub inverted_data: bool,
    /// Colour order for panels that do not set their own.
    pub color_order: ColorOrder,
    #[serde(deserialize_with = "lenient_gamma")]
    pub gamma: GammaSetting,
    pub interface: String,
    #[serde(rename = "sourceMAC", skip_serializing_if = "Option::is_none")]
    pub source_mac: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discovery: DiscoveryConfig,
    pub panels: Vec<PanelConfig>,
    pub sub_matrices: Vec<SubMatrixConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            panel_width: DEFAULT_PANEL_WIDTH,
            panel_height: DEFAULT_PANEL_HEIGHT,
            inverted_data: false,
            color_order: ColorOrder::Rgb,
            gamma: GammaSetting::default(),
            interface: DEFAULT_INTERFACE.to_string(),
            source_mac: None,
            description: None,
            discovery: DiscoveryConfig::default(),
            panels: Vec::new(),
            sub_matrices: Vec::new(),
        }
    }
}

impl OutputConfig {
    /// Default settings with `panels` chained left to right on output 0.
    pub fn single_chain(panels: usize) -> Self {
        let mut config = Self::default();
        config.panels = (0..panels)
            .map(|i| PanelConfig {
                panel_number: i,
                x_offset: i * DEFAULT_PANEL_WIDTH,
                ..PanelConfig::default()
            })
            .collect();
        config
    }

    pub fn from_json(json: &str) -> Result<Self, LinsnError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, LinsnError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, LinsnError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Panel size in pixels; zero in either dimension means unset.
    pub fn panel_size(&self) -> (usize, usize) {
        let or_default = |v: usize, d: usize| if v == 0 { d } else { v };
        (
            or_default(self.panel_width, DEFAULT_PANEL_WIDTH),
            or_default(self.panel_height, DEFAULT_PANEL_HEIGHT),
        )
    }

    /// Resolve the panel list into a pixel-mapped matrix.
    pub fn build_matrix(&self) -> Result<PanelMatrix, LinsnError> {
        let (width, height) = self.panel_size();
        let mut builder = PanelMatrixBuilder::new(width, height, self.inverted_data)?;
        for panel in &self.panels {
            builder.add_panel(panel.placement(self.color_order))?;
        }
        builder.build()
    }

    /// Main canvas at `start_channel` with every configured sub-matrix.
    pub fn build_canvas(
        &self,
        start_channel: usize,
        matrix: &PanelMatrix,
    ) -> Result<Canvas, LinsnError> {
        let mut canvas = Canvas::new(start_channel, matrix.width(), matrix.height());
        for sub in &self.sub_matrices {
            canvas.add_sub_region(sub.region()?);
        }
        Ok(canvas)
    }

    /// Configured exponent; out-of-range values are left for
    /// [`GammaCurve`] to replace.
    pub fn gamma_value(&self) -> f32 {
        self.gamma.value()
    }

    pub fn gamma_curve(&self) -> GammaCurve {
        GammaCurve::new(self.gamma_value())
    }

    /// The `sourceMAC` override, if one is set and non-empty.
    pub fn source_mac(&self) -> Result<Option<MacAddr>, LinsnError> {
        match self.source_mac.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }

    /// Preview model base name.
    pub fn model_name(&self) -> &str {
        match self.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d,
            _ => DEFAULT_MODEL_NAME,
        }
    }

    pub fn discovery_schedule(&self) -> DiscoverySchedule {
        self.discovery.schedule()
    }
}

// ── GammaSetting ─────────────────────────────────────────────────

/// Gamma exponent as written in the config: a number or a numeric string.
///
/// Anything else deserializes to the default exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GammaSetting {
    Number(f32),
    Text(String),
}

impl Default for GammaSetting {
    fn default() -> Self {
        GammaSetting::Number(DEFAULT_GAMMA)
    }
}

impl GammaSetting {
    /// The exponent, or 1.0 when the text does not parse.
    pub fn value(&self) -> f32 {
        match self {
            GammaSetting::Number(g) => *g,
            GammaSetting::Text(s) if s.trim().is_empty() => DEFAULT_GAMMA,
            GammaSetting::Text(s) => s.trim().parse().unwrap_or_else(|_| {
                warn!("gamma {s:?} is not a number, using {DEFAULT_GAMMA}");
                DEFAULT_GAMMA
            }),
        }
    }
}

// ── PanelConfig ──────────────────────────────────────────────────

/// One entry of `panels[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
    pub output_number: usize,
    /// Position along the output's chain, 0 nearest the receiver.
    pub panel_number: usize,
    /// `N`, `U`, `R` or `L`; only the first character is read.
    pub orientation: String,
    pub x_offset: usize,
    pub y_offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_order: Option<ColorOrder>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            output_number: 0,
            panel_number: 0,
            orientation: "N".to_string(),
            x_offset: 0,
            y_offset: 0,
            color_order: None,
        }
    }
}

impl PanelConfig {
    fn placement(&self, default_order: ColorOrder) -> PanelPlacement {
        let orientation = match self.orientation.trim().chars().next() {
            Some(c) => Orientation::from_char(c).unwrap_or_else(|e| {
                warn!("panel {}/{}: {e}, using N", self.output_number, self.panel_number);
                Orientation::Normal
            }),
            None => Orientation::Normal,
        };
        PanelPlacement {
            output: self.output_number,
            chain: self.panel_number,
            orientation,
            x_offset: self.x_offset,
            y_offset: self.y_offset,
            color_order: self.color_order.unwrap_or(default_order),
        }
    }
}

// ── SubMatrixConfig ──────────────────────────────────────────────

/// One entry of `subMatrices[]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubMatrixConfig {
    #[serde(deserialize_with = "bool_or_int")]
    pub enabled: bool,
    /// One-based channel where the sub-matrix data starts.
    pub start_channel: usize,
    pub width: usize,
    pub height: usize,
    pub x_offset: usize,
    pub y_offset: usize,
}

impl SubMatrixConfig {
    fn region(&self) -> Result<SubRegion, LinsnError> {
        let start_channel = self.start_channel.checked_sub(1).ok_or_else(|| {
            LinsnError::InvalidConfig("sub-matrix startChannel is one-based".into())
        })?;
        Ok(SubRegion {
            enabled: self.enabled,
            start_channel,
            width: self.width,
            height: self.height,
            x_offset: self.x_offset,
            y_offset: self.y_offset,
        })
    }
}

// ── DiscoveryConfig ──────────────────────────────────────────────

/// Wake-up handshake tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    pub attempts: usize,
    pub interval_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let schedule = DiscoverySchedule::default();
        Self {
            attempts: schedule.attempts,
            interval_ms: schedule.interval.as_millis() as u64,
        }
    }
}

impl DiscoveryConfig {
    pub fn schedule(&self) -> DiscoverySchedule {
        DiscoverySchedule {
            attempts: self.attempts,
            interval: Duration::from_millis(self.interval_ms),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Accept any scalar for `gamma`; values that are neither a number nor
/// a string fall back to the default exponent.
fn lenient_gamma<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GammaSetting, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(g) => GammaSetting::Number(g as f32),
            None => GammaSetting::default(),
        },
        serde_json::Value::String(s) => GammaSetting::Text(s),
        serde_json::Value::Null => GammaSetting::default(),
        other => {
            warn!("gamma {other} is not a number, using {DEFAULT_GAMMA}");
            GammaSetting::default()
        }
    })
}

/// Accept `true`/`false` as well as `0`/`1`.
fn bool_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
