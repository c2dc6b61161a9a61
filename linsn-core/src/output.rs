//! The Linsn output instance: lifecycle, per-tick streaming, preview
//! registration.
//!
//! ```text
//!  Uninitialized ──► Negotiating ──► Discovering ──► Streaming
//!                         │                              │
//!                         ▼                              ▼
//!                   (init fails)                       Closed
//! ```
//!
//! Every phase may move to `Closed`; nothing leaves it.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::OutputConfig;
use crate::discovery::{self, DiscoveryReport};
use crate::error::LinsnError;
use crate::format::{self, FormatCode};
use crate::gamma::GammaCurve;
use crate::mac::MacAddr;
use crate::model::{AutoModel, ModelRegistry, StartCorner};
use crate::overlay::Canvas;
use crate::packetizer::{self, Packetizer, TickOutcome};
use crate::panel::PanelMatrix;
use crate::remap::{self, HardwareFrame, RemapLayout};
use crate::transport::Transport;

// ── OutputPhase ──────────────────────────────────────────────────

/// Lifecycle phase of a [`LinsnOutput`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputPhase {
    #[default]
    Uninitialized,

    /// Selecting a format and binding the transport.
    Negotiating,

    /// Sending the wake-up broadcast.
    Discovering,

    /// Accepting ticks.
    Streaming {
        /// When streaming began.
        since: Instant,
    },

    /// Transport released. Terminal.
    Closed,
}

impl std::fmt::Display for OutputPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Negotiating => write!(f, "Negotiating"),
            Self::Discovering => write!(f, "Discovering"),
            Self::Streaming { .. } => write!(f, "Streaming"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

impl OutputPhase {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Time spent streaming, `None` in any other phase.
    pub fn streaming_duration(&self) -> Option<Duration> {
        match self {
            Self::Streaming { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Uninitialized`.
    pub fn begin_negotiation(&mut self) -> Result<(), LinsnError> {
        match self {
            Self::Uninitialized => {
                *self = Self::Negotiating;
                Ok(())
            }
            _ => Err(LinsnError::InvalidState(
                "cannot negotiate: not in Uninitialized state",
            )),
        }
    }

    /// Valid from: `Negotiating`.
    pub fn begin_discovery(&mut self) -> Result<(), LinsnError> {
        match self {
            Self::Negotiating => {
                *self = Self::Discovering;
                Ok(())
            }
            _ => Err(LinsnError::InvalidState(
                "cannot discover: not in Negotiating state",
            )),
        }
    }

    /// Valid from: `Discovering`.
    pub fn start_streaming(&mut self) -> Result<(), LinsnError> {
        match self {
            Self::Discovering => {
                *self = Self::Streaming {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(LinsnError::InvalidState(
                "cannot stream: not in Discovering state",
            )),
        }
    }

    /// Valid from any phase. Returns `false` if already closed.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        *self = Self::Closed;
        true
    }
}

// ── OutputPlan ───────────────────────────────────────────────────

/// Everything `init` derives from the configuration before touching
/// the network.
#[derive(Debug, Clone)]
pub struct OutputPlan {
    start_channel: usize,
    matrix: PanelMatrix,
    canvas: Canvas,
    format: FormatCode,
    layout: RemapLayout,
    gamma: GammaCurve,
    frame_packets: usize,
}

impl OutputPlan {
    /// Build the geometry and pick a format. No I/O.
    pub fn new(start_channel: usize, config: &OutputConfig) -> Result<Self, LinsnError> {
        let matrix = config.build_matrix()?;
        let canvas = config.build_canvas(start_channel, &matrix)?;
        // The format has to hold the canvas and every output band.
        let (band_width, band_height) = RemapLayout::extent(&matrix);
        let format = format::negotiate(
            matrix.width().max(band_width),
            matrix.height().max(band_height),
        )?;
        let layout = RemapLayout::new(&matrix, &format)?;

        let raw_gamma = config.gamma_value();
        let gamma = GammaCurve::new(raw_gamma);
        if GammaCurve::sanitize(raw_gamma) != raw_gamma {
            warn!("gamma {raw_gamma} outside supported range, using 1.0");
        }

        let frame_packets = packetizer::frame_packets(matrix.height(), &format);

        Ok(Self {
            start_channel,
            matrix,
            canvas,
            format,
            layout,
            gamma,
            frame_packets,
        })
    }

    pub fn start_channel(&self) -> usize {
        self.start_channel
    }

    pub fn channel_count(&self) -> usize {
        self.matrix.channel_count()
    }

    pub fn matrix(&self) -> &PanelMatrix {
        &self.matrix
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn format(&self) -> &FormatCode {
        &self.format
    }

    pub fn gamma(&self) -> &GammaCurve {
        &self.gamma
    }

    /// Logical hardware frame size.
    pub fn frame_buffer_len(&self) -> usize {
        self.format.frame_buffer_len()
    }

    /// Frames per tick, lead frame included.
    pub fn frame_packets(&self) -> usize {
        self.frame_packets
    }

    /// Inclusive channel range this output reads.
    pub fn channel_range(&self) -> (usize, usize) {
        (
            self.start_channel,
            self.start_channel + self.channel_count().saturating_sub(1),
        )
    }

    fn allocate_frame(&self) -> HardwareFrame {
        HardwareFrame::with_slack(
            self.frame_buffer_len(),
            packetizer::payload_span(self.frame_packets),
        )
    }
}

// ── LinsnOutput ──────────────────────────────────────────────────

/// One Linsn receiver chain driven over a raw link-layer transport.
pub struct LinsnOutput<T: Transport> {
    plan: OutputPlan,
    interface: String,
    model_name: String,
    transport: T,
    packetizer: Packetizer,
    hardware: HardwareFrame,
    discovery: DiscoveryReport,
    phase: OutputPhase,
}

impl<T: Transport> LinsnOutput<T> {
    /// Negotiate, bind with `bind`, run discovery and start streaming.
    ///
    /// Any failure before discovery is returned and no instance exists.
    pub fn init<F>(start_channel: usize, config: &OutputConfig, bind: F) -> Result<Self, LinsnError>
    where
        F: FnOnce(&str) -> Result<T, LinsnError>,
    {
        let mut phase = OutputPhase::default();
        phase.begin_negotiation()?;

        let plan = OutputPlan::new(start_channel, config)?;
        let override_mac = config.source_mac()?;
        info!(
            "canvas {}x{} uses format {}",
            plan.matrix.width(),
            plan.matrix.height(),
            plan.format
        );

        let mut transport = bind(&config.interface)?;
        let source = match override_mac.or_else(|| transport.hardware_addr()) {
            Some(mac) => mac,
            None => {
                warn!(
                    "no hardware address for {}, sending from {}",
                    config.interface,
                    MacAddr::default()
                );
                MacAddr::default()
            }
        };

        phase.begin_discovery()?;
        let mut packetizer = Packetizer::new(plan.format, source, plan.matrix.height());
        let report = discovery::run(
            &mut transport,
            packetizer.frame_mut(),
            &plan.format,
            source,
            &config.discovery_schedule(),
        );
        phase.start_streaming()?;

        let hardware = plan.allocate_frame();
        info!(
            "streaming {} channels from {} on {}",
            plan.channel_count(),
            source,
            config.interface
        );

        Ok(Self {
            interface: config.interface.clone(),
            model_name: config.model_name().to_string(),
            plan,
            transport,
            packetizer,
            hardware,
            discovery: report,
            phase,
        })
    }

    /// Composite sub-regions and rebuild the hardware frame from
    /// `channels`.
    ///
    /// Sub-regions are copied in place, so `channels` is modified.
    pub fn prep_data(&mut self, channels: &mut [u8]) -> Result<(), LinsnError> {
        self.check_streaming()?;
        let needed = self.plan.start_channel + self.plan.channel_count();
        if channels.len() < needed {
            return Err(LinsnError::ChannelBufferTooShort {
                needed,
                actual: channels.len(),
            });
        }

        self.plan.canvas.apply_overlays(channels);
        remap::remap(
            &self.plan.matrix,
            &self.plan.layout,
            &self.plan.gamma,
            &channels[self.plan.start_channel..needed],
            self.hardware.as_bytes_mut(),
        );
        Ok(())
    }

    /// Send the current hardware frame.
    ///
    /// Returns the channel count when every frame went out, `0` when a
    /// send failed and the tick was dropped.
    pub fn transmit(&mut self) -> Result<usize, LinsnError> {
        self.check_streaming()?;
        match self.packetizer.send_tick(&mut self.transport, &self.hardware) {
            TickOutcome::Delivered { .. } => Ok(self.plan.channel_count()),
            TickOutcome::Dropped { sequence, error } => {
                warn!(
                    "tick dropped at frame {sequence}/{} on {}: {error}",
                    self.plan.frame_packets, self.interface
                );
                Ok(0)
            }
        }
    }

    /// [`prep_data`](Self::prep_data) then [`transmit`](Self::transmit).
    pub fn send_data(&mut self, channels: &mut [u8]) -> Result<usize, LinsnError> {
        self.prep_data(channels)?;
        self.transmit()
    }

    /// Release the transport. Later sends fail with `InvalidState`.
    pub fn close(&mut self) {
        if self.phase.close() {
            self.transport.close();
            debug!("closed output on {}", self.interface);
        }
    }

    /// Publish the canvas as an auto-created preview model.
    ///
    /// Returns the name the model was registered under.
    pub fn register_preview<R: ModelRegistry + ?Sized>(
        &self,
        registry: &mut R,
    ) -> Result<String, LinsnError> {
        let name = registry.unique_name(&self.model_name);
        let model = AutoModel {
            name: name.clone(),
            start_channel: self.plan.start_channel,
            channel_count: self.plan.channel_count(),
            channels_per_node: 3,
            start_corner: if self.plan.matrix.is_inverted() {
                StartCorner::BottomLeft
            } else {
                StartCorner::TopLeft
            },
            strings: self.plan.matrix.height(),
            strands_per_string: 1,
        };
        registry.add_auto_model(model)?;
        info!("registered preview model {name:?}");
        Ok(name)
    }

    /// Channel ranges read by this output, inclusive.
    pub fn required_channel_ranges(&self) -> Vec<(usize, usize)> {
        vec![self.plan.channel_range()]
    }

    /// Log the resolved configuration at debug level.
    pub fn dump_config(&self) {
        let fc = &self.plan.format;
        debug!("Linsn RV9 output on {}", self.interface);
        debug!("  source MAC      : {}", self.packetizer.source());
        debug!(
            "  canvas          : {}x{} ({} panels of {}x{}, {} outputs)",
            self.plan.matrix.width(),
            self.plan.matrix.height(),
            self.plan.matrix.panel_count(),
            self.plan.matrix.panel_width(),
            self.plan.matrix.panel_height(),
            self.plan.matrix.output_count()
        );
        debug!("  channels        : {}", self.plan.channel_count());
        debug!("  format          : {fc}");
        debug!("  payload offset  : {}", fc.payload_offset);
        debug!("  frame buffer    : {} bytes", self.hardware.len());
        debug!("  frames per tick : {}", self.plan.frame_packets);
        debug!("  gamma identity  : {}", self.plan.gamma.is_identity());
        debug!(
            "  discovery       : {} sent, {} failed",
            self.discovery.sent, self.discovery.failed
        );
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn phase(&self) -> &OutputPhase {
        &self.phase
    }

    pub fn plan(&self) -> &OutputPlan {
        &self.plan
    }

    pub fn format(&self) -> &FormatCode {
        &self.plan.format
    }

    pub fn channel_count(&self) -> usize {
        self.plan.channel_count()
    }

    pub fn frame_packets(&self) -> usize {
        self.plan.frame_packets
    }

    pub fn frame_buffer(&self) -> &HardwareFrame {
        &self.hardware
    }

    pub fn source_mac(&self) -> MacAddr {
        self.packetizer.source()
    }

    pub fn discovery_report(&self) -> DiscoveryReport {
        self.discovery
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn check_streaming(&self) -> Result<(), LinsnError> {
        if self.phase.is_streaming() {
            Ok(())
        } else if self.phase.is_closed() {
            Err(LinsnError::InvalidState("output is closed"))
        } else {
            Err(LinsnError::InvalidState("output is not streaming"))
        }
    }
}

impl<T: Transport> Drop for LinsnOutput<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> std::fmt::Debug for LinsnOutput<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinsnOutput")
            .field("interface", &self.interface)
            .field("phase", &self.phase)
            .field("format", &self.plan.format)
            .field("channels", &self.plan.channel_count())
            .finish()
    }
}
