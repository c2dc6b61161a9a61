//! # linsn-core
//!
//! Channel-output driver for Linsn RV9 LED receiver cards, which take
//! pixel data as bare Ethernet frames (EtherType `0xAA55`).
//!
//! This crate contains:
//! - **Output**: `LinsnOutput` lifecycle (negotiate, discover, stream, close)
//! - **Wire**: `LinkFrame` fixed-size frame with named field accessors
//! - **Format**: `FormatCode` table and canvas-size negotiation
//! - **Remap**: panel-chain layout and gamma correction into the hardware frame
//! - **Geometry**: `PanelMatrix` builder, `Canvas` sub-region compositor
//! - **Transport**: `Transport` trait with `AF_PACKET`, `/dev/bpfN` and
//!   in-memory implementations
//! - **Config**: `OutputConfig`, the JSON channel-output object
//! - **Error**: `LinsnError`, a typed, `thiserror`-based error enum

pub mod config;
pub mod discovery;
pub mod error;
pub mod format;
pub mod gamma;
pub mod mac;
pub mod model;
pub mod output;
pub mod overlay;
pub mod packetizer;
pub mod panel;
pub mod remap;
pub mod transport;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use config::{DiscoveryConfig, GammaSetting, OutputConfig, PanelConfig, SubMatrixConfig};
pub use discovery::{DiscoveryReport, DiscoverySchedule};
pub use error::LinsnError;
pub use format::{FORMAT_CODES, FormatCode, negotiate};
pub use gamma::GammaCurve;
pub use mac::MacAddr;
pub use model::{AutoModel, MemoryRegistry, ModelRegistry, StartCorner};
pub use output::{LinsnOutput, OutputPhase, OutputPlan};
pub use overlay::{Canvas, SubRegion};
pub use packetizer::{Packetizer, TickOutcome, frame_packets};
pub use panel::{ColorOrder, Orientation, Panel, PanelMatrix, PanelMatrixBuilder, PanelPlacement};
pub use remap::{HardwareFrame, RemapLayout};
pub use transport::{FrameLog, MemoryTransport, Transport};
pub use wire::{ETHER_TYPE, FRAME_LEN, HEADER_LEN, LinkFrame, PAYLOAD_LEN};
