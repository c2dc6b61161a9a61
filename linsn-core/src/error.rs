//! Domain-specific error types for the Linsn output driver.
//!
//! Initialization failures are fatal for an output instance and are
//! returned from `LinsnOutput::init`. Send failures during streaming are
//! reported per tick and never tear the instance down.

use thiserror::Error;

/// The canonical error type for the Linsn driver.
#[derive(Debug, Error)]
pub enum LinsnError {
    // ── Initialization Errors ────────────────────────────────────
    /// The panel layout could not be turned into a pixel map.
    #[error("invalid panel geometry: {0}")]
    Geometry(String),

    /// No hardware frame format covers the requested canvas.
    #[error("no format code covers a {width}x{height} canvas")]
    NoFormatAvailable { width: usize, height: usize },

    /// A configuration value could not be interpreted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A MAC address string was not six colon-separated hex octets.
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),

    // ── Transport Errors ─────────────────────────────────────────
    /// The named network interface does not exist.
    #[error("network interface not found: {0}")]
    InterfaceNotFound(String),

    /// Raw socket creation or binding failed.
    #[error("raw socket {op} failed: {source}")]
    Socket {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Every packet-filter device on the host is busy or missing.
    #[error("no free packet-filter device (probed {probed})")]
    DeviceExhausted { probed: usize },

    /// A single frame could not be transmitted.
    #[error("frame send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    // ── Streaming Errors ─────────────────────────────────────────
    /// The operation is not valid in the output's current phase.
    #[error("invalid output state: {0}")]
    InvalidState(&'static str),

    /// The channel buffer does not reach the end of this output's range.
    #[error("channel buffer too short: need {needed} bytes, got {actual}")]
    ChannelBufferTooShort { needed: usize, actual: usize },

    // ── Serialization Errors ─────────────────────────────────────
    /// The JSON channel-output object failed to parse.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinsnError {
    /// The OS error code behind a transport failure, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::SendFailed(e) | Self::Socket { source: e, .. } => e.raw_os_error(),
            _ => None,
        }
    }
}
