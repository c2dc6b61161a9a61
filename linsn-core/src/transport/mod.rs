//! Link-layer transport: "send a raw frame on this interface".
//!
//! | Module   | Platform                        |
//! |----------|---------------------------------|
//! | `packet` | Linux `AF_PACKET` raw socket    |
//! | `bpf`    | macOS / BSD `/dev/bpfN` device  |
//! | `memory` | In-process recorder (any)       |
//!
//! [`bind`] opens the implementation native to the build target.

use crate::error::LinsnError;
use crate::mac::MacAddr;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub mod bpf;
pub mod memory;
#[cfg(target_os = "linux")]
pub mod packet;

pub use memory::{FrameLog, MemoryTransport};

// ── Transport ────────────────────────────────────────────────────

/// A bound raw link-layer sender.
pub trait Transport {
    /// Transmit exactly one frame. No retry, no queuing.
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, LinsnError>;

    /// The interface's own hardware address, if it could be resolved.
    fn hardware_addr(&self) -> Option<MacAddr>;

    /// Release the underlying descriptor. Safe to call repeatedly.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, LinsnError> {
        (**self).send_frame(frame)
    }

    fn hardware_addr(&self) -> Option<MacAddr> {
        (**self).hardware_addr()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

// ── Native binding ───────────────────────────────────────────────

#[cfg(target_os = "linux")]
pub type NativeTransport = packet::PacketSocket;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub type NativeTransport = bpf::BpfDevice;

/// Open the platform's raw transport on `interface`.
#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub fn bind(interface: &str) -> Result<NativeTransport, LinsnError> {
    NativeTransport::bind(interface)
}

/// Raw link-layer access is not available on this platform.
#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
pub fn bind(interface: &str) -> Result<MemoryTransport, LinsnError> {
    Err(LinsnError::Socket {
        op: "open",
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("raw frames unsupported on this platform ({interface})"),
        ),
    })
}
