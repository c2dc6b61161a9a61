//! Linux `AF_PACKET` raw socket transport.
//!
//! The socket is bound with protocol 0 so the kernel never queues
//! inbound traffic on it; the driver only transmits.

use std::ffi::CString;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use tracing::debug;

use crate::error::LinsnError;
use crate::mac::MacAddr;
use crate::transport::Transport;
use crate::wire::ETHER_TYPE;

/// Raw Ethernet socket bound to one interface.
pub struct PacketSocket {
    fd: Option<OwnedFd>,
    interface: String,
    destination: libc::sockaddr_ll,
    hardware_addr: Option<MacAddr>,
}

impl PacketSocket {
    /// Open a raw socket on `interface` and resolve its MAC address.
    pub fn bind(interface: &str) -> Result<Self, LinsnError> {
        let index = interface_index(interface)?;

        // SAFETY: plain syscall; the result is checked before use.
        let raw = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, 0) };
        if raw < 0 {
            return Err(LinsnError::Socket {
                op: "socket",
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: `raw` is a freshly created descriptor we exclusively own.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: all-zero is a valid `sockaddr_ll`.
        let mut local: libc::sockaddr_ll = unsafe { mem::zeroed() };
        local.sll_family = libc::AF_PACKET as libc::c_ushort;
        local.sll_ifindex = index;

        // SAFETY: `local` outlives the call and the length matches its type.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &local as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(LinsnError::Socket {
                op: "bind",
                source: io::Error::last_os_error(),
            });
        }

        let mut destination = local;
        destination.sll_protocol = ETHER_TYPE.to_be();
        destination.sll_halen = 6;
        destination.sll_addr[..6].copy_from_slice(&MacAddr::RECEIVER.octets());

        let hardware_addr = read_hardware_addr(interface);
        debug!(
            "bound AF_PACKET socket on {interface} (index {index}, mac {})",
            hardware_addr.map(|m| m.to_string()).unwrap_or_else(|| "unknown".into())
        );

        Ok(Self {
            fd: Some(fd),
            interface: interface.to_string(),
            destination,
            hardware_addr,
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl Transport for PacketSocket {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, LinsnError> {
        let fd = self
            .fd
            .as_ref()
            .ok_or_else(|| LinsnError::SendFailed(io::Error::from(io::ErrorKind::NotConnected)))?;

        // SAFETY: `frame` and `destination` are valid for the duration of the call.
        let sent = unsafe {
            libc::sendto(
                fd.as_raw_fd(),
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
                &self.destination as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if sent < 0 {
            return Err(LinsnError::SendFailed(io::Error::last_os_error()));
        }
        Ok(sent as usize)
    }

    fn hardware_addr(&self) -> Option<MacAddr> {
        self.hardware_addr
    }

    fn close(&mut self) {
        if self.fd.take().is_some() {
            debug!("closed AF_PACKET socket on {}", self.interface);
        }
    }

    fn is_open(&self) -> bool {
        self.fd.is_some()
    }
}

impl std::fmt::Debug for PacketSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketSocket")
            .field("interface", &self.interface)
            .field("ifindex", &self.destination.sll_ifindex)
            .field("open", &self.fd.is_some())
            .field("hardware_addr", &self.hardware_addr)
            .finish()
    }
}

// ── Interface lookup ─────────────────────────────────────────────

fn interface_index(interface: &str) -> Result<libc::c_int, LinsnError> {
    let name =
        CString::new(interface).map_err(|_| LinsnError::InterfaceNotFound(interface.to_string()))?;
    // SAFETY: `name` is a valid NUL-terminated string.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    if index == 0 {
        return Err(LinsnError::InterfaceNotFound(interface.to_string()));
    }
    Ok(index as libc::c_int)
}

/// Interface MAC as published by the kernel in sysfs.
fn read_hardware_addr(interface: &str) -> Option<MacAddr> {
    std::fs::read_to_string(format!("/sys/class/net/{interface}/address"))
        .ok()
        .and_then(|s| s.parse::<MacAddr>().ok())
        .filter(|mac| !mac.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_interface_is_reported() {
        let err = PacketSocket::bind("linsn-nope0").unwrap_err();
        assert!(matches!(err, LinsnError::InterfaceNotFound(name) if name == "linsn-nope0"));
    }

    #[test]
    fn interior_nul_is_not_an_interface() {
        assert!(matches!(
            interface_index("eth\0"),
            Err(LinsnError::InterfaceNotFound(_))
        ));
    }

    #[test]
    fn loopback_has_an_index() {
        assert!(interface_index("lo").unwrap() > 0);
    }
}
