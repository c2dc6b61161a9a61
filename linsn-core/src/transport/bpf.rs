//! macOS / BSD packet-filter device transport.
//!
//! There is no raw Ethernet socket on these systems; instead a free
//! `/dev/bpfN` clone device is opened, attached to the interface with
//! `BIOCSETIF`, and told that written frames carry their own source
//! address with `BIOCSHDRCMPLT`.

use std::ffi::CStr;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;

use tracing::{debug, warn};

use crate::error::LinsnError;
use crate::mac::MacAddr;
use crate::transport::Transport;

/// Highest device number probed before giving up.
const MAX_BPF_DEVICES: usize = 255;

/// `_IOW('B', 108, struct ifreq)`
const BIOCSETIF: libc::c_ulong = 0x8020_426c;
/// `_IOW('B', 117, u_int)`
const BIOCSHDRCMPLT: libc::c_ulong = 0x8004_4275;

const IFNAMSIZ: usize = 16;

/// `struct ifreq` as far as `BIOCSETIF` reads it.
#[repr(C)]
struct IfReq {
    name: [libc::c_char; IFNAMSIZ],
    data: [u8; 16],
}

/// A packet-filter device attached to one interface.
pub struct BpfDevice {
    file: Option<File>,
    path: String,
    interface: String,
    hardware_addr: Option<MacAddr>,
}

impl BpfDevice {
    /// Open the first free `/dev/bpfN` and attach it to `interface`.
    pub fn bind(interface: &str) -> Result<Self, LinsnError> {
        if interface.is_empty() || interface.len() >= IFNAMSIZ || interface.contains('\0') {
            return Err(LinsnError::InterfaceNotFound(interface.to_string()));
        }
        let hardware_addr = link_address(interface)?;

        let (file, path) = open_free_device()?;

        let mut req = IfReq {
            name: [0; IFNAMSIZ],
            data: [0; 16],
        };
        for (dst, &src) in req.name.iter_mut().zip(interface.as_bytes()) {
            *dst = src as libc::c_char;
        }

        // SAFETY: `req` is a properly sized ifreq for this request.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), BIOCSETIF, &mut req as *mut IfReq) };
        if rc < 0 {
            return Err(LinsnError::Socket {
                op: "BIOCSETIF",
                source: io::Error::last_os_error(),
            });
        }

        let mut yes: libc::c_uint = 1;
        // SAFETY: the request takes a pointer to an unsigned int.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), BIOCSHDRCMPLT, &mut yes as *mut libc::c_uint) };
        if rc < 0 {
            warn!(
                "BIOCSHDRCMPLT failed on {path}: {}",
                io::Error::last_os_error()
            );
        }

        debug!("attached {path} to {interface}");
        Ok(Self {
            file: Some(file),
            path,
            interface: interface.to_string(),
            hardware_addr: Some(hardware_addr).filter(|m| !m.is_zero()),
        })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl Transport for BpfDevice {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, LinsnError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LinsnError::SendFailed(io::Error::from(io::ErrorKind::NotConnected)))?;
        file.write(frame).map_err(LinsnError::SendFailed)
    }

    fn hardware_addr(&self) -> Option<MacAddr> {
        self.hardware_addr
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("closed {}", self.path);
        }
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

impl std::fmt::Debug for BpfDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpfDevice")
            .field("path", &self.path)
            .field("interface", &self.interface)
            .field("open", &self.file.is_some())
            .finish()
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn open_free_device() -> Result<(File, String), LinsnError> {
    for n in 0..MAX_BPF_DEVICES {
        let path = format!("/dev/bpf{n}");
        match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(_) => continue,
        }
    }
    Err(LinsnError::DeviceExhausted {
        probed: MAX_BPF_DEVICES,
    })
}

/// Link-layer address of `interface` from `getifaddrs`.
///
/// Fails with `InterfaceNotFound` when no `AF_LINK` entry matches.
fn link_address(interface: &str) -> Result<MacAddr, LinsnError> {
    let mut list: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: `list` receives a heap list freed below.
    if unsafe { libc::getifaddrs(&mut list) } != 0 {
        return Err(LinsnError::Socket {
            op: "getifaddrs",
            source: io::Error::last_os_error(),
        });
    }

    let mut found = None;
    let mut cur = list;
    while !cur.is_null() {
        // SAFETY: `cur` walks the list returned by getifaddrs.
        let entry = unsafe { &*cur };
        cur = entry.ifa_next;

        if entry.ifa_addr.is_null() {
            continue;
        }
        // SAFETY: ifa_name is a valid C string for every entry.
        let name = unsafe { CStr::from_ptr(entry.ifa_name) };
        // SAFETY: ifa_addr was checked for null above.
        let family = unsafe { (*entry.ifa_addr).sa_family } as libc::c_int;
        if family != libc::AF_LINK || name.to_bytes() != interface.as_bytes() {
            continue;
        }

        // SAFETY: AF_LINK entries point at a sockaddr_dl.
        let sdl = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_dl) };
        let start = sdl.sdl_nlen as usize;
        if sdl.sdl_alen as usize == 6 && start + 6 <= sdl.sdl_data.len() {
            let mut octets = [0u8; 6];
            for (dst, &src) in octets.iter_mut().zip(&sdl.sdl_data[start..start + 6]) {
                *dst = src as u8;
            }
            found = Some(MacAddr(octets));
        } else {
            found = Some(MacAddr::default());
        }
        break;
    }

    // SAFETY: `list` came from a successful getifaddrs call.
    unsafe { libc::freeifaddrs(list) };

    found.ok_or_else(|| LinsnError::InterfaceNotFound(interface.to_string()))
}
