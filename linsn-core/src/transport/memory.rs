//! In-process transport that records frames instead of sending them.
//!
//! Used by tests and by dry runs. Individual send attempts can be made
//! to fail to exercise the per-tick recovery path.

use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::LinsnError;
use crate::mac::MacAddr;
use crate::transport::Transport;

/// Shared view of every frame a [`MemoryTransport`] accepted.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FrameLog {
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every recorded frame, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().clone()
    }

    /// Remove and return every recorded frame.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.lock())
    }

    fn push(&self, frame: &[u8]) {
        self.lock().push(frame.to_vec());
    }
}

/// Transport that keeps frames in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    log: FrameLog,
    hardware_addr: Option<MacAddr>,
    attempts: usize,
    failures: BTreeSet<usize>,
    open: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            log: FrameLog::default(),
            hardware_addr: None,
            attempts: 0,
            failures: BTreeSet::new(),
            open: true,
        }
    }

    pub fn with_hardware_addr(mut self, mac: MacAddr) -> Self {
        self.hardware_addr = Some(mac);
        self
    }

    /// Make send attempt number `attempt` (zero-based, counting every
    /// call including failed ones) fail with `ENETDOWN`.
    pub fn fail_attempt(&mut self, attempt: usize) {
        self.failures.insert(attempt);
    }

    /// Handle onto the recorded frames, valid after the transport moves.
    pub fn log(&self) -> FrameLog {
        self.log.clone()
    }

    /// Send attempts so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize, LinsnError> {
        let attempt = self.attempts;
        self.attempts += 1;

        if !self.open {
            return Err(LinsnError::SendFailed(io::Error::from(
                io::ErrorKind::NotConnected,
            )));
        }
        if self.failures.remove(&attempt) {
            #[cfg(unix)]
            let err = io::Error::from_raw_os_error(libc::ENETDOWN);
            #[cfg(not(unix))]
            let err = io::Error::from(io::ErrorKind::BrokenPipe);
            return Err(LinsnError::SendFailed(err));
        }

        self.log.push(frame);
        Ok(frame.len())
    }

    fn hardware_addr(&self) -> Option<MacAddr> {
        self.hardware_addr
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_frames() {
        let mut t = MemoryTransport::new();
        let log = t.log();
        assert_eq!(t.send_frame(&[1, 2, 3]).unwrap(), 3);
        t.send_frame(&[4]).unwrap();
        assert_eq!(log.frames(), vec![vec![1, 2, 3], vec![4]]);
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut t = MemoryTransport::new();
        t.fail_attempt(1);
        assert!(t.send_frame(&[0]).is_ok());
        let err = t.send_frame(&[0]).unwrap_err();
        assert!(matches!(err, LinsnError::SendFailed(_)));
        assert!(t.send_frame(&[0]).is_ok());
        assert_eq!(t.attempts(), 3);
        assert_eq!(t.log().len(), 2);
    }

    #[test]
    fn close_is_idempotent_and_rejects_sends() {
        let mut t = MemoryTransport::new().with_hardware_addr(MacAddr([2; 6]));
        assert_eq!(t.hardware_addr(), Some(MacAddr([2; 6])));
        t.close();
        t.close();
        assert!(!t.is_open());
        assert!(t.send_frame(&[0]).is_err());
    }
}
