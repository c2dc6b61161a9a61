//! Wake-up handshake sent before streaming starts.
//!
//! Receivers have to see broadcast frames from the host before they
//! accept unicast pixel data. The exchange observed on the wire is:
//!
//! ```text
//! host ──► ff:ff:ff:ff:ff:ff   trailer 00 00
//!          (receiver replies with two bytes, typically fe ff)
//! host ──► ff:ff:ff:ff:ff:ff   trailer fe ff
//! ```
//!
//! Replies are never read. After the last attempt every frame goes to
//! the receiver's fixed unicast address.

use std::time::Duration;

use tracing::{debug, warn};

use crate::format::FormatCode;
use crate::mac::MacAddr;
use crate::transport::Transport;
use crate::wire::{DISCOVERY_ACK, LinkFrame};

/// Number of broadcast frames and the pause after each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySchedule {
    pub attempts: usize,
    pub interval: Duration,
}

impl Default for DiscoverySchedule {
    fn default() -> Self {
        Self {
            attempts: 2,
            interval: Duration::from_secs(1),
        }
    }
}

/// Outcome of a handshake run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Broadcast the wake-up frames, then point `frame` at the receiver.
///
/// Send failures are logged and counted but never abort the sequence.
pub fn run<T: Transport + ?Sized>(
    transport: &mut T,
    frame: &mut LinkFrame,
    format: &FormatCode,
    source: MacAddr,
    schedule: &DiscoverySchedule,
) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();

    frame.clear_payload();
    frame.set_sequence(0);
    frame.set_addresses(MacAddr::BROADCAST, source);
    frame.set_status(format);

    for attempt in 0..schedule.attempts {
        match transport.send_frame(frame.as_bytes()) {
            Ok(_) => report.sent += 1,
            Err(e) => {
                warn!("discovery frame {attempt} failed: {e}");
                report.failed += 1;
            }
        }

        frame.set_discovery_trailer(DISCOVERY_ACK);

        if !schedule.interval.is_zero() {
            std::thread::sleep(schedule.interval);
        }
    }

    frame.set_addresses(MacAddr::RECEIVER, source);
    debug!(
        "discovery done: {} sent, {} failed; streaming to {}",
        report.sent,
        report.failed,
        MacAddr::RECEIVER
    );
    report
}
