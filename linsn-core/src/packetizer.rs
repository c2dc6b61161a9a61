//! Splits the hardware frame buffer into sequenced raw frames.
//!
//! Each tick is one header-only lead frame (sequence 0) followed by
//! payload frames numbered from 1, each carrying the next 480 pixels of
//! the hardware frame buffer. There is no acknowledgement; a failed send
//! drops the rest of the tick.

use tracing::warn;

use crate::error::LinsnError;
use crate::format::FormatCode;
use crate::mac::MacAddr;
use crate::remap::HardwareFrame;
use crate::transport::Transport;
use crate::wire::{LinkFrame, PAYLOAD_LEN, PIXELS_PER_FRAME};

/// Frames per tick (lead frame included) for a canvas `canvas_height`
/// rows tall.
pub const fn frame_packets(canvas_height: usize, format: &FormatCode) -> usize {
    (canvas_height * format.max_width + format.payload_offset) / PIXELS_PER_FRAME + 1
}

/// Bytes of hardware buffer read by one tick's payload frames.
pub const fn payload_span(frame_packets: usize) -> usize {
    frame_packets.saturating_sub(1) * PAYLOAD_LEN
}

// ── TickOutcome ──────────────────────────────────────────────────

/// Result of streaming one hardware frame.
#[derive(Debug)]
pub enum TickOutcome {
    /// Every frame of the tick was handed to the transport.
    Delivered { frames: usize },
    /// The send of `sequence` failed; later frames were not sent.
    Dropped { sequence: u16, error: LinsnError },
}

impl TickOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, TickOutcome::Delivered { .. })
    }
}

// ── Packetizer ───────────────────────────────────────────────────

/// Owns the scratch frame and the per-tick sequencing.
#[derive(Debug)]
pub struct Packetizer {
    frame: LinkFrame,
    format: FormatCode,
    source: MacAddr,
    packets: usize,
}

impl Packetizer {
    pub fn new(format: FormatCode, source: MacAddr, canvas_height: usize) -> Self {
        Self {
            frame: LinkFrame::new(),
            format,
            source,
            packets: frame_packets(canvas_height, &format),
        }
    }

    /// Frames sent per tick, lead frame included.
    pub fn frame_packets(&self) -> usize {
        self.packets
    }

    pub fn source(&self) -> MacAddr {
        self.source
    }

    /// Scratch frame, for the discovery handshake.
    pub fn frame_mut(&mut self) -> &mut LinkFrame {
        &mut self.frame
    }

    /// Send the lead frame and every payload frame for one tick.
    ///
    /// `hardware` must hold at least [`payload_span`] bytes of storage.
    pub fn send_tick<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        hardware: &HardwareFrame,
    ) -> TickOutcome {
        self.frame.set_addresses(MacAddr::RECEIVER, self.source);
        self.frame.clear_payload();
        self.frame.set_sequence(0);
        self.frame.set_status(&self.format);

        if let Err(error) = transport.send_frame(self.frame.as_bytes()) {
            warn!("lead frame send failed: {error}");
            return TickOutcome::Dropped { sequence: 0, error };
        }

        self.frame.clear_protocol_header();
        let mut offset = 0;
        for sequence in 1..self.packets {
            let sequence = sequence as u16;
            self.frame.set_sequence(sequence);
            self.frame
                .payload_mut()
                .copy_from_slice(hardware.window(offset, PAYLOAD_LEN));

            if let Err(error) = transport.send_frame(self.frame.as_bytes()) {
                warn!("payload frame {sequence} send failed: {error}");
                return TickOutcome::Dropped { sequence, error };
            }
            offset += PAYLOAD_LEN;
        }

        TickOutcome::Delivered {
            frames: self.packets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FORMAT_CODES;
    use crate::transport::MemoryTransport;
    use crate::wire::HEADER_LEN;

    const SRC: MacAddr = MacAddr([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

    fn hardware_for(format: &FormatCode, packets: usize) -> HardwareFrame {
        HardwareFrame::with_slack(format.frame_buffer_len(), payload_span(packets))
    }

    #[test]
    fn frame_packets_formula() {
        let small = FORMAT_CODES[0];
        let large = FORMAT_CODES[1];
        assert_eq!(frame_packets(16, &small), (16 * 512 + 96) / 480 + 1);
        assert_eq!(frame_packets(16, &small), 18);
        assert_eq!(frame_packets(256, &small), 274);
        assert_eq!(frame_packets(300, &large), (300 * 1024 + 1632) / 480 + 1);
        assert_eq!(frame_packets(512, &large), 1096);
    }

    #[test]
    fn slack_covers_the_last_window() {
        for format in FORMAT_CODES {
            let packets = frame_packets(format.max_height, format);
            let hw = hardware_for(format, packets);
            assert!(hw.capacity() >= payload_span(packets));
            assert_eq!(hw.len(), format.frame_buffer_len());
        }
    }

    #[test]
    fn tick_sequences_frames_from_zero() {
        let format = FORMAT_CODES[0];
        let mut p = Packetizer::new(format, SRC, 16);
        let hw = hardware_for(&format, p.frame_packets());
        let mut t = MemoryTransport::new();
        let log = t.log();

        let outcome = p.send_tick(&mut t, &hw);
        assert!(matches!(outcome, TickOutcome::Delivered { frames: 18 }));

        let frames = log.frames();
        assert_eq!(frames.len(), 18);
        for (i, f) in frames.iter().enumerate() {
            assert_eq!(u16::from_le_bytes([f[14], f[15]]) as usize, i);
            assert_eq!(&f[0..6], &MacAddr::RECEIVER.octets());
        }
    }

    #[test]
    fn lead_frame_carries_status_payload_frames_do_not() {
        let format = FORMAT_CODES[1];
        let mut p = Packetizer::new(format, SRC, 16);
        let hw = hardware_for(&format, p.frame_packets());
        let mut t = MemoryTransport::new();
        let log = t.log();
        p.send_tick(&mut t, &hw);

        let frames = log.frames();
        let lead = &frames[0];
        assert_eq!(lead[27], 0x1f);
        assert_eq!(lead[45], 0xc2);
        assert_eq!(&lead[39..45], &SRC.octets());
        assert!(lead[HEADER_LEN..].iter().all(|&b| b == 0));

        let data = &frames[1];
        assert_eq!(data[45], 0);
        assert_eq!(data[22], 0);
        assert_eq!(&data[12..14], &[0xaa, 0x55]);
    }

    #[test]
    fn payload_windows_follow_the_buffer() {
        let format = FORMAT_CODES[0];
        let mut p = Packetizer::new(format, SRC, 16);
        let mut hw = hardware_for(&format, p.frame_packets());
        for (i, b) in hw.as_bytes_mut().iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }
        let mut t = MemoryTransport::new();
        let log = t.log();
        p.send_tick(&mut t, &hw);

        let frames = log.frames();
        for (seq, f) in frames.iter().enumerate().skip(1) {
            let start = (seq - 1) * PAYLOAD_LEN;
            assert_eq!(&f[HEADER_LEN..], hw.window(start, PAYLOAD_LEN));
        }
    }

    #[test]
    fn failure_mid_tick_stops_sending() {
        let format = FORMAT_CODES[0];
        let mut p = Packetizer::new(format, SRC, 16);
        let hw = hardware_for(&format, p.frame_packets());
        let mut t = MemoryTransport::new();
        t.fail_attempt(5);
        let log = t.log();

        match p.send_tick(&mut t, &hw) {
            TickOutcome::Dropped { sequence, error } => {
                assert_eq!(sequence, 5);
                assert!(matches!(error, LinsnError::SendFailed(_)));
            }
            other => panic!("expected drop, got {other:?}"),
        }
        assert_eq!(log.len(), 5);

        // Next tick starts over from the lead frame.
        log.drain();
        assert!(p.send_tick(&mut t, &hw).is_delivered());
        assert_eq!(log.frames()[0][14..16], [0, 0]);
        assert_eq!(log.len(), 18);
    }

    #[test]
    fn lead_failure_reports_sequence_zero() {
        let format = FORMAT_CODES[0];
        let mut p = Packetizer::new(format, SRC, 16);
        let hw = hardware_for(&format, p.frame_packets());
        let mut t = MemoryTransport::new();
        t.fail_attempt(0);
        assert!(matches!(
            p.send_tick(&mut t, &hw),
            TickOutcome::Dropped { sequence: 0, .. }
        ));
        assert_eq!(t.attempts(), 1);
    }
}
