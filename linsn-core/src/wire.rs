//! Raw Ethernet frame layout for Linsn receiver cards.
//!
//! The layout was reverse-engineered from captures of LED Studio talking
//! to an RV908 receiver. Only the fields below are known to matter; the
//! rest of the 46-byte header is sent as zero.
//!
//! ## Wire format
//!
//! ```text
//! 0..6     destination MAC
//! 6..12    source MAC
//! 12..14   EtherType 0xAA55 (network order)
//! 14..16   sequence number (little-endian)
//! 22       0x96
//! 26       0x85
//! 27       format status byte
//! 28..32   0xff (brightness)
//! 39..45   source MAC echo
//! 45       format code
//! 46..1486 pixel payload, 480 RGB pixels
//! ```

use crate::format::FormatCode;
use crate::mac::MacAddr;

// ── Constants ────────────────────────────────────────────────────

/// EtherType carried by every frame.
pub const ETHER_TYPE: u16 = 0xAA55;

/// Ethernet header plus protocol header.
pub const HEADER_LEN: usize = 46;

/// Pixels carried by one payload frame.
pub const PIXELS_PER_FRAME: usize = 480;

/// Payload window size in bytes.
pub const PAYLOAD_LEN: usize = PIXELS_PER_FRAME * 3;

/// Total size of every frame on the wire.
pub const FRAME_LEN: usize = HEADER_LEN + PAYLOAD_LEN;

const DST: std::ops::Range<usize> = 0..6;
const SRC: std::ops::Range<usize> = 6..12;
const TYPE: std::ops::Range<usize> = 12..14;
const SEQUENCE: std::ops::Range<usize> = 14..16;
const PROTOCOL_HEADER: std::ops::Range<usize> = 14..HEADER_LEN;
const STATUS_A: usize = 22;
const STATUS_B: usize = 26;
const FORMAT_STATUS: usize = 27;
const BRIGHTNESS: std::ops::Range<usize> = 28..32;
const SRC_ECHO: std::ops::Range<usize> = 39..45;
const FORMAT_CODE: usize = 45;

/// Frame offsets of the two bytes receivers echo back during discovery.
const DISCOVERY_TRAILER: std::ops::Range<usize> = 47..49;

const STATUS_A_VALUE: u8 = 0x96;
const STATUS_B_VALUE: u8 = 0x85;

/// Trailer value observed in receiver replies.
pub const DISCOVERY_ACK: [u8; 2] = [0xfe, 0xff];

// ── LinkFrame ────────────────────────────────────────────────────

/// Scratch buffer holding exactly one frame, reused for every send.
pub struct LinkFrame {
    bytes: [u8; FRAME_LEN],
}

impl LinkFrame {
    /// A zeroed frame with the EtherType already set.
    pub fn new() -> Self {
        let mut frame = Self {
            bytes: [0; FRAME_LEN],
        };
        frame.bytes[TYPE].copy_from_slice(&ETHER_TYPE.to_be_bytes());
        frame
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    // ── Addressing ───────────────────────────────────────────────

    pub fn destination(&self) -> MacAddr {
        MacAddr(self.bytes[DST].try_into().unwrap_or_default())
    }

    pub fn source(&self) -> MacAddr {
        MacAddr(self.bytes[SRC].try_into().unwrap_or_default())
    }

    pub fn source_echo(&self) -> MacAddr {
        MacAddr(self.bytes[SRC_ECHO].try_into().unwrap_or_default())
    }

    /// Set destination and source, echoing the source into the header.
    pub fn set_addresses(&mut self, destination: MacAddr, source: MacAddr) {
        self.bytes[DST].copy_from_slice(&destination.0);
        self.bytes[SRC].copy_from_slice(&source.0);
        self.bytes[SRC_ECHO].copy_from_slice(&source.0);
    }

    pub fn ether_type(&self) -> u16 {
        u16::from_be_bytes([self.bytes[TYPE.start], self.bytes[TYPE.start + 1]])
    }

    // ── Header fields ────────────────────────────────────────────

    pub fn sequence(&self) -> u16 {
        u16::from_le_bytes([self.bytes[SEQUENCE.start], self.bytes[SEQUENCE.start + 1]])
    }

    pub fn set_sequence(&mut self, sequence: u16) {
        self.bytes[SEQUENCE].copy_from_slice(&sequence.to_le_bytes());
    }

    /// Write the fixed status bytes and the format identification.
    pub fn set_status(&mut self, format: &FormatCode) {
        self.bytes[STATUS_A] = STATUS_A_VALUE;
        self.bytes[STATUS_B] = STATUS_B_VALUE;
        self.bytes[FORMAT_STATUS] = format.status_byte;
        self.bytes[BRIGHTNESS].fill(0xff);
        self.bytes[FORMAT_CODE] = format.code;
    }

    pub fn format_code(&self) -> u8 {
        self.bytes[FORMAT_CODE]
    }

    pub fn format_status(&self) -> u8 {
        self.bytes[FORMAT_STATUS]
    }

    /// Byte at an absolute frame offset.
    pub fn byte(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    /// Zero everything after the Ethernet header up to the payload.
    ///
    /// Payload frames carry only addressing and a sequence number.
    pub fn clear_protocol_header(&mut self) {
        self.bytes[PROTOCOL_HEADER].fill(0);
    }

    // ── Payload ──────────────────────────────────────────────────

    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[HEADER_LEN..]
    }

    pub fn clear_payload(&mut self) {
        self.payload_mut().fill(0);
    }

    pub fn discovery_trailer(&self) -> [u8; 2] {
        [
            self.bytes[DISCOVERY_TRAILER.start],
            self.bytes[DISCOVERY_TRAILER.start + 1],
        ]
    }

    pub fn set_discovery_trailer(&mut self, trailer: [u8; 2]) {
        self.bytes[DISCOVERY_TRAILER].copy_from_slice(&trailer);
    }
}

impl Default for LinkFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LinkFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkFrame")
            .field("destination", &self.destination())
            .field("source", &self.source())
            .field("sequence", &self.sequence())
            .field("format_code", &self.format_code())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FORMAT_CODES;

    #[test]
    fn frame_len_matches_capture() {
        assert_eq!(FRAME_LEN, 1486);
        assert_eq!(LinkFrame::new().as_bytes().len(), FRAME_LEN);
    }

    #[test]
    fn ether_type_is_network_order() {
        let frame = LinkFrame::new();
        assert_eq!(&frame.as_bytes()[12..14], &[0xaa, 0x55]);
        assert_eq!(frame.ether_type(), ETHER_TYPE);
    }

    #[test]
    fn addresses_are_echoed() {
        let mut frame = LinkFrame::new();
        let src = MacAddr([1, 2, 3, 4, 5, 6]);
        frame.set_addresses(MacAddr::BROADCAST, src);
        assert_eq!(&frame.as_bytes()[0..6], &[0xff; 6]);
        assert_eq!(&frame.as_bytes()[6..12], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&frame.as_bytes()[39..45], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(frame.source_echo(), src);
    }

    #[test]
    fn sequence_is_little_endian() {
        let mut frame = LinkFrame::new();
        frame.set_sequence(0x0102);
        assert_eq!(&frame.as_bytes()[14..16], &[0x02, 0x01]);
        assert_eq!(frame.sequence(), 0x0102);
    }

    #[test]
    fn status_bytes() {
        let mut frame = LinkFrame::new();
        frame.set_status(&FORMAT_CODES[0]);
        let b = frame.as_bytes();
        assert_eq!(b[22], 0x96);
        assert_eq!(b[26], 0x85);
        assert_eq!(b[27], 0x0f);
        assert_eq!(&b[28..32], &[0xff; 4]);
        assert_eq!(b[45], 0xd2);
    }

    #[test]
    fn clearing_header_keeps_ethernet_fields() {
        let mut frame = LinkFrame::new();
        let src = MacAddr([9; 6]);
        frame.set_addresses(MacAddr::RECEIVER, src);
        frame.set_status(&FORMAT_CODES[1]);
        frame.set_sequence(7);
        frame.clear_protocol_header();

        assert_eq!(frame.destination(), MacAddr::RECEIVER);
        assert_eq!(frame.source(), src);
        assert_eq!(frame.ether_type(), ETHER_TYPE);
        assert!(frame.as_bytes()[14..HEADER_LEN].iter().all(|&b| b == 0));
    }

    #[test]
    fn payload_window_and_trailer() {
        let mut frame = LinkFrame::new();
        assert_eq!(frame.payload().len(), PAYLOAD_LEN);
        frame.set_discovery_trailer(DISCOVERY_ACK);
        assert_eq!(&frame.as_bytes()[47..49], &[0xfe, 0xff]);
        assert_eq!(frame.payload()[1..3], [0xfe, 0xff]);
        frame.clear_payload();
        assert_eq!(frame.discovery_trailer(), [0, 0]);
    }
}
