//! Ethernet hardware addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::LinsnError;

/// A 6-byte Ethernet MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// `ff:ff:ff:ff:ff:ff`, used for discovery frames.
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Address the receiver card answers to once discovery is done.
    pub const RECEIVER: MacAddr = MacAddr([0x00, 0x00, 0x00, 0x00, 0x00, 0xfe]);

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        MacAddr(octets)
    }
}

impl FromStr for MacAddr {
    type Err = LinsnError;

    /// Parse `aa:bb:cc:dd:ee:ff` (case-insensitive, `-` also accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.trim().split([':', '-']);
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .filter(|p| !p.is_empty() && p.len() <= 2)
                .ok_or_else(|| LinsnError::InvalidMac(s.to_string()))?;
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| LinsnError::InvalidMac(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(LinsnError::InvalidMac(s.to_string()));
        }
        Ok(MacAddr(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_colon_separated() {
        let mac: MacAddr = "00:1A:2b:3c:4D:ff".parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0xff]);
        assert_eq!(mac.to_string(), "00:1a:2b:3c:4d:ff");
    }

    #[test]
    fn parse_short_octets() {
        let mac: MacAddr = "0:1:2:3:4:5".parse().unwrap();
        assert_eq!(mac.octets(), [0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn rejects_malformed() {
        assert!("00:11:22:33:44".parse::<MacAddr>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<MacAddr>().is_err());
        assert!("00:11:22:33:44:zz".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
    }

    #[test]
    fn well_known_addresses() {
        assert_eq!(MacAddr::BROADCAST.to_string(), "ff:ff:ff:ff:ff:ff");
        assert_eq!(MacAddr::RECEIVER.to_string(), "00:00:00:00:00:fe");
        assert!(MacAddr::default().is_zero());
    }
}
