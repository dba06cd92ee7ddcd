//! Ethernet frame types and helpers.
//!
//! # Reference
//! IEEE 802.3

use core::fmt;

pub const ETH_ALEN: usize = 6;
pub const ETH_HLEN: usize = 14;
pub const ETH_ZLEN: usize = 60;
pub const ETH_FCS_LEN: usize = 4;
pub const ETH_DATA_LEN: usize = 1500;
pub const ETH_MIN_MTU: usize = 68;
pub const VLAN_HLEN: usize = 4;

// Common EtherTypes
pub const ETH_P_IP: u16 = 0x0800;
pub const ETH_P_IPV6: u16 = 0x86DD;
pub const ETH_P_8021Q: u16 = 0x8100;

/// MAC address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; ETH_ALEN]);

impl MacAddress {
    pub const BROADCAST: MacAddress = MacAddress([0xff; ETH_ALEN]);

    pub const fn new(bytes: [u8; ETH_ALEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ETH_ALEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; ETH_ALEN]
    }

    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Unicast and non-zero.
    pub fn is_valid(&self) -> bool {
        !self.is_multicast() && !self.is_zero()
    }

    /// Locally administered unicast address derived from `seed`.
    pub fn from_seed(seed: u64) -> Self {
        let b = seed.to_le_bytes();
        let mut mac = [b[0], b[1], b[2], b[3], b[4], b[5]];
        mac[0] &= 0xfe;
        mac[0] |= 0x02;
        Self(mac)
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

/// Ethernet CRC-32 as the MAC computes it for the multicast hash.
///
/// Bits are fed LSB first; the result is not inverted.
pub fn ether_crc(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xffff_ffff;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let carry = ((crc >> 31) ^ (b as u32)) & 1;
            crc <<= 1;
            b >>= 1;
            if carry != 0 {
                crc ^= 0x04c1_1db7;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_mac_validity() {
        assert!(!MacAddress::default().is_valid());
        assert!(!MacAddress::BROADCAST.is_valid());
        assert!(MacAddress::new([0x00, 0xe0, 0x4c, 0x68, 0x00, 0x01]).is_valid());
    }

    #[test]
    fn test_seeded_mac_is_local_unicast() {
        let mac = MacAddress::from_seed(0xdead_beef_cafe_f00d);
        assert!(mac.is_valid());
        assert_eq!(mac.0[0] & 0x02, 0x02);
    }

    #[test]
    fn test_mac_display() {
        let mac = MacAddress::new([0x00, 0xe0, 0x4c, 0x68, 0x0a, 0xff]);
        assert_eq!(format!("{}", mac), "00:e0:4c:68:0a:ff");
    }

    #[test]
    fn test_ether_crc_known_values() {
        assert_eq!(ether_crc(&[0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]), 0x7fa3_2d9b);
        assert_eq!(ether_crc(&[0x33, 0x33, 0x00, 0x00, 0x00, 0x01]), 0xf99b_aaba);
        assert_eq!(ether_crc(&[0xff; 6]), 0xff48_647d);
        assert_eq!(ether_crc(&[]), 0xffff_ffff);
    }
}
