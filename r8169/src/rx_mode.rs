//! Receive address filtering.
//!
//! Unicast to our address and broadcast are always accepted. Multicast
//! goes through a 64-bit hash filter in MAR0..MAR7, indexed by the top six
//! bits of the Ethernet CRC of the group address.

use alloc::vec::Vec;

use crate::access::RegisterAccess;
use crate::chip::ChipRevision;
use crate::hw::{Platform, RegisterIo};
use crate::regs::{self, RxAccept};
use crate::types::{ether_crc, MacAddress};

/// Past this many groups the hash filter is saturated anyway.
pub const MC_FILTER_LIMIT: usize = 32;

/// Host view of the receive filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RxMode {
    pub promiscuous: bool,
    pub all_multicast: bool,
    pub multicast: Vec<MacAddress>,
}

/// Register image produced from an [`RxMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFilter {
    pub accept: RxAccept,
    /// `[MAR0, MAR4]`
    pub mar: [u32; 2],
}

/// Compute accept bits and the hash filter.
pub fn compute_filter(rev: ChipRevision, mode: &RxMode) -> RxFilter {
    let mut accept = RxAccept::BROADCAST | RxAccept::MY_PHYS | RxAccept::MULTICAST;
    let mut mar = [u32::MAX; 2];

    if mode.promiscuous {
        accept |= RxAccept::ALL_PHYS;
    } else if mode.multicast.len() > MC_FILTER_LIMIT
        || mode.all_multicast
        || rev == ChipRevision::V35
    {
        // Accept all multicast. Revision 35 mishandles the hash filter.
    } else if mode.multicast.is_empty() {
        accept -= RxAccept::MULTICAST;
    } else {
        mar = [0, 0];
        for addr in &mode.multicast {
            let bit = ether_crc(addr.as_bytes()) >> 26;
            mar[(bit >> 5) as usize] |= 1 << (bit & 31);
        }
        // Later chips take the filter byte- and word-swapped.
        if rev > ChipRevision::V06 {
            mar = [mar[1].swap_bytes(), mar[0].swap_bytes()];
        }
    }

    RxFilter { accept, mar }
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// Program the receive filter.
    pub fn set_rx_mode(&self, mode: &RxMode) {
        let filter = compute_filter(self.revision(), mode);
        log::trace!("[r8169] rx mode {:?} mar {:08x}:{:08x}", filter.accept, filter.mar[0], filter.mar[1]);

        self.w32(regs::MAR0 + 4, filter.mar[1]);
        self.w32(regs::MAR0, filter.mar[0]);
        self.mod32(regs::RX_CONFIG, regs::RX_CONFIG_ACCEPT_OK_MASK, filter.accept.bits());
    }
}
