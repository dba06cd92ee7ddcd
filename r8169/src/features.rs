//! Offload feature flags.
//!
//! `hw_features` is what the chip can toggle; the active set is what is
//! currently programmed. Changing the MTU can force offloads off, so the
//! active set is always passed through [`fix_features`] first.

use bitflags::bitflags;

use crate::access::RegisterAccess;
use crate::chip::{ChipRevision, Capabilities, CsumGen, Family, Quirks};
use crate::hw::{Platform, RegisterIo};
use crate::regs;
use crate::ring::desc::TD0_MSS_MAX;
use crate::ring::RxFlags;
use crate::types::ETH_DATA_LEN;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// Scatter-gather transmit.
        const SG = 1 << 0;
        const IP_CSUM = 1 << 1;
        const IPV6_CSUM = 1 << 2;
        const TSO = 1 << 3;
        const TSO6 = 1 << 4;
        const RXCSUM = 1 << 5;
        const HW_VLAN_TX = 1 << 6;
        const HW_VLAN_RX = 1 << 7;
        /// Deliver frames with CRC or runt errors.
        const RXALL = 1 << 8;
        /// Keep the FCS on delivered frames.
        const RXFCS = 1 << 9;
        /// 64-bit DMA addressing.
        const HIGHDMA = 1 << 10;

        const CSUM_MASK = Self::IP_CSUM.bits() | Self::IPV6_CSUM.bits();
        const ALL_TSO = Self::TSO.bits() | Self::TSO6.bits();
    }
}

impl Default for Features {
    /// Checksum and VLAN offloads; everything else starts off.
    fn default() -> Self {
        Self::IP_CSUM | Self::IPV6_CSUM | Self::RXCSUM | Self::HW_VLAN_TX | Self::HW_VLAN_RX
    }
}

impl Features {
    pub fn rx_flags(self) -> RxFlags {
        RxFlags {
            rx_all: self.contains(Self::RXALL),
            rx_fcs: self.contains(Self::RXFCS),
        }
    }
}

/// Features the chip lets the host toggle.
pub fn hw_features(rev: ChipRevision, caps: &Capabilities) -> Features {
    let mut f = Features::IP_CSUM | Features::RXCSUM | Features::HW_VLAN_TX | Features::HW_VLAN_RX;
    if caps.has(Quirks::FIXED_RX_VLAN) {
        f -= Features::HW_VLAN_RX;
    }
    match caps.csum {
        CsumGen::V2 => f |= Features::IPV6_CSUM | Features::SG | Features::TSO | Features::TSO6,
        CsumGen::V1 => f |= Features::SG | Features::TSO,
    }
    if rev >= ChipRevision::V18 {
        f |= Features::HIGHDMA;
    }
    f | Features::RXALL | Features::RXFCS
}

/// Features that stay on no matter what is requested.
pub fn fixed_features(rev: ChipRevision, caps: &Capabilities) -> Features {
    let mut f = Features::empty();
    // The 8110SCd stops raising interrupts under load unless VLAN
    // stripping stays enabled.
    if caps.has(Quirks::FIXED_RX_VLAN) {
        f |= Features::HW_VLAN_RX;
    }
    if rev >= ChipRevision::V18 {
        f |= Features::HIGHDMA;
    }
    f
}

/// Drop offloads the current MTU rules out.
pub fn fix_features(rev: ChipRevision, mtu: usize, mut features: Features) -> Features {
    if mtu > TD0_MSS_MAX as usize {
        features -= Features::ALL_TSO;
    }
    if mtu > ETH_DATA_LEN && rev > ChipRevision::V06 {
        features -= Features::CSUM_MASK | Features::ALL_TSO;
    }
    features
}

/// Resolve a requested set against what the chip supports.
pub fn resolve(rev: ChipRevision, caps: &Capabilities, mtu: usize, wanted: Features) -> Features {
    let f = (wanted & hw_features(rev, caps)) | fixed_features(rev, caps);
    fix_features(rev, mtu, f)
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// RX-all and (on the 8125) VLAN stripping live in RxConfig.
    pub fn rx_config_features(&self, family: Family, features: Features) {
        let mut rx_config = self.r32(regs::RX_CONFIG);
        if features.contains(Features::RXALL) {
            rx_config |= regs::RX_CONFIG_ACCEPT_ERR_MASK;
        } else {
            rx_config &= !regs::RX_CONFIG_ACCEPT_ERR_MASK;
        }
        if family == Family::Rtl8125 {
            if features.contains(Features::HW_VLAN_RX) {
                rx_config |= regs::RX_VLAN_8125;
            } else {
                rx_config &= !regs::RX_VLAN_8125;
            }
        }
        self.w32(regs::RX_CONFIG, rx_config);
    }

    /// Program `features` into RxConfig and CPlusCmd.
    ///
    /// # Arguments
    /// - `cp_cmd`: shadow of CPlusCmd, updated in place
    pub fn apply_features(&self, family: Family, cp_cmd: &mut u16, features: Features) {
        self.rx_config_features(family, features);

        if features.contains(Features::RXCSUM) {
            *cp_cmd |= regs::CP_RX_CHKSUM;
        } else {
            *cp_cmd &= !regs::CP_RX_CHKSUM;
        }
        if family != Family::Rtl8125 {
            if features.contains(Features::HW_VLAN_RX) {
                *cp_cmd |= regs::CP_RX_VLAN;
            } else {
                *cp_cmd &= !regs::CP_RX_VLAN;
            }
        }
        self.w16(regs::CPLUS_CMD, *cp_cmd);
        self.commit();
    }
}
