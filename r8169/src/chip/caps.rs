//! Per-revision capability record.
//!
//! A pure function of [`ChipRevision`]; every identified revision has a
//! record. Behaviour that varies by revision but is not a bring-up step
//! (offload generation, jumbo ceiling, coalescing scale, quirks) is read
//! from here rather than re-derived at each call site.

use bitflags::bitflags;

use super::ident::ChipRevision::{self, *};
use crate::regs::Interrupts;

/// Register layout family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// PCI RTL8169/8110 (VER_02..VER_06).
    Rtl8169,
    /// PCIe RTL8168/8111 and the RTL81xx Fast Ethernet parts.
    Rtl8168,
    /// RTL8125 2.5G parts with the relocated interrupt block.
    Rtl8125,
}

/// Checksum and segmentation offload descriptor encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsumGen {
    /// Flags and MSS in `opts1`.
    V1,
    /// Flags, MSS and header offsets in `opts2`; GSO type in `opts1`.
    V2,
}

/// Interrupt mitigation timer scale for one link speed.
///
/// `scale_ns[i]` is the timer unit in nanoseconds when the CPlusCmd
/// INTT field is `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalesceScale {
    pub speed: u32,
    pub scale_ns: [u32; 4],
}

const fn coalesce_delay(speed: u32, d: u32) -> CoalesceScale {
    CoalesceScale {
        speed,
        scale_ns: [d, 8 * d, 16 * d, 32 * d],
    }
}

pub static COALESCE_8169: [CoalesceScale; 3] = [
    coalesce_delay(1000, 320),
    coalesce_delay(100, 2560),
    coalesce_delay(10, 40960),
];

pub static COALESCE_8168_8136: [CoalesceScale; 3] = [
    coalesce_delay(1000, 5000),
    coalesce_delay(100, 2560),
    coalesce_delay(10, 40960),
];

bitflags! {
    /// Behavioural switches that do not fit a single enum.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Quirks: u32 {
        /// Hardware checksum of short frames corrupts the padding; pad to
        /// ETH_ZLEN in software.
        const PAD_TO_ETH_ZLEN = 1 << 0;
        /// RxFIFOOver wedges the receiver; needs a full reset.
        const RX_FIFO_OVERFLOW_RESET = 1 << 1;
        /// Energy Efficient Ethernet MAC side.
        const EEE = 1 << 2;
        /// 8168evl-and-later register layout (ERI MAC address, EarlySize).
        const EVL_UP = 1 << 3;
        /// The 8125 loses RX state across link down; reset on link loss.
        const LINK_DOWN_RESET = 1 << 4;
        /// Firmware may own the MAC (DASH out-of-band management).
        const DASH_CAPABLE = 1 << 5;
        /// RX VLAN stripping cannot be toggled.
        const FIXED_RX_VLAN = 1 << 6;
        /// ASPM on the 8168gu/8106eus disturbs other devices on the bus.
        const ASPM_HARMFUL = 1 << 7;
        /// The TSO engine mangles short trailing fragments (8168evl).
        const TSO_SHORT_TAIL = 1 << 8;
        /// ASPM is managed by the chip when its firmware says so.
        const ASPM_SELF_MANAGED = 1 << 9;
    }
}

/// Immutable per-revision behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub family: Family,
    pub csum: CsumGen,
    /// Largest MTU with jumbo frames, 0 if jumbo frames are unsupported.
    pub jumbo_max: usize,
    /// `None` on the 8125, whose coalescing block is not supported.
    pub coalesce: Option<&'static [CoalesceScale]>,
    pub irq_mask: Interrupts,
    pub quirks: Quirks,
    pub gso_max_size: usize,
    pub gso_max_segs: usize,
}

/// `n` KiB frame minus VLAN Ethernet header and FCS.
const fn jumbo(kib: usize) -> usize {
    kib * 1024 - 18 - 4
}

pub const JUMBO_4K: usize = jumbo(4);
pub const JUMBO_6K: usize = jumbo(6);
pub const JUMBO_7K: usize = jumbo(7);
pub const JUMBO_9K: usize = jumbo(9);

pub const GSO_MAX_SIZE_V1: usize = 32000;
pub const GSO_MAX_SEGS_V1: usize = 24;
pub const GSO_MAX_SIZE_V2: usize = 64000;
pub const GSO_MAX_SEGS_V2: usize = 64;

impl Capabilities {
    pub fn has(&self, q: Quirks) -> bool {
        self.quirks.contains(q)
    }

    /// Largest MTU the chip accepts.
    pub fn max_mtu(&self) -> usize {
        if self.jumbo_max > 0 {
            self.jumbo_max
        } else {
            crate::types::ETH_DATA_LEN
        }
    }
}

/// Capability record for `rev`.
///
/// # Arguments
/// - `gmii`: board has a gigabit PHY; jumbo frames need one
pub fn capabilities(rev: ChipRevision, gmii: bool) -> Capabilities {
    let family = if rev.is_8169() {
        Family::Rtl8169
    } else if rev.is_8125() {
        Family::Rtl8125
    } else {
        Family::Rtl8168
    };

    let csum = if rev.within(V02, V06) || rev.within(V10, V17) {
        CsumGen::V1
    } else {
        CsumGen::V2
    };

    let jumbo_max = if !gmii {
        0
    } else {
        match rev {
            r if r.is_8169() => JUMBO_7K,
            V11 | V17 => JUMBO_4K,
            r if r.within(V18, V24) => JUMBO_6K,
            _ => JUMBO_9K,
        }
    };

    let coalesce: Option<&'static [CoalesceScale]> = match family {
        Family::Rtl8169 => Some(&COALESCE_8169),
        Family::Rtl8168 => Some(&COALESCE_8168_8136),
        Family::Rtl8125 => None,
    };

    let mut irq_mask = Interrupts::RX_OK
        | Interrupts::RX_ERR
        | Interrupts::TX_OK
        | Interrupts::TX_ERR
        | Interrupts::LINK_CHG;
    if rev <= V06 {
        irq_mask |= Interrupts::SYS_ERR | Interrupts::RX_OVERFLOW | Interrupts::RX_FIFO_OVER;
    } else if rev == V11 {
        irq_mask |= Interrupts::RX_FIFO_OVER;
    } else {
        irq_mask |= Interrupts::RX_OVERFLOW;
    }

    let mut quirks = Quirks::empty();
    if matches!(rev, V34 | V61 | V63) {
        quirks |= Quirks::PAD_TO_ETH_ZLEN;
    }
    if rev == V11 {
        quirks |= Quirks::RX_FIFO_OVERFLOW_RESET;
    }
    if rev.supports_eee() {
        quirks |= Quirks::EEE;
    }
    if rev.is_8168evl_up() {
        quirks |= Quirks::EVL_UP;
    }
    if rev.is_8125() {
        quirks |= Quirks::LINK_DOWN_RESET;
    }
    if matches!(rev, V28 | V31 | V51 | V52 | V53) {
        quirks |= Quirks::DASH_CAPABLE;
    }
    if rev == V05 {
        quirks |= Quirks::FIXED_RX_VLAN;
    }
    if matches!(rev, V42 | V43) {
        quirks |= Quirks::ASPM_HARMFUL;
    }
    if rev == V34 {
        quirks |= Quirks::TSO_SHORT_TAIL;
    }
    if rev >= V61 {
        quirks |= Quirks::ASPM_SELF_MANAGED;
    }

    let (gso_max_size, gso_max_segs) = match csum {
        CsumGen::V1 => (GSO_MAX_SIZE_V1, GSO_MAX_SEGS_V1),
        CsumGen::V2 => (GSO_MAX_SIZE_V2, GSO_MAX_SEGS_V2),
    };

    Capabilities {
        family,
        csum,
        jumbo_max,
        coalesce,
        irq_mask,
        quirks,
        gso_max_size,
        gso_max_segs,
    }
}
