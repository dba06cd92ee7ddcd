//! Per-revision hardware bring-up tables.
//!
//! Each revision maps to a list of step blocks. Blocks shared between
//! revisions (the 8168f, 8168g, 8168ep and 8125 common parts) are defined
//! once and referenced from several sequences. A revision without an
//! entry needs only the generic start in [`super::setup`].
//!
//! The executor never aborts a sequence: a failed indirect write has
//! already been logged by the access layer, and the remaining steps are
//! still worth applying. The count of failed steps is returned instead.
//!
//! # Reference
//! RTL8168 family application notes, per-chip init tables

use super::ident::ChipRevision::{self, *};
use crate::access::{EphyPatch, EriMask, Protocol, RegisterAccess, Poll};
use crate::error::Result;
use crate::hw::{Platform, RegisterIo};
use crate::regs;

// ═══════════════════════════════════════════════════════════════════════════
// STEP VOCABULARY
// ═══════════════════════════════════════════════════════════════════════════

/// One register-level bring-up action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// PCIe ASPM entry latency byte at config offset 0x70f.
    Latency(u8),
    W8(usize, u8),
    W16(usize, u16),
    /// `(reg, clear, set)`
    Mod8(usize, u8, u8),
    Mod16(usize, u16, u16),
    Mod32(usize, u32, u32),
    /// Config5 under the Config2/5 lock.
    Config5(u8, u8),
    /// PCIe Link Control CLKREQ.
    ClkReq(bool),
    Ephy(&'static [EphyPatch]),
    EphyWrite(u8, u16),
    Eri(u32, EriMask, u32),
    /// `(addr, clear, set)`
    EriModify(u32, u32, u32),
    MacOcp(u32, u16),
    MacOcpModify(u32, u16, u16),
    /// Poll until the masked MAC OCP bits read zero.
    WaitMacOcpLow(u32, u16, Poll),
    Fifo {
        rx_stat: u32,
        tx_stat: u32,
        rx_dyn: u32,
        tx_dyn: u32,
    },
    Pause {
        low: u32,
        high: u32,
    },
    ResetPacketFilter,
    L2l3Disable,
    DisableRxdvGate,
    StopCmac,
    EeeMac8168,
    Eee8125a,
    Eee8125b,
    /// Calibrate the 1 ms software counter from the PHY saw counter.
    SawCounter,
    /// 8102e: LED mode 11 is reserved; fall back to mode 10.
    FixLeds8102e,
    Udelay(u32),
}

use Step::*;

/// Default PCIe ASPM entry latency.
pub const DEF_ASPM_ENTRY_LATENCY: u8 = 0x27;

const fn ephy(reg: u8, clear: u16, set: u16) -> EphyPatch {
    EphyPatch::new(reg, clear, set)
}

const POLL_MAC_OCP_E00E: Poll = Poll::new(1000, 10);

// ═══════════════════════════════════════════════════════════════════════════
// SHARED BLOCKS
// ═══════════════════════════════════════════════════════════════════════════

const LATENCY: &[Step] = &[Latency(DEF_ASPM_ENTRY_LATENCY)];
const CLKREQ_OFF: &[Step] = &[ClkReq(false)];
const BEACON_OFF: &[Step] = &[Mod8(regs::CONFIG3, regs::BEACON_EN, 0)];

/// 8168cp/8168c tail.
const CP_COMMON: &[Step] = &[
    Mod8(regs::CONFIG1, 0, regs::SPEED_DOWN),
    Mod8(regs::CONFIG3, regs::BEACON_EN, 0),
    ClkReq(false),
];

const E_8105: &[Step] = &[
    Mod32(regs::FUNC_EVENT, 0, regs::FORCE_ASPM_EXIT),
    Mod32(regs::FUNC_EVENT, 0x0001_0000, 0),
    Mod8(regs::MCU, 0, regs::EN_NDP | regs::EN_OOB_RESET),
    Mod8(regs::DLLPR, 0, regs::PFM_EN),
    Ephy(&[
        ephy(0x07, 0, 0x4000),
        ephy(0x19, 0, 0x0200),
        ephy(0x19, 0, 0x0020),
        ephy(0x1e, 0, 0x2000),
        ephy(0x03, 0, 0x0001),
        ephy(0x19, 0, 0x0100),
        ephy(0x19, 0, 0x0004),
        ephy(0x0a, 0, 0x0020),
    ]),
    L2l3Disable,
];

const F_COMMON: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Eri(0xc0, EriMask::M0011, 0x0000),
    Eri(0xb8, EriMask::M1111, 0x0000),
    Fifo { rx_stat: 0x10, tx_stat: 0x10, rx_dyn: 0x02, tx_dyn: 0x06 },
    ResetPacketFilter,
    EriModify(0x1b0, 0, 1 << 4),
    EriModify(0x1d0, 0, (1 << 4) | (1 << 1)),
    Eri(0xcc, EriMask::M1111, 0x0000_0050),
    Eri(0xd0, EriMask::M1111, 0x0000_0060),
    ClkReq(false),
    Mod8(regs::MCU, regs::NOW_IS_OOB, 0),
    Mod8(regs::DLLPR, 0, regs::PFM_EN),
    Mod32(regs::MISC, 0, regs::PWM_EN),
    Config5(regs::SPI_EN, 0),
    EeeMac8168,
];

const G_COMMON: &[Step] = &[
    Fifo { rx_stat: 0x08, tx_stat: 0x10, rx_dyn: 0x02, tx_dyn: 0x06 },
    Pause { low: 0x38, high: 0x48 },
    Latency(DEF_ASPM_ENTRY_LATENCY),
    ResetPacketFilter,
    Eri(0x2f8, EriMask::M0011, 0x1d8f),
    DisableRxdvGate,
    Eri(0xc0, EriMask::M0011, 0x0000),
    Eri(0xb8, EriMask::M0011, 0x0000),
    EeeMac8168,
    EriModify(0x2fc, 0x01, 0x06),
    EriModify(0x1b0, 1 << 12, 0),
    L2l3Disable,
];

const EP_COMMON: &[Step] = &[
    StopCmac,
    Fifo { rx_stat: 0x08, tx_stat: 0x10, rx_dyn: 0x02, tx_dyn: 0x06 },
    Pause { low: 0x2f, high: 0x5f },
    Latency(DEF_ASPM_ENTRY_LATENCY),
    ResetPacketFilter,
    Eri(0x5f0, EriMask::M0011, 0x4f87),
    DisableRxdvGate,
    Eri(0xc0, EriMask::M0011, 0x0000),
    Eri(0xb8, EriMask::M0011, 0x0000),
    EeeMac8168,
    EriModify(0x2fc, 0x01, 0x06),
    Mod8(regs::DLLPR, regs::TX_10M_PS_EN, 0),
    L2l3Disable,
];

/// MAC OCP tail shared by the 8168h and 8117.
const OCP_E63E_PULSE: &[Step] = &[
    MacOcp(0xe63e, 0x0001),
    MacOcp(0xe63e, 0x0000),
    MacOcp(0xc094, 0x0000),
    MacOcp(0xc09e, 0x0000),
];

const C8125_HEAD: &[Step] = &[
    L2l3Disable,
    W16(0x382, 0x221b),
    W8(0x4500, 0),
    W16(0x4800, 0),
    // UPS off
    MacOcpModify(0xd40a, 0x0010, 0x0000),
    Mod8(regs::CONFIG1, 0x10, 0),
    MacOcp(0xc140, 0xffff),
    MacOcp(0xc142, 0xffff),
    MacOcpModify(0xd3e2, 0x0fff, 0x03a9),
    MacOcpModify(0xd3e4, 0x00ff, 0x0000),
    MacOcpModify(0xe860, 0x0000, 0x0080),
    // Legacy TX descriptor format
    MacOcpModify(0xeb58, 0x0001, 0x0000),
];

const C8125A_FIFO: &[Step] = &[
    MacOcpModify(0xe614, 0x0700, 0x0400),
    MacOcpModify(0xe63e, 0x0c30, 0x0020),
];

const C8125B_FIFO: &[Step] = &[
    MacOcpModify(0xe614, 0x0700, 0x0200),
    MacOcpModify(0xe63e, 0x0c30, 0x0000),
];

const C8125_BODY: &[Step] = &[
    MacOcpModify(0xc0b4, 0x0000, 0x000c),
    MacOcpModify(0xeb6a, 0x00ff, 0x0033),
    MacOcpModify(0xeb50, 0x03e0, 0x0040),
    MacOcpModify(0xe056, 0x00f0, 0x0030),
    MacOcpModify(0xe040, 0x1000, 0x0000),
    MacOcpModify(0xea1c, 0x0003, 0x0001),
    MacOcpModify(0xe0c0, 0x4f0f, 0x4403),
    MacOcpModify(0xe052, 0x0080, 0x0068),
    MacOcpModify(0xd430, 0x0fff, 0x047f),
    MacOcpModify(0xea1c, 0x0004, 0x0000),
    MacOcpModify(0xeb54, 0x0000, 0x0001),
    Udelay(1),
    MacOcpModify(0xeb54, 0x0001, 0x0000),
    Mod16(0x1880, 0x0030, 0),
    MacOcp(0xe098, 0xc302),
    WaitMacOcpLow(0xe00e, 1 << 13, POLL_MAC_OCP_E00E),
];

const RXDV_OFF: &[Step] = &[DisableRxdvGate];

// ═══════════════════════════════════════════════════════════════════════════
// PER-REVISION BLOCKS
// ═══════════════════════════════════════════════════════════════════════════

const S_8102E_1: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    W8(regs::DBG_REG, regs::FIX_NAK_1),
    W8(
        regs::CONFIG1,
        regs::LEDS1 | regs::LEDS0 | regs::SPEED_DOWN | regs::MEMMAP | regs::IOMAP | regs::VPD | regs::PM_ENABLE,
    ),
    Mod8(regs::CONFIG3, regs::BEACON_EN, 0),
    FixLeds8102e,
    Ephy(&[
        ephy(0x01, 0, 0x6e65),
        ephy(0x02, 0, 0x091f),
        ephy(0x03, 0, 0xc2f9),
        ephy(0x06, 0, 0xafb5),
        ephy(0x07, 0, 0x0e00),
        ephy(0x19, 0, 0xec80),
        ephy(0x01, 0, 0x2e65),
        ephy(0x01, 0, 0x6e65),
    ]),
];

const S_8102E_2: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    W8(regs::CONFIG1, regs::MEMMAP | regs::IOMAP | regs::VPD | regs::PM_ENABLE),
    Mod8(regs::CONFIG3, regs::BEACON_EN, 0),
];

const S_8102E_3: &[Step] = &[EphyWrite(0x03, 0xc2f9)];

const S_8401: &[Step] = &[
    Ephy(&[
        ephy(0x01, 0xffff, 0x6fe5),
        ephy(0x03, 0xffff, 0x0599),
        ephy(0x06, 0xffff, 0xaf25),
        ephy(0x07, 0xffff, 0x8e68),
    ]),
    Mod8(regs::CONFIG3, regs::BEACON_EN, 0),
];

const S_8168CP_1: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Ephy(&[
        ephy(0x01, 0, 0x0001),
        ephy(0x02, 0x0800, 0x1000),
        ephy(0x03, 0, 0x0042),
        ephy(0x06, 0x0080, 0x0000),
        ephy(0x07, 0, 0x2000),
    ]),
];

const S_8168C_1: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    W8(regs::DBG_REG, 0x06 | regs::FIX_NAK_1 | regs::FIX_NAK_2),
    Ephy(&[
        ephy(0x02, 0x0800, 0x1000),
        ephy(0x03, 0, 0x0002),
        ephy(0x06, 0x0080, 0x0000),
    ]),
];

const S_8168C_2: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Ephy(&[ephy(0x01, 0, 0x0001), ephy(0x03, 0x0400, 0x0020)]),
];

const S_8168CP_3: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Mod8(regs::CONFIG3, regs::BEACON_EN, 0),
    W8(regs::DBG_REG, 0x20),
];

const S_8168D_4: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Ephy(&[
        ephy(0x0b, 0x0000, 0x0048),
        ephy(0x19, 0x0020, 0x0050),
        ephy(0x0c, 0x0100, 0x0020),
        ephy(0x10, 0x0004, 0x0000),
    ]),
    ClkReq(true),
];

const S_8105E_2: &[Step] = &[Ephy(&[ephy(0x1e, 0, 0x8000)])];

const S_8168E_1: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Ephy(&[
        ephy(0x00, 0x0200, 0x0100),
        ephy(0x00, 0x0000, 0x0004),
        ephy(0x06, 0x0002, 0x0001),
        ephy(0x06, 0x0000, 0x0030),
        ephy(0x07, 0x0000, 0x2000),
        ephy(0x00, 0x0000, 0x0020),
        ephy(0x03, 0x5800, 0x2000),
        ephy(0x03, 0x0000, 0x0001),
        ephy(0x01, 0x0800, 0x1000),
        ephy(0x07, 0x0000, 0x4000),
        ephy(0x1e, 0x0000, 0x2000),
        ephy(0x19, 0xffff, 0xfe6c),
        ephy(0x0a, 0x0000, 0x0040),
    ]),
    ClkReq(false),
    // Reset the TX FIFO pointer.
    Mod32(regs::MISC, 0, regs::TXPLA_RST),
    Mod32(regs::MISC, regs::TXPLA_RST, 0),
    Config5(regs::SPI_EN, 0),
];

const S_8168E_2: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Ephy(&[
        ephy(0x09, 0x0000, 0x0080),
        ephy(0x19, 0x0000, 0x0224),
        ephy(0x00, 0x0000, 0x0004),
        ephy(0x0c, 0x3df0, 0x0200),
    ]),
    Eri(0xc0, EriMask::M0011, 0x0000),
    Eri(0xb8, EriMask::M1111, 0x0000),
    Fifo { rx_stat: 0x10, tx_stat: 0x10, rx_dyn: 0x02, tx_dyn: 0x06 },
    EriModify(0x1d0, 0, 1 << 1),
    ResetPacketFilter,
    EriModify(0x1b0, 0, 1 << 4),
    Eri(0xcc, EriMask::M1111, 0x0000_0050),
    Eri(0xd0, EriMask::M1111, 0x07ff_0060),
    ClkReq(false),
    Mod8(regs::MCU, regs::NOW_IS_OOB, 0),
    EeeMac8168,
    Mod8(regs::DLLPR, 0, regs::PFM_EN),
    Mod32(regs::MISC, 0, regs::PWM_EN),
    Config5(regs::SPI_EN, 0),
];

const S_8168F_1: &[Step] = &[Ephy(&[
    ephy(0x06, 0x00c0, 0x0020),
    ephy(0x08, 0x0001, 0x0002),
    ephy(0x09, 0x0000, 0x0080),
    ephy(0x19, 0x0000, 0x0224),
    ephy(0x00, 0x0000, 0x0008),
    ephy(0x0c, 0x3df0, 0x0200),
])];

const S_8411: &[Step] = &[
    L2l3Disable,
    Ephy(&[
        ephy(0x06, 0x00c0, 0x0020),
        ephy(0x0f, 0xffff, 0x5200),
        ephy(0x19, 0x0000, 0x0224),
        ephy(0x00, 0x0000, 0x0008),
        ephy(0x0c, 0x3df0, 0x0200),
    ]),
];

const S_8402: &[Step] = &[
    Latency(DEF_ASPM_ENTRY_LATENCY),
    Mod32(regs::FUNC_EVENT, 0, regs::FORCE_ASPM_EXIT),
    Mod8(regs::MCU, regs::NOW_IS_OOB, 0),
    Ephy(&[ephy(0x19, 0xffff, 0xff64), ephy(0x1e, 0, 0x4000)]),
    Fifo { rx_stat: 0x00, tx_stat: 0x00, rx_dyn: 0x02, tx_dyn: 0x06 },
    ResetPacketFilter,
    Eri(0xc0, EriMask::M0011, 0x0000),
    Eri(0xb8, EriMask::M0011, 0x0000),
    EriModify(0xd4, 0x0e00, 0xff00),
    Eri(0x1b0, EriMask::M0011, 0x0000),
    L2l3Disable,
];

const S_8106: &[Step] = &[
    Mod32(regs::FUNC_EVENT, 0, regs::FORCE_ASPM_EXIT),
    Mod32(regs::MISC, regs::EARLY_TALLY_EN, regs::DISABLE_LAN_EN),
    Mod8(regs::MCU, 0, regs::EN_NDP | regs::EN_OOB_RESET),
    Mod8(regs::DLLPR, regs::PFM_EN, 0),
    // L0s exit takes longer on the 8106e.
    Latency(0x2f),
    Eri(0x1d0, EriMask::M0011, 0x0000),
    Eri(0x1b0, EriMask::M0011, 0x0000),
    L2l3Disable,
];

const S_8168G_1: &[Step] = &[Ephy(&[
    ephy(0x00, 0x0008, 0x0000),
    ephy(0x0c, 0x3ff0, 0x0820),
    ephy(0x1e, 0x0000, 0x0001),
    ephy(0x19, 0x8000, 0x0000),
])];

const S_8168G_2: &[Step] = &[Ephy(&[
    ephy(0x00, 0x0008, 0x0000),
    ephy(0x0c, 0x3ff0, 0x0820),
    ephy(0x19, 0xffff, 0x7c00),
    ephy(0x1e, 0xffff, 0x20eb),
    ephy(0x0d, 0xffff, 0x1666),
    ephy(0x00, 0xffff, 0x10a3),
    ephy(0x06, 0xffff, 0xf050),
    ephy(0x04, 0x0000, 0x0010),
    ephy(0x1d, 0x4000, 0x0000),
])];

const S_8411_2: &[Step] = &[Ephy(&[
    ephy(0x00, 0x0008, 0x0000),
    ephy(0x0c, 0x37d0, 0x0820),
    ephy(0x1e, 0x0000, 0x0001),
    ephy(0x19, 0x8021, 0x0000),
    ephy(0x1e, 0x0000, 0x2000),
    ephy(0x0d, 0x0100, 0x0200),
    ephy(0x00, 0x0000, 0x0080),
    ephy(0x06, 0x0000, 0x0010),
    ephy(0x04, 0x0000, 0x0010),
    ephy(0x1d, 0x0000, 0x4000),
])];

const S_8168H_1: &[Step] = &[
    Ephy(&[
        ephy(0x1e, 0x0800, 0x0001),
        ephy(0x1d, 0x0000, 0x0800),
        ephy(0x05, 0xffff, 0x2089),
        ephy(0x06, 0xffff, 0x5881),
        ephy(0x04, 0xffff, 0x854a),
        ephy(0x01, 0xffff, 0x068b),
    ]),
    Fifo { rx_stat: 0x08, tx_stat: 0x10, rx_dyn: 0x02, tx_dyn: 0x06 },
    Pause { low: 0x38, high: 0x48 },
    Latency(DEF_ASPM_ENTRY_LATENCY),
    ResetPacketFilter,
    EriModify(0xdc, 0, 0x001c),
    Eri(0x5f0, EriMask::M0011, 0x4f87),
    DisableRxdvGate,
    Eri(0xc0, EriMask::M0011, 0x0000),
    Eri(0xb8, EriMask::M0011, 0x0000),
    EeeMac8168,
    Mod8(regs::DLLPR, regs::PFM_EN, 0),
    Mod8(regs::MISC_1, regs::PFM_D3COLD_EN, 0),
    Mod8(regs::DLLPR, regs::TX_10M_PS_EN, 0),
    EriModify(0x1b0, 1 << 12, 0),
    L2l3Disable,
    SawCounter,
    MacOcpModify(0xe056, 0x00f0, 0x0070),
    MacOcpModify(0xe052, 0x6000, 0x8008),
    MacOcpModify(0xe0d6, 0x01ff, 0x017f),
    MacOcpModify(0xd420, 0x0fff, 0x047f),
];

const S_8168EP_3_EPHY: &[Step] = &[Ephy(&[
    ephy(0x00, 0x0000, 0x0080),
    ephy(0x0d, 0x0100, 0x0200),
    ephy(0x19, 0x8021, 0x0000),
    ephy(0x1e, 0x0000, 0x2000),
])];

const S_8168EP_3_TAIL: &[Step] = &[
    Mod8(regs::DLLPR, regs::PFM_EN, 0),
    Mod8(regs::MISC_1, regs::PFM_D3COLD_EN, 0),
    MacOcpModify(0xd3e2, 0x0fff, 0x0271),
    MacOcpModify(0xd3e4, 0x00ff, 0x0000),
    MacOcpModify(0xe860, 0x0000, 0x0080),
];

const S_8117: &[Step] = &[
    StopCmac,
    // 0x59 folds onto 0x19 through the five-bit register field.
    Ephy(&[ephy(0x19, 0x0040, 0x1100), ephy(0x59, 0x0040, 0x1100)]),
    Fifo { rx_stat: 0x08, tx_stat: 0x10, rx_dyn: 0x02, tx_dyn: 0x06 },
    Pause { low: 0x2f, high: 0x5f },
    Latency(DEF_ASPM_ENTRY_LATENCY),
    ResetPacketFilter,
    EriModify(0xd4, 0, 0x0010),
    Eri(0x5f0, EriMask::M0011, 0x4f87),
    DisableRxdvGate,
    Eri(0xc0, EriMask::M0011, 0x0000),
    Eri(0xb8, EriMask::M0011, 0x0000),
    EeeMac8168,
    Mod8(regs::DLLPR, regs::PFM_EN, 0),
    Mod8(regs::MISC_1, regs::PFM_D3COLD_EN, 0),
    Mod8(regs::DLLPR, regs::TX_10M_PS_EN, 0),
    EriModify(0x1b0, 1 << 12, 0),
    L2l3Disable,
    SawCounter,
    MacOcpModify(0xe056, 0x00f0, 0x0070),
    MacOcp(0xea80, 0x0003),
    MacOcpModify(0xe052, 0x0000, 0x0009),
    MacOcpModify(0xd420, 0x0fff, 0x047f),
];

const S_8125A_2: &[Step] = &[Ephy(&[
    ephy(0x04, 0xffff, 0xd000),
    ephy(0x0a, 0xffff, 0x8653),
    ephy(0x23, 0xffff, 0xab66),
    ephy(0x20, 0xffff, 0x9455),
    ephy(0x21, 0xffff, 0x99ff),
    ephy(0x29, 0xffff, 0xfe04),
    ephy(0x44, 0xffff, 0xd000),
    ephy(0x4a, 0xffff, 0x8653),
    ephy(0x63, 0xffff, 0xab66),
    ephy(0x60, 0xffff, 0x9455),
    ephy(0x61, 0xffff, 0x99ff),
    ephy(0x69, 0xffff, 0xfe04),
])];

const S_8125B: &[Step] = &[Ephy(&[
    ephy(0x0b, 0xffff, 0xa908),
    ephy(0x1e, 0xffff, 0x20eb),
    ephy(0x4b, 0xffff, 0xa908),
    ephy(0x5e, 0xffff, 0x20eb),
    ephy(0x22, 0x0030, 0x0020),
    ephy(0x62, 0x0030, 0x0020),
])];

// ═══════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════

/// Ordered step blocks for `rev`. Empty when only the generic start runs.
pub fn sequence(rev: ChipRevision) -> &'static [&'static [Step]] {
    match rev {
        V07 => &[S_8102E_1],
        V08 => &[S_8102E_2, S_8102E_3],
        V09 => &[S_8102E_2],
        V11 | V17 => &[BEACON_OFF],
        V14 => &[S_8401],
        V18 => &[S_8168CP_1, CP_COMMON],
        V19 => &[S_8168C_1, CP_COMMON],
        V20 | V21 => &[S_8168C_2, CP_COMMON],
        V22 => &[LATENCY, CP_COMMON],
        V23 => &[LATENCY, BEACON_OFF],
        V24 => &[S_8168CP_3],
        V25 | V26 | V31 => &[LATENCY, CLKREQ_OFF],
        V28 => &[S_8168D_4],
        V29 => &[E_8105],
        V30 => &[E_8105, S_8105E_2],
        V32 | V33 => &[S_8168E_1],
        V34 => &[S_8168E_2],
        V35 | V36 => &[F_COMMON, S_8168F_1],
        V37 => &[S_8402],
        V38 => &[F_COMMON, S_8411],
        V39 => &[S_8106],
        V40 => &[G_COMMON, S_8168G_1],
        V42 | V43 => &[G_COMMON, S_8168G_2],
        // The 8411b MAC MCU patch is a firmware program and is not applied.
        V44 => &[G_COMMON, S_8411_2],
        V46 | V48 => &[S_8168H_1, OCP_E63E_PULSE],
        V51 => &[S_8168EP_3_EPHY, EP_COMMON, S_8168EP_3_TAIL],
        V52 | V53 => &[S_8117, OCP_E63E_PULSE],
        V61 => &[LATENCY, S_8125A_2, C8125_HEAD, C8125A_FIFO, C8125_BODY, &[Eee8125a], RXDV_OFF],
        V63 => &[LATENCY, S_8125B, C8125_HEAD, C8125B_FIFO, C8125_BODY, &[Eee8125b], RXDV_OFF],
        V02 | V03 | V04 | V05 | V06 | V10 => &[],
    }
}

/// Outcome of one bring-up run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BringUpReport {
    pub steps: usize,
    pub failed: usize,
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// Apply the revision's bring-up sequence.
    ///
    /// Config registers must already be unlocked.
    ///
    /// # Arguments
    /// - `mtu`: current MTU, used by the 8125B EEE idle timer
    pub fn hw_config(&self, mtu: usize) -> BringUpReport {
        let mut report = BringUpReport::default();
        for step in sequence(self.revision()).iter().flat_map(|block| block.iter()) {
            report.steps += 1;
            if let Err(e) = self.apply_step(step, mtu) {
                report.failed += 1;
                log::debug!("[r8169] bring-up step {:?} failed: {}", step, e);
            }
        }
        if report.failed > 0 {
            log::warn!(
                "[r8169] {} of {} bring-up steps failed on {}",
                report.failed,
                report.steps,
                self.revision()
            );
        }
        report
    }

    fn apply_step(&self, step: &Step, mtu: usize) -> Result<()> {
        match *step {
            Latency(val) => return self.set_aspm_entry_latency(val),
            W8(reg, v) => self.w8(reg, v),
            W16(reg, v) => self.w16(reg, v),
            Mod8(reg, clear, set) => self.mod8(reg, clear, set),
            Mod16(reg, clear, set) => self.mod16(reg, clear, set),
            Mod32(reg, clear, set) => self.mod32(reg, clear, set),
            Config5(clear, set) => self.mod_config5(clear, set),
            ClkReq(enable) => crate::hw::PciFunction::set_clock_request(self.platform(), enable),
            Ephy(patches) => return self.ephy_init(patches),
            EphyWrite(reg, v) => return self.ephy_write(reg, v),
            Eri(addr, mask, v) => return self.eri_write(addr, mask, v),
            EriModify(addr, clear, set) => return self.eri_modify(addr, clear, set),
            MacOcp(reg, v) => return self.mac_ocp_write(reg, v),
            MacOcpModify(reg, clear, set) => return self.mac_ocp_modify(reg, clear, set),
            WaitMacOcpLow(reg, mask, poll) => {
                return self.wait_for(Protocol::MacOcp, poll, false, |a| {
                    a.mac_ocp_read(reg).map(|v| v & mask != 0).unwrap_or(true)
                })
            }
            Fifo { rx_stat, tx_stat, rx_dyn, tx_dyn } => {
                self.eri_write(0xc8, EriMask::M1111, rx_stat << 16 | rx_dyn)?;
                return self.eri_write(0xe8, EriMask::M1111, tx_stat << 16 | tx_dyn);
            }
            Pause { low, high } => {
                self.eri_write(0xcc, EriMask::M0001, low)?;
                return self.eri_write(0xd0, EriMask::M0001, high);
            }
            ResetPacketFilter => return self.reset_packet_filter(),
            L2l3Disable => self.mod8(regs::CONFIG3, regs::RDY_TO_L23, 0),
            DisableRxdvGate => self.disable_rxdvgate(),
            StopCmac => return self.stop_cmac(),
            EeeMac8168 => return self.config_eee_mac_8168(),
            Eee8125a => return self.config_eee_mac_8125a(),
            Eee8125b => return self.config_eee_mac_8125b(mtu),
            SawCounter => return self.calibrate_saw_counter(),
            FixLeds8102e => {
                let leds = regs::LEDS1 | regs::LEDS0;
                if self.r8(regs::CONFIG1) & leds == leds {
                    self.mod8(regs::CONFIG1, regs::LEDS0, 0);
                }
            }
            Udelay(us) => crate::hw::Delay::udelay(self.platform(), us),
        }
        Ok(())
    }

    /// Derive the 1 ms software tick from the PHY saw counter.
    fn calibrate_saw_counter(&self) -> Result<()> {
        let cnt = self.phy_read_paged(0x0c42, 0x13)? & 0x3fff;
        if cnt > 0 {
            let ini = ((16_000_000 / cnt as u32) & 0x0fff) as u16;
            self.mac_ocp_modify(0xd412, 0x0fff, ini)?;
        }
        Ok(())
    }
}
