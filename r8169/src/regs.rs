//! RTL8169 family register map.
//!
//! Offsets are relative to the MMIO BAR. Register widths follow the
//! datasheet; the 8125 moved the interrupt registers and the TX doorbell.
//!
//! # Reference
//! RTL8169S/RTL8168 datasheets, register tables

use bitflags::bitflags;

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER OFFSETS
// ═══════════════════════════════════════════════════════════════════════════

pub const MAC0: usize = 0x00;
pub const MAC4: usize = 0x04;
pub const MAR0: usize = 0x08;
pub const COUNTER_ADDR_LOW: usize = 0x10;
pub const COUNTER_ADDR_HIGH: usize = 0x14;
pub const EEE_LED: usize = 0x1b;
pub const TX_DESC_START_ADDR_LOW: usize = 0x20;
pub const TX_DESC_START_ADDR_HIGH: usize = 0x24;
pub const CHIP_CMD: usize = 0x37;
pub const TX_POLL: usize = 0x38;
pub const INTR_MASK: usize = 0x3c;
pub const INTR_STATUS: usize = 0x3e;
pub const TX_CONFIG: usize = 0x40;
pub const RX_CONFIG: usize = 0x44;
pub const CFG9346: usize = 0x50;
pub const CONFIG0: usize = 0x51;
pub const CONFIG1: usize = 0x52;
pub const CONFIG2: usize = 0x53;
pub const CONFIG3: usize = 0x54;
pub const CONFIG4: usize = 0x55;
pub const CONFIG5: usize = 0x56;
pub const PHYAR: usize = 0x60;
pub const CSIDR: usize = 0x64;
pub const CSIAR: usize = 0x68;
pub const PHY_STATUS: usize = 0x6c;
pub const PMCH: usize = 0x6f;
pub const ERIDR: usize = 0x70;
pub const ERIAR: usize = 0x74;
pub const EPHYAR: usize = 0x80;
pub const OCPDR: usize = 0xb0;
pub const OCPAR: usize = 0xb4;
pub const GPHY_OCP: usize = 0xb8;
pub const DLLPR: usize = 0xd0;
pub const DBG_REG: usize = 0xd1;
pub const MCU: usize = 0xd3;
pub const RX_MAX_SIZE: usize = 0xda;
pub const EFUSEAR: usize = 0xdc;
pub const CPLUS_CMD: usize = 0xe0;
pub const INTR_MITIGATE: usize = 0xe2;
pub const RX_DESC_ADDR_LOW: usize = 0xe4;
pub const RX_DESC_ADDR_HIGH: usize = 0xe8;
/// Named EarlyTxThres on the 8169, MaxTxPacketSize on later chips.
pub const MAX_TX_PACKET_SIZE: usize = 0xec;
pub const EARLY_TX_THRES: usize = 0xec;
pub const FUNC_EVENT: usize = 0xf0;
pub const MISC: usize = 0xf0;
pub const MISC_1: usize = 0xf2;
pub const IBCR0: usize = 0xf8;
pub const IBCR2: usize = 0xf9;
pub const IBISR0: usize = 0xfb;
/// 8169sc magic timing register.
pub const MAGIC_8169: usize = 0x7c;

// 8125 relocations
pub const INTR_MASK_8125: usize = 0x38;
pub const INTR_STATUS_8125: usize = 0x3c;
pub const TX_POLL_8125: usize = 0x90;
pub const MAC0_BKP: usize = 0x19e0;
pub const EEE_TXIDLE_TIMER_8125: usize = 0x6048;
pub const INTR_COALESCE_8125_START: usize = 0xa00;
pub const INTR_COALESCE_8125_END: usize = 0xb00;

// ═══════════════════════════════════════════════════════════════════════════
// COMMAND / CONFIG BITS
// ═══════════════════════════════════════════════════════════════════════════

bitflags! {
    /// ChipCmd (0x37).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChipCmd: u8 {
        const STOP_REQ = 0x80;
        const RESET = 0x10;
        const RX_ENABLE = 0x08;
        const TX_ENABLE = 0x04;
    }
}

/// TxPoll normal priority queue doorbell.
pub const NPQ: u8 = 0x40;

// Cfg9346
pub const CFG9346_LOCK: u8 = 0x00;
pub const CFG9346_UNLOCK: u8 = 0xc0;

// Config1
pub const LEDS1: u8 = 1 << 7;
pub const LEDS0: u8 = 1 << 6;
pub const SPEED_DOWN: u8 = 1 << 4;
pub const MEMMAP: u8 = 1 << 3;
pub const IOMAP: u8 = 1 << 2;
pub const VPD: u8 = 1 << 1;
pub const PM_ENABLE: u8 = 1 << 0;

// Config2
pub const CLK_REQ_EN: u8 = 1 << 7;
pub const MSI_ENABLE: u8 = 1 << 5;
pub const PME_SIGNAL: u8 = 1 << 5;
pub const PCI_CLOCK_66MHZ: u8 = 0x01;

// Config3
pub const MAGIC_PACKET: u8 = 1 << 5;
pub const LINK_UP: u8 = 1 << 4;
pub const JUMBO_EN0: u8 = 1 << 2;
pub const RDY_TO_L23: u8 = 1 << 1;
pub const BEACON_EN: u8 = 1 << 0;

// Config4
pub const JUMBO_EN1: u8 = 1 << 1;

// Config5
pub const BWF: u8 = 1 << 6;
pub const MWF: u8 = 1 << 5;
pub const UWF: u8 = 1 << 4;
pub const SPI_EN: u8 = 1 << 3;
pub const LAN_WAKE: u8 = 1 << 1;
pub const ASPM_EN: u8 = 1 << 0;

/// ERI 0x0dc magic packet enable on 8168evl and later.
pub const MAGIC_PACKET_V2: u32 = 1 << 16;

// PMCH
pub const D3_NO_PLL_DOWN: u8 = 0xc0;

// DLLPR
pub const PFM_EN: u8 = 1 << 6;
pub const TX_10M_PS_EN: u8 = 1 << 7;

// DBG_REG
pub const FIX_NAK_1: u8 = 1 << 4;
pub const FIX_NAK_2: u8 = 1 << 3;

// MCU
pub const NOW_IS_OOB: u8 = 1 << 7;
pub const TX_EMPTY: u8 = 1 << 5;
pub const RX_EMPTY: u8 = 1 << 4;
pub const RXTX_EMPTY: u8 = TX_EMPTY | RX_EMPTY;
pub const EN_NDP: u8 = 1 << 3;
pub const EN_OOB_RESET: u8 = 1 << 2;
pub const LINK_LIST_RDY: u8 = 1 << 1;

// MISC / FuncEvent
pub const TXPLA_RST: u32 = 1 << 29;
pub const DISABLE_LAN_EN: u32 = 1 << 23;
pub const PWM_EN: u32 = 1 << 22;
pub const RXDV_GATED_EN: u32 = 1 << 19;
pub const EARLY_TALLY_EN: u32 = 1 << 16;
/// Force LAN exit from ASPM when RX/TX are not idle.
pub const FORCE_ASPM_EXIT: u32 = 0x0000_2800;

// MISC_1
pub const PFM_D3COLD_EN: u8 = 1 << 6;

// MaxTxPacketSize / EarlyTxThres
pub const TX_PACKET_MAX: u8 = (8064 >> 7) as u8;
pub const EARLY_SIZE: u8 = 0x27;
pub const NO_EARLY_TX: u8 = 0x3f;

// CounterAddrLow command bits
pub const COUNTER_RESET: u32 = 1 << 0;
pub const COUNTER_DUMP: u32 = 1 << 3;

/// RxMaxSize programmed with filtering disabled.
pub const RX_MAX_SIZE_VALUE: u16 = 16384;

// ═══════════════════════════════════════════════════════════════════════════
// TX / RX CONFIG
// ═══════════════════════════════════════════════════════════════════════════

pub const TXCFG_AUTO_FIFO: u32 = 1 << 7;
pub const TXCFG_EMPTY: u32 = 1 << 11;
pub const TX_DMA_BURST: u32 = 7;
pub const TX_DMA_SHIFT: u32 = 8;
pub const TX_INTER_FRAME_GAP: u32 = 3;
pub const TX_INTER_FRAME_GAP_SHIFT: u32 = 24;

pub const RX128_INT_EN: u32 = 1 << 15;
pub const RX_MULTI_EN: u32 = 1 << 14;
pub const RX_FIFO_THRESH: u32 = 7 << 13;
pub const RX_EARLY_OFF: u32 = 1 << 11;
pub const RX_DMA_BURST: u32 = 7 << 8;
pub const RX_FETCH_DFLT_8125: u32 = 8 << 27;
pub const RX_VLAN_8125: u32 = (1 << 22) | (1 << 23);

bitflags! {
    /// RxConfig accept bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RxAccept: u32 {
        const ERR = 0x20;
        const RUNT = 0x10;
        const BROADCAST = 0x08;
        const MULTICAST = 0x04;
        const MY_PHYS = 0x02;
        const ALL_PHYS = 0x01;
    }
}

pub const RX_CONFIG_ACCEPT_ERR_MASK: u32 = 0x30;
pub const RX_CONFIG_ACCEPT_OK_MASK: u32 = 0x0f;
pub const RX_CONFIG_ACCEPT_MASK: u32 = 0x3f;

// ═══════════════════════════════════════════════════════════════════════════
// C+ COMMAND
// ═══════════════════════════════════════════════════════════════════════════

pub const CP_ENABLE_BIST: u16 = 1 << 15;
pub const CP_EN_ANA_PLL: u16 = 1 << 14;
pub const CP_NORMAL_MODE: u16 = 1 << 13;
pub const CP_PKT_CNTR_DISABLE: u16 = 1 << 7;
pub const CP_RX_VLAN: u16 = 1 << 6;
pub const CP_RX_CHKSUM: u16 = 1 << 5;
pub const CP_PCI_DAC: u16 = 1 << 4;
pub const CP_PCI_MUL_RW: u16 = 1 << 3;
pub const CP_INTT_MASK: u16 = 0x3;
pub const CPCMD_MASK: u16 = CP_NORMAL_MODE | CP_RX_VLAN | CP_RX_CHKSUM | CP_INTT_MASK;

// ═══════════════════════════════════════════════════════════════════════════
// INTERRUPTS
// ═══════════════════════════════════════════════════════════════════════════

bitflags! {
    /// IntrStatus / IntrMask bits (16 bit on 8169-8168, 32 bit on 8125).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Interrupts: u32 {
        const SYS_ERR = 0x8000;
        const PCS_TIMEOUT = 0x4000;
        const SW_INT = 0x0100;
        const TX_DESC_UNAVAIL = 0x0080;
        const RX_FIFO_OVER = 0x0040;
        const LINK_CHG = 0x0020;
        const RX_OVERFLOW = 0x0010;
        const TX_ERR = 0x0008;
        const TX_OK = 0x0004;
        const RX_ERR = 0x0002;
        const RX_OK = 0x0001;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PHY STATUS
// ═══════════════════════════════════════════════════════════════════════════

bitflags! {
    /// PHYstatus (0x6c).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PhyStatus: u32 {
        const SPEED_2500_FULL = 0x400;
        const TBI_ENABLE = 0x80;
        const TX_FLOW_CTRL = 0x40;
        const RX_FLOW_CTRL = 0x20;
        const SPEED_1000_FULL = 0x10;
        const SPEED_100 = 0x08;
        const SPEED_10 = 0x04;
        const LINK_STATUS = 0x02;
        const FULL_DUP = 0x01;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// MII REGISTERS (IEEE 802.3 clause 22)
// ═══════════════════════════════════════════════════════════════════════════

pub const MII_BMCR: u32 = 0x00;
pub const MII_BMSR: u32 = 0x01;
pub const MII_PHYSID1: u32 = 0x02;
pub const MII_PHYSID2: u32 = 0x03;
pub const MII_ADVERTISE: u32 = 0x04;
pub const MII_CTRL1000: u32 = 0x09;

pub const BMCR_RESET: u16 = 0x8000;
pub const BMCR_ANENABLE: u16 = 0x1000;
pub const BMCR_PDOWN: u16 = 0x0800;
pub const BMCR_ANRESTART: u16 = 0x0200;

pub const ADVERTISE_CSMA: u16 = 0x0001;
pub const ADVERTISE_10HALF: u16 = 0x0020;
pub const ADVERTISE_10FULL: u16 = 0x0040;
pub const ADVERTISE_100HALF: u16 = 0x0080;
pub const ADVERTISE_100FULL: u16 = 0x0100;
pub const ADVERTISE_PAUSE_CAP: u16 = 0x0400;
pub const ADVERTISE_PAUSE_ASYM: u16 = 0x0800;

pub const ADVERTISE_1000HALF: u16 = 0x0100;
pub const ADVERTISE_1000FULL: u16 = 0x0200;

/// Standard PHY register window in GPHY OCP space.
pub const OCP_STD_PHY_BASE: u32 = 0xa400;

// ═══════════════════════════════════════════════════════════════════════════
// PCI IDENTIFICATION
// ═══════════════════════════════════════════════════════════════════════════

pub const PCI_VENDOR_ID_REALTEK: u16 = 0x10ec;
pub const PCI_VENDOR_ID_NCUBE: u16 = 0x10ff;
pub const PCI_VENDOR_ID_DLINK: u16 = 0x1186;
pub const PCI_VENDOR_ID_AT: u16 = 0x1259;
pub const PCI_VENDOR_ID_USR: u16 = 0x16ec;
pub const PCI_VENDOR_ID_LINKSYS: u16 = 0x1737;

pub const SUPPORTED_VENDORS: &[u16] = &[
    PCI_VENDOR_ID_REALTEK,
    PCI_VENDOR_ID_NCUBE,
    PCI_VENDOR_ID_DLINK,
    PCI_VENDOR_ID_AT,
    PCI_VENDOR_ID_USR,
    PCI_VENDOR_ID_LINKSYS,
    0x0001,
];

pub const SUPPORTED_DEVICES: &[u16] = &[
    0x2502, 0x2600, 0x8129, 0x8136, 0x8161, 0x8162, 0x8167, 0x8168, 0x8169,
    0x4300, 0x4302, 0xc107, 0x0116, 0x1032, 0x8125, 0x3000,
];

/// Device IDs of Fast Ethernet-only parts (no GMII).
pub const NO_GBIT_DEVICES: &[u16] = &[0x8136];
