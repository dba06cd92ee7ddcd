//! Wake-on-LAN.
//!
//! Wake sources live in Config3/Config5 behind the config write-protect
//! latch. Magic-packet wake moved out of Config3 on the 8168evl (ERI
//! 0xdc) and again on the 8125 (MAC OCP 0xc0b6).

use bitflags::bitflags;

use crate::access::RegisterAccess;
use crate::chip::{ChipRevision, DashType};
use crate::error::{R8169Error, Result};
use crate::hw::{Platform, RegisterIo};
use crate::regs;

bitflags! {
    /// Wake sources, numbered as the usual host tools number them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WolOpts: u32 {
        const PHY = 1 << 0;
        const UCAST = 1 << 1;
        const MCAST = 1 << 2;
        const BCAST = 1 << 3;
        const ARP = 1 << 4;
        const MAGIC = 1 << 5;
        const MAGICSECURE = 1 << 6;
        const FILTER = 1 << 7;
    }
}

impl WolOpts {
    /// Everything the chip reports as supported.
    pub const SUPPORTED: Self = Self::all();

    /// Parse a raw option word, rejecting unknown bits.
    pub fn from_raw(raw: u32) -> Result<Self> {
        Self::from_bits(raw).ok_or(R8169Error::InvalidArgument)
    }
}

/// Config register bit driven by one wake source.
struct WolBit {
    opt: WolOpts,
    reg: usize,
    mask: u8,
}

const WOL_BITS: [WolBit; 5] = [
    WolBit { opt: WolOpts::PHY, reg: regs::CONFIG3, mask: regs::LINK_UP },
    WolBit { opt: WolOpts::UCAST, reg: regs::CONFIG5, mask: regs::UWF },
    WolBit { opt: WolOpts::BCAST, reg: regs::CONFIG5, mask: regs::BWF },
    WolBit { opt: WolOpts::MCAST, reg: regs::CONFIG5, mask: regs::MWF },
    WolBit { opt: WolOpts::all(), reg: regs::CONFIG5, mask: regs::LAN_WAKE },
];

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// Arm the given wake sources.
    ///
    /// # Arguments
    /// - `opts`: wake sources, empty to disarm
    /// - `dash`: an active management controller keeps the PLL running
    ///
    /// # Returns
    /// `true` if wake is armed, which is what the host should mark the
    /// device as wake capable with.
    pub fn set_wol(&self, opts: WolOpts, dash: DashType) -> Result<bool> {
        let rev = self.revision();
        let armed = !opts.is_empty();

        self.unlock_config();
        let magic = if rev.is_8168evl_up() {
            if opts.contains(WolOpts::MAGIC) {
                self.eri_set_bits(0x0dc, regs::MAGIC_PACKET_V2)
            } else {
                self.eri_clear_bits(0x0dc, regs::MAGIC_PACKET_V2)
            }
        } else if rev.is_8125() {
            if opts.contains(WolOpts::MAGIC) {
                self.mac_ocp_modify(0xc0b6, 0, 1 << 0)
            } else {
                self.mac_ocp_modify(0xc0b6, 1 << 0, 0)
            }
        } else {
            Ok(())
        };
        let legacy_magic = !rev.is_8168evl_up() && !rev.is_8125();

        self.with_config25(|| {
            for bit in &WOL_BITS {
                let set = if opts.intersects(bit.opt) { bit.mask } else { 0 };
                self.mod8(bit.reg, bit.mask, set);
            }
            if legacy_magic {
                let set = if opts.contains(WolOpts::MAGIC) { regs::MAGIC_PACKET } else { 0 };
                self.mod8(regs::CONFIG3, regs::MAGIC_PACKET, set);
            }
        });

        if rev.within(ChipRevision::V02, ChipRevision::V06) {
            self.mod8(regs::CONFIG1, regs::PM_ENABLE, if armed { regs::PM_ENABLE } else { 0 });
        } else if rev == ChipRevision::V34 || rev == ChipRevision::V37 || rev >= ChipRevision::V39 {
            if armed {
                self.mod_config2(0, regs::PME_SIGNAL);
            } else {
                self.mod_config2(regs::PME_SIGNAL, 0);
            }
        }
        self.lock_config();

        if !dash.is_enabled() {
            self.set_d3_pll_down(!armed);
        }
        magic.map(|()| armed)
    }

    /// Wake sources currently armed in hardware, for diagnostics.
    pub fn read_wol(&self) -> WolOpts {
        let rev = self.revision();
        let c3 = self.r8(regs::CONFIG3);
        let c5 = self.r8(regs::CONFIG5);
        let mut opts = WolOpts::empty();
        if c5 & regs::LAN_WAKE == 0 {
            return opts;
        }
        if c3 & regs::LINK_UP != 0 {
            opts |= WolOpts::PHY;
        }
        if c5 & regs::UWF != 0 {
            opts |= WolOpts::UCAST;
        }
        if c5 & regs::BWF != 0 {
            opts |= WolOpts::BCAST;
        }
        if c5 & regs::MWF != 0 {
            opts |= WolOpts::MCAST;
        }
        let magic = if rev.is_8168evl_up() {
            self.eri_read(0x0dc).map(|v| v & regs::MAGIC_PACKET_V2 != 0).unwrap_or(false)
        } else if rev.is_8125() {
            self.mac_ocp_read(0xc0b6).map(|v| v & 1 != 0).unwrap_or(false)
        } else {
            c3 & regs::MAGIC_PACKET != 0
        };
        if magic {
            opts |= WolOpts::MAGIC;
        }
        opts
    }
}
