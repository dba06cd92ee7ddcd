//! PHY register access.
//!
//! Three routes exist depending on the chip:
//!
//! - [`PhyRoute::Mdio`]: PHYAR, clause 22 style
//! - [`PhyRoute::MdioOob`]: PHYAR bracketed by the 8168dp management
//!   controller toggle in register 0xd0
//! - [`PhyRoute::Paged`]: GPHY OCP with an implicit page register at
//!   0x1f (8168g and later)

use core::sync::atomic::Ordering;

use super::{Protocol, RegisterAccess, POLL_MDIO};
use crate::chip::ChipRevision;
use crate::error::Result;
use crate::hw::{Delay, Platform, RegisterIo};
use crate::regs::{self, OCP_STD_PHY_BASE, PHYAR};

const PHYAR_FLAG: u32 = 0x8000_0000;
const PHY_PAGE_SELECT: u32 = 0x1f;
/// Register 0xd0 bit that hands the MDIO bus to the host on the 8168dp.
const R8168DP_MDIO_ACCESS_BIT: u32 = 0x0002_0000;
/// The 8168dp reports a wrong PHYSID2.
const R8168DP_PHYSID2: u16 = 0xc912;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyRoute {
    Mdio,
    MdioOob,
    Paged,
}

impl PhyRoute {
    pub fn for_revision(rev: ChipRevision) -> Self {
        match rev {
            ChipRevision::V28 | ChipRevision::V31 => Self::MdioOob,
            r if r >= ChipRevision::V40 => Self::Paged,
            _ => Self::Mdio,
        }
    }
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    pub fn phy_write(&self, reg: u32, value: u16) -> Result<()> {
        match PhyRoute::for_revision(self.rev) {
            PhyRoute::Mdio => self.mdio_write(reg, value),
            PhyRoute::MdioOob => {
                self.mdio_oob_start();
                let ret = self.mdio_write(reg, value);
                self.mdio_oob_stop();
                ret
            }
            PhyRoute::Paged => self.paged_phy_write(reg, value),
        }
    }

    pub fn phy_read(&self, reg: u32) -> Result<u16> {
        match PhyRoute::for_revision(self.rev) {
            PhyRoute::Mdio => self.mdio_read(reg),
            PhyRoute::MdioOob => {
                if reg == regs::MII_PHYSID2 {
                    return Ok(R8168DP_PHYSID2);
                }
                self.mdio_oob_start();
                let ret = self.mdio_read(reg);
                self.mdio_oob_stop();
                ret
            }
            PhyRoute::Paged => self.paged_phy_read(reg),
        }
    }

    pub fn phy_modify(&self, reg: u32, clear: u16, set: u16) -> Result<()> {
        let value = self.phy_read(reg)?;
        self.phy_write(reg, (value & !clear) | set)
    }

    /// Read `reg` on `page`, restoring the standard page afterwards.
    pub fn phy_read_paged(&self, page: u16, reg: u32) -> Result<u16> {
        self.phy_write(PHY_PAGE_SELECT, page)?;
        let ret = self.phy_read(reg);
        self.phy_write(PHY_PAGE_SELECT, 0)?;
        ret
    }

    pub fn phy_write_paged(&self, page: u16, reg: u32, value: u16) -> Result<()> {
        self.phy_write(PHY_PAGE_SELECT, page)?;
        let ret = self.phy_write(reg, value);
        self.phy_write(PHY_PAGE_SELECT, 0)?;
        ret
    }

    // ───────────────────────────────────────────────────────────────────
    // PHYAR
    // ───────────────────────────────────────────────────────────────────

    fn mdio_write(&self, reg: u32, value: u16) -> Result<()> {
        self.w32(PHYAR, PHYAR_FLAG | (reg & 0x1f) << 16 | value as u32);
        let ret = self.wait_reg32(Protocol::Mdio, PHYAR, PHYAR_FLAG, false, POLL_MDIO);
        // 20us turnaround before the next command.
        self.platform.udelay(20);
        ret
    }

    fn mdio_read(&self, reg: u32) -> Result<u16> {
        self.w32(PHYAR, (reg & 0x1f) << 16);
        let ret = self
            .wait_reg32(Protocol::Mdio, PHYAR, PHYAR_FLAG, true, POLL_MDIO)
            .map(|()| self.r32(PHYAR) as u16);
        self.platform.udelay(20);
        ret
    }

    fn mdio_oob_start(&self) {
        self.mod32(0xd0, R8168DP_MDIO_ACCESS_BIT, 0);
    }

    fn mdio_oob_stop(&self) {
        self.mod32(0xd0, 0, R8168DP_MDIO_ACCESS_BIT);
    }

    // ───────────────────────────────────────────────────────────────────
    // Paged GPHY OCP
    // ───────────────────────────────────────────────────────────────────

    fn paged_phy_write(&self, reg: u32, value: u16) -> Result<()> {
        if reg == PHY_PAGE_SELECT {
            let base = if value != 0 {
                (value as u32) << 4
            } else {
                OCP_STD_PHY_BASE
            };
            self.ocp_base.store(base, Ordering::Relaxed);
            return Ok(());
        }

        let base = self.ocp_base.load(Ordering::Relaxed);
        let reg = if base != OCP_STD_PHY_BASE { reg.wrapping_sub(0x10) } else { reg };

        if base == OCP_STD_PHY_BASE && reg == regs::MII_BMCR {
            self.phy_suspend_quirk(value)?;
        }

        self.phy_ocp_write(base + reg * 2, value)
    }

    fn paged_phy_read(&self, reg: u32) -> Result<u16> {
        let base = self.ocp_base.load(Ordering::Relaxed);
        if reg == PHY_PAGE_SELECT {
            return Ok(if base == OCP_STD_PHY_BASE { 0 } else { (base >> 4) as u16 });
        }

        let reg = if base != OCP_STD_PHY_BASE { reg.wrapping_sub(0x10) } else { reg };
        self.phy_ocp_read(base + reg * 2)
    }

    /// The 8168g PHY MCU must have its interrupts masked before power-down.
    fn phy_suspend_quirk(&self, bmcr: u16) -> Result<()> {
        if self.rev != ChipRevision::V40 {
            return Ok(());
        }
        if bmcr & regs::BMCR_RESET != 0 || bmcr & regs::BMCR_PDOWN == 0 {
            self.eri_set_bits(0x1a8, 0xfc00_0000)
        } else {
            self.eri_clear_bits(0x1a8, 0xfc00_0000)
        }
    }
}
