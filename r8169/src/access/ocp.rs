//! On-chip peripheral (OCP) register spaces.
//!
//! - MAC OCP through OCPDR: posted, no completion flag
//! - GPHY OCP through GPHY_OCP: flag-polled
//! - OOB OCP for the management controller: OCPAR/OCPDR on the 8168dp,
//!   ERI type OOB on the 8168ep/8117

use super::eri::{EriMask, EriType};
use super::{Protocol, RegisterAccess, POLL_OOB_OCP, POLL_PHY_OCP};
use crate::error::{R8169Error, Result};
use crate::hw::{Platform, RegisterIo};
use crate::regs::{GPHY_OCP, OCPAR, OCPDR};

const OCP_FLAG: u32 = 0x8000_0000;
const OCP_REG_SHIFT: u32 = 15;

fn check_ocp_reg(reg: u32) -> Result<()> {
    if reg & 0xffff_0001 != 0 {
        log::warn!("[r8169] invalid OCP register {:#x}", reg);
        return Err(R8169Error::InvalidArgument);
    }
    Ok(())
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    // ───────────────────────────────────────────────────────────────────
    // MAC OCP
    // ───────────────────────────────────────────────────────────────────

    fn mac_ocp_write_locked(&self, reg: u32, data: u16) {
        self.w32(OCPDR, OCP_FLAG | (reg << OCP_REG_SHIFT) | data as u32);
    }

    fn mac_ocp_read_locked(&self, reg: u32) -> u16 {
        self.w32(OCPDR, reg << OCP_REG_SHIFT);
        self.r32(OCPDR) as u16
    }

    pub fn mac_ocp_write(&self, reg: u32, data: u16) -> Result<()> {
        check_ocp_reg(reg)?;
        let _guard = self.mac_ocp.lock();
        self.mac_ocp_write_locked(reg, data);
        Ok(())
    }

    pub fn mac_ocp_read(&self, reg: u32) -> Result<u16> {
        check_ocp_reg(reg)?;
        let _guard = self.mac_ocp.lock();
        Ok(self.mac_ocp_read_locked(reg))
    }

    /// `(value & !clear) | set`, atomic with respect to other OCP users.
    pub fn mac_ocp_modify(&self, reg: u32, clear: u16, set: u16) -> Result<()> {
        check_ocp_reg(reg)?;
        let _guard = self.mac_ocp.lock();
        let data = self.mac_ocp_read_locked(reg);
        self.mac_ocp_write_locked(reg, (data & !clear) | set);
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────
    // GPHY OCP
    // ───────────────────────────────────────────────────────────────────

    pub fn phy_ocp_write(&self, reg: u32, data: u16) -> Result<()> {
        check_ocp_reg(reg)?;
        self.w32(GPHY_OCP, OCP_FLAG | (reg << OCP_REG_SHIFT) | data as u32);
        self.wait_reg32(Protocol::PhyOcp, GPHY_OCP, OCP_FLAG, false, POLL_PHY_OCP)
    }

    pub fn phy_ocp_read(&self, reg: u32) -> Result<u16> {
        check_ocp_reg(reg)?;
        self.w32(GPHY_OCP, reg << OCP_REG_SHIFT);
        self.wait_reg32(Protocol::PhyOcp, GPHY_OCP, OCP_FLAG, true, POLL_PHY_OCP)?;
        Ok(self.r32(GPHY_OCP) as u16)
    }

    // ───────────────────────────────────────────────────────────────────
    // OOB OCP
    // ───────────────────────────────────────────────────────────────────

    /// 8168dp management controller read.
    pub fn dp_ocp_read(&self, reg: u16) -> Result<u32> {
        self.w32(OCPAR, 0x0f << 12 | (reg as u32 & 0x0fff));
        self.wait_reg32(Protocol::OobOcp, OCPAR, OCP_FLAG, true, POLL_OOB_OCP)?;
        Ok(self.r32(OCPDR))
    }

    pub fn dp_ocp_write(&self, mask: u8, reg: u16, data: u32) -> Result<()> {
        self.w32(OCPDR, data);
        self.w32(
            OCPAR,
            OCP_FLAG | ((mask as u32) & 0x0f) << 12 | (reg as u32 & 0x0fff),
        );
        self.wait_reg32(Protocol::OobOcp, OCPAR, OCP_FLAG, false, POLL_OOB_OCP)
    }

    /// 8168ep/8117 management controller read.
    pub fn ep_ocp_read(&self, reg: u16) -> Result<u32> {
        self.eri_read_typed(reg as u32, EriType::Oob)
    }

    /// Only the low-byte enable is used by the management handshake.
    pub fn ep_ocp_write(&self, reg: u16, data: u32) -> Result<()> {
        self.eri_write_typed(reg as u32, EriMask::M0001, data, EriType::Oob)
    }
}
