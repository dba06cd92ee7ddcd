//! Extended PHY (EPHY): PCIe SerDes tuning registers.

use super::{Protocol, RegisterAccess, POLL_EPHY};
use crate::error::Result;
use crate::hw::{Delay, Platform, RegisterIo};
use crate::regs::EPHYAR;

const EPHYAR_FLAG: u32 = 0x8000_0000;
const EPHYAR_REG_SHIFT: u32 = 16;
const EPHYAR_DATA_MASK: u32 = 0xffff;

/// One `(reg, clear, set)` SerDes patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EphyPatch {
    pub reg: u8,
    pub clear: u16,
    pub set: u16,
}

impl EphyPatch {
    pub const fn new(reg: u8, clear: u16, set: u16) -> Self {
        Self { reg, clear, set }
    }
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// The 8125 widened the register field to seven bits.
    fn ephy_reg_mask(&self) -> u32 {
        if self.rev.is_8125() {
            0x7f
        } else {
            0x1f
        }
    }

    pub fn ephy_write(&self, reg: u8, value: u16) -> Result<()> {
        let reg = reg as u32 & self.ephy_reg_mask();
        self.w32(
            EPHYAR,
            EPHYAR_FLAG | (value as u32 & EPHYAR_DATA_MASK) | reg << EPHYAR_REG_SHIFT,
        );
        let ret = self.wait_reg32(Protocol::Ephy, EPHYAR, EPHYAR_FLAG, false, POLL_EPHY);
        self.platform.udelay(10);
        ret
    }

    pub fn ephy_read(&self, reg: u8) -> Result<u16> {
        let reg = reg as u32 & self.ephy_reg_mask();
        self.w32(EPHYAR, reg << EPHYAR_REG_SHIFT);
        self.wait_reg32(Protocol::Ephy, EPHYAR, EPHYAR_FLAG, true, POLL_EPHY)?;
        Ok((self.r32(EPHYAR) & EPHYAR_DATA_MASK) as u16)
    }

    /// Apply a SerDes patch table in order.
    pub fn ephy_init(&self, patches: &[EphyPatch]) -> Result<()> {
        for p in patches {
            let value = (self.ephy_read(p.reg)? & !p.clear) | p.set;
            self.ephy_write(p.reg, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::ChipRevision;
    use crate::error::R8169Error;
    use crate::mock::{test_access, MockIo};

    #[test]
    fn test_patch_table_applies_clear_then_set() {
        let io = MockIo::new(ChipRevision::V32);
        let hw = test_access(io.clone(), ChipRevision::V32);
        hw.ephy_write(0x03, 0x5a5a).unwrap();
        hw.ephy_init(&[EphyPatch::new(0x03, 0x5800, 0x2000), EphyPatch::new(0x03, 0, 0x0001)])
            .unwrap();
        assert_eq!(hw.ephy_read(0x03), Ok(0x225b));
    }

    #[test]
    fn test_8125_reaches_upper_registers() {
        let io = MockIo::new(ChipRevision::V61);
        let hw = test_access(io.clone(), ChipRevision::V61);
        hw.ephy_write(0x44, 0xd000).unwrap();
        hw.ephy_write(0x04, 0x0001).unwrap();
        assert_eq!(hw.ephy_read(0x44), Ok(0xd000));
    }

    #[test]
    fn test_busy_write_times_out() {
        let io = MockIo::new(ChipRevision::V32);
        let hw = test_access(io.clone(), ChipRevision::V32);
        io.set_always_busy(true);
        io.reset_read_count(EPHYAR);
        assert_eq!(hw.ephy_write(0x19, 0xff64), Err(R8169Error::Timeout(Protocol::Ephy)));
        assert_eq!(io.read_count(EPHYAR), POLL_EPHY.tries as usize);
    }
}
