//! EFUSE: one-time-programmable byte storage (8168d).

use super::{Protocol, RegisterAccess, POLL_EFUSE};
use crate::error::Result;
use crate::hw::{Platform, RegisterIo};
use crate::regs::EFUSEAR;

const EFUSEAR_FLAG: u32 = 0x8000_0000;
const EFUSEAR_REG_MASK: u32 = 0x03ff;
const EFUSEAR_REG_SHIFT: u32 = 8;
const EFUSEAR_DATA_MASK: u32 = 0xff;

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    pub fn efuse_read(&self, reg: u16) -> Result<u8> {
        self.w32(EFUSEAR, (reg as u32 & EFUSEAR_REG_MASK) << EFUSEAR_REG_SHIFT);
        self.wait_reg32(Protocol::Efuse, EFUSEAR, EFUSEAR_FLAG, true, POLL_EFUSE)?;
        Ok((self.r32(EFUSEAR) & EFUSEAR_DATA_MASK) as u8)
    }
}
