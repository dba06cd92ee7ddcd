//! CSI: PCI configuration space reached through the MAC.
//!
//! Fallback for platforms without extended config access.

use super::{Protocol, RegisterAccess, POLL_CSI};
use crate::error::Result;
use crate::hw::{PciFunction, Platform, RegisterIo};
use crate::regs::{CSIAR, CSIDR};

const CSIAR_FLAG: u32 = 0x8000_0000;
const CSIAR_BYTE_ENABLE: u32 = 0x0000_f000;
const CSIAR_ADDR_MASK: u32 = 0x0000_0fff;

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    fn csi_function(&self) -> u32 {
        (self.platform.function_number() as u32) << 16
    }

    pub fn csi_write(&self, addr: u32, value: u32) -> Result<()> {
        self.w32(CSIDR, value);
        self.w32(
            CSIAR,
            CSIAR_FLAG | (addr & CSIAR_ADDR_MASK) | CSIAR_BYTE_ENABLE | self.csi_function(),
        );
        self.wait_reg32(Protocol::Csi, CSIAR, CSIAR_FLAG, false, POLL_CSI)
    }

    pub fn csi_read(&self, addr: u32) -> Result<u32> {
        self.w32(
            CSIAR,
            (addr & CSIAR_ADDR_MASK) | self.csi_function() | CSIAR_BYTE_ENABLE,
        );
        self.wait_reg32(Protocol::Csi, CSIAR, CSIAR_FLAG, true, POLL_CSI)?;
        Ok(self.r32(CSIDR))
    }
}
