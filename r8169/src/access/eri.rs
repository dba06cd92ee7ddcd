//! Extended register interface (ERI).
//!
//! ```text
//! ERIAR: [31] flag | [27:18] OOB base (8117) | [17:16] type | [15:12] byte enables | [11:0] addr
//! ```
//!
//! Writes complete when the flag drops; reads complete when it rises.

use super::{Protocol, RegisterAccess, POLL_ERI};
use crate::chip::ChipRevision;
use crate::error::{R8169Error, Result};
use crate::hw::{Platform, RegisterIo};
use crate::regs::{ERIAR, ERIDR};

const ERIAR_FLAG: u32 = 0x8000_0000;
const ERIAR_TYPE_SHIFT: u32 = 16;
const ERIAR_MASK_SHIFT: u32 = 12;
/// OOB MAC base on the 8168fp/8117.
const R8168FP_OOB_BASE: u32 = 0xf70 << 18;

/// ERI address space selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EriType {
    ExgMac = 0,
    Msix = 1,
    Oob = 2,
}

/// Byte enables of an ERI write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EriMask {
    M0001 = 0x1,
    M0011 = 0x3,
    M0100 = 0x4,
    M0101 = 0x5,
    M1111 = 0xf,
}

impl EriMask {
    fn bits(self) -> u32 {
        (self as u32) << ERIAR_MASK_SHIFT
    }
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    fn eri_command(&self, addr: u32, mask: EriMask, ty: EriType) -> u32 {
        let mut cmd = ((ty as u32) << ERIAR_TYPE_SHIFT) | mask.bits() | addr;
        if ty == EriType::Oob && matches!(self.rev, ChipRevision::V52 | ChipRevision::V53) {
            cmd |= R8168FP_OOB_BASE;
        }
        cmd
    }

    pub fn eri_write_typed(&self, addr: u32, mask: EriMask, value: u32, ty: EriType) -> Result<()> {
        if addr & 3 != 0 {
            log::warn!("[r8169] ERI write to unaligned address {:#x}", addr);
            return Err(R8169Error::InvalidArgument);
        }

        self.w32(ERIDR, value);
        self.w32(ERIAR, ERIAR_FLAG | self.eri_command(addr, mask, ty));
        self.wait_reg32(Protocol::Eri, ERIAR, ERIAR_FLAG, false, POLL_ERI)
    }

    pub fn eri_read_typed(&self, addr: u32, ty: EriType) -> Result<u32> {
        self.w32(ERIAR, self.eri_command(addr, EriMask::M1111, ty));
        self.wait_reg32(Protocol::Eri, ERIAR, ERIAR_FLAG, true, POLL_ERI)?;
        Ok(self.r32(ERIDR))
    }

    pub fn eri_write(&self, addr: u32, mask: EriMask, value: u32) -> Result<()> {
        self.eri_write_typed(addr, mask, value, EriType::ExgMac)
    }

    pub fn eri_read(&self, addr: u32) -> Result<u32> {
        self.eri_read_typed(addr, EriType::ExgMac)
    }

    /// `(value & !clear) | set` over all four bytes.
    pub fn eri_modify(&self, addr: u32, clear: u32, set: u32) -> Result<()> {
        let value = self.eri_read(addr)?;
        self.eri_write(addr, EriMask::M1111, (value & !clear) | set)
    }

    pub fn eri_set_bits(&self, addr: u32, bits: u32) -> Result<()> {
        self.eri_modify(addr, 0, bits)
    }

    pub fn eri_clear_bits(&self, addr: u32, bits: u32) -> Result<()> {
        self.eri_modify(addr, bits, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{test_access, MockIo};

    #[test]
    fn test_write_then_read_echoes() {
        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        hw.eri_write(0xc8, EriMask::M1111, 0x0010_0008).unwrap();
        assert_eq!(hw.eri_read(0xc8), Ok(0x0010_0008));
    }

    #[test]
    fn test_byte_enables_limit_the_write() {
        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        hw.eri_write(0xd4, EriMask::M1111, 0xaabb_ccdd).unwrap();
        hw.eri_write(0xd4, EriMask::M0011, 0x1122_3344).unwrap();
        assert_eq!(hw.eri_read(0xd4), Ok(0xaabb_3344));
    }

    #[test]
    fn test_modify_keeps_other_bits() {
        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        hw.eri_write(0x2fc, EriMask::M1111, 0x0000_0f06).unwrap();
        hw.eri_modify(0x2fc, 0x06, 0x01).unwrap();
        assert_eq!(hw.eri_read(0x2fc), Ok(0x0000_0f01));
    }

    #[test]
    fn test_unaligned_address_is_rejected() {
        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        assert_eq!(hw.eri_write(0x1b1, EriMask::M0001, 1), Err(R8169Error::InvalidArgument));
    }

    #[test]
    fn test_busy_read_times_out_after_exact_retry_count() {
        let io = MockIo::new(ChipRevision::V40);
        let hw = test_access(io.clone(), ChipRevision::V40);
        io.set_always_busy(true);
        io.reset_read_count(ERIAR);
        assert_eq!(hw.eri_read(0xdc), Err(R8169Error::Timeout(Protocol::Eri)));
        assert_eq!(io.read_count(ERIAR), POLL_ERI.tries as usize);
    }

    #[test]
    fn test_oob_type_on_8117_carries_base_offset() {
        let io = MockIo::new(ChipRevision::V52);
        let hw = test_access(io.clone(), ChipRevision::V52);
        let cmd = hw.eri_command(0x128, EriMask::M1111, EriType::Oob);
        assert_eq!(cmd & R8168FP_OOB_BASE, R8168FP_OOB_BASE);
        let cmd = hw.eri_command(0x128, EriMask::M1111, EriType::ExgMac);
        assert_eq!(cmd & R8168FP_OOB_BASE, 0);
    }
}
