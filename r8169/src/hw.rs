//! Platform seams: MMIO, delays and the PCI function.
//!
//! The driver never touches the bus directly. Everything it needs from
//! the surrounding system comes through the traits here, so the whole
//! driver can run against a simulated register file in tests.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §2.3 (MMIO), §3.1 (DMA)

use core::sync::atomic::{fence, Ordering};

use crate::dma::DmaAllocator;

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER I/O
// ═══════════════════════════════════════════════════════════════════════════

/// Raw register access at byte offsets into the MMIO BAR.
pub trait RegisterIo {
    fn read8(&self, offset: usize) -> u8;
    fn read16(&self, offset: usize) -> u16;
    fn read32(&self, offset: usize) -> u32;
    fn write8(&self, offset: usize, value: u8);
    fn write16(&self, offset: usize, value: u16);
    fn write32(&self, offset: usize, value: u32);
}

/// Volatile MMIO window.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    base: u64,
}

impl Mmio {
    /// # Safety
    /// `base` must be the mapped, uncached address of the device BAR and
    /// stay mapped for the lifetime of every copy of this value.
    pub unsafe fn new(base: u64) -> Self {
        Self { base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    #[inline]
    fn ptr<T>(&self, offset: usize) -> *mut T {
        (self.base as usize + offset) as *mut T
    }
}

impl RegisterIo for Mmio {
    #[inline]
    fn read8(&self, offset: usize) -> u8 {
        unsafe { core::ptr::read_volatile(self.ptr(offset)) }
    }

    #[inline]
    fn read16(&self, offset: usize) -> u16 {
        u16::from_le(unsafe { core::ptr::read_volatile(self.ptr(offset)) })
    }

    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        u32::from_le(unsafe { core::ptr::read_volatile(self.ptr(offset)) })
    }

    #[inline]
    fn write8(&self, offset: usize, value: u8) {
        unsafe { core::ptr::write_volatile(self.ptr(offset), value) }
    }

    #[inline]
    fn write16(&self, offset: usize, value: u16) {
        unsafe { core::ptr::write_volatile(self.ptr(offset), value.to_le()) }
    }

    #[inline]
    fn write32(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile(self.ptr(offset), value.to_le()) }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TIME
// ═══════════════════════════════════════════════════════════════════════════

pub trait Delay {
    /// Busy-wait for `us` microseconds.
    fn udelay(&self, us: u32);

    /// Sleep for `ms` milliseconds. May busy-wait on platforms without a
    /// scheduler.
    fn msleep(&self, ms: u32) {
        for _ in 0..ms {
            self.udelay(1000);
        }
    }

    /// Monotonic milliseconds.
    fn now_ms(&self) -> u64;
}

// ═══════════════════════════════════════════════════════════════════════════
// PCI FUNCTION
// ═══════════════════════════════════════════════════════════════════════════

/// PCI services the MAC needs from the bus driver.
pub trait PciFunction {
    /// Function number in the slot; selects the CSI function field.
    fn function_number(&self) -> u8;

    fn is_pcie(&self) -> bool;

    /// Write one byte of extended config space.
    ///
    /// # Returns
    /// `false` if the platform cannot reach extended config space; the
    /// caller then falls back to CSI.
    fn write_ext_config_byte(&self, offset: u16, value: u8) -> bool;

    /// PCIe Link Control CLKREQ enable.
    fn set_clock_request(&self, enable: bool);

    /// Disable ASPM L1 (and L0s when `include_l0s`).
    ///
    /// # Returns
    /// `true` if the link states are now disabled.
    fn disable_aspm(&self, include_l0s: bool) -> bool;

    /// Secondary bus reset of the upstream bridge.
    ///
    /// # Returns
    /// `true` if the reset was performed.
    fn secondary_bus_reset(&self) -> bool;

    fn set_bus_master(&self, enable: bool);

    /// PCIe Device Control max read request size in bytes.
    fn set_max_read_request(&self, bytes: u16);

    /// Seed for a locally administered MAC when the chip has none.
    fn mac_seed(&self) -> u64;
}

/// Everything the driver borrows from its host.
pub trait Platform: Delay + DmaAllocator + PciFunction {}

impl<T: Delay + DmaAllocator + PciFunction> Platform for T {}

// ═══════════════════════════════════════════════════════════════════════════
// BARRIERS
// ═══════════════════════════════════════════════════════════════════════════

/// Order descriptor payload writes before the ownership flip.
#[inline]
pub fn dma_wmb() {
    fence(Ordering::Release);
}

/// Order the ownership read before reading the rest of the descriptor.
#[inline]
pub fn dma_rmb() {
    fence(Ordering::Acquire);
}
