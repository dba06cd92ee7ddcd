//! Coherent DMA region.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §3.3

/// A device-coherent allocation: CPU pointer plus bus address.
#[derive(Debug)]
pub struct DmaRegion {
    cpu_ptr: *mut u8,
    bus_addr: u64,
    size: usize,
}

impl DmaRegion {
    /// # Safety
    /// - `cpu_ptr` must point to `size` bytes of coherent memory
    /// - `bus_addr` must be the device-visible address of the same bytes
    pub unsafe fn new(cpu_ptr: *mut u8, bus_addr: u64, size: usize) -> Self {
        Self { cpu_ptr, bus_addr, size }
    }

    pub fn cpu_ptr(&self) -> *mut u8 {
        self.cpu_ptr
    }

    pub fn bus_addr(&self) -> u64 {
        self.bus_addr
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Fill the whole region with zeroes.
    pub fn zero(&mut self) {
        unsafe { core::ptr::write_bytes(self.cpu_ptr, 0, self.size) }
    }
}

unsafe impl Send for DmaRegion {}
unsafe impl Sync for DmaRegion {}
