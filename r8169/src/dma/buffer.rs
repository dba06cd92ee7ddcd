//! RX DMA buffer with ownership tracking.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §3.5

use super::ownership::BufferOwnership;

/// One receive buffer carved out of a coherent region.
///
/// The ownership field shadows the Own bit of the descriptor that points
/// at this buffer.
pub struct DmaBuffer {
    cpu_ptr: *mut u8,
    bus_addr: u64,
    capacity: usize,
    ownership: BufferOwnership,
    index: u16,
}

impl DmaBuffer {
    /// # Safety
    /// - `cpu_ptr` must point to `capacity` bytes of coherent memory
    /// - `bus_addr` must be the device-visible address of the same bytes
    pub unsafe fn new(cpu_ptr: *mut u8, bus_addr: u64, capacity: usize, index: u16) -> Self {
        Self {
            cpu_ptr,
            bus_addr,
            capacity,
            ownership: BufferOwnership::Free,
            index,
        }
    }

    /// First `len` bytes of a completed receive.
    ///
    /// # Panics
    /// Panics if the device still owns the buffer or `len` exceeds capacity.
    pub fn received(&self, len: usize) -> &[u8] {
        assert!(
            self.ownership.can_access(),
            "BUG: RX buffer {} read while {:?}",
            self.index,
            self.ownership
        );
        assert!(len <= self.capacity, "RX length exceeds buffer capacity");
        unsafe { core::slice::from_raw_parts(self.cpu_ptr, len) }
    }

    pub fn bus_addr(&self) -> u64 {
        self.bus_addr
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ownership(&self) -> BufferOwnership {
        self.ownership
    }

    pub fn is_device_owned(&self) -> bool {
        self.ownership.is_device_owned()
    }

    /// Free -> DriverOwned.
    pub(crate) fn mark_allocated(&mut self) {
        debug_assert!(self.ownership.is_free(), "RX buffer must be free to allocate");
        self.ownership = BufferOwnership::DriverOwned;
    }

    /// DriverOwned -> DeviceOwned. Call right before setting Own.
    pub(crate) fn mark_device_owned(&mut self) {
        debug_assert!(
            self.ownership.can_access(),
            "RX buffer must be driver-owned before posting"
        );
        self.ownership = BufferOwnership::DeviceOwned;
    }

    /// DeviceOwned -> DriverOwned. Call after observing Own cleared.
    pub(crate) fn mark_driver_owned(&mut self) {
        debug_assert!(
            self.ownership.is_device_owned(),
            "RX buffer must be device-owned before reclaim"
        );
        self.ownership = BufferOwnership::DriverOwned;
    }

    /// Any state -> Free. Only valid once the receiver is stopped.
    pub(crate) fn mark_free(&mut self) {
        self.ownership = BufferOwnership::Free;
    }
}

unsafe impl Send for DmaBuffer {}
unsafe impl Sync for DmaBuffer {}
