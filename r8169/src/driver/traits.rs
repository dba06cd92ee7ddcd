//! Driver trait definitions.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §8.2

use crate::types::MacAddress;

/// TX error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxError {
    /// TX ring is full, try again after completions are collected.
    QueueFull,
    /// Device closed, detached or suspended.
    DeviceNotReady,
    /// Frame exceeds the MTU plus headers.
    FrameTooLarge,
    /// Frame discarded and counted as dropped: the offload it asks for is
    /// not possible for this frame, or DMA mapping failed.
    Dropped,
}

/// RX error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxError {
    /// Provided buffer too small for frame.
    BufferTooSmall {
        /// Required buffer size.
        needed: usize,
    },
    /// Device closed or detached.
    DeviceError,
}

/// Core network device interface.
///
/// Higher layers (smoltcp adapter, state machines) only see this trait.
pub trait NetworkDriver {
    fn mac_address(&self) -> MacAddress;

    /// `true` if `transmit()` will not report `QueueFull`.
    fn can_transmit(&self) -> bool;

    /// `true` if `receive()` will return `Ok(Some(_))`.
    fn can_receive(&self) -> bool;

    /// Queue one complete Ethernet frame.
    ///
    /// # Returns
    /// - `Ok(())`: frame queued (fire-and-forget)
    /// - `Err(TxError::QueueFull)`: no space, try again later
    ///
    /// # Contract
    /// - MUST return immediately (no completion wait)
    fn transmit(&mut self, frame: &[u8]) -> Result<(), TxError>;

    /// Copy one received frame into `buffer`.
    ///
    /// # Returns
    /// - `Ok(Some(len))`: frame received, `len` bytes copied
    /// - `Ok(None)`: no frame available (normal)
    /// - `Err(RxError)`: receive error
    ///
    /// # Contract
    /// - MUST return immediately (no blocking)
    /// - A frame too large for `buffer` is consumed and dropped
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, RxError>;

    /// Give the device fresh RX work. Called in main loop phase 1.
    fn refill_rx_queue(&mut self);

    /// Reclaim finished TX work. Called in main loop phase 5.
    fn collect_tx_completions(&mut self);

    fn link_up(&self) -> bool {
        true
    }
}

/// Driver initialization trait.
pub trait DriverInit: Sized {
    type Error: core::fmt::Debug;

    type Config;

    /// PCI vendor IDs this driver supports.
    fn supported_vendors() -> &'static [u16];

    /// PCI device IDs this driver supports.
    fn supported_devices() -> &'static [u16];

    fn supports_device(vendor: u16, device: u16) -> bool {
        Self::supported_vendors().contains(&vendor) && Self::supported_devices().contains(&device)
    }

    /// Create driver from MMIO base and configuration.
    ///
    /// # Safety
    /// - `mmio_base` must be valid device MMIO address
    /// - Configuration must be valid
    unsafe fn create(mmio_base: u64, config: Self::Config) -> Result<Self, Self::Error>;
}
