//! Driver configuration.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §8.3

use crate::error::{R8169Error, Result};
use crate::features::Features;
use crate::types::{ETH_FCS_LEN, ETH_HLEN, ETH_MIN_MTU, VLAN_HLEN};

/// Descriptors per ring.
pub const NUM_TX_DESC: usize = 256;
pub const NUM_RX_DESC: usize = 256;

/// RX buffer size programmed into every RX descriptor.
pub const R8169_RX_BUF_SIZE: usize = 16383;

/// NAPI-style poll weight.
pub const DEFAULT_POLL_BUDGET: usize = 64;

/// TX watchdog period.
pub const TX_TIMEOUT_MS: u64 = 6000;

/// Smallest ring the engine accepts.
pub const MIN_RING_SIZE: usize = 4;
/// Largest ring the engine accepts.
pub const MAX_RING_SIZE: usize = 1024;
/// A TX ring must hold a full wake window, or a stopped queue never
/// wakes again.
pub const MIN_TX_RING_SIZE: usize = 64;

/// R8169 driver configuration.
#[derive(Debug, Clone)]
pub struct R8169Config {
    /// Number of TX descriptors (power of two).
    pub tx_ring_size: usize,
    /// Number of RX descriptors (power of two).
    pub rx_ring_size: usize,
    /// Size of each RX DMA buffer.
    pub rx_buf_size: usize,
    /// Maximum RX completions processed per poll.
    pub poll_budget: usize,
    /// Initial MTU.
    pub mtu: usize,
    /// TX watchdog timeout.
    pub tx_timeout_ms: u64,
    /// False for Fast Ethernet-only boards (PCI ID 0x8136).
    pub supports_gmii: bool,
    /// The host lets the driver switch ASPM and CLKREQ. When false, ASPM
    /// is kept off.
    pub aspm_manageable: bool,
    /// Initial offload feature set.
    pub features: Features,
    /// Rate limiter: messages allowed per window.
    pub log_burst: u32,
    /// Rate limiter window.
    pub log_window_ms: u64,
}

impl Default for R8169Config {
    fn default() -> Self {
        Self {
            tx_ring_size: NUM_TX_DESC,
            rx_ring_size: NUM_RX_DESC,
            rx_buf_size: R8169_RX_BUF_SIZE,
            poll_budget: DEFAULT_POLL_BUDGET,
            mtu: crate::types::ETH_DATA_LEN,
            tx_timeout_ms: TX_TIMEOUT_MS,
            supports_gmii: true,
            aspm_manageable: true,
            features: Features::default(),
            log_burst: 10,
            log_window_ms: 5000,
        }
    }
}

impl R8169Config {
    /// Configuration for a Fast Ethernet-only device ID.
    pub fn for_device(device_id: u16) -> Self {
        Self {
            supports_gmii: !crate::regs::NO_GBIT_DEVICES.contains(&device_id),
            ..Self::default()
        }
    }

    /// Check ring geometry and limits.
    pub fn validate(&self) -> Result<()> {
        for size in [self.tx_ring_size, self.rx_ring_size] {
            if !size.is_power_of_two() || !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&size) {
                return Err(R8169Error::InvalidArgument);
            }
        }
        if self.tx_ring_size < MIN_TX_RING_SIZE {
            return Err(R8169Error::InvalidArgument);
        }
        // Length field in the RX descriptor is 14 bits.
        if self.rx_buf_size == 0 || self.rx_buf_size > R8169_RX_BUF_SIZE {
            return Err(R8169Error::InvalidArgument);
        }
        if self.poll_budget == 0 || self.mtu < ETH_MIN_MTU || !self.rx_frame_fits(self.mtu) {
            return Err(R8169Error::InvalidArgument);
        }
        Ok(())
    }

    /// A tagged frame of `mtu` bytes plus FCS fits in one RX buffer.
    /// Multi-descriptor receive is not supported.
    pub fn rx_frame_fits(&self, mtu: usize) -> bool {
        mtu + ETH_HLEN + VLAN_HLEN + ETH_FCS_LEN <= self.rx_buf_size
    }
}
