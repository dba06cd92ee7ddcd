//! smoltcp adapter.
//!
//! Exposes any [`NetworkDriver`] as a `smoltcp::phy::Device`. Received
//! frames are copied out of the driver when smoltcp asks for them; the
//! transmit token hands its buffer to [`NetworkDriver::transmit`].
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §6

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use smoltcp::phy::{self, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

use crate::driver::traits::{NetworkDriver, RxError};
use crate::types::{ETH_DATA_LEN, ETH_HLEN, VLAN_HLEN};

/// Largest frame smoltcp builds: MTU plus the Ethernet header.
pub const MAX_FRAME: usize = ETH_DATA_LEN + ETH_HLEN;

/// Adapter bridging a [`NetworkDriver`] to smoltcp.
pub struct SmoltcpAdapter<'a, D: NetworkDriver> {
    driver: &'a mut D,
    rx_buffer: Vec<u8>,
    tx_errors: AtomicU32,
    rx_oversize: u32,
}

impl<'a, D: NetworkDriver> SmoltcpAdapter<'a, D> {
    pub fn new(driver: &'a mut D) -> Self {
        Self {
            driver,
            rx_buffer: vec![0u8; MAX_FRAME + VLAN_HLEN],
            tx_errors: AtomicU32::new(0),
            rx_oversize: 0,
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut *self.driver
    }

    /// Frames the driver refused since the adapter was created.
    pub fn tx_errors(&self) -> u32 {
        self.tx_errors.load(Ordering::Relaxed)
    }

    /// Received frames too large for the adapter's buffer; they stay
    /// queued in the driver.
    pub fn rx_oversize(&self) -> u32 {
        self.rx_oversize
    }
}

/// Owns one received frame.
pub struct RxToken {
    buffer: Vec<u8>,
}

impl phy::RxToken for RxToken {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(&mut self.buffer)
    }
}

pub struct TxToken<'a, D: NetworkDriver> {
    driver: &'a mut D,
    errors: &'a AtomicU32,
}

impl<'a, D: NetworkDriver> phy::TxToken for TxToken<'a, D> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut buffer = vec![0u8; len];
        let result = f(&mut buffer);
        if let Err(e) = self.driver.transmit(&buffer) {
            self.errors.fetch_add(1, Ordering::Relaxed);
            log::trace!("[r8169] smoltcp frame of {} bytes not sent: {:?}", len, e);
        }
        result
    }
}

impl<'a, D: NetworkDriver> phy::Device for SmoltcpAdapter<'a, D> {
    type RxToken<'b> = RxToken where Self: 'b;
    type TxToken<'b> = TxToken<'b, D> where Self: 'b;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        match self.driver.receive(&mut self.rx_buffer) {
            Ok(Some(len)) => {
                let rx = RxToken {
                    buffer: self.rx_buffer[..len].to_vec(),
                };
                let tx = TxToken {
                    driver: &mut *self.driver,
                    errors: &self.tx_errors,
                };
                Some((rx, tx))
            }
            Ok(None) => None,
            Err(RxError::BufferTooSmall { needed }) => {
                self.rx_oversize = self.rx_oversize.wrapping_add(1);
                log::trace!("[r8169] {} byte frame exceeds adapter buffer", needed);
                None
            }
            Err(RxError::DeviceError) => None,
        }
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        if !self.driver.can_transmit() {
            return None;
        }
        Some(TxToken {
            driver: &mut *self.driver,
            errors: &self.tx_errors,
        })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = MAX_FRAME;
        caps.max_burst_size = Some(1);
        caps
    }
}
