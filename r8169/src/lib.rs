//! MorpheusX Realtek Gigabit Ethernet driver.
//!
//! Drives the RTL8169/8110, RTL8168/8111, RTL8101/8102/8105/8106/8107,
//! RTL8401/8402/8411, RTL8117 and RTL8125 families behind one device type.
//!
//! # Layout
//! - [`access`] - raw MMIO plus the indirect register protocols
//!   (MDIO, OCP, EPHY, ERI, CSI, EFUSE)
//! - [`chip`] - revision identification, capability table, bring-up steps
//! - [`ring`] - TX/RX descriptor rings and offload encoding
//! - [`irq`] / [`recovery`] - interrupt pipeline and deferred recovery
//! - [`device`] - the [`R8169`] device: attach, open/close, datapath
//! - [`stack`] - smoltcp adapter
//!
//! # Reference
//! RTL8169/RTL8168 register datasheets, MorpheusX NETWORK_IMPL_GUIDE.md §8

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod config;
pub mod types;
pub mod regs;
pub mod hw;
pub mod access;
pub mod chip;
pub mod dma;
pub mod ring;
pub mod irq;
pub mod recovery;
pub mod link;
pub mod wol;
pub mod rx_mode;
pub mod coalesce;
pub mod features;
pub mod stats;
pub mod driver;
pub mod device;
#[cfg(feature = "smoltcp-adapter")]
pub mod stack;

#[cfg(test)]
pub(crate) mod mock;

pub use config::R8169Config;
pub use device::R8169;
pub use error::{R8169Error, Result};
pub use types::MacAddress;
