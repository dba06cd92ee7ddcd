//! Descriptor rings and transmit offload encoding.
//!
//! # Layout
//! - [`csum`] - software Internet checksum
//! - [`desc`] - descriptor bits and coherent descriptor storage
//! - [`offload`] - checksum/TSO encoding and the per-packet feature check
//! - [`tx`] - transmit ring with bounce buffers
//! - [`rx`] - receive ring with copy-out delivery

pub mod csum;
pub mod desc;
pub mod offload;
pub mod tx;
pub mod rx;

pub use offload::{TxOffload, TxOpts, TxPacket};
pub use rx::{RxFlags, RxPacket, RxRing};
pub use tx::{TxReclaim, TxRing, TX_START_THRESHOLD, TX_STOP_THRESHOLD};
