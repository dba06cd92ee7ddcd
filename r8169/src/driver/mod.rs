//! Driver abstraction shared with the rest of MorpheusX.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §8

pub mod traits;

pub use traits::{DriverInit, NetworkDriver, RxError, TxError};
