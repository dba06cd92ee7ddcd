//! Chip identification, capabilities and bring-up.
//!
//! # Layout
//! - [`ident`] - XID to [`ChipRevision`]
//! - [`caps`] - per-revision capability record
//! - [`bringup`] - per-revision register tables
//! - [`setup`] - generic MAC setup shared by all revisions
//! - [`dash`] - out-of-band management handshake

pub mod ident;
pub mod caps;
pub mod bringup;
pub mod setup;
pub mod dash;

pub use bringup::{sequence, BringUpReport, Step};
pub use caps::{capabilities, Capabilities, CoalesceScale, CsumGen, Family, Quirks};
pub use dash::DashType;
pub use ident::{identify, xid_from_txconfig, ChipRevision, XID_MASK};
