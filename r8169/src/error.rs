//! Driver error types.

use core::fmt;

use crate::access::Protocol;

pub type Result<T> = core::result::Result<T, R8169Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum R8169Error {
    /// Identification value matched no known revision.
    UnknownChip {
        /// Masked XID read from TxConfig.
        xid: u16,
    },
    /// Register reads return all ones; device is not responding.
    PciReadFailed,
    /// Indirect register transaction did not complete in time.
    Timeout(Protocol),
    /// Coherent DMA allocation failed.
    OutOfMemory,
    /// Streaming DMA mapping failed.
    MapFailed,
    InvalidArgument,
    /// Operation not available on this chip revision.
    NotSupported,
    /// Negotiated link speed has no coalescing scale entry.
    SpeedOutOfRange,
    /// Value exceeds a hardware-enforced maximum.
    OutOfRange,
    /// Device detached after a failed bus reset.
    Detached,
    /// Device is not open.
    NotRunning,
    /// Operation conflicts with one already in progress.
    Busy,
}

impl fmt::Display for R8169Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChip { xid } => write!(f, "unknown chip XID {:03x}", xid),
            Self::PciReadFailed => write!(f, "PCI read failed"),
            Self::Timeout(proto) => write!(f, "{} access timed out", proto),
            Self::OutOfMemory => write!(f, "out of DMA memory"),
            Self::MapFailed => write!(f, "DMA mapping failed"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::NotSupported => write!(f, "not supported on this chip"),
            Self::SpeedOutOfRange => write!(f, "link speed outside coalescing table"),
            Self::OutOfRange => write!(f, "value out of range"),
            Self::Detached => write!(f, "device detached"),
            Self::NotRunning => write!(f, "device not running"),
            Self::Busy => write!(f, "device busy"),
        }
    }
}
