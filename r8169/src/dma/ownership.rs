//! Buffer ownership state machine.
//!
//! # State Machine
//! ```text
//!     FREE ──alloc()──> DRIVER_OWNED ──post()──> DEVICE_OWNED
//!       ▲                     │   ▲                    │
//!       └────free()───────────┘   └────completion──────┘
//! ```
//!
//! INVARIANT: the state mirrors the descriptor Own bit. Touching a
//! DEVICE_OWNED buffer races the NIC.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §3.4

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferOwnership {
    Free,
    DriverOwned,
    DeviceOwned,
}

impl BufferOwnership {
    pub fn is_free(self) -> bool {
        self == Self::Free
    }

    /// CPU may read or write the buffer.
    pub fn can_access(self) -> bool {
        self == Self::DriverOwned
    }

    pub fn is_device_owned(self) -> bool {
        self == Self::DeviceOwned
    }
}
