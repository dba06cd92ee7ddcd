//! DMA memory management.
//!
//! Coherent regions hold descriptor rings, RX buffers and the tally
//! block. TX payloads are streamed with single mappings.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §3

pub mod region;
pub mod ownership;
pub mod buffer;
pub mod pool;

pub use buffer::DmaBuffer;
pub use ownership::BufferOwnership;
pub use pool::BufferPool;
pub use region::DmaRegion;

/// Streaming mapping could not be established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapError;

impl core::fmt::Display for MapError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DMA mapping failed")
    }
}

/// Direction of a streaming mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaDirection {
    /// Device reads (TX).
    ToDevice,
    /// Device writes (RX).
    FromDevice,
}

/// Host DMA services.
pub trait DmaAllocator {
    /// Allocate zeroed, device-coherent memory.
    fn alloc_coherent(&self, size: usize, align: usize) -> Option<DmaRegion>;

    /// Release memory from [`alloc_coherent`](Self::alloc_coherent).
    fn free_coherent(&self, region: DmaRegion);

    /// Map `len` bytes at `cpu` for device access.
    fn map_single(&self, cpu: *const u8, len: usize, dir: DmaDirection) -> Result<u64, MapError>;

    fn unmap_single(&self, bus: u64, len: usize, dir: DmaDirection);
}
