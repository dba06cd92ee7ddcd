//! RX buffer pool.
//!
//! One coherent region split into equally sized, 16-byte aligned buffers.
//! Buffer `i` always backs RX descriptor `i`.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §3.5

use alloc::vec::Vec;

use super::buffer::DmaBuffer;
use super::region::DmaRegion;
use super::DmaAllocator;

/// Alignment of each buffer inside the region.
pub const BUFFER_ALIGN: usize = 16;

pub struct BufferPool {
    region: Option<DmaRegion>,
    buffers: Vec<DmaBuffer>,
    buffer_size: usize,
}

impl BufferPool {
    /// Allocate `count` buffers of `buffer_size` bytes.
    ///
    /// # Returns
    /// `None` if the coherent allocation fails.
    pub fn allocate<A: DmaAllocator + ?Sized>(
        dma: &A,
        buffer_size: usize,
        count: usize,
    ) -> Option<Self> {
        let stride = stride_for(buffer_size);
        let region = dma.alloc_coherent(stride * count, BUFFER_ALIGN)?;

        let mut buffers = Vec::with_capacity(count);
        for i in 0..count {
            let buf = unsafe {
                DmaBuffer::new(
                    region.cpu_ptr().add(i * stride),
                    region.bus_addr() + (i * stride) as u64,
                    buffer_size,
                    i as u16,
                )
            };
            buffers.push(buf);
        }

        Some(Self {
            region: Some(region),
            buffers,
            buffer_size,
        })
    }

    /// Hand the backing region back to the allocator.
    pub fn release<A: DmaAllocator + ?Sized>(mut self, dma: &A) {
        self.buffers.clear();
        if let Some(region) = self.region.take() {
            dma.free_coherent(region);
        }
    }

    pub fn get(&self, index: usize) -> Option<&DmaBuffer> {
        self.buffers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DmaBuffer> {
        self.buffers.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Buffers currently owned by the device.
    pub fn in_flight(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_device_owned()).count()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DmaBuffer> {
        self.buffers.iter_mut()
    }
}

fn stride_for(buffer_size: usize) -> usize {
    (buffer_size + BUFFER_ALIGN - 1) & !(BUFFER_ALIGN - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;

    #[test]
    fn test_buffers_are_aligned_and_disjoint() {
        let platform = MockPlatform::new();
        let pool = BufferPool::allocate(&platform, 16383, 4).expect("pool");
        assert_eq!(pool.len(), 4);
        for i in 0..4 {
            let buf = pool.get(i).unwrap();
            assert_eq!(buf.bus_addr() % BUFFER_ALIGN as u64, 0);
            assert_eq!(buf.capacity(), 16383);
        }
        assert_eq!(pool.get(1).unwrap().bus_addr() - pool.get(0).unwrap().bus_addr(), 16384);
        pool.release(&platform);
        assert_eq!(platform.live_coherent(), 0);
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let platform = MockPlatform::new();
        platform.fail_coherent_after(0);
        assert!(BufferPool::allocate(&platform, 2048, 4).is_none());
    }
}
