//! TX descriptor ring.
//!
//! `cur` is the next slot the driver fills, `dirty` the oldest slot not
//! yet reclaimed. Both run free as `u32` and wrap; the slot index is
//! `idx & (len - 1)`. Slots in `[dirty, cur)` belong to in-flight
//! packets; everything else is free.
//!
//! Every fragment is copied into a driver-owned bounce buffer before it
//! is mapped, so the caller's frame can be dropped as soon as
//! [`TxRing::post`] returns.
//!
//! # Reference
//! RTL8168 datasheet §Transmit descriptor, NETWORK_IMPL_GUIDE.md §4.2

use alloc::vec::Vec;

use super::desc::*;
use super::offload::TxOpts;
use crate::dma::{DmaAllocator, DmaDirection};
use crate::error::{R8169Error, Result};
use crate::hw::dma_wmb;

/// Most fragments one packet may occupy.
pub const MAX_TX_FRAGS: usize = 17;
/// Stop the queue when fewer slots than this remain.
pub const TX_STOP_THRESHOLD: usize = MAX_TX_FRAGS + 1;
/// Wake a stopped queue once this many slots are free again.
pub const TX_START_THRESHOLD: usize = 2 * TX_STOP_THRESHOLD;
/// Largest buffer one descriptor can describe.
pub const TX_FRAG_MAX: usize = RX_LEN_MASK as usize;

enum TxSlot {
    Free,
    Mapped {
        buf: Vec<u8>,
        bus: u64,
        /// Set on the last slot of a packet: its total length.
        packet: Option<usize>,
    },
}

/// Work done by one [`TxRing::reclaim`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxReclaim {
    pub packets: usize,
    pub bytes: usize,
    pub slots: usize,
    /// Packets remain queued behind a completed one; ring the doorbell
    /// again in case the chip missed the previous kick.
    pub kick: bool,
}

pub struct TxRing {
    desc: DescRing,
    slots: Vec<TxSlot>,
    cur: u32,
    dirty: u32,
}

impl TxRing {
    /// Allocate a ring of `count` slots (power of two).
    pub fn allocate<A: DmaAllocator + ?Sized>(dma: &A, count: usize) -> Option<Self> {
        debug_assert!(count.is_power_of_two());
        let desc = DescRing::allocate(dma, count)?;
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, || TxSlot::Free);
        Some(Self {
            desc,
            slots,
            cur: 0,
            dirty: 0,
        })
    }

    /// Unmap anything still queued and free the descriptor array.
    pub fn release<A: DmaAllocator + ?Sized>(mut self, dma: &A) {
        self.drain(dma);
        self.desc.release(dma);
    }

    pub fn bus_addr(&self) -> u64 {
        self.desc.bus_addr()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cur == self.dirty
    }

    pub fn cur(&self) -> u32 {
        self.cur
    }

    pub fn dirty(&self) -> u32 {
        self.dirty
    }

    #[inline]
    fn slot(&self, idx: u32) -> usize {
        idx as usize & (self.slots.len() - 1)
    }

    pub fn in_flight(&self) -> usize {
        self.cur.wrapping_sub(self.dirty) as usize
    }

    /// Free descriptors.
    pub fn avail(&self) -> usize {
        self.len() - self.in_flight()
    }

    /// `true` once the free count falls under the stop threshold.
    pub fn should_stop(&self) -> bool {
        self.avail() < TX_STOP_THRESHOLD
    }

    /// `true` once enough slots are free to wake a stopped queue.
    pub fn should_wake(&self) -> bool {
        self.avail() >= TX_START_THRESHOLD
    }

    /// Queue one packet split over `bufs`.
    ///
    /// The head descriptor is written without Own; the tail fragments are
    /// handed over as they are written. After a write barrier the head
    /// gets Own and FirstFrag, which releases the whole chain at once.
    ///
    /// # Returns
    /// - `Err(Busy)`: not enough free slots, nothing queued
    /// - `Err(MapFailed)`: a fragment failed to map; fragments already
    ///   mapped are unmapped and their slots cleared
    pub fn post<A: DmaAllocator + ?Sized>(
        &mut self,
        dma: &A,
        bufs: Vec<Vec<u8>>,
        opts: TxOpts,
        pkt_len: usize,
    ) -> Result<()> {
        let n = bufs.len();
        if n == 0 || n > self.avail() {
            return Err(R8169Error::Busy);
        }

        let first = self.slot(self.cur);
        let last_i = n - 1;
        for (i, buf) in bufs.into_iter().enumerate() {
            debug_assert!(buf.len() <= TX_FRAG_MAX);
            let entry = self.slot(self.cur.wrapping_add(i as u32));
            let bus = match dma.map_single(buf.as_ptr(), buf.len(), DmaDirection::ToDevice) {
                Ok(bus) => bus,
                Err(_) => {
                    self.unmap_range(dma, self.cur, i);
                    return Err(R8169Error::MapFailed);
                }
            };

            let mut opts1 = opts.opts1 | self.desc.ring_end(entry) | buf.len() as u32;
            if i > 0 {
                opts1 |= DESC_OWN;
            }
            if i == last_i {
                opts1 |= LAST_FRAG;
            }
            self.desc.set_addr(entry, bus);
            self.desc.set_opts2(entry, opts.opts2);
            self.desc.set_opts1(entry, opts1);

            let packet = (i == last_i).then_some(pkt_len);
            self.slots[entry] = TxSlot::Mapped { buf, bus, packet };
        }

        dma_wmb();
        let head = self.desc.opts1(first);
        self.desc.set_opts1(first, head | DESC_OWN | FIRST_FRAG);
        self.cur = self.cur.wrapping_add(n as u32);
        Ok(())
    }

    /// Undo `count` slots starting at `from`.
    fn unmap_range<A: DmaAllocator + ?Sized>(&mut self, dma: &A, from: u32, count: usize) {
        for i in 0..count {
            let entry = self.slot(from.wrapping_add(i as u32));
            self.unmap_slot(dma, entry);
        }
    }

    /// Unmap one slot and zero its descriptor.
    ///
    /// # Returns
    /// Packet length if the slot ended a packet.
    fn unmap_slot<A: DmaAllocator + ?Sized>(&mut self, dma: &A, entry: usize) -> Option<usize> {
        let slot = core::mem::replace(&mut self.slots[entry], TxSlot::Free);
        self.desc.clear(entry);
        match slot {
            TxSlot::Mapped { buf, bus, packet } => {
                dma.unmap_single(bus, buf.len(), DmaDirection::ToDevice);
                packet
            }
            TxSlot::Free => None,
        }
    }

    /// Reclaim descriptors the chip has finished with, at most `budget`
    /// packets.
    pub fn reclaim<A: DmaAllocator + ?Sized>(&mut self, dma: &A, budget: usize) -> TxReclaim {
        let mut done = TxReclaim::default();
        let mut last_was_packet = false;

        while self.dirty != self.cur && done.packets < budget {
            let entry = self.slot(self.dirty);
            if self.desc.is_device_owned(entry) {
                break;
            }
            let packet = self.unmap_slot(dma, entry);
            last_was_packet = packet.is_some();
            if let Some(len) = packet {
                done.packets += 1;
                done.bytes += len;
            }
            done.slots += 1;
            self.dirty = self.dirty.wrapping_add(1);
        }

        done.kick = self.cur != self.dirty && last_was_packet;
        done
    }

    /// Unmap everything queued and rewind both indices to zero.
    pub fn drain<A: DmaAllocator + ?Sized>(&mut self, dma: &A) {
        for entry in 0..self.slots.len() {
            self.unmap_slot(dma, entry);
        }
        self.cur = 0;
        self.dirty = 0;
    }

    /// Slot index the oldest in-flight packet starts at.
    pub fn dirty_slot(&self) -> usize {
        self.slot(self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;
    use alloc::vec;
    use proptest::prelude::*;

    /// Clear Own on `count` descriptors starting at the reclaim point.
    fn complete(ring: &mut TxRing, count: usize) {
        for i in 0..count {
            let entry = ring.slot(ring.dirty.wrapping_add(i as u32));
            let v = ring.desc.opts1(entry);
            ring.desc.set_opts1(entry, v & !DESC_OWN);
        }
    }

    fn frags(sizes: &[usize]) -> Vec<Vec<u8>> {
        sizes.iter().map(|&n| vec![0xab; n]).collect()
    }

    #[test]
    fn test_post_marks_first_last_and_ring_end() {
        let dma = MockPlatform::new();
        let mut ring = TxRing::allocate(&dma, 4).unwrap();
        ring.post(&dma, frags(&[60]), TxOpts::default(), 60).unwrap();
        ring.post(&dma, frags(&[100, 200, 300]), TxOpts { opts1: 0, opts2: 7 }, 600).unwrap();

        let d0 = ring.desc.read(0);
        assert_eq!(d0.opts1, DESC_OWN | FIRST_FRAG | LAST_FRAG | 60);

        let d1 = ring.desc.read(1);
        assert_eq!(d1.opts1, DESC_OWN | FIRST_FRAG | 100);
        assert_eq!(d1.opts2, 7);
        assert_eq!(ring.desc.opts1(2), DESC_OWN | 200);
        assert_eq!(ring.desc.opts1(3), DESC_OWN | RING_END | LAST_FRAG | 300);
        assert_eq!(ring.avail(), 0);
        assert_eq!(dma.live_maps(), 4);
        ring.release(&dma);
        assert_eq!(dma.live_maps(), 0);
    }

    #[test]
    fn test_full_ring_rejects_without_side_effects() {
        let dma = MockPlatform::new();
        let mut ring = TxRing::allocate(&dma, 4).unwrap();
        ring.post(&dma, frags(&[64, 64, 64]), TxOpts::default(), 192).unwrap();
        assert_eq!(ring.post(&dma, frags(&[64, 64]), TxOpts::default(), 128), Err(R8169Error::Busy));
        assert_eq!(ring.cur(), 3);
        assert_eq!(dma.live_maps(), 3);
        ring.release(&dma);
    }

    #[test]
    fn test_map_failure_rolls_back_earlier_fragments() {
        let dma = MockPlatform::new();
        let mut ring = TxRing::allocate(&dma, 8).unwrap();
        dma.fail_map_after(2);
        let err = ring.post(&dma, frags(&[64, 64, 64, 64]), TxOpts::default(), 256);
        assert_eq!(err, Err(R8169Error::MapFailed));
        assert_eq!(dma.live_maps(), 0);
        assert_eq!(ring.cur(), 0);
        for i in 0..8 {
            assert_eq!(ring.desc.read(i), Descriptor::default());
        }
        dma.clear_map_failure();
        ring.release(&dma);
    }

    #[test]
    fn test_reclaim_counts_packets_and_stops_at_owned() {
        let dma = MockPlatform::new();
        let mut ring = TxRing::allocate(&dma, 8).unwrap();
        ring.post(&dma, frags(&[100, 50]), TxOpts::default(), 150).unwrap();
        ring.post(&dma, frags(&[70]), TxOpts::default(), 70).unwrap();
        ring.post(&dma, frags(&[80]), TxOpts::default(), 80).unwrap();

        complete(&mut ring, 3);
        let done = ring.reclaim(&dma, 64);
        assert_eq!(done, TxReclaim { packets: 2, bytes: 220, slots: 3, kick: true });
        assert_eq!(ring.in_flight(), 1);

        complete(&mut ring, 1);
        let done = ring.reclaim(&dma, 64);
        assert_eq!(done.packets, 1);
        assert!(!done.kick);
        assert!(ring.is_empty());
        ring.release(&dma);
    }

    #[test]
    fn test_reclaim_honours_budget() {
        let dma = MockPlatform::new();
        let mut ring = TxRing::allocate(&dma, 8).unwrap();
        for _ in 0..4 {
            ring.post(&dma, frags(&[60]), TxOpts::default(), 60).unwrap();
        }
        complete(&mut ring, 4);
        assert_eq!(ring.reclaim(&dma, 3).packets, 3);
        assert_eq!(ring.reclaim(&dma, 3).packets, 1);
        ring.release(&dma);
    }

    #[test]
    fn test_drain_is_idempotent() {
        let dma = MockPlatform::new();
        let mut ring = TxRing::allocate(&dma, 8).unwrap();
        ring.post(&dma, frags(&[60, 60]), TxOpts::default(), 120).unwrap();
        ring.drain(&dma);
        assert_eq!((ring.cur(), ring.dirty()), (0, 0));
        assert_eq!(dma.live_maps(), 0);
        ring.drain(&dma);
        assert_eq!((ring.cur(), ring.dirty()), (0, 0));
        assert_eq!(dma.live_maps(), 0);
        ring.release(&dma);
    }

    #[test]
    fn test_thresholds() {
        let dma = MockPlatform::new();
        let mut ring = TxRing::allocate(&dma, 64).unwrap();
        assert!(ring.should_wake());
        for _ in 0..47 {
            ring.post(&dma, frags(&[60]), TxOpts::default(), 60).unwrap();
        }
        assert_eq!(ring.avail(), 17);
        assert!(ring.should_stop());
        assert!(!ring.should_wake());
        ring.release(&dma);
    }

    proptest! {
        #[test]
        fn prop_reclaim_never_passes_head(
            ops in proptest::collection::vec((1usize..4, 0usize..6), 1..60)
        ) {
            let dma = MockPlatform::new();
            let mut ring = TxRing::allocate(&dma, 16).unwrap();
            let mut posted = 0usize;
            let mut reclaimed = 0usize;
            for (nfrags, ncomplete) in ops {
                if ring.post(&dma, frags(&vec![60; nfrags]), TxOpts::default(), 60 * nfrags).is_ok() {
                    posted += nfrags;
                }
                let n = ncomplete.min(ring.in_flight());
                complete(&mut ring, n);
                reclaimed += ring.reclaim(&dma, usize::MAX).slots;
                prop_assert!(ring.in_flight() <= ring.len());
                prop_assert_eq!(posted - reclaimed, ring.in_flight());
                prop_assert_eq!(dma.live_maps(), ring.in_flight());
                for i in 0..ring.in_flight() {
                    let entry = ring.slot(ring.dirty.wrapping_add(i as u32));
                    prop_assert!(ring.desc.is_device_owned(entry));
                }
            }
            ring.release(&dma);
        }
    }
}
