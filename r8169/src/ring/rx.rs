//! RX descriptor ring.
//!
//! Buffer `i` of the pool permanently backs descriptor `i`. Completed
//! frames are copied out into owned packets and the descriptor is handed
//! straight back to the chip, so the ring never runs dry while the stack
//! holds on to packets.
//!
//! # Reference
//! RTL8168 datasheet §Receive descriptor, NETWORK_IMPL_GUIDE.md §4.3

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use super::desc::*;
use crate::dma::{BufferPool, DmaAllocator};
use crate::hw::{dma_rmb, dma_wmb};
use crate::stats::SwStats;
use crate::types::{MacAddress, ETH_FCS_LEN};

/// One received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxPacket {
    pub data: Vec<u8>,
    /// Hardware verified the L3 and L4 checksums.
    pub csum_ok: bool,
    /// Tag stripped by the chip, host byte order.
    pub vlan: Option<u16>,
    pub multicast: bool,
}

/// Receive-side feature switches that change how descriptors are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxFlags {
    /// Deliver frames with CRC or runt errors.
    pub rx_all: bool,
    /// Keep the FCS at the end of delivered frames.
    pub rx_fcs: bool,
}

pub struct RxRing {
    desc: DescRing,
    pool: BufferPool,
    cur: u32,
    queue: VecDeque<RxPacket>,
    queue_cap: usize,
}

impl RxRing {
    /// Allocate `count` descriptors with one `buf_size` buffer each.
    pub fn allocate<A: DmaAllocator + ?Sized>(dma: &A, count: usize, buf_size: usize) -> Option<Self> {
        debug_assert!(count.is_power_of_two());
        let desc = DescRing::allocate(dma, count)?;
        let pool = match BufferPool::allocate(dma, buf_size, count) {
            Some(pool) => pool,
            None => {
                desc.release(dma);
                return None;
            }
        };
        Some(Self {
            desc,
            pool,
            cur: 0,
            queue: VecDeque::with_capacity(2 * count),
            queue_cap: 2 * count,
        })
    }

    pub fn release<A: DmaAllocator + ?Sized>(mut self, dma: &A) {
        self.clear();
        self.pool.release(dma);
        self.desc.release(dma);
    }

    pub fn bus_addr(&self) -> u64 {
        self.desc.bus_addr()
    }

    pub fn len(&self) -> usize {
        self.desc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desc.is_empty()
    }

    pub fn cur(&self) -> u32 {
        self.cur
    }

    #[inline]
    fn slot(&self, idx: u32) -> usize {
        idx as usize & (self.desc.len() - 1)
    }

    /// Point every descriptor at its buffer and give it to the chip.
    pub fn init(&mut self) {
        for i in 0..self.desc.len() {
            let (bus, free) = match self.pool.get(i) {
                Some(buf) => (buf.bus_addr(), buf.ownership().is_free()),
                None => continue,
            };
            if let Some(buf) = self.pool.get_mut(i) {
                if free {
                    buf.mark_allocated();
                } else if buf.is_device_owned() {
                    buf.mark_driver_owned();
                }
            }
            self.desc.set_addr(i, bus);
            self.mark_to_asic(i);
        }
        self.cur = 0;
    }

    /// Hand every descriptor back to the chip after a reset, keeping the
    /// buffers.
    pub fn remark_all(&mut self) {
        self.init();
    }

    fn mark_to_asic(&mut self, entry: usize) {
        let size = self.pool.buffer_size() as u32;
        self.desc.set_opts2(entry, 0);
        dma_wmb();
        let opts1 = DESC_OWN | self.desc.ring_end(entry) | size;
        if let Some(buf) = self.pool.get_mut(entry) {
            buf.mark_device_owned();
        }
        self.desc.set_opts1(entry, opts1);
    }

    /// Descriptors currently owned by the chip.
    pub fn in_flight(&self) -> usize {
        self.pool.in_flight()
    }

    /// Process up to `budget` completed descriptors.
    ///
    /// Error frames and dropped frames consume budget like delivered
    /// ones. `may_log` is consulted before each per-frame error message.
    ///
    /// # Returns
    /// Descriptors consumed; equal to `budget` when more work may remain.
    pub fn poll(
        &mut self,
        budget: usize,
        flags: RxFlags,
        stats: &mut SwStats,
        mut may_log: impl FnMut() -> bool,
    ) -> usize {
        let mut count = 0;
        while count < budget {
            let entry = self.slot(self.cur);
            let status = self.desc.opts1(entry);
            if status & DESC_OWN != 0 {
                break;
            }
            // Status first, then the rest of the descriptor and the payload.
            dma_rmb();

            if let Some(buf) = self.pool.get_mut(entry) {
                buf.mark_driver_owned();
            }
            self.receive_one(entry, status, flags, stats, &mut may_log);
            self.mark_to_asic(entry);

            count += 1;
            self.cur = self.cur.wrapping_add(1);
        }
        count
    }

    fn receive_one(
        &mut self,
        entry: usize,
        status: u32,
        flags: RxFlags,
        stats: &mut SwStats,
        may_log: &mut impl FnMut() -> bool,
    ) {
        if status & RX_RES != 0 {
            if may_log() {
                log::warn!("[r8169] Rx ERROR. status = {:08x}", status);
            }
            stats.rx_errors += 1;
            if status & (RX_RWT | RX_RUNT) != 0 {
                stats.rx_length_errors += 1;
            }
            if status & RX_CRC != 0 {
                stats.rx_crc_errors += 1;
            }
            if !flags.rx_all || status & RX_RWT != 0 || status & (RX_RUNT | RX_CRC) == 0 {
                return;
            }
        }

        let mut pkt_size = (status & RX_LEN_MASK) as usize;
        if !flags.rx_fcs {
            pkt_size = pkt_size.saturating_sub(ETH_FCS_LEN);
        }

        if status & (FIRST_FRAG | LAST_FRAG) != FIRST_FRAG | LAST_FRAG {
            stats.rx_dropped += 1;
            stats.rx_length_errors += 1;
            return;
        }

        let Some(buf) = self.pool.get(entry) else { return };
        if pkt_size > buf.capacity() {
            stats.rx_dropped += 1;
            stats.rx_length_errors += 1;
            return;
        }
        if self.queue.len() >= self.queue_cap {
            stats.rx_dropped += 1;
            return;
        }

        let data = buf.received(pkt_size).to_vec();
        let csum = status & (RX_PROTO_MASK | RX_CS_FAIL_MASK);
        let csum_ok = csum == RX_PROTO_TCP || csum == RX_PROTO_UDP;

        let opts2 = self.desc.opts2(entry);
        let vlan = (opts2 & RX_VLAN_TAG != 0).then(|| (opts2 as u16).swap_bytes());

        let multicast = data.len() >= 6 && {
            let mut dst = [0u8; 6];
            dst.copy_from_slice(&data[..6]);
            let dst = MacAddress::new(dst);
            dst.is_multicast() && !dst.is_broadcast()
        };
        if multicast {
            stats.multicast += 1;
        }
        stats.rx_packets += 1;
        stats.rx_bytes += pkt_size as u64;

        self.queue.push_back(RxPacket { data, csum_ok, vlan, multicast });
    }

    /// Next delivered packet.
    pub fn take(&mut self) -> Option<RxPacket> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn peek_len(&self) -> Option<usize> {
        self.queue.front().map(|p| p.data.len())
    }

    /// Take every descriptor back from the chip and drop queued packets.
    /// Only valid with the receiver stopped.
    pub fn clear(&mut self) {
        for i in 0..self.desc.len() {
            self.desc.clear(i);
        }
        for buf in self.pool.iter_mut() {
            buf.mark_free();
        }
        self.queue.clear();
        self.cur = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;
    use alloc::vec;

    fn ring(count: usize) -> (MockPlatform, RxRing) {
        let dma = MockPlatform::new();
        let mut ring = RxRing::allocate(&dma, count, 2048).unwrap();
        ring.init();
        (dma, ring)
    }

    /// Complete `entry` the way the chip would, FCS included.
    fn complete(ring: &mut RxRing, entry: usize, frame: &[u8], extra: u32) {
        let addr = ring.desc.addr(entry);
        unsafe { core::ptr::copy_nonoverlapping(frame.as_ptr(), addr as *mut u8, frame.len()) };
        let len = (frame.len() + ETH_FCS_LEN) as u32;
        let status = ring.desc.ring_end(entry) | FIRST_FRAG | LAST_FRAG | extra | len;
        ring.desc.set_opts1(entry, status);
    }

    fn frame(dst: [u8; 6], len: usize) -> Vec<u8> {
        let mut f = vec![0x11; len];
        f[..6].copy_from_slice(&dst);
        f
    }

    #[test]
    fn test_init_hands_every_descriptor_to_chip() {
        let (dma, ring) = ring(8);
        for i in 0..8 {
            let opts1 = ring.desc.opts1(i);
            assert_ne!(opts1 & DESC_OWN, 0);
            assert_eq!(opts1 & RX_LEN_MASK, 2048);
            assert_eq!(opts1 & RING_END != 0, i == 7);
            assert_ne!(ring.desc.addr(i), 0);
        }
        assert_eq!(ring.in_flight(), 8);
        ring.release(&dma);
    }

    #[test]
    fn test_poll_copies_frame_and_rearms() {
        let (dma, mut ring) = ring(4);
        let f = frame([0x02, 0, 0, 0, 0, 1], 100);
        complete(&mut ring, 0, &f, RX_PROTO_TCP);
        ring.desc.set_opts2(0, RX_VLAN_TAG | 0x0a00);

        let mut stats = SwStats::default();
        assert_eq!(ring.poll(16, RxFlags::default(), &mut stats, || true), 1);
        let pkt = ring.take().unwrap();
        assert_eq!(pkt.data, f);
        assert!(pkt.csum_ok);
        assert_eq!(pkt.vlan, Some(0x000a));
        assert!(!pkt.multicast);
        assert_eq!((stats.rx_packets, stats.rx_bytes), (1, 100));
        assert!(ring.desc.is_device_owned(0));
        assert_eq!(ring.desc.opts2(0), 0);
        ring.release(&dma);
    }

    #[test]
    fn test_checksum_failure_is_not_trusted() {
        let (dma, mut ring) = ring(4);
        complete(&mut ring, 0, &frame([2, 0, 0, 0, 0, 1], 80), RX_PROTO_UDP | RX_UDP_FAIL);
        let mut stats = SwStats::default();
        ring.poll(16, RxFlags::default(), &mut stats, || true);
        assert!(!ring.take().unwrap().csum_ok);
        ring.release(&dma);
    }

    #[test]
    fn test_budget_splits_work_across_polls() {
        let (dma, mut ring) = ring(8);
        for i in 0..5 {
            complete(&mut ring, i, &frame([2, 0, 0, 0, 0, i as u8], 64), 0);
        }
        let mut stats = SwStats::default();
        assert_eq!(ring.poll(3, RxFlags::default(), &mut stats, || true), 3);
        assert_eq!(ring.poll(3, RxFlags::default(), &mut stats, || true), 2);
        assert_eq!(ring.pending(), 5);
        assert_eq!(ring.cur(), 5);
        ring.release(&dma);
    }

    #[test]
    fn test_error_frames_are_counted_and_recycled() {
        let (dma, mut ring) = ring(4);
        complete(&mut ring, 0, &frame([2, 0, 0, 0, 0, 1], 64), RX_RES | RX_CRC);
        complete(&mut ring, 1, &frame([2, 0, 0, 0, 0, 1], 64), RX_RES | RX_RUNT);
        let mut stats = SwStats::default();
        assert_eq!(ring.poll(16, RxFlags::default(), &mut stats, || false), 2);
        assert_eq!(ring.pending(), 0);
        assert_eq!(stats.rx_errors, 2);
        assert_eq!(stats.rx_crc_errors, 1);
        assert_eq!(stats.rx_length_errors, 1);
        assert!(ring.desc.is_device_owned(0) && ring.desc.is_device_owned(1));
        ring.release(&dma);
    }

    #[test]
    fn test_rx_all_delivers_crc_errors_but_not_watchdog() {
        let (dma, mut ring) = ring(4);
        complete(&mut ring, 0, &frame([2, 0, 0, 0, 0, 1], 64), RX_RES | RX_CRC);
        complete(&mut ring, 1, &frame([2, 0, 0, 0, 0, 1], 64), RX_RES | RX_RWT);
        let flags = RxFlags { rx_all: true, rx_fcs: true };
        let mut stats = SwStats::default();
        ring.poll(16, flags, &mut stats, || false);
        assert_eq!(ring.pending(), 1);
        assert_eq!(ring.take().unwrap().data.len(), 68);
        ring.release(&dma);
    }

    #[test]
    fn test_fragmented_frame_is_dropped() {
        let (dma, mut ring) = ring(4);
        complete(&mut ring, 0, &frame([2, 0, 0, 0, 0, 1], 64), 0);
        let v = ring.desc.opts1(0) & !LAST_FRAG;
        ring.desc.set_opts1(0, v);
        let mut stats = SwStats::default();
        ring.poll(16, RxFlags::default(), &mut stats, || true);
        assert_eq!(ring.pending(), 0);
        assert_eq!((stats.rx_dropped, stats.rx_length_errors), (1, 1));
        ring.release(&dma);
    }

    #[test]
    fn test_multicast_excludes_broadcast() {
        let (dma, mut ring) = ring(4);
        complete(&mut ring, 0, &frame([0x01, 0, 0x5e, 0, 0, 1], 64), 0);
        complete(&mut ring, 1, &frame([0xff; 6], 64), 0);
        let mut stats = SwStats::default();
        ring.poll(16, RxFlags::default(), &mut stats, || true);
        assert!(ring.take().unwrap().multicast);
        assert!(!ring.take().unwrap().multicast);
        assert_eq!(stats.multicast, 1);
        ring.release(&dma);
    }

    #[test]
    fn test_clear_then_init_rearms_from_zero() {
        let (dma, mut ring) = ring(4);
        complete(&mut ring, 0, &frame([2, 0, 0, 0, 0, 1], 64), 0);
        let mut stats = SwStats::default();
        ring.poll(16, RxFlags::default(), &mut stats, || true);
        ring.clear();
        assert_eq!(ring.in_flight(), 0);
        assert_eq!(ring.pending(), 0);
        ring.init();
        assert_eq!(ring.in_flight(), 4);
        assert_eq!(ring.cur(), 0);
        ring.release(&dma);
        assert_eq!(dma.live_coherent(), 0);
    }
}
