//! Hardware descriptor layout and ring storage.
//!
//! # Layout
//! ```text
//! +0  opts1  [31] Own | [30] RingEnd | [29] FirstFrag | [28] LastFrag | flags | [13:0] len
//! +4  opts2  VLAN tag, v2 offload fields
//! +8  addr   64-bit bus address of the buffer
//! ```
//! All fields are little-endian. The ring lives in coherent memory and
//! every access goes through volatile reads and writes.
//!
//! # Reference
//! RTL8169S datasheet §Descriptor format, RTL8168 datasheet §Tx/Rx descriptors

use core::mem::size_of;

use static_assertions::const_assert_eq;

use crate::dma::{DmaAllocator, DmaRegion};

pub const DESC_SIZE: usize = 16;
/// Ring base alignment required by the DMA engine.
pub const RING_ALIGN: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════
// COMMON BITS
// ═══════════════════════════════════════════════════════════════════════════

pub const DESC_OWN: u32 = 1 << 31;
pub const RING_END: u32 = 1 << 30;
pub const FIRST_FRAG: u32 = 1 << 29;
pub const LAST_FRAG: u32 = 1 << 28;

// ═══════════════════════════════════════════════════════════════════════════
// TX: FIRST GENERATION (opts1)
// ═══════════════════════════════════════════════════════════════════════════

pub const TD_LSO: u32 = 1 << 27;
pub const TD0_MSS_SHIFT: u32 = 16;
pub const TD0_MSS_MAX: u32 = 0x7ff;
pub const TD0_TCP_CS: u32 = 1 << 16;
pub const TD0_UDP_CS: u32 = 1 << 17;
pub const TD0_IP_CS: u32 = 1 << 18;

// ═══════════════════════════════════════════════════════════════════════════
// TX: SECOND GENERATION
// ═══════════════════════════════════════════════════════════════════════════

// opts1
pub const TD1_GTSENV4: u32 = 1 << 26;
pub const TD1_GTSENV6: u32 = 1 << 25;
pub const GTTCPHO_SHIFT: u32 = 18;
pub const GTTCPHO_MAX: usize = 0x7f;

// opts2
pub const TCPHO_SHIFT: u32 = 18;
pub const TCPHO_MAX: usize = 0x3ff;
pub const TD1_MSS_SHIFT: u32 = 18;
pub const TD1_IPV6_CS: u32 = 1 << 28;
pub const TD1_IPV4_CS: u32 = 1 << 29;
pub const TD1_TCP_CS: u32 = 1 << 30;
pub const TD1_UDP_CS: u32 = 1 << 31;

/// opts2: insert the tag in the low 16 bits (byte swapped).
pub const TX_VLAN_TAG: u32 = 1 << 17;

// ═══════════════════════════════════════════════════════════════════════════
// RX STATUS (opts1)
// ═══════════════════════════════════════════════════════════════════════════

/// Receive watchdog timer expired (frame longer than 8 KiB).
pub const RX_RWT: u32 = 1 << 22;
/// Receive error summary.
pub const RX_RES: u32 = 1 << 21;
pub const RX_RUNT: u32 = 1 << 20;
pub const RX_CRC: u32 = 1 << 19;
pub const RX_PROTO_UDP: u32 = 1 << 18;
pub const RX_PROTO_TCP: u32 = 1 << 17;
pub const RX_PROTO_MASK: u32 = RX_PROTO_TCP | RX_PROTO_UDP;
pub const RX_IP_FAIL: u32 = 1 << 16;
pub const RX_UDP_FAIL: u32 = 1 << 15;
pub const RX_TCP_FAIL: u32 = 1 << 14;
pub const RX_CS_FAIL_MASK: u32 = RX_IP_FAIL | RX_UDP_FAIL | RX_TCP_FAIL;
pub const RX_LEN_MASK: u32 = 0x3fff;

/// opts2: a stripped VLAN tag is present in the low 16 bits.
pub const RX_VLAN_TAG: u32 = 1 << 16;

// ═══════════════════════════════════════════════════════════════════════════
// DESCRIPTOR
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory image of one descriptor.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub opts1: u32,
    pub opts2: u32,
    pub addr: u64,
}

const_assert_eq!(size_of::<Descriptor>(), DESC_SIZE);

/// Coherent array of descriptors.
pub struct DescRing {
    region: DmaRegion,
    count: usize,
}

impl DescRing {
    /// Allocate a zeroed ring of `count` descriptors.
    pub fn allocate<A: DmaAllocator + ?Sized>(dma: &A, count: usize) -> Option<Self> {
        let mut region = dma.alloc_coherent(count * DESC_SIZE, RING_ALIGN)?;
        region.zero();
        Some(Self { region, count })
    }

    pub fn release<A: DmaAllocator + ?Sized>(self, dma: &A) {
        dma.free_coherent(self.region);
    }

    pub fn bus_addr(&self) -> u64 {
        self.region.bus_addr()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `RING_END` for the last slot, 0 elsewhere.
    #[inline]
    pub fn ring_end(&self, index: usize) -> u32 {
        if index == self.count - 1 {
            RING_END
        } else {
            0
        }
    }

    #[inline]
    fn ptr(&self, index: usize) -> *mut Descriptor {
        assert!(index < self.count, "descriptor index {} out of range", index);
        unsafe { (self.region.cpu_ptr() as *mut Descriptor).add(index) }
    }

    #[inline]
    pub fn opts1(&self, index: usize) -> u32 {
        let p = self.ptr(index);
        u32::from_le(unsafe { core::ptr::addr_of!((*p).opts1).read_volatile() })
    }

    #[inline]
    pub fn opts2(&self, index: usize) -> u32 {
        let p = self.ptr(index);
        u32::from_le(unsafe { core::ptr::addr_of!((*p).opts2).read_volatile() })
    }

    #[inline]
    pub fn addr(&self, index: usize) -> u64 {
        let p = self.ptr(index);
        u64::from_le(unsafe { core::ptr::addr_of!((*p).addr).read_volatile() })
    }

    #[inline]
    pub fn set_opts1(&mut self, index: usize, value: u32) {
        let p = self.ptr(index);
        unsafe { core::ptr::addr_of_mut!((*p).opts1).write_volatile(value.to_le()) }
    }

    #[inline]
    pub fn set_opts2(&mut self, index: usize, value: u32) {
        let p = self.ptr(index);
        unsafe { core::ptr::addr_of_mut!((*p).opts2).write_volatile(value.to_le()) }
    }

    #[inline]
    pub fn set_addr(&mut self, index: usize, value: u64) {
        let p = self.ptr(index);
        unsafe { core::ptr::addr_of_mut!((*p).addr).write_volatile(value.to_le()) }
    }

    /// Snapshot of one descriptor.
    pub fn read(&self, index: usize) -> Descriptor {
        Descriptor {
            opts1: self.opts1(index),
            opts2: self.opts2(index),
            addr: self.addr(index),
        }
    }

    pub fn clear(&mut self, index: usize) {
        self.set_opts1(index, 0);
        self.set_opts2(index, 0);
        self.set_addr(index, 0);
    }

    pub fn is_device_owned(&self, index: usize) -> bool {
        self.opts1(index) & DESC_OWN != 0
    }
}

unsafe impl Send for DescRing {}
