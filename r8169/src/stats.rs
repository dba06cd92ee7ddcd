//! Statistics: software counters and the hardware tally block.
//!
//! The chip keeps its own counters and copies them into a 64-byte DMA
//! block on request. Revisions before the 8168c only clear those counters
//! on a power cycle, so the values seen at first open are kept as a
//! baseline and subtracted from every snapshot.
//!
//! # Reference
//! RTL8169 datasheet §Tally counters

use core::mem::size_of;

use static_assertions::const_assert_eq;

use crate::access::{Poll, Protocol, RegisterAccess};
use crate::chip::ChipRevision;
use crate::dma::{DmaAllocator, DmaRegion};
use crate::error::{R8169Error, Result};
use crate::hw::{Platform, RegisterIo};
use crate::regs::{self, ChipCmd};

pub const TALLY_SIZE: usize = 64;
const TALLY_ALIGN: usize = 64;

const POLL_COUNTERS: Poll = Poll::new(10, 1000);

// ═══════════════════════════════════════════════════════════════════════════
// SOFTWARE COUNTERS
// ═══════════════════════════════════════════════════════════════════════════

/// Counters maintained by the datapath.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwStats {
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub rx_errors: u64,
    pub rx_length_errors: u64,
    pub rx_crc_errors: u64,
    pub rx_dropped: u64,
    pub multicast: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub tx_dropped: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// TALLY BLOCK
// ═══════════════════════════════════════════════════════════════════════════

/// Decoded tally block, in the order the chip writes it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallyCounters {
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_errors: u64,
    pub rx_errors: u32,
    pub rx_missed: u16,
    pub align_errors: u16,
    pub tx_one_collision: u32,
    pub tx_multi_collision: u32,
    pub rx_unicast: u64,
    pub rx_broadcast: u64,
    pub rx_multicast: u32,
    pub tx_aborted: u16,
    pub tx_underrun: u16,
}

const_assert_eq!(size_of::<TallyCounters>(), TALLY_SIZE);

/// Names of [`TallyCounters::values`], in the same order.
pub const TALLY_NAMES: [&str; 13] = [
    "tx_packets",
    "rx_packets",
    "tx_errors",
    "rx_errors",
    "rx_missed",
    "align_errors",
    "tx_single_collisions",
    "tx_multi_collisions",
    "unicast",
    "broadcast",
    "multicast",
    "tx_aborted",
    "tx_underrun",
];

fn le16(b: &[u8; TALLY_SIZE], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn le32(b: &[u8; TALLY_SIZE], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn le64(b: &[u8; TALLY_SIZE], at: usize) -> u64 {
    let mut v = [0u8; 8];
    v.copy_from_slice(&b[at..at + 8]);
    u64::from_le_bytes(v)
}

impl TallyCounters {
    pub fn from_le_bytes(b: &[u8; TALLY_SIZE]) -> Self {
        Self {
            tx_packets: le64(b, 0),
            rx_packets: le64(b, 8),
            tx_errors: le64(b, 16),
            rx_errors: le32(b, 24),
            rx_missed: le16(b, 28),
            align_errors: le16(b, 30),
            tx_one_collision: le32(b, 32),
            tx_multi_collision: le32(b, 36),
            rx_unicast: le64(b, 40),
            rx_broadcast: le64(b, 48),
            rx_multicast: le32(b, 56),
            tx_aborted: le16(b, 60),
            tx_underrun: le16(b, 62),
        }
    }

    /// Every counter widened to `u64`, ordered as [`TALLY_NAMES`].
    pub fn values(&self) -> [u64; 13] {
        [
            self.tx_packets,
            self.rx_packets,
            self.tx_errors,
            self.rx_errors as u64,
            self.rx_missed as u64,
            self.align_errors as u64,
            self.tx_one_collision as u64,
            self.tx_multi_collision as u64,
            self.rx_unicast,
            self.rx_broadcast,
            self.rx_multicast as u64,
            self.tx_aborted as u64,
            self.tx_underrun as u64,
        ]
    }
}

/// Coherent memory the chip dumps its counters into.
pub struct TallyBlock {
    region: DmaRegion,
}

impl TallyBlock {
    pub fn allocate<A: DmaAllocator + ?Sized>(dma: &A) -> Option<Self> {
        let mut region = dma.alloc_coherent(TALLY_SIZE, TALLY_ALIGN)?;
        region.zero();
        Some(Self { region })
    }

    pub fn release<A: DmaAllocator + ?Sized>(self, dma: &A) {
        dma.free_coherent(self.region);
    }

    pub fn bus_addr(&self) -> u64 {
        self.region.bus_addr()
    }

    /// Decode the last dump.
    pub fn read(&self) -> TallyCounters {
        let mut raw = [0u8; TALLY_SIZE];
        let src = self.region.cpu_ptr();
        for (i, b) in raw.iter_mut().enumerate() {
            *b = unsafe { src.add(i).read_volatile() };
        }
        TallyCounters::from_le_bytes(&raw)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// BASELINE
// ═══════════════════════════════════════════════════════════════════════════

/// Tally values at first open, for chips that cannot clear them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterOffsets {
    pub inited: bool,
    pub tx_errors: u64,
    pub tx_multi_collision: u32,
    pub tx_aborted: u16,
    pub rx_missed: u16,
}

/// Interface statistics as reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats64 {
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub multicast: u64,
    pub collisions: u64,
    pub rx_length_errors: u64,
    pub rx_crc_errors: u64,
    pub rx_missed_errors: u64,
    pub tx_aborted_errors: u64,
}

impl Stats64 {
    /// Software counters plus the hardware-only error counters, net of
    /// the baseline.
    pub fn merge(sw: &SwStats, tally: &TallyCounters, base: &CounterOffsets) -> Self {
        Self {
            rx_packets: sw.rx_packets,
            tx_packets: sw.tx_packets,
            rx_bytes: sw.rx_bytes,
            tx_bytes: sw.tx_bytes,
            rx_errors: sw.rx_errors,
            tx_errors: tally.tx_errors.wrapping_sub(base.tx_errors),
            rx_dropped: sw.rx_dropped,
            tx_dropped: sw.tx_dropped,
            multicast: sw.multicast,
            collisions: tally.tx_multi_collision.wrapping_sub(base.tx_multi_collision) as u64,
            rx_length_errors: sw.rx_length_errors,
            rx_crc_errors: sw.rx_crc_errors,
            rx_missed_errors: tally.rx_missed.wrapping_sub(base.rx_missed) as u64,
            tx_aborted_errors: tally.tx_aborted.wrapping_sub(base.tx_aborted) as u64,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CHIP COMMANDS
// ═══════════════════════════════════════════════════════════════════════════

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// Issue a dump or reset command against the block at `bus`.
    pub fn do_counters(&self, bus: u64, cmd: u32) -> Result<()> {
        let low = bus as u32;
        self.w32(regs::COUNTER_ADDR_HIGH, (bus >> 32) as u32);
        self.commit();
        self.w32(regs::COUNTER_ADDR_LOW, low);
        self.w32(regs::COUNTER_ADDR_LOW, low | cmd);
        self.wait_reg32(
            Protocol::Counters,
            regs::COUNTER_ADDR_LOW,
            regs::COUNTER_RESET | regs::COUNTER_DUMP,
            false,
            POLL_COUNTERS,
        )
    }

    /// Dump the counters if the receiver is running.
    ///
    /// Some chips cannot dump with the receiver off, and an all-ones
    /// ChipCmd means the function is in a low-power state.
    ///
    /// # Returns
    /// `Ok(false)` if the dump was skipped.
    pub fn update_counters(&self, bus: u64) -> Result<bool> {
        let cmd = self.r8(regs::CHIP_CMD);
        if cmd & ChipCmd::RX_ENABLE.bits() == 0 || cmd == 0xff {
            return Ok(false);
        }
        self.do_counters(bus, regs::COUNTER_DUMP)?;
        Ok(true)
    }

    /// Establish the baseline once per device lifetime.
    pub fn init_counter_offsets(&self, tally: &TallyBlock, offsets: &mut CounterOffsets) -> Result<()> {
        if offsets.inited {
            return Ok(());
        }
        if self.revision() >= ChipRevision::V19 {
            self.do_counters(tally.bus_addr(), regs::COUNTER_RESET)?;
        } else {
            match self.update_counters(tally.bus_addr()) {
                Ok(_) | Err(R8169Error::Timeout(_)) => {}
                Err(e) => return Err(e),
            }
            let t = tally.read();
            offsets.tx_errors = t.tx_errors;
            offsets.tx_multi_collision = t.tx_multi_collision;
            offsets.tx_aborted = t.tx_aborted;
            offsets.rx_missed = t.rx_missed;
        }
        offsets.inited = true;
        Ok(())
    }
}
