//! Simulated RTL8169 register file and host platform for unit tests.
//!
//! `MockIo` behaves like the MAC just enough for the driver to run
//! against it: indirect protocols complete immediately and echo their
//! writes, ChipCmd reset self-clears, interrupt status is write-1-to-clear
//! and the tally dump copies a canned block into DMA memory. Bus
//! addresses handed out by `MockPlatform` are the CPU addresses, so the
//! mock can reach descriptors and buffers directly.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::vec::Vec;

use crate::access::{RateLimiter, RegisterAccess};
use crate::chip::ChipRevision::{self, *};
use crate::dma::{DmaAllocator, DmaDirection, DmaRegion, MapError};
use crate::hw::{Delay, PciFunction, RegisterIo};
use crate::regs;

const REG_SPACE: usize = 0x8000;
const FLAG: u32 = 0x8000_0000;

const DESC_OWN: u32 = 1 << 31;
const DESC_RING_END: u32 = 1 << 30;
const DESC_FIRST: u32 = 1 << 29;
const DESC_LAST: u32 = 1 << 28;

/// An XID that identifies as `rev` (on a gigabit board unless the
/// revision only exists without one).
pub fn xid_for(rev: ChipRevision) -> u16 {
    match rev {
        V02 => 0x008,
        V03 => 0x040,
        V04 => 0x100,
        V05 => 0x180,
        V06 => 0x980,
        V07 => 0x348,
        V08 => 0x349,
        V09 => 0x34a,
        V10 => 0x340,
        V11 => 0x300,
        V14 => 0x240,
        V17 => 0x380,
        V18 => 0x3c8,
        V19 => 0x3c0,
        V20 => 0x3c2,
        V21 => 0x3c3,
        V22 => 0x3c4,
        V23 => 0x3c9,
        V24 => 0x3cc,
        V25 => 0x281,
        V26 => 0x280,
        V28 => 0x28a,
        V29 => 0x409,
        V30 => 0x408,
        V31 => 0x28b,
        V32 => 0x2c1,
        V33 => 0x2c0,
        V34 => 0x2c8,
        V35 => 0x480,
        V36 => 0x481,
        V37 => 0x440,
        V38 => 0x488,
        V39 => 0x448,
        V40 => 0x4c0,
        V42 | V43 => 0x509,
        V44 => 0x5c8,
        V46 | V48 => 0x541,
        V51 => 0x502,
        V52 => 0x54a,
        V53 => 0x54b,
        V61 => 0x609,
        V63 => 0x641,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER FILE
// ═══════════════════════════════════════════════════════════════════════════

struct IoState {
    rev: ChipRevision,
    regs: Vec<u8>,
    always_busy: bool,
    read_counts: HashMap<usize, usize>,
    eri: HashMap<(u32, u32), u32>,
    mac_ocp: HashMap<u32, u16>,
    phy_ocp: HashMap<u32, u16>,
    mdio: [u16; 32],
    ephy: HashMap<u32, u16>,
    csi: HashMap<u32, u32>,
    dp_ocp: HashMap<u32, u32>,
    efuse: HashMap<u32, u8>,
    tally: [u8; 64],
    tally_dumps: usize,
    tally_resets: usize,
    doorbells: usize,
    tx_next: usize,
}

impl IoState {
    fn get32(&self, off: usize) -> u32 {
        u32::from_le_bytes([self.regs[off], self.regs[off + 1], self.regs[off + 2], self.regs[off + 3]])
    }

    fn set32(&mut self, off: usize, v: u32) {
        self.regs[off..off + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn get16(&self, off: usize) -> u16 {
        u16::from_le_bytes([self.regs[off], self.regs[off + 1]])
    }

    fn set16(&mut self, off: usize, v: u16) {
        self.regs[off..off + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn uses_mac_ocp(&self) -> bool {
        !matches!(self.rev, V28 | V31)
    }

    fn intr_status_reg(&self) -> (usize, bool) {
        if self.rev.is_8125() {
            (regs::INTR_STATUS_8125, true)
        } else {
            (regs::INTR_STATUS, false)
        }
    }

    /// Protocol side effects of a 32-bit register write.
    fn write32(&mut self, off: usize, v: u32) {
        let busy = self.always_busy;
        match off {
            regs::ERIAR => {
                let ty = (v >> 16) & 0x3;
                let addr = v & 0xfff;
                if v & FLAG != 0 {
                    if busy {
                        self.set32(off, v);
                        return;
                    }
                    let enables = (v >> 12) & 0xf;
                    let mut mask = 0u32;
                    for i in 0..4 {
                        if enables & (1 << i) != 0 {
                            mask |= 0xff << (8 * i);
                        }
                    }
                    let data = self.get32(regs::ERIDR);
                    let old = self.eri.get(&(ty, addr)).copied().unwrap_or(0);
                    self.eri.insert((ty, addr), (old & !mask) | (data & mask));
                    self.set32(off, v & !FLAG);
                } else {
                    if busy {
                        self.set32(off, v);
                        return;
                    }
                    let data = self.eri.get(&(ty, addr)).copied().unwrap_or(0);
                    self.set32(regs::ERIDR, data);
                    self.set32(off, v | FLAG);
                }
            }
            regs::OCPDR if self.uses_mac_ocp() => {
                let reg = (v >> 15) & 0xfffe;
                if v & FLAG != 0 {
                    self.mac_ocp.insert(reg, v as u16);
                    self.set32(off, v);
                } else {
                    let data = self.mac_ocp.get(&reg).copied().unwrap_or(0);
                    self.set32(off, v | data as u32);
                }
            }
            regs::OCPAR => {
                let reg = v & 0xfff;
                if busy {
                    self.set32(off, v);
                } else if v & FLAG != 0 {
                    let data = self.get32(regs::OCPDR);
                    self.dp_ocp.insert(reg, data);
                    self.set32(off, v & !FLAG);
                } else {
                    let data = self.dp_ocp.get(&reg).copied().unwrap_or(0);
                    self.set32(regs::OCPDR, data);
                    self.set32(off, v | FLAG);
                }
            }
            regs::GPHY_OCP => {
                let reg = (v >> 15) & 0xfffe;
                if busy {
                    self.set32(off, v);
                } else if v & FLAG != 0 {
                    self.phy_ocp.insert(reg, v as u16);
                    self.set32(off, v & !FLAG);
                } else {
                    let data = self.phy_ocp.get(&reg).copied().unwrap_or(0);
                    self.set32(off, v | FLAG | data as u32);
                }
            }
            regs::PHYAR => {
                let reg = ((v >> 16) & 0x1f) as usize;
                if busy {
                    self.set32(off, v);
                } else if v & FLAG != 0 {
                    self.mdio[reg] = v as u16;
                    self.set32(off, v & !FLAG);
                } else {
                    self.set32(off, v | FLAG | self.mdio[reg] as u32);
                }
            }
            regs::EPHYAR => {
                let reg = (v >> 16) & 0x7f;
                if busy {
                    self.set32(off, v);
                } else if v & FLAG != 0 {
                    self.ephy.insert(reg, v as u16);
                    self.set32(off, v & !FLAG);
                } else {
                    let data = self.ephy.get(&reg).copied().unwrap_or(0);
                    self.set32(off, v | FLAG | data as u32);
                }
            }
            regs::CSIAR => {
                let addr = v & 0xfff;
                if busy {
                    self.set32(off, v);
                } else if v & FLAG != 0 {
                    let data = self.get32(regs::CSIDR);
                    self.csi.insert(addr, data);
                    self.set32(off, v & !FLAG);
                } else {
                    let data = self.csi.get(&addr).copied().unwrap_or(0);
                    self.set32(regs::CSIDR, data);
                    self.set32(off, v | FLAG);
                }
            }
            regs::EFUSEAR => {
                let reg = (v >> 8) & 0x3ff;
                if busy {
                    self.set32(off, v);
                } else {
                    let data = self.efuse.get(&reg).copied().unwrap_or(0);
                    self.set32(off, v | FLAG | data as u32);
                }
            }
            regs::COUNTER_ADDR_LOW => {
                let cmd = v & (regs::COUNTER_DUMP | regs::COUNTER_RESET);
                if cmd == 0 || busy {
                    self.set32(off, v);
                    return;
                }
                let addr = (self.get32(regs::COUNTER_ADDR_HIGH) as u64) << 32 | (v & !0x3f) as u64;
                if v & regs::COUNTER_DUMP != 0 {
                    self.tally_dumps += 1;
                    unsafe {
                        core::ptr::copy_nonoverlapping(self.tally.as_ptr(), addr as *mut u8, 64);
                    }
                }
                if v & regs::COUNTER_RESET != 0 {
                    self.tally_resets += 1;
                    self.tally = [0; 64];
                }
                self.set32(off, v & !cmd);
            }
            regs::TX_DESC_START_ADDR_LOW => {
                self.tx_next = 0;
                self.set32(off, v);
            }
            _ => {
                let (status, wide) = self.intr_status_reg();
                if off == status && wide {
                    let old = self.get32(off);
                    self.set32(off, old & !v);
                } else {
                    self.set32(off, v);
                }
            }
        }
    }

    fn write16(&mut self, off: usize, v: u16) {
        let (status, wide) = self.intr_status_reg();
        if off == status && !wide {
            let old = self.get16(off);
            self.set16(off, old & !v);
        } else {
            if off == regs::TX_POLL_8125 && self.rev.is_8125() {
                self.doorbells += 1;
            }
            self.set16(off, v);
        }
    }

    fn write8(&mut self, off: usize, v: u8) {
        match off {
            regs::CHIP_CMD => {
                // Reset completes instantly and clears the enables.
                let v = if v & regs::ChipCmd::RESET.bits() != 0 { 0 } else { v };
                self.regs[off] = v;
            }
            regs::TX_POLL if !self.rev.is_8125() => {
                self.doorbells += 1;
                self.regs[off] = v & !regs::NPQ;
            }
            _ => self.regs[off] = v,
        }
    }
}

/// Shared handle onto the simulated register file.
#[derive(Clone)]
pub struct MockIo {
    state: Arc<Mutex<IoState>>,
}

impl MockIo {
    pub fn new(rev: ChipRevision) -> Self {
        let mut state = IoState {
            rev,
            regs: vec![0; REG_SPACE],
            always_busy: false,
            read_counts: HashMap::new(),
            eri: HashMap::new(),
            mac_ocp: HashMap::new(),
            phy_ocp: HashMap::new(),
            mdio: [0; 32],
            ephy: HashMap::new(),
            csi: HashMap::new(),
            dp_ocp: HashMap::new(),
            efuse: HashMap::new(),
            tally: [0; 64],
            tally_dumps: 0,
            tally_resets: 0,
            doorbells: 0,
            tx_next: 0,
        };
        state.set32(regs::TX_CONFIG, (xid_for(rev) as u32) << 20 | regs::TXCFG_EMPTY);
        state.regs[regs::MCU] = regs::LINK_LIST_RDY | regs::RXTX_EMPTY;
        if rev == V63 {
            state.set16(regs::INTR_MITIGATE, 0x0103);
        }
        state.regs[regs::MAC0..regs::MAC0 + 6].copy_from_slice(&[0x00, 0xe0, 0x4c, 0x68, 0x00, 0x01]);
        state.mdio[regs::MII_BMSR as usize] = 0x796d;
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut IoState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn peek8(&self, off: usize) -> u8 {
        self.with(|s| s.regs[off])
    }

    pub fn peek16(&self, off: usize) -> u16 {
        self.with(|s| s.get16(off))
    }

    pub fn peek32(&self, off: usize) -> u32 {
        self.with(|s| s.get32(off))
    }

    /// Set a register without triggering protocol side effects.
    pub fn poke8(&self, off: usize, v: u8) {
        self.with(|s| s.regs[off] = v)
    }

    pub fn poke32(&self, off: usize, v: u32) {
        self.with(|s| s.set32(off, v))
    }

    /// Every flag-polled protocol stops completing.
    pub fn set_always_busy(&self, busy: bool) {
        self.with(|s| s.always_busy = busy)
    }

    pub fn read_count(&self, off: usize) -> usize {
        self.with(|s| s.read_counts.get(&off).copied().unwrap_or(0))
    }

    pub fn reset_read_count(&self, off: usize) {
        self.with(|s| {
            s.read_counts.remove(&off);
        })
    }

    pub fn phy_ocp(&self, reg: u32) -> u16 {
        self.with(|s| s.phy_ocp.get(&reg).copied().unwrap_or(0))
    }

    pub fn set_efuse(&self, reg: u32, v: u8) {
        self.with(|s| {
            s.efuse.insert(reg, v);
        })
    }

    pub fn set_mdio(&self, reg: u32, v: u16) {
        self.with(|s| s.mdio[reg as usize & 0x1f] = v)
    }

    pub fn mdio(&self, reg: u32) -> u16 {
        self.with(|s| s.mdio[reg as usize & 0x1f])
    }

    pub fn set_dp_ocp(&self, reg: u32, v: u32) {
        self.with(|s| {
            s.dp_ocp.insert(reg, v);
        })
    }

    pub fn dp_ocp(&self, reg: u32) -> u32 {
        self.with(|s| s.dp_ocp.get(&reg).copied().unwrap_or(0))
    }

    /// Raw ERI cell, `ty` 0 for the EXGMAC space and 2 for OOB.
    pub fn eri(&self, ty: u32, addr: u32) -> u32 {
        self.with(|s| s.eri.get(&(ty, addr)).copied().unwrap_or(0))
    }

    pub fn set_eri(&self, ty: u32, addr: u32, v: u32) {
        self.with(|s| {
            s.eri.insert((ty, addr), v);
        })
    }

    /// Counter block the next dump copies out.
    pub fn set_tally(&self, block: [u8; 64]) {
        self.with(|s| s.tally = block)
    }

    pub fn tally_dumps(&self) -> usize {
        self.with(|s| s.tally_dumps)
    }

    pub fn tally_resets(&self) -> usize {
        self.with(|s| s.tally_resets)
    }

    pub fn doorbells(&self) -> usize {
        self.with(|s| s.doorbells)
    }

    /// Latch interrupt status bits.
    pub fn raise(&self, bits: u32) {
        self.with(|s| {
            let (status, wide) = s.intr_status_reg();
            if wide {
                let v = s.get32(status) | bits;
                s.set32(status, v);
            } else {
                let v = s.get16(status) | bits as u16;
                s.set16(status, v);
            }
        })
    }

    /// Make every read of the device return all ones.
    pub fn fall_off_bus(&self) {
        self.with(|s| s.regs.iter_mut().for_each(|b| *b = 0xff))
    }

    // ───────────────────────────────────────────────────────────────────
    // Simulated DMA engine
    // ───────────────────────────────────────────────────────────────────

    fn desc_base(&self, low: usize, high: usize) -> u64 {
        self.with(|s| (s.get32(high) as u64) << 32 | s.get32(low) as u64)
    }

    /// Complete RX descriptor `slot` with `frame` and extra status bits.
    pub fn rx_complete(&self, slot: usize, frame: &[u8], status: u32) {
        let base = self.desc_base(regs::RX_DESC_ADDR_LOW, regs::RX_DESC_ADDR_HIGH);
        let desc = (base + slot as u64 * 16) as *mut u32;
        unsafe {
            let opts1 = u32::from_le(desc.read_volatile());
            let buf = u64::from_le((desc.add(2) as *const u64).read_volatile());
            core::ptr::copy_nonoverlapping(frame.as_ptr(), buf as *mut u8, frame.len());
            let len = (frame.len() + 4) as u32;
            let v = (opts1 & DESC_RING_END) | DESC_FIRST | DESC_LAST | status | len;
            desc.write_volatile(v.to_le());
        }
    }

    /// Overwrite RX descriptor `slot` status verbatim.
    pub fn rx_status(&self, slot: usize, status: u32, opts2: u32) {
        let base = self.desc_base(regs::RX_DESC_ADDR_LOW, regs::RX_DESC_ADDR_HIGH);
        let desc = (base + slot as u64 * 16) as *mut u32;
        unsafe {
            let opts1 = u32::from_le(desc.read_volatile());
            desc.add(1).write_volatile(opts2.to_le());
            desc.write_volatile(((opts1 & DESC_RING_END) | status).to_le());
        }
    }

    /// `true` while the device owns RX descriptor `slot`.
    pub fn rx_owned(&self, slot: usize) -> bool {
        let base = self.desc_base(regs::RX_DESC_ADDR_LOW, regs::RX_DESC_ADDR_HIGH);
        let desc = (base + slot as u64 * 16) as *const u32;
        unsafe { u32::from_le(desc.read_volatile()) & DESC_OWN != 0 }
    }

    /// Raw `(opts1, opts2, addr)` of TX descriptor `slot`.
    pub fn tx_desc(&self, slot: usize) -> (u32, u32, u64) {
        let base = self.desc_base(regs::TX_DESC_START_ADDR_LOW, regs::TX_DESC_START_ADDR_HIGH);
        let desc = (base + slot as u64 * 16) as *const u32;
        unsafe {
            (
                u32::from_le(desc.read_volatile()),
                u32::from_le(desc.add(1).read_volatile()),
                u64::from_le((desc.add(2) as *const u64).read_volatile()),
            )
        }
    }

    /// Hand back up to `count` device-owned TX descriptors in ring order.
    pub fn tx_complete(&self, count: usize) -> usize {
        let base = self.desc_base(regs::TX_DESC_START_ADDR_LOW, regs::TX_DESC_START_ADDR_HIGH);
        let mut done = 0;
        while done < count {
            let slot = self.with(|s| s.tx_next);
            let desc = (base + slot as u64 * 16) as *mut u32;
            let opts1 = unsafe { u32::from_le(desc.read_volatile()) };
            if opts1 & DESC_OWN == 0 {
                break;
            }
            unsafe { desc.write_volatile((opts1 & !DESC_OWN).to_le()) };
            let next = if opts1 & DESC_RING_END != 0 { 0 } else { slot + 1 };
            self.with(|s| s.tx_next = next);
            done += 1;
        }
        done
    }
}

impl RegisterIo for MockIo {
    fn read8(&self, off: usize) -> u8 {
        self.with(|s| {
            *s.read_counts.entry(off).or_insert(0) += 1;
            s.regs[off]
        })
    }

    fn read16(&self, off: usize) -> u16 {
        self.with(|s| {
            *s.read_counts.entry(off).or_insert(0) += 1;
            s.get16(off)
        })
    }

    fn read32(&self, off: usize) -> u32 {
        self.with(|s| {
            *s.read_counts.entry(off).or_insert(0) += 1;
            s.get32(off)
        })
    }

    fn write8(&self, off: usize, v: u8) {
        self.with(|s| s.write8(off, v))
    }

    fn write16(&self, off: usize, v: u16) {
        self.with(|s| s.write16(off, v))
    }

    fn write32(&self, off: usize, v: u32) {
        self.with(|s| s.write32(off, v))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PLATFORM
// ═══════════════════════════════════════════════════════════════════════════

struct PlatformState {
    now_us: u64,
    live_coherent: HashMap<usize, Layout>,
    coherent_budget: Option<usize>,
    live_maps: usize,
    map_budget: Option<usize>,
    ext_config_ok: bool,
    ext_config: HashMap<u16, u8>,
    clkreq: Option<bool>,
    aspm_disables: Vec<bool>,
    bus_resets: usize,
    bus_reset_ok: bool,
    bus_master: bool,
    max_read_request: Option<u16>,
    pcie: bool,
}

/// Heap-backed DMA, a fake clock and a recording PCI function.
#[derive(Clone)]
pub struct MockPlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlatformState {
                now_us: 1_000_000,
                live_coherent: HashMap::new(),
                coherent_budget: None,
                live_maps: 0,
                map_budget: None,
                ext_config_ok: true,
                ext_config: HashMap::new(),
                clkreq: None,
                aspm_disables: Vec::new(),
                bus_resets: 0,
                bus_reset_ok: true,
                bus_master: false,
                max_read_request: None,
                pcie: true,
            })),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut PlatformState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn live_coherent(&self) -> usize {
        self.with(|s| s.live_coherent.len())
    }

    /// Let `n` more coherent allocations succeed, then fail.
    pub fn fail_coherent_after(&self, n: usize) {
        self.with(|s| s.coherent_budget = Some(n))
    }

    pub fn live_maps(&self) -> usize {
        self.with(|s| s.live_maps)
    }

    /// Let `n` more streaming mappings succeed, then fail.
    pub fn fail_map_after(&self, n: usize) {
        self.with(|s| s.map_budget = Some(n))
    }

    pub fn clear_map_failure(&self) {
        self.with(|s| s.map_budget = None)
    }

    pub fn set_ext_config_ok(&self, ok: bool) {
        self.with(|s| s.ext_config_ok = ok)
    }

    pub fn ext_config(&self, offset: u16) -> Option<u8> {
        self.with(|s| s.ext_config.get(&offset).copied())
    }

    pub fn clkreq(&self) -> Option<bool> {
        self.with(|s| s.clkreq)
    }

    /// Every `disable_aspm(include_l0s)` call so far.
    pub fn aspm_disables(&self) -> Vec<bool> {
        self.with(|s| s.aspm_disables.clone())
    }

    pub fn bus_resets(&self) -> usize {
        self.with(|s| s.bus_resets)
    }

    pub fn set_bus_reset_ok(&self, ok: bool) {
        self.with(|s| s.bus_reset_ok = ok)
    }

    pub fn bus_master(&self) -> bool {
        self.with(|s| s.bus_master)
    }

    pub fn max_read_request(&self) -> Option<u16> {
        self.with(|s| s.max_read_request)
    }

    pub fn advance_ms(&self, ms: u64) {
        self.with(|s| s.now_us += ms * 1000)
    }
}

impl Delay for MockPlatform {
    fn udelay(&self, us: u32) {
        self.with(|s| s.now_us += us as u64)
    }

    fn now_ms(&self) -> u64 {
        self.with(|s| s.now_us / 1000)
    }
}

impl DmaAllocator for MockPlatform {
    fn alloc_coherent(&self, size: usize, align: usize) -> Option<DmaRegion> {
        let allowed = self.with(|s| match s.coherent_budget.as_mut() {
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
            None => true,
        });
        if !allowed || size == 0 {
            return None;
        }
        let layout = Layout::from_size_align(size, align.max(1)).ok()?;
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return None;
        }
        self.with(|s| s.live_coherent.insert(ptr as usize, layout));
        Some(unsafe { DmaRegion::new(ptr, ptr as u64, size) })
    }

    fn free_coherent(&self, region: DmaRegion) {
        let ptr = region.cpu_ptr();
        if let Some(layout) = self.with(|s| s.live_coherent.remove(&(ptr as usize))) {
            unsafe { dealloc(ptr, layout) };
        }
    }

    fn map_single(&self, cpu: *const u8, _len: usize, _dir: DmaDirection) -> Result<u64, MapError> {
        self.with(|s| {
            match s.map_budget.as_mut() {
                Some(0) => return Err(MapError),
                Some(n) => *n -= 1,
                None => {}
            }
            s.live_maps += 1;
            Ok(cpu as u64)
        })
    }

    fn unmap_single(&self, _bus: u64, _len: usize, _dir: DmaDirection) {
        self.with(|s| s.live_maps -= 1)
    }
}

impl PciFunction for MockPlatform {
    fn function_number(&self) -> u8 {
        0
    }

    fn is_pcie(&self) -> bool {
        self.with(|s| s.pcie)
    }

    fn write_ext_config_byte(&self, offset: u16, value: u8) -> bool {
        self.with(|s| {
            if s.ext_config_ok {
                s.ext_config.insert(offset, value);
            }
            s.ext_config_ok
        })
    }

    fn set_clock_request(&self, enable: bool) {
        self.with(|s| s.clkreq = Some(enable))
    }

    fn disable_aspm(&self, include_l0s: bool) -> bool {
        self.with(|s| s.aspm_disables.push(include_l0s));
        true
    }

    fn secondary_bus_reset(&self) -> bool {
        self.with(|s| {
            s.bus_resets += 1;
            s.bus_reset_ok
        })
    }

    fn set_bus_master(&self, enable: bool) {
        self.with(|s| s.bus_master = enable)
    }

    fn set_max_read_request(&self, bytes: u16) {
        self.with(|s| s.max_read_request = Some(bytes))
    }

    fn mac_seed(&self) -> u64 {
        0x0000_5566_7788_99aa
    }
}

/// Register access over a fresh mock platform.
pub fn test_access(io: MockIo, rev: ChipRevision) -> RegisterAccess<MockIo, MockPlatform> {
    RegisterAccess::new(io, MockPlatform::new(), rev, RateLimiter::new(10, 5000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{identify, xid_from_txconfig};

    #[test]
    fn test_mock_identifies_as_requested_revision() {
        for rev in ChipRevision::ALL {
            let io = MockIo::new(rev);
            let xid = xid_from_txconfig(io.peek32(regs::TX_CONFIG));
            let gmii = !matches!(rev, V43 | V48);
            assert_eq!(identify(xid, gmii), Some(rev));
        }
    }

    #[test]
    fn test_interrupt_status_is_write_one_to_clear() {
        let io = MockIo::new(ChipRevision::V40);
        io.raise(0x25);
        io.write16(regs::INTR_STATUS, 0x05);
        assert_eq!(io.peek16(regs::INTR_STATUS), 0x20);
    }
}
