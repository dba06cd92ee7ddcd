//! Register access layer.
//!
//! Direct MMIO plus the indirect protocols layered over a handful of
//! command/data register pairs. Every indirect protocol follows the same
//! shape: write a command word, poll a flag bit with a bounded retry
//! count, then read the data register. A timeout is logged (rate
//! limited) and returned as [`R8169Error::Timeout`]; it never hangs.
//!
//! # Locks
//! - `mac_ocp` guards the OCPDR read-modify-write sequence
//! - `config25` guards Config2/Config5 read-modify-write
//! - `cfg9346_usage` reference-counts the config write-protect latch
//!
//! All three are short spin sections and are safe from interrupt context.
//!
//! # Reference
//! RTL8168 datasheet §ERI/OCP/EPHY, NETWORK_IMPL_GUIDE.md §2.3

mod csi;
mod efuse;
mod ephy;
mod eri;
mod ocp;
mod phy;

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use spin::Mutex;

pub use ephy::EphyPatch;
pub use eri::{EriMask, EriType};
pub use phy::PhyRoute;

use crate::chip::ChipRevision;
use crate::error::{R8169Error, Result};
use crate::hw::{Delay, Platform, RegisterIo};
use crate::regs;

// ═══════════════════════════════════════════════════════════════════════════
// PROTOCOLS
// ═══════════════════════════════════════════════════════════════════════════

/// What a bounded wait was polling for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Mdio,
    PhyOcp,
    MacOcp,
    Ephy,
    Eri,
    Csi,
    OobOcp,
    Efuse,
    /// Chip reset, FIFO drain and MCU handshakes.
    Mcu,
    /// Tally counter dump/reset.
    Counters,
    /// 8168ep CMAC stop handshake.
    Cmac,
    /// DASH firmware handshake.
    Dash,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mdio => "MDIO",
            Self::PhyOcp => "PHY OCP",
            Self::MacOcp => "MAC OCP",
            Self::Ephy => "EPHY",
            Self::Eri => "ERI",
            Self::Csi => "CSI",
            Self::OobOcp => "OOB OCP",
            Self::Efuse => "EFUSE",
            Self::Mcu => "MCU",
            Self::Counters => "counter dump",
            Self::Cmac => "CMAC",
            Self::Dash => "DASH",
        };
        f.write_str(name)
    }
}

/// Poll interval and retry count of one bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poll {
    pub delay_us: u32,
    pub tries: u32,
}

impl Poll {
    pub const fn new(delay_us: u32, tries: u32) -> Self {
        Self { delay_us, tries }
    }
}

pub const POLL_ERI: Poll = Poll::new(100, 100);
pub const POLL_PHY_OCP: Poll = Poll::new(25, 10);
pub const POLL_MDIO: Poll = Poll::new(25, 20);
pub const POLL_EPHY: Poll = Poll::new(10, 100);
pub const POLL_CSI: Poll = Poll::new(10, 100);
pub const POLL_OOB_OCP: Poll = Poll::new(100, 20);
pub const POLL_EFUSE: Poll = Poll::new(100, 300);

// ═══════════════════════════════════════════════════════════════════════════
// RATE LIMITER
// ═══════════════════════════════════════════════════════════════════════════

/// Burst limiter for error logs, usable from interrupt context.
pub struct RateLimiter {
    burst: u32,
    window_ms: u64,
    window_start: AtomicU64,
    emitted: AtomicU32,
}

impl RateLimiter {
    pub const fn new(burst: u32, window_ms: u64) -> Self {
        Self {
            burst,
            window_ms,
            window_start: AtomicU64::new(0),
            emitted: AtomicU32::new(0),
        }
    }

    /// `true` if a message may be emitted at `now_ms`.
    pub fn allow(&self, now_ms: u64) -> bool {
        let start = self.window_start.load(Ordering::Relaxed);
        if now_ms.wrapping_sub(start) >= self.window_ms
            && self
                .window_start
                .compare_exchange(start, now_ms, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            self.emitted.store(0, Ordering::Relaxed);
        }
        self.emitted.fetch_add(1, Ordering::Relaxed) < self.burst
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER ACCESS
// ═══════════════════════════════════════════════════════════════════════════

/// MMIO window plus the platform, bound to one identified chip.
pub struct RegisterAccess<R, P> {
    io: R,
    platform: P,
    rev: ChipRevision,
    mac_ocp: Mutex<()>,
    config25: Mutex<()>,
    cfg9346_usage: Mutex<u32>,
    /// Current GPHY OCP page base for paged PHY access.
    ocp_base: AtomicU32,
    limiter: RateLimiter,
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    pub fn new(io: R, platform: P, rev: ChipRevision, limiter: RateLimiter) -> Self {
        Self {
            io,
            platform,
            rev,
            mac_ocp: Mutex::new(()),
            config25: Mutex::new(()),
            cfg9346_usage: Mutex::new(0),
            ocp_base: AtomicU32::new(regs::OCP_STD_PHY_BASE),
            limiter,
        }
    }

    pub fn io(&self) -> &R {
        &self.io
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn revision(&self) -> ChipRevision {
        self.rev
    }

    // ───────────────────────────────────────────────────────────────────
    // Direct MMIO
    // ───────────────────────────────────────────────────────────────────

    #[inline]
    pub fn r8(&self, reg: usize) -> u8 {
        self.io.read8(reg)
    }

    #[inline]
    pub fn r16(&self, reg: usize) -> u16 {
        self.io.read16(reg)
    }

    #[inline]
    pub fn r32(&self, reg: usize) -> u32 {
        self.io.read32(reg)
    }

    #[inline]
    pub fn w8(&self, reg: usize, value: u8) {
        self.io.write8(reg, value)
    }

    #[inline]
    pub fn w16(&self, reg: usize, value: u16) {
        self.io.write16(reg, value)
    }

    #[inline]
    pub fn w32(&self, reg: usize, value: u32) {
        self.io.write32(reg, value)
    }

    pub fn mod8(&self, reg: usize, clear: u8, set: u8) {
        let v = self.r8(reg);
        self.w8(reg, (v & !clear) | set);
    }

    pub fn mod16(&self, reg: usize, clear: u16, set: u16) {
        let v = self.r16(reg);
        self.w16(reg, (v & !clear) | set);
    }

    pub fn mod32(&self, reg: usize, clear: u32, set: u32) {
        let v = self.r32(reg);
        self.w32(reg, (v & !clear) | set);
    }

    /// Flush posted writes.
    #[inline]
    pub fn commit(&self) {
        let _ = self.r8(regs::CHIP_CMD);
    }

    // ───────────────────────────────────────────────────────────────────
    // Config write-protect latch
    // ───────────────────────────────────────────────────────────────────

    /// Open the Config0-5 write window. Nested calls are counted.
    pub fn unlock_config(&self) {
        let mut usage = self.cfg9346_usage.lock();
        if *usage == 0 {
            self.w8(regs::CFG9346, regs::CFG9346_UNLOCK);
        }
        *usage += 1;
    }

    /// Close the write window once the last user is done.
    pub fn lock_config(&self) {
        let mut usage = self.cfg9346_usage.lock();
        match *usage {
            0 => log::warn!("[r8169] unbalanced config lock"),
            1 => {
                *usage = 0;
                self.w8(regs::CFG9346, regs::CFG9346_LOCK);
            }
            _ => *usage -= 1,
        }
    }

    /// Current nesting depth of the config unlock.
    pub fn config_unlock_depth(&self) -> u32 {
        *self.cfg9346_usage.lock()
    }

    pub fn mod_config2(&self, clear: u8, set: u8) {
        let _guard = self.config25.lock();
        self.mod8(regs::CONFIG2, clear, set);
    }

    pub fn mod_config5(&self, clear: u8, set: u8) {
        let _guard = self.config25.lock();
        self.mod8(regs::CONFIG5, clear, set);
    }

    /// Run `f` with Config2/Config5 held, for multi-register updates.
    pub fn with_config25<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.config25.lock();
        f()
    }

    // ───────────────────────────────────────────────────────────────────
    // Bounded waits
    // ───────────────────────────────────────────────────────────────────

    /// Poll `cond` until it equals `high`, at most `poll.tries` times.
    ///
    /// # Returns
    /// `Err(Timeout(what))` once the retries are exhausted.
    pub fn wait_for(
        &self,
        what: Protocol,
        poll: Poll,
        high: bool,
        mut cond: impl FnMut(&Self) -> bool,
    ) -> Result<()> {
        for _ in 0..poll.tries {
            if cond(self) == high {
                return Ok(());
            }
            self.delay_us(poll.delay_us);
        }

        if self.ratelimit() {
            log::error!(
                "[r8169] {} flag == {} (loop: {}, delay: {})",
                what,
                !high,
                poll.tries,
                poll.delay_us
            );
        }
        Err(R8169Error::Timeout(what))
    }

    /// Poll until every bit of `mask` in a 32-bit register is set or clear.
    pub fn wait_reg32(&self, what: Protocol, reg: usize, mask: u32, high: bool, poll: Poll) -> Result<()> {
        self.wait_for(what, poll, high, |a| a.r32(reg) & mask != 0)
    }

    pub fn delay_us(&self, us: u32) {
        if us >= 1000 {
            self.platform.msleep(us / 1000);
        } else {
            self.platform.udelay(us);
        }
    }

    /// Shared limiter for timeout and per-packet error logs.
    pub fn ratelimit(&self) -> bool {
        self.limiter.allow(self.platform.now_ms())
    }

    // ───────────────────────────────────────────────────────────────────
    // Chip helpers
    // ───────────────────────────────────────────────────────────────────

    /// Read the MAC address stored in six consecutive byte registers.
    pub fn read_mac_from(&self, reg: usize) -> [u8; 6] {
        let mut mac = [0u8; 6];
        for (i, b) in mac.iter_mut().enumerate() {
            *b = self.r8(reg + i);
        }
        mac
    }
}
