//! Interrupt pipeline.
//!
//! The hard interrupt handler only reads and acknowledges status, masks
//! the chip and hands off to the poll task. Poll state is a single atomic
//! so the handler can run against a `&` reference while the owner of the
//! device polls:
//!
//! ```text
//! Idle ──irq──> Pending ──poll──> Polling ──budget left──> Idle
//!                                    │
//!                                    └──budget spent──> Pending
//! ```
//!
//! # Reference
//! RTL8169 datasheet §IntrMask/IntrStatus, NETWORK_IMPL_GUIDE.md §4

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::access::RegisterAccess;
use crate::chip::{Capabilities, Quirks};
use crate::hw::{Platform, RegisterIo};
use crate::regs::{self, Interrupts};

// ═══════════════════════════════════════════════════════════════════════════
// REGISTER OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// Raw interrupt status. 32 bits wide on the 8125.
    pub fn irq_status(&self) -> u32 {
        if self.revision().is_8125() {
            self.r32(regs::INTR_STATUS_8125)
        } else {
            self.r16(regs::INTR_STATUS) as u32
        }
    }

    /// Write-1-to-clear acknowledge.
    pub fn irq_ack(&self, bits: u32) {
        if self.revision().is_8125() {
            self.w32(regs::INTR_STATUS_8125, bits);
        } else {
            self.w16(regs::INTR_STATUS, bits as u16);
        }
    }

    fn irq_write_mask(&self, mask: u32) {
        if self.revision().is_8125() {
            self.w32(regs::INTR_MASK_8125, mask);
        } else {
            self.w16(regs::INTR_MASK, mask as u16);
        }
    }

    pub fn irq_disable(&self) {
        self.irq_write_mask(0);
    }

    pub fn irq_enable(&self, mask: Interrupts) {
        self.irq_write_mask(mask.bits());
    }

    /// Mask everything and drop whatever is latched.
    pub fn irq_mask_and_ack(&self) {
        self.irq_disable();
        self.irq_ack(u32::MAX);
        self.commit();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════

/// What one interrupt asks the driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrqEvents {
    /// Raw status, acknowledged on the way out.
    pub status: u32,
    /// PCI system error; reset instead of polling.
    pub sys_err: bool,
    pub link_change: bool,
    /// RX FIFO overflow on a chip that needs a reset to recover.
    pub fifo_reset: bool,
}

/// Decide whether `status` is ours and what it means.
///
/// # Returns
/// `None` for a shared interrupt raised by another device, or for a
/// device that has dropped off the bus.
pub fn classify(status: u32, caps: &Capabilities) -> Option<IrqEvents> {
    if status & 0xffff == 0xffff || status & caps.irq_mask.bits() == 0 {
        return None;
    }
    let bits = Interrupts::from_bits_truncate(status);
    Some(IrqEvents {
        status,
        sys_err: bits.contains(Interrupts::SYS_ERR),
        link_change: bits.contains(Interrupts::LINK_CHG),
        fifo_reset: bits.contains(Interrupts::RX_FIFO_OVER) && caps.has(Quirks::RX_FIFO_OVERFLOW_RESET),
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// POLL STATE
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PollState {
    Idle = 0,
    Pending = 1,
    Polling = 2,
}

impl PollState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Pending,
            2 => Self::Polling,
            _ => Self::Idle,
        }
    }
}

/// Interrupt-side state shared with the poll task.
pub struct IrqPipeline {
    state: AtomicU8,
    /// Polling allowed; cleared while the control path owns the rings.
    enabled: AtomicBool,
    link_event: AtomicBool,
}

impl Default for IrqPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqPipeline {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(PollState::Idle as u8),
            enabled: AtomicBool::new(false),
            link_event: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PollState {
        PollState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn enable(&self) {
        self.state.store(PollState::Idle as u8, Ordering::Release);
        self.enabled.store(true, Ordering::Release);
    }

    /// Stop scheduling polls. Any scheduled poll is forgotten.
    ///
    /// The caller holds the device mutably, so no poll is running. An
    /// interrupt racing with this call through an `IrqHandle` may still
    /// mask the chip, which the following reset or close unmasks or
    /// leaves masked as it needs.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        self.state.store(PollState::Idle as u8, Ordering::Release);
    }

    /// Claim the right to schedule a poll.
    ///
    /// # Returns
    /// `true` exactly once per Idle to Pending transition.
    pub fn schedule_prep(&self) -> bool {
        self.is_enabled()
            && self
                .state
                .compare_exchange(
                    PollState::Idle as u8,
                    PollState::Pending as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    /// Enter the poll body.
    ///
    /// # Returns
    /// `false` if no poll was scheduled.
    pub fn begin_poll(&self) -> bool {
        self.is_enabled()
            && self
                .state
                .compare_exchange(
                    PollState::Pending as u8,
                    PollState::Polling as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
    }

    /// Leave the poll body.
    ///
    /// # Arguments
    /// - `budget_exhausted`: stay scheduled with interrupts masked
    ///
    /// # Returns
    /// `true` if interrupts should be unmasked.
    pub fn complete(&self, budget_exhausted: bool) -> bool {
        let next = if budget_exhausted { PollState::Pending } else { PollState::Idle };
        self.state.store(next as u8, Ordering::Release);
        !budget_exhausted
    }

    pub fn note_link_event(&self) {
        self.link_event.store(true, Ordering::Release);
    }

    pub fn take_link_event(&self) -> bool {
        self.link_event.swap(false, Ordering::AcqRel)
    }
}
