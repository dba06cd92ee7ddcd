//! Deferred recovery requests.
//!
//! Interrupt and poll context may only *request* recovery; the work runs
//! later on the control path. Requests collapse into a small atomic set,
//! so a burst of errors costs one reset.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Recovery actions waiting to run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RecoveryAction: u8 {
        /// Transmitter stalled; may need a bus reset and ASPM off.
        const TX_TIMEOUT = 1 << 0;
        /// System error or RX FIFO overflow; reinitialise the MAC.
        const RESET_PENDING = 1 << 1;
    }
}

/// Pending recovery set plus the task's enable flag.
pub struct Recovery {
    pending: AtomicU8,
    enabled: AtomicBool,
    running: AtomicBool,
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

impl Recovery {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU8::new(0),
            enabled: AtomicBool::new(false),
            running: AtomicBool::new(false),
        }
    }

    /// Accept requests from now on.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }

    /// Refuse new requests and drop queued ones.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        self.pending.store(0, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Queue `action`. Safe from interrupt context.
    ///
    /// # Returns
    /// `false` if the task is disabled and the request was dropped.
    pub fn request(&self, action: RecoveryAction) -> bool {
        if !self.is_enabled() {
            return false;
        }
        self.pending.fetch_or(action.bits(), Ordering::AcqRel);
        true
    }

    pub fn pending(&self) -> RecoveryAction {
        RecoveryAction::from_bits_truncate(self.pending.load(Ordering::Acquire))
    }

    /// Claim the task for one run.
    ///
    /// # Returns
    /// `None` if disabled, idle or already running elsewhere.
    pub fn begin(&self) -> Option<RecoveryGuard<'_>> {
        if !self.is_enabled() || self.pending().is_empty() {
            return None;
        }
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RecoveryGuard { recovery: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// One claimed run of the recovery task; released on drop.
pub struct RecoveryGuard<'a> {
    recovery: &'a Recovery,
}

impl RecoveryGuard<'_> {
    /// Clear and return `action` if it was pending.
    pub fn take(&self, action: RecoveryAction) -> bool {
        let prev = self.recovery.pending.fetch_and(!action.bits(), Ordering::AcqRel);
        prev & action.bits() != 0
    }
}

impl Drop for RecoveryGuard<'_> {
    fn drop(&mut self) {
        self.recovery.running.store(false, Ordering::Release);
    }
}
