//! The RTL8169 device.
//!
//! One [`R8169`] owns the register window, the rings and the driver state
//! of one PCI function. Methods are split by the context they may run in:
//!
//! - interrupt: [`R8169::handle_interrupt`] or an [`IrqHandle`] touch
//!   only registers and atomics
//! - poll: [`R8169::poll`] and [`R8169::xmit`] (`datapath`)
//! - control: attach, open/close, power management and recovery
//!   (`control`), host-visible settings (`settings`)
//!
//! Poll and control methods take `&mut self`, so they can never overlap.
//! The host serialises them with whatever lock its scheduler offers.
//! The interrupt handler must not wait on that lock; it gets an
//! [`IrqHandle`] from [`R8169::interrupt_handle`] instead, which shares
//! the register window and interrupt state with the device.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §8, RTL8168 datasheet §Operation

mod control;
mod datapath;
mod settings;

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::access::RegisterAccess;
use crate::chip::{Capabilities, ChipRevision, DashType};
use crate::config::R8169Config;
use crate::driver::traits::{DriverInit, NetworkDriver, RxError, TxError};
use crate::error::R8169Error;
use crate::features::Features;
use crate::hw::{Mmio, Platform, RegisterIo};
use crate::irq::IrqPipeline;
use crate::link::LinkState;
use crate::recovery::{Recovery, RecoveryAction};
use crate::regs;
use crate::ring::{RxRing, TxPacket, TxRing};
use crate::rx_mode::RxMode;
use crate::stats::{CounterOffsets, SwStats, TallyBlock};
use crate::types::MacAddress;
use crate::wol::WolOpts;

pub use datapath::PollOutcome;

// ═══════════════════════════════════════════════════════════════════════════
// DEVICE STATE
// ═══════════════════════════════════════════════════════════════════════════

/// Interface lifecycle. Suspension is tracked separately and overlays
/// either `Up` or `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Down,
    Opening,
    Up,
    Closing,
}

/// Rings exist exactly while the interface is open.
struct Rings {
    tx: TxRing,
    rx: RxRing,
}

/// Realtek RTL8169/8168/8101/8125 network device.
pub struct R8169<R: RegisterIo, P: Platform> {
    hw: Arc<RegisterAccess<R, P>>,
    config: R8169Config,
    caps: Capabilities,
    xid: u16,
    dash: DashType,

    mac: MacAddress,
    /// Address found at attach; restored on shutdown.
    perm_mac: MacAddress,
    /// Shadow of CPlusCmd.
    cp_cmd: u16,
    features: Features,
    mtu: usize,
    /// Wake sources to arm across suspend and close.
    saved_wol: WolOpts,
    wake_enabled: bool,
    rx_mode: RxMode,
    aspm_manageable: bool,
    aspm_warned: bool,

    state: DeviceState,
    suspended: bool,
    /// Cleared when the device is detached, by suspend or for good after a
    /// failed bus reset.
    present: bool,
    dead: bool,
    queue_stopped: Arc<AtomicBool>,

    rings: Option<Rings>,
    tally: Option<TallyBlock>,
    counter_offsets: CounterOffsets,
    sw: SwStats,
    link: LinkState,
    last_tx_progress_ms: u64,

    irq: Arc<IrqPipeline>,
    recovery: Arc<Recovery>,
}

/// Interrupt-context handle to an [`R8169`].
///
/// Holds only what the hard interrupt handler touches, so it can run on
/// another CPU while the poll task has the device borrowed mutably.
pub struct IrqHandle<R: RegisterIo, P: Platform> {
    hw: Arc<RegisterAccess<R, P>>,
    caps: Capabilities,
    irq: Arc<IrqPipeline>,
    recovery: Arc<Recovery>,
    queue_stopped: Arc<AtomicBool>,
}

impl<R: RegisterIo, P: Platform> Clone for IrqHandle<R, P> {
    fn clone(&self) -> Self {
        Self {
            hw: Arc::clone(&self.hw),
            caps: self.caps,
            irq: Arc::clone(&self.irq),
            recovery: Arc::clone(&self.recovery),
            queue_stopped: Arc::clone(&self.queue_stopped),
        }
    }
}

impl<R: RegisterIo, P: Platform> R8169<R, P> {
    pub fn revision(&self) -> ChipRevision {
        self.hw.revision()
    }

    /// Masked XID the chip identified with.
    pub fn xid(&self) -> u16 {
        self.xid
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn config(&self) -> &R8169Config {
        &self.config
    }

    pub fn registers(&self) -> &RegisterAccess<R, P> {
        &self.hw
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Open and able to move traffic.
    pub fn is_running(&self) -> bool {
        self.state == DeviceState::Up
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Detached for good after the bus stopped answering.
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn dash(&self) -> DashType {
        self.dash
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn perm_mac(&self) -> MacAddress {
        self.perm_mac
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// Largest MTU this chip and board accept.
    pub fn max_mtu(&self) -> usize {
        self.caps.max_mtu()
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Link as last seen by a link-change event.
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// `true` while the transmit queue is stopped.
    pub fn queue_stopped(&self) -> bool {
        self.queue_stopped.load(Ordering::Acquire)
    }

    /// The interrupt handler scheduled a poll that has not run yet.
    pub fn poll_scheduled(&self) -> bool {
        self.irq.state() == crate::irq::PollState::Pending
    }

    /// Recovery actions waiting for [`R8169::run_recovery`].
    pub fn recovery_pending(&self) -> RecoveryAction {
        self.recovery.pending()
    }

    /// Handle for the host's interrupt handler.
    pub fn interrupt_handle(&self) -> IrqHandle<R, P> {
        IrqHandle {
            hw: Arc::clone(&self.hw),
            caps: self.caps,
            irq: Arc::clone(&self.irq),
            recovery: Arc::clone(&self.recovery),
            queue_stopped: Arc::clone(&self.queue_stopped),
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Queue control
    // ───────────────────────────────────────────────────────────────────

    fn stop_queue(&self) {
        self.queue_stopped.store(true, Ordering::Release);
    }

    fn wake_queue(&self) {
        self.queue_stopped.store(false, Ordering::Release);
    }

    /// Tell the chip new TX descriptors are ready.
    fn doorbell(&self) {
        if self.hw.revision().is_8125() {
            self.hw.w16(regs::TX_POLL_8125, 1);
        } else {
            self.hw.w8(regs::TX_POLL, regs::NPQ);
        }
    }

    /// Give the rings and their buffers back to the platform.
    fn free_rings(&mut self) {
        if let Some(rings) = self.rings.take() {
            let dma = self.hw.platform();
            rings.tx.release(dma);
            rings.rx.release(dma);
        }
    }
}

impl<R: RegisterIo, P: Platform> Drop for R8169<R, P> {
    fn drop(&mut self) {
        self.free_rings();
        if let Some(tally) = self.tally.take() {
            tally.release(self.hw.platform());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// NETWORK DRIVER IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

impl<R: RegisterIo, P: Platform> NetworkDriver for R8169<R, P> {
    fn mac_address(&self) -> MacAddress {
        self.mac
    }

    fn can_transmit(&self) -> bool {
        self.is_running() && self.present && !self.queue_stopped()
    }

    fn can_receive(&self) -> bool {
        self.rings.as_ref().map_or(false, |r| r.rx.pending() > 0)
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<(), TxError> {
        let frags = [frame];
        self.xmit(&TxPacket::new(&frags))
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, RxError> {
        if !self.present {
            return Err(RxError::DeviceError);
        }
        let Some(rings) = self.rings.as_mut() else {
            return Err(RxError::DeviceError);
        };
        let Some(pkt) = rings.rx.take() else {
            return Ok(None);
        };
        let len = pkt.data.len();
        if len > buffer.len() {
            // Dropped rather than requeued, so later frames still drain.
            self.sw.rx_dropped += 1;
            return Err(RxError::BufferTooSmall { needed: len });
        }
        buffer[..len].copy_from_slice(&pkt.data);
        Ok(Some(len))
    }

    /// Polled mode: pull completed RX descriptors without waiting for an
    /// interrupt.
    fn refill_rx_queue(&mut self) {
        if self.is_running() && self.present {
            self.rx_work(self.config.poll_budget);
        }
    }

    /// Polled mode: reclaim TX, then run the watchdog, link events and
    /// any recovery they asked for.
    fn collect_tx_completions(&mut self) {
        if !self.is_running() || !self.present {
            return;
        }
        self.tx_work();
        let now = self.hw.platform().now_ms();
        self.check_tx_watchdog(now);
        self.process_link_event();
        if let Err(e) = self.run_recovery() {
            log::error!("[r8169] recovery failed: {}", e);
        }
    }

    fn link_up(&self) -> bool {
        self.hw.link_state().up
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DRIVER INIT IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

/// What [`DriverInit::create`] needs besides the BAR.
pub struct R8169Init<P> {
    pub platform: P,
    pub config: R8169Config,
}

impl<P: Platform> DriverInit for R8169<Mmio, P> {
    type Error = R8169Error;
    type Config = R8169Init<P>;

    fn supported_vendors() -> &'static [u16] {
        regs::SUPPORTED_VENDORS
    }

    fn supported_devices() -> &'static [u16] {
        regs::SUPPORTED_DEVICES
    }

    unsafe fn create(mmio_base: u64, init: Self::Config) -> Result<Self, Self::Error> {
        Self::attach(Mmio::new(mmio_base), init.platform, init.config)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::mock::{MockIo, MockPlatform};
    use alloc::vec;

    pub(crate) type TestDevice = R8169<MockIo, MockPlatform>;

    pub(crate) fn test_config() -> R8169Config {
        R8169Config {
            tx_ring_size: 64,
            rx_ring_size: 4,
            rx_buf_size: 2048,
            ..R8169Config::default()
        }
    }

    pub(crate) fn attached(rev: ChipRevision) -> (TestDevice, MockIo, MockPlatform) {
        attached_with(rev, test_config())
    }

    pub(crate) fn attached_with(rev: ChipRevision, config: R8169Config) -> (TestDevice, MockIo, MockPlatform) {
        let io = MockIo::new(rev);
        let platform = MockPlatform::new();
        let dev = R8169::attach(io.clone(), platform.clone(), config).unwrap();
        (dev, io, platform)
    }

    pub(crate) fn opened(rev: ChipRevision) -> (TestDevice, MockIo, MockPlatform) {
        let (mut dev, io, platform) = attached(rev);
        dev.open().unwrap();
        (dev, io, platform)
    }

    #[test]
    fn test_supported_ids() {
        assert!(TestDeviceInit::supports_device(0x10ec, 0x8168));
        assert!(TestDeviceInit::supports_device(0x10ec, 0x8125));
        assert!(!TestDeviceInit::supports_device(0x8086, 0x8168));
    }

    type TestDeviceInit = R8169<Mmio, MockPlatform>;

    #[test]
    fn test_receive_copies_frame() {
        let (mut dev, io, _) = opened(ChipRevision::V40);
        io.rx_complete(0, &[0x42; 100], 0);
        dev.refill_rx_queue();
        assert!(dev.can_receive());

        let mut buf = vec![0u8; 1514];
        assert_eq!(dev.receive(&mut buf), Ok(Some(100)));
        assert!(buf[..100].iter().all(|&b| b == 0x42));
        assert_eq!(dev.receive(&mut buf), Ok(None));
    }

    #[test]
    fn test_oversized_frame_is_dropped_not_requeued() {
        let (mut dev, io, _) = opened(ChipRevision::V40);
        dev.set_mtu(2000).unwrap();
        io.rx_complete(0, &[0x11; 2000], 0);
        io.rx_complete(1, &[0x22; 100], 0);
        dev.refill_rx_queue();

        let mut buf = [0u8; 1518];
        assert_eq!(dev.receive(&mut buf), Err(RxError::BufferTooSmall { needed: 2000 }));
        assert_eq!(dev.receive(&mut buf), Ok(Some(100)));
        assert!(buf[..100].iter().all(|&b| b == 0x22));
        assert_eq!(dev.sw.rx_dropped, 1);
        assert_eq!(dev.receive(&mut buf), Ok(None));
    }

    #[test]
    fn test_transmit_requires_open_device() {
        let (mut dev, _, _) = attached(ChipRevision::V40);
        assert!(!dev.can_transmit());
        assert_eq!(dev.transmit(&[0u8; 60]), Err(TxError::DeviceNotReady));
    }

    #[test]
    fn test_rx_error_counted_and_slot_reposted() {
        use crate::ring::desc::{FIRST_FRAG, LAST_FRAG, RX_CRC, RX_RES};

        let (mut dev, io, _) = opened(ChipRevision::V40);
        io.rx_status(0, FIRST_FRAG | LAST_FRAG | RX_RES | RX_CRC | 68, 0);
        dev.refill_rx_queue();

        assert!(!dev.can_receive());
        assert!(io.rx_owned(0));
        let s = dev.stats();
        assert_eq!(s.rx_errors, 1);
        assert_eq!(s.rx_crc_errors, 1);
        assert_eq!(s.rx_packets, 0);
    }

    #[test]
    fn test_polled_mode_runs_watchdog_recovery() {
        let (mut dev, _, platform) = opened(ChipRevision::V40);
        dev.transmit(&[0u8; 60]).unwrap();

        platform.advance_ms(dev.config.tx_timeout_ms + 1);
        dev.collect_tx_completions();

        let rings = dev.rings.as_ref().unwrap();
        assert_eq!((rings.tx.cur(), rings.tx.dirty()), (0, 0));
        assert!(dev.recovery_pending().is_empty());
        assert!(dev.can_transmit());
    }

    static_assertions::assert_impl_all!(IrqHandle<MockIo, MockPlatform>: Send, Sync, Clone);

    #[test]
    fn test_interrupt_handle_runs_beside_poll() {
        use crate::regs::Interrupts;

        let (mut dev, io, _) = opened(ChipRevision::V40);
        for slot in 0..4 {
            io.rx_complete(slot, &[slot as u8; 64], 0);
        }
        io.raise(Interrupts::RX_OK.bits());
        let handle = dev.interrupt_handle();
        assert!(handle.handle_interrupt());
        assert!(dev.poll_scheduled());

        let claimed = std::thread::scope(|s| {
            let irq_io = io.clone();
            let handle = handle.clone();
            let irq = s.spawn(move || {
                (0..100)
                    .filter(|_| {
                        irq_io.raise(Interrupts::TX_OK.bits());
                        handle.handle_interrupt()
                    })
                    .count()
            });
            // The poll task holds the device mutably the whole time.
            let outcome = dev.poll(64);
            assert_eq!(outcome, PollOutcome { work: 4, exhausted: false });
            irq.join().unwrap()
        });

        assert_eq!(claimed, 100);
        assert_eq!(dev.sw.rx_packets, 4);
        assert_eq!(dev.rings.as_ref().unwrap().rx.pending(), 4);
    }

    #[test]
    fn test_drop_returns_dma_memory() {
        let (dev, _, platform) = opened(ChipRevision::V40);
        assert!(platform.live_coherent() > 0);
        drop(dev);
        assert_eq!(platform.live_coherent(), 0);
        assert_eq!(platform.live_maps(), 0);
    }
}
