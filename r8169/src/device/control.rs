//! Control path: attach, open/close, power management and recovery.
//!
//! Everything here may sleep and runs with the device held exclusively.

use alloc::sync::Arc;
use core::sync::atomic::AtomicBool;

use super::{DeviceState, Rings, R8169};
use crate::access::{RateLimiter, RegisterAccess};
use crate::chip::{capabilities, identify, xid_from_txconfig, BringUpReport, ChipRevision, Family};
use crate::config::R8169Config;
use crate::error::{R8169Error, Result};
use crate::features;
use crate::hw::{Delay, PciFunction, Platform, RegisterIo};
use crate::irq::IrqPipeline;
use crate::link::LinkState;
use crate::recovery::{Recovery, RecoveryAction};
use crate::regs::{self, ChipCmd};
use crate::ring::{RxRing, TxRing};
use crate::rx_mode::RxMode;
use crate::stats::{CounterOffsets, SwStats, TallyBlock};
use crate::types::MacAddress;
use crate::wol::WolOpts;

/// Log a failed step that should not abort the sequence it is part of.
fn log_failed(what: &str, ret: Result<()>) {
    if let Err(e) = ret {
        log::warn!("[r8169] {} failed: {}", what, e);
    }
}

impl<R: RegisterIo, P: Platform> R8169<R, P> {
    // ═══════════════════════════════════════════════════════════════════════
    // ATTACH / REMOVE
    // ═══════════════════════════════════════════════════════════════════════

    /// Identify the chip behind `io` and bring it to a known idle state.
    ///
    /// The interface is left down; call [`R8169::open`] to start traffic.
    ///
    /// # Errors
    /// - `InvalidArgument`: the configuration is inconsistent or asks for
    ///   an MTU the chip cannot carry
    /// - `PciReadFailed`: the BAR reads back all ones
    /// - `UnknownChip`: the XID matches no supported revision
    /// - `OutOfMemory`: the statistics block could not be allocated
    pub fn attach(io: R, platform: P, config: R8169Config) -> Result<Self> {
        config.validate()?;

        let txconfig = io.read32(regs::TX_CONFIG);
        if txconfig == u32::MAX {
            log::error!("[r8169] PCI read failed");
            return Err(R8169Error::PciReadFailed);
        }
        let xid = xid_from_txconfig(txconfig);
        let Some(rev) = identify(xid, config.supports_gmii) else {
            log::error!("[r8169] unknown chip XID {:03x}", xid);
            return Err(R8169Error::UnknownChip { xid });
        };

        let limiter = RateLimiter::new(config.log_burst, config.log_window_ms);
        let hw = RegisterAccess::new(io, platform, rev, limiter);
        let caps = capabilities(rev, config.supports_gmii);
        if config.mtu > caps.max_mtu() {
            log::error!("[r8169] MTU {} above chip limit {}", config.mtu, caps.max_mtu());
            return Err(R8169Error::InvalidArgument);
        }

        // L1 hangs or kills the link on many boards. Keep it only where the
        // board vendor vouched for it, otherwise ask the host to turn it off.
        let l1_settled = hw.aspm_is_safe() || hw.platform().disable_aspm(false);
        let aspm_manageable = config.aspm_manageable && l1_settled;

        let dash = hw.check_dash();
        let mut cp_cmd = hw.r16(regs::CPLUS_CMD) & regs::CPCMD_MASK;

        hw.init_rxcfg();
        hw.irq_mask_and_ack();
        hw.hw_initialize()?;
        hw.hw_reset()?;

        let mac = Self::init_mac_address(&hw)?;

        let features = features::resolve(rev, &caps, config.mtu, config.features);
        hw.apply_features(caps.family, &mut cp_cmd, features);

        let saved_wol = hw.read_wol();
        hw.set_d3_pll_down(!dash.is_enabled());
        let wake_enabled = dash.is_enabled() || !saved_wol.is_empty();

        let tally = TallyBlock::allocate(hw.platform()).ok_or(R8169Error::OutOfMemory)?;

        log::info!("[r8169] {}, {}, XID {:03x}", rev.name(), mac, xid);
        if caps.jumbo_max > 0 {
            log::info!(
                "[r8169] jumbo features [frames: {} bytes, tx checksumming: {}]",
                caps.jumbo_max,
                if rev <= ChipRevision::V06 { "ok" } else { "ko" }
            );
        }
        if dash.is_enabled() {
            log::info!("[r8169] DASH enabled");
            log_failed("DASH driver start", hw.dash_driver_start(dash));
        }

        let mtu = config.mtu;
        Ok(Self {
            hw: Arc::new(hw),
            config,
            caps,
            xid,
            dash,
            mac,
            perm_mac: mac,
            cp_cmd,
            features,
            mtu,
            saved_wol,
            wake_enabled,
            rx_mode: RxMode::default(),
            aspm_manageable,
            aspm_warned: false,
            state: DeviceState::Down,
            suspended: false,
            present: true,
            dead: false,
            queue_stopped: Arc::new(AtomicBool::new(true)),
            rings: None,
            tally: Some(tally),
            counter_offsets: CounterOffsets::default(),
            sw: SwStats::default(),
            link: LinkState::default(),
            last_tx_progress_ms: 0,
            irq: Arc::new(IrqPipeline::new()),
            recovery: Arc::new(Recovery::new()),
        })
    }

    /// Pick the station address: the chip's non-volatile copy, then what
    /// firmware left in MAC0, then a locally administered one.
    fn init_mac_address(hw: &RegisterAccess<R, P>) -> Result<MacAddress> {
        let stored = hw.read_stored_mac().ok().flatten().filter(MacAddress::is_valid);
        let mac = match stored {
            Some(mac) => mac,
            None => {
                let mac0 = MacAddress::new(hw.read_mac_from(regs::MAC0));
                if mac0.is_valid() {
                    mac0
                } else {
                    log::warn!("[r8169] can't read MAC address, setting random one");
                    MacAddress::from_seed(hw.platform().mac_seed())
                }
            }
        };
        hw.rar_set(&mac)?;
        Ok(mac)
    }

    /// Undo [`R8169::attach`]: close, release the management firmware and
    /// put the factory address back.
    pub fn remove(mut self) {
        if self.state == DeviceState::Up {
            log_failed("close", self.close());
        }
        log_failed("DASH driver stop", self.hw.dash_driver_stop(self.dash));
        log_failed("address restore", self.hw.rar_set(&self.perm_mac));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // OPEN / CLOSE
    // ═══════════════════════════════════════════════════════════════════════

    /// Allocate the rings and start the MAC.
    ///
    /// # Errors
    /// - `Detached`: the device is suspended or gone
    /// - `Busy`: already open
    /// - `OutOfMemory`: ring allocation failed; nothing is left allocated
    pub fn open(&mut self) -> Result<()> {
        if !self.present {
            return Err(R8169Error::Detached);
        }
        if self.state != DeviceState::Down {
            return Err(R8169Error::Busy);
        }
        self.state = DeviceState::Opening;

        let dma = self.hw.platform();
        let Some(tx) = TxRing::allocate(dma, self.config.tx_ring_size) else {
            self.state = DeviceState::Down;
            return Err(R8169Error::OutOfMemory);
        };
        let Some(mut rx) = RxRing::allocate(dma, self.config.rx_ring_size, self.config.rx_buf_size) else {
            tx.release(dma);
            self.state = DeviceState::Down;
            return Err(R8169Error::OutOfMemory);
        };
        rx.init();
        self.rings = Some(Rings { tx, rx });

        if let Err(e) = self.up() {
            log::error!("[r8169] open failed: {}", e);
            self.irq.disable();
            self.recovery.disable();
            self.hw.irq_mask_and_ack();
            self.free_rings();
            self.state = DeviceState::Down;
            return Err(e);
        }

        if let Some(tally) = self.tally.as_ref() {
            log_failed(
                "counter baseline",
                self.hw.init_counter_offsets(tally, &mut self.counter_offsets),
            );
        }
        self.last_tx_progress_ms = self.hw.platform().now_ms();
        self.state = DeviceState::Up;
        self.wake_queue();
        Ok(())
    }

    /// Stop the MAC and free the rings. No poll or recovery work survives.
    pub fn close(&mut self) -> Result<()> {
        if self.state != DeviceState::Up {
            return Err(R8169Error::NotRunning);
        }
        self.state = DeviceState::Closing;
        self.stop_queue();
        self.down();
        if let Some(rings) = self.rings.as_mut() {
            rings.rx.clear();
        }
        self.recovery.disable();
        self.free_rings();
        self.state = DeviceState::Down;
        Ok(())
    }

    fn up(&mut self) -> Result<()> {
        self.hw.platform().set_bus_master(true);
        log_failed("PHY init", self.hw.init_phy(self.config.supports_gmii));
        self.link = self.hw.link_state();
        self.irq.enable();
        self.recovery.enable();
        self.reset_work()
    }

    fn down(&mut self) {
        self.recovery.disable();
        if let Some(tally) = self.tally.as_ref() {
            if let Err(e) = self.hw.update_counters(tally.bus_addr()) {
                log::warn!("[r8169] counter dump failed: {}", e);
            }
        }
        self.hw.platform().set_bus_master(false);
        self.hw.commit();

        self.cleanup();
        log_failed("L1 exit disable", self.hw.disable_exit_l1());
        log_failed(
            "power down",
            self.hw.prepare_power_down(self.dash, self.wake_enabled, self.config.supports_gmii),
        );
    }

    /// Silence the chip and take all TX work back. Ring indices end at 0.
    fn cleanup(&mut self) {
        self.irq.disable();
        self.hw.irq_mask_and_ack();
        self.hw.rx_close();
        log_failed("TX quiesce", self.hw.quiesce());
        log_failed("MAC reset", self.hw.hw_reset());
        if let Some(rings) = self.rings.as_mut() {
            rings.tx.drain(self.hw.platform());
        }
    }

    /// Full MAC reinitialisation with the rings kept.
    fn reset_work(&mut self) -> Result<()> {
        self.stop_queue();
        self.cleanup();
        if let Some(rings) = self.rings.as_mut() {
            rings.rx.remark_all();
        }
        self.irq.enable();
        self.hw_start()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // HARDWARE START
    // ═══════════════════════════════════════════════════════════════════════

    /// Program the MAC from scratch and enable TX, RX and interrupts.
    fn hw_start(&mut self) -> Result<()> {
        let Some(rings) = self.rings.as_ref() else {
            return Err(R8169Error::NotRunning);
        };
        let (tx_bus, rx_bus) = (rings.tx.bus_addr(), rings.rx.bus_addr());
        let hw = &self.hw;
        let rev = hw.revision();

        hw.unlock_config();
        // ASPM and CLKREQ stay off while the EPHY is touched.
        log_failed("ASPM disable", hw.aspm_clkreq(false, self.aspm_manageable));
        hw.w16(regs::CPLUS_CMD, self.cp_cmd);

        match self.caps.family {
            Family::Rtl8169 => {
                hw.w8(regs::EARLY_TX_THRES, regs::NO_EARLY_TX);
                self.cp_cmd |= regs::CP_PCI_MUL_RW;
                if matches!(rev, ChipRevision::V02 | ChipRevision::V03) {
                    self.cp_cmd |= regs::CP_EN_ANA_PLL;
                }
                hw.w16(regs::CPLUS_CMD, self.cp_cmd);
                hw.set_magic_reg();
                // no interrupt coalescing
                hw.w16(regs::INTR_MITIGATE, 0);
            }
            Family::Rtl8125 => {
                for reg in (regs::INTR_COALESCE_8125_START..regs::INTR_COALESCE_8125_END).step_by(4) {
                    hw.w32(reg, 0);
                }
                Self::log_bring_up(hw.hw_config(self.mtu));
            }
            Family::Rtl8168 => {
                let max_tx = if rev.is_8168evl_up() { regs::EARLY_SIZE } else { regs::TX_PACKET_MAX };
                hw.w8(regs::MAX_TX_PACKET_SIZE, max_tx);
                Self::log_bring_up(hw.hw_config(self.mtu));
                hw.w16(regs::INTR_MITIGATE, 0);
            }
        }

        log_failed("L1 exit enable", hw.enable_exit_l1());
        log_failed("ASPM enable", hw.aspm_clkreq(true, self.aspm_manageable));
        hw.set_rx_max_size();
        hw.set_desc_addr(tx_bus, rx_bus);
        hw.lock_config();

        hw.jumbo_config(self.mtu, self.config.supports_gmii);
        hw.commit();

        hw.w8(regs::CHIP_CMD, (ChipCmd::TX_ENABLE | ChipCmd::RX_ENABLE).bits());
        hw.init_rxcfg();
        hw.set_tx_config();
        hw.rx_config_features(self.caps.family, self.features);
        hw.set_rx_mode(&self.rx_mode);
        hw.irq_enable(self.caps.irq_mask);
        Ok(())
    }

    fn log_bring_up(report: BringUpReport) {
        if report.failed > 0 {
            log::warn!("[r8169] {} of {} bring-up steps failed", report.failed, report.steps);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LINK EVENTS
    // ═══════════════════════════════════════════════════════════════════════

    /// Act on a link change reported by the interrupt handler.
    ///
    /// # Returns
    /// The new link state, or `None` if no event was pending.
    pub fn process_link_event(&mut self) -> Option<LinkState> {
        if !self.irq.take_link_event() {
            return None;
        }
        let link = self.hw.link_state();
        self.link = link;

        if link.up {
            log_failed("link patch", self.hw.link_change_patch(link.speed));
            if self.is_running() && self.present {
                self.wake_queue();
            }
            log::info!("[r8169] Link is {}", link);
        } else {
            log::info!("[r8169] Link is Down");
            // RX stays broken after link down on the 8125 unless the MAC
            // is reset.
            if self.hw.revision().is_8125() && self.is_running() && self.present {
                log_failed("link-down reset", self.reset_work());
                self.wake_queue();
            }
        }
        Some(link)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RECOVERY
    // ═══════════════════════════════════════════════════════════════════════

    /// Request a TX timeout recovery if TX work has been outstanding
    /// without progress for `tx_timeout_ms`.
    ///
    /// # Returns
    /// `true` if a recovery was requested.
    pub fn check_tx_watchdog(&mut self, now_ms: u64) -> bool {
        if !self.is_running() || !self.present {
            return false;
        }
        let Some(rings) = self.rings.as_ref() else {
            return false;
        };
        if rings.tx.is_empty() {
            self.last_tx_progress_ms = now_ms;
            return false;
        }
        if now_ms.saturating_sub(self.last_tx_progress_ms) < self.config.tx_timeout_ms {
            return false;
        }
        log::warn!(
            "[r8169] transmit timed out, {} descriptors pending at slot {}",
            rings.tx.in_flight(),
            rings.tx.dirty_slot()
        );
        self.last_tx_progress_ms = now_ms;
        self.recovery.request(RecoveryAction::TX_TIMEOUT)
    }

    /// Run whatever recovery the interrupt handler or watchdog queued.
    ///
    /// # Errors
    /// `Detached` if the chip stopped answering and the bus reset failed.
    /// The device is then unusable until it is removed.
    pub fn run_recovery(&mut self) -> Result<()> {
        if !self.is_running() || !self.present {
            return Ok(());
        }
        let (timeout, reset) = match self.recovery.begin() {
            Some(run) => (
                run.take(RecoveryAction::TX_TIMEOUT),
                run.take(RecoveryAction::RESET_PENDING),
            ),
            None => return Ok(()),
        };

        if !timeout && !reset {
            return Ok(());
        }
        let why = if timeout { "tx timeout" } else { "reset request" };

        // A chip that reads back all ones may come back after a bus reset.
        if self.hw.r32(regs::TX_CONFIG) == u32::MAX && !self.hw.platform().secondary_bus_reset() {
            log::error!("[r8169] Can't reset secondary PCI bus, detach NIC");
            self.present = false;
            self.dead = true;
            self.stop_queue();
            self.irq.disable();
            self.recovery.disable();
            return Err(R8169Error::Detached);
        }
        // ASPM is the usual cause of TX timeouts and bus errors.
        if self.hw.platform().disable_aspm(true) && !self.aspm_warned {
            self.aspm_warned = true;
            log::warn!("[r8169] ASPM disabled on {}", why);
        }

        log::warn!("[r8169] resetting MAC ({})", why);
        self.reset_work()?;
        self.wake_queue();
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // POWER MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════

    fn net_suspend(&mut self) {
        self.present = false;
        self.stop_queue();
        if self.is_running() {
            self.down();
        }
        self.suspended = true;
    }

    /// System suspend. The rings stay allocated; the MAC is stopped with
    /// the saved wake sources armed.
    pub fn suspend(&mut self) {
        self.net_suspend();
    }

    /// Idle suspend: wake on link change only.
    pub fn runtime_suspend(&mut self) -> Result<()> {
        if self.rings.is_none() {
            self.present = false;
            self.suspended = true;
            return Ok(());
        }
        self.wake_enabled = self.hw.set_wol(WolOpts::PHY, self.dash)?;
        self.net_suspend();
        Ok(())
    }

    pub fn runtime_resume(&mut self) -> Result<()> {
        if self.dead {
            return Err(R8169Error::Detached);
        }
        // A stuck mailbox must not keep the interface suspended.
        log_failed("address restore", self.hw.rar_set(&self.mac));
        self.wake_enabled = match self.hw.set_wol(self.saved_wol, self.dash) {
            Ok(armed) => armed || self.dash.is_enabled(),
            Err(e) => {
                log::warn!("[r8169] wake-on-LAN restore failed: {}", e);
                self.dash.is_enabled()
            }
        };
        if self.rings.is_some() {
            self.up()?;
        }
        self.present = true;
        self.suspended = false;
        if self.is_running() {
            self.wake_queue();
        }
        Ok(())
    }

    /// System resume.
    pub fn resume(&mut self) -> Result<()> {
        // Some 8168f boards truncate packets until RxConfig is rewritten.
        if self.hw.revision() == ChipRevision::V37 {
            self.hw.init_rxcfg();
        }
        self.runtime_resume()
    }

    /// Quiesce for power-off or reboot and restore the factory address.
    pub fn shutdown(&mut self) {
        self.net_suspend();
        log_failed("address restore", self.hw.rar_set(&self.perm_mac));
    }
}
