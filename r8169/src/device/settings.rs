//! Host-visible settings: MTU, offloads, wake-on-LAN, coalescing, receive
//! filter, station address and statistics.

use super::R8169;
use crate::chip::ChipRevision;
use crate::coalesce::Coalesce;
use crate::error::{R8169Error, Result};
use crate::features::{self, Features};
use crate::hw::{Platform, RegisterIo};
use crate::link::LinkState;
use crate::rx_mode::RxMode;
use crate::stats::{Stats64, TallyCounters};
use crate::types::{MacAddress, ETH_MIN_MTU};
use crate::wol::WolOpts;

impl<R: RegisterIo, P: Platform> R8169<R, P> {
    // ═══════════════════════════════════════════════════════════════════════
    // MTU AND OFFLOADS
    // ═══════════════════════════════════════════════════════════════════════

    /// Change the MTU.
    ///
    /// Offloads the new MTU rules out are dropped from the active set.
    ///
    /// # Errors
    /// `InvalidArgument` if `mtu` is below 68, above the chip's jumbo
    /// limit or larger than an RX buffer can hold.
    pub fn set_mtu(&mut self, mtu: usize) -> Result<()> {
        if mtu < ETH_MIN_MTU || mtu > self.max_mtu() || !self.config.rx_frame_fits(mtu) {
            return Err(R8169Error::InvalidArgument);
        }
        if !self.present {
            return Err(R8169Error::Detached);
        }
        let rev = self.hw.revision();
        self.mtu = mtu;
        self.features = features::fix_features(rev, mtu, self.features);
        self.hw.apply_features(self.caps.family, &mut self.cp_cmd, self.features);

        self.hw.jumbo_config(mtu, self.config.supports_gmii);
        if matches!(rev, ChipRevision::V61 | ChipRevision::V63) {
            self.hw.set_eee_txidle_timer(mtu);
        }
        log::debug!("[r8169] MTU {} features {:?}", mtu, self.features);
        Ok(())
    }

    /// Request a new offload set. Unsupported bits are ignored and fixed
    /// ones stay on.
    ///
    /// # Returns
    /// The set now active.
    pub fn set_features(&mut self, wanted: Features) -> Result<Features> {
        if !self.present {
            return Err(R8169Error::Detached);
        }
        let features = features::resolve(self.hw.revision(), &self.caps, self.mtu, wanted);
        self.hw.apply_features(self.caps.family, &mut self.cp_cmd, features);
        self.features = features;
        Ok(features)
    }

    /// Offloads the host may toggle.
    pub fn hw_features(&self) -> Features {
        features::hw_features(self.hw.revision(), &self.caps)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // WAKE-ON-LAN
    // ═══════════════════════════════════════════════════════════════════════

    pub fn get_wol(&self) -> WolOpts {
        self.saved_wol
    }

    /// Arm `opts` for the next suspend or close. The hardware is
    /// programmed now unless the device is suspended.
    pub fn set_wol(&mut self, opts: WolOpts) -> Result<()> {
        self.saved_wol = opts;
        if self.present && !self.suspended {
            self.wake_enabled = self.hw.set_wol(opts, self.dash)? || self.dash.is_enabled();
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERRUPT COALESCING
    // ═══════════════════════════════════════════════════════════════════════

    /// Speed the coalescing scale is chosen for. Unknown while the link
    /// is down.
    fn coalesce_speed(&self) -> Option<u32> {
        if self.link.up {
            self.link.mbps()
        } else {
            None
        }
    }

    pub fn get_coalesce(&self) -> Result<Coalesce> {
        self.hw.get_coalesce(&self.caps, self.cp_cmd, self.coalesce_speed())
    }

    /// # Errors
    /// - `NotSupported`: the 8125 has no mitigation register
    /// - `SpeedOutOfRange`: no scale table entry for the current speed
    /// - `OutOfRange`: a time or frame limit exceeds the register field
    pub fn set_coalesce(&mut self, req: &Coalesce) -> Result<()> {
        if !self.present {
            return Err(R8169Error::Detached);
        }
        let speed = self.coalesce_speed();
        self.hw.set_coalesce(&self.caps, &mut self.cp_cmd, speed, req)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // ADDRESSING
    // ═══════════════════════════════════════════════════════════════════════

    /// Replace the receive filter. Programmed at once while open, and on
    /// every start otherwise.
    pub fn set_rx_mode(&mut self, mode: RxMode) {
        self.rx_mode = mode;
        if self.is_running() && self.present {
            self.hw.set_rx_mode(&self.rx_mode);
        }
    }

    pub fn rx_mode(&self) -> &RxMode {
        &self.rx_mode
    }

    /// Set the station address.
    ///
    /// # Errors
    /// `InvalidArgument` for a multicast or all-zero address.
    pub fn set_mac_address(&mut self, mac: MacAddress) -> Result<()> {
        if !mac.is_valid() {
            return Err(R8169Error::InvalidArgument);
        }
        if self.present {
            self.hw.rar_set(&mac)?;
        }
        self.mac = mac;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STATUS
    // ═══════════════════════════════════════════════════════════════════════

    /// Statistics snapshot. Hardware counters are refreshed first while
    /// the device is open.
    pub fn stats(&mut self) -> Stats64 {
        let Some(tally) = self.tally.as_ref() else {
            return Stats64::merge(&self.sw, &TallyCounters::default(), &self.counter_offsets);
        };
        if self.is_running() && self.present {
            if let Err(e) = self.hw.update_counters(tally.bus_addr()) {
                if self.hw.ratelimit() {
                    log::warn!("[r8169] counter dump failed: {}", e);
                }
            }
        }
        Stats64::merge(&self.sw, &tally.read(), &self.counter_offsets)
    }

    /// Link as the PHY reports it now.
    pub fn link_state(&self) -> LinkState {
        self.hw.link_state()
    }
}
