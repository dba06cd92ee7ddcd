//! Interrupt handler, poll loop and transmit path.
//!
//! # Reference
//! NETWORK_IMPL_GUIDE.md §4, RTL8169 datasheet §Transmit/Receive Descriptors

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use super::{IrqHandle, R8169};
use crate::access::RegisterAccess;
use crate::chip::{Capabilities, CsumGen};
use crate::driver::traits::TxError;
use crate::hw::{Delay, Platform, RegisterIo};
use crate::irq::{classify, IrqPipeline};
use crate::recovery::{Recovery, RecoveryAction};
use crate::ring::offload::{
    encode, features_check, offload_permitted, packet_padto, parse_headers, prepare_tso_v6, software_offload,
    FrameHeaders, L3,
};
use crate::ring::tx::{MAX_TX_FRAGS, TX_FRAG_MAX, TX_STOP_THRESHOLD};
use crate::ring::{TxOffload, TxOpts, TxPacket};
use crate::error::R8169Error;
use crate::types::{ETH_HLEN, VLAN_HLEN};

/// Result of one [`R8169::poll`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// RX descriptors consumed.
    pub work: usize,
    /// The budget ran out; interrupts stay masked and the poll stays
    /// scheduled.
    pub exhausted: bool,
}

impl<R: RegisterIo, P: Platform> R8169<R, P> {
    // ═══════════════════════════════════════════════════════════════════════
    // INTERRUPT
    // ═══════════════════════════════════════════════════════════════════════

    /// Hard interrupt handler.
    ///
    /// Reads and acknowledges status, masks the chip and schedules a poll.
    /// Never touches the rings.
    ///
    /// # Returns
    /// `false` if the interrupt was not raised by this device.
    pub fn handle_interrupt(&self) -> bool {
        IrqContext {
            hw: &self.hw,
            caps: &self.caps,
            irq: &self.irq,
            recovery: &self.recovery,
            queue_stopped: &self.queue_stopped,
        }
        .run()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // POLL
    // ═══════════════════════════════════════════════════════════════════════

    /// Poll body: reclaim TX, then receive up to `budget` frames.
    ///
    /// Interrupts are unmasked again only when the budget was not used up.
    pub fn poll(&mut self, budget: usize) -> PollOutcome {
        if !self.irq.begin_poll() {
            return PollOutcome::default();
        }
        self.tx_work();
        let work = self.rx_work(budget);
        let exhausted = work >= budget;
        if self.irq.complete(exhausted) {
            self.hw.irq_enable(self.caps.irq_mask);
        }
        PollOutcome { work, exhausted }
    }

    pub(super) fn rx_work(&mut self, budget: usize) -> usize {
        let Self { hw, rings, sw, features, .. } = self;
        let Some(rings) = rings.as_mut() else {
            return 0;
        };
        rings.rx.poll(budget, features.rx_flags(), sw, || hw.ratelimit())
    }

    pub(super) fn tx_work(&mut self) {
        let Some(rings) = self.rings.as_mut() else {
            return;
        };
        let budget = rings.tx.len();
        let done = rings.tx.reclaim(self.hw.platform(), budget);
        self.sw.tx_packets += done.packets as u64;
        self.sw.tx_bytes += done.bytes as u64;
        if done.slots > 0 {
            self.last_tx_progress_ms = self.hw.platform().now_ms();
        }
        let wake = rings.tx.should_wake();
        if self.queue_stopped() && wake {
            self.wake_queue();
        }
        if done.kick {
            self.doorbell();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // TRANSMIT
    // ═══════════════════════════════════════════════════════════════════════

    /// Queue one packet.
    ///
    /// An offload the hardware cannot apply to this particular packet is
    /// done in software instead; a TSO super-frame then becomes several
    /// frames.
    ///
    /// # Returns
    /// - `Err(DeviceNotReady)`: closed, detached or suspended
    /// - `Err(QueueFull)`: queue stopped; retry after completions
    /// - `Err(FrameTooLarge)`: longer than the MTU allows, or too many
    ///   fragments
    /// - `Err(Dropped)`: the offload cannot be done for this frame at all,
    ///   or DMA mapping failed; counted in `tx_dropped`
    pub fn xmit(&mut self, pkt: &TxPacket<'_>) -> Result<(), TxError> {
        if !self.is_running() || !self.present || self.rings.is_none() {
            return Err(TxError::DeviceNotReady);
        }
        if self.queue_stopped() {
            return Err(TxError::QueueFull);
        }
        let is_tso = matches!(pkt.offload, TxOffload::Tso { .. });
        if !is_tso && pkt.len() > self.mtu + ETH_HLEN + VLAN_HLEN {
            return Err(TxError::FrameTooLarge);
        }

        let rev = self.hw.revision();
        let hdrs = parse_headers(pkt.head());
        let allowed = features_check(&self.caps, rev, pkt, &hdrs, self.features);
        if !offload_permitted(pkt, &hdrs, allowed) {
            return self.xmit_in_software(pkt, &hdrs);
        }

        let bufs = self.stage(pkt, &hdrs)?;
        if !self.reserve(bufs.len()) {
            if self.hw.ratelimit() {
                log::error!("[r8169] BUG! Tx Ring full when queue awake!");
            }
            return Err(TxError::QueueFull);
        }
        let opts = encode(self.caps.csum, pkt, &hdrs);
        self.post_staged(bufs, opts, pkt.len())?;
        self.finish_xmit();
        Ok(())
    }

    /// Finish the offload on the CPU and post the resulting frames as one
    /// batch behind a single doorbell.
    fn xmit_in_software(&mut self, pkt: &TxPacket<'_>, hdrs: &FrameHeaders) -> Result<(), TxError> {
        let Some(frames) = software_offload(pkt, hdrs) else {
            if self.hw.ratelimit() {
                log::warn!("[r8169] cannot offload {:?} for this frame, dropping", pkt.offload);
            }
            self.sw.tx_dropped += 1;
            return Err(TxError::Dropped);
        };

        let mut staged = Vec::with_capacity(frames.len());
        let mut slots = 0;
        for frame in &frames {
            let frags = [&frame[..]];
            let seg = TxPacket { vlan_tag: pkt.vlan_tag, ..TxPacket::new(&frags) };
            let seg_hdrs = parse_headers(frame);
            let bufs = self.stage(&seg, &seg_hdrs)?;
            slots += bufs.len();
            staged.push((bufs, encode(self.caps.csum, &seg, &seg_hdrs), frame.len()));
        }

        let ring_len = self.rings.as_ref().map_or(0, |r| r.tx.len());
        if slots + TX_STOP_THRESHOLD > ring_len {
            return Err(TxError::FrameTooLarge);
        }
        if !self.reserve(slots) {
            return Err(TxError::QueueFull);
        }

        let mut posted = 0;
        let mut ret = Ok(());
        for (bufs, opts, len) in staged {
            if let Err(e) = self.post_staged(bufs, opts, len) {
                ret = Err(e);
                break;
            }
            posted += 1;
        }
        if posted > 0 {
            self.finish_xmit();
        }
        ret
    }

    /// Make sure `slots` descriptors are free, stopping the queue if not.
    fn reserve(&mut self, slots: usize) -> bool {
        let Some(rings) = self.rings.as_ref() else {
            return false;
        };
        if rings.tx.avail() < slots {
            self.stop_queue();
            return false;
        }
        if rings.tx.is_empty() {
            self.last_tx_progress_ms = self.hw.platform().now_ms();
        }
        true
    }

    fn post_staged(&mut self, bufs: Vec<Vec<u8>>, opts: TxOpts, len: usize) -> Result<(), TxError> {
        let Some(rings) = self.rings.as_mut() else {
            return Err(TxError::DeviceNotReady);
        };
        match rings.tx.post(self.hw.platform(), bufs, opts, len) {
            Ok(()) => Ok(()),
            Err(R8169Error::MapFailed) => {
                if self.hw.ratelimit() {
                    log::error!("[r8169] Failed to map TX buffer");
                }
                self.sw.tx_dropped += 1;
                Err(TxError::Dropped)
            }
            Err(_) => {
                self.stop_queue();
                Err(TxError::QueueFull)
            }
        }
    }

    /// Stop the queue if the next packet might not fit, then kick the chip.
    fn finish_xmit(&self) {
        if self.rings.as_ref().map_or(false, |r| r.tx.should_stop()) {
            self.stop_queue();
        }
        self.doorbell();
    }

    /// Copy `pkt` into descriptor sized buffers.
    ///
    /// Short frames that need padding are flattened into one zero-padded
    /// buffer; everything else keeps its fragment boundaries.
    fn stage(&self, pkt: &TxPacket<'_>, hdrs: &FrameHeaders) -> Result<Vec<Vec<u8>>, TxError> {
        let len = pkt.len();
        let padto = match pkt.offload {
            TxOffload::None => packet_padto(&self.caps, self.hw.revision(), pkt, hdrs),
            _ => 0,
        };

        let mut bufs: Vec<Vec<u8>> = Vec::with_capacity(pkt.frags.len());
        if padto > len {
            let mut flat = vec![0u8; padto];
            let mut off = 0;
            for frag in pkt.frags {
                flat[off..off + frag.len()].copy_from_slice(frag);
                off += frag.len();
            }
            bufs.push(flat);
        } else {
            for frag in pkt.frags.iter().filter(|f| !f.is_empty()) {
                bufs.extend(frag.chunks(TX_FRAG_MAX).map(<[u8]>::to_vec));
            }
        }

        if bufs.is_empty() {
            return Err(TxError::FrameTooLarge);
        }
        if bufs.len() > MAX_TX_FRAGS {
            return Err(TxError::FrameTooLarge);
        }
        if self.caps.csum == CsumGen::V2 && is_tso_v6(pkt, hdrs) {
            prepare_tso_v6(&mut bufs[0], hdrs);
        }
        Ok(bufs)
    }
}

impl<R: RegisterIo, P: Platform> IrqHandle<R, P> {
    /// Same as [`R8169::handle_interrupt`], callable while the device is
    /// borrowed elsewhere.
    pub fn handle_interrupt(&self) -> bool {
        IrqContext {
            hw: &self.hw,
            caps: &self.caps,
            irq: &self.irq,
            recovery: &self.recovery,
            queue_stopped: &self.queue_stopped,
        }
        .run()
    }
}

/// Everything the interrupt handler may touch.
struct IrqContext<'a, R: RegisterIo, P: Platform> {
    hw: &'a RegisterAccess<R, P>,
    caps: &'a Capabilities,
    irq: &'a IrqPipeline,
    recovery: &'a Recovery,
    queue_stopped: &'a AtomicBool,
}

impl<R: RegisterIo, P: Platform> IrqContext<'_, R, P> {
    fn run(&self) -> bool {
        let status = self.hw.irq_status();
        let Some(ev) = classify(status, self.caps) else {
            return false;
        };

        if ev.sys_err {
            self.recovery.request(RecoveryAction::RESET_PENDING);
            self.hw.irq_ack(ev.status);
            return true;
        }
        if ev.link_change {
            self.irq.note_link_event();
        }
        if ev.fifo_reset {
            self.queue_stopped.store(true, Ordering::Release);
            self.recovery.request(RecoveryAction::RESET_PENDING);
        }

        if self.irq.schedule_prep() {
            self.hw.irq_disable();
        }
        self.hw.irq_ack(ev.status);
        true
    }
}

fn is_tso_v6(pkt: &TxPacket<'_>, hdrs: &FrameHeaders) -> bool {
    matches!(pkt.offload, TxOffload::Tso { .. }) && hdrs.l3 == L3::Ipv6
}
