//! Interrupt coalescing.
//!
//! IntrMitigate packs four 4-bit fields: TX timer, TX frame count, RX
//! timer and RX frame count. Frame counts are in units of four frames.
//! The timer unit depends on the link speed and on the INTT field of
//! CPlusCmd, which selects one of four scales per speed.
//!
//! The 8125 moved its coalescing block and is not supported here.

use crate::access::RegisterAccess;
use crate::chip::{Capabilities, CoalesceScale};
use crate::error::{R8169Error, Result};
use crate::hw::{Platform, RegisterIo};
use crate::regs;

const TX_USECS_SHIFT: u16 = 12;
const TX_FRAMES_SHIFT: u16 = 8;
const RX_USECS_SHIFT: u16 = 4;
const RX_FRAMES_SHIFT: u16 = 0;
const FIELD_MASK: u16 = 0xf;

/// Largest value of a timer field.
pub const COALESCE_T_MAX: u32 = 0xf;
/// Largest frame count the hardware can express.
pub const COALESCE_FRAME_MAX: u32 = COALESCE_T_MAX * 4;

/// Host-facing coalescing parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coalesce {
    pub rx_usecs: u32,
    pub rx_max_frames: u32,
    pub tx_usecs: u32,
    pub tx_max_frames: u32,
}

/// Scale entry for the current link speed.
///
/// # Arguments
/// - `speed`: negotiated speed in Mb/s, `None` if unknown
///
/// # Returns
/// The fastest entry for an unknown speed; `SpeedOutOfRange` for a speed
/// the table does not list.
pub fn scale_for(caps: &Capabilities, speed: Option<u32>) -> Result<&'static CoalesceScale> {
    let table = caps.coalesce.ok_or(R8169Error::NotSupported)?;
    match speed {
        None => table.first().ok_or(R8169Error::NotSupported),
        Some(s) => table.iter().find(|c| c.speed == s).ok_or(R8169Error::SpeedOutOfRange),
    }
}

/// Pick the finest INTT scale that can still express `usecs`.
///
/// # Returns
/// `(intt, scale_ns)`
pub fn choose_scale(ci: &CoalesceScale, usecs: u32) -> Result<(u16, u32)> {
    for (i, &scale) in ci.scale_ns.iter().enumerate() {
        if usecs <= scale * COALESCE_T_MAX / 1000 {
            return Ok((i as u16, scale));
        }
    }
    Err(R8169Error::OutOfRange)
}

fn field(w: u16, shift: u16) -> u32 {
    ((w >> shift) & FIELD_MASK) as u32
}

/// Decode IntrMitigate against `scale_ns`.
pub fn decode(intrmit: u16, scale_ns: u32) -> Coalesce {
    let side = |us_shift, fr_shift| {
        let c_us = field(intrmit, us_shift);
        let c_fr = field(intrmit, fr_shift);
        let usecs = (c_us * scale_ns).div_ceil(1000);
        // A zero timer and zero frame count reads back as one frame.
        let frames = if c_us != 0 || c_fr != 0 { c_fr * 4 } else { 1 };
        (usecs, frames)
    };
    let (tx_usecs, tx_max_frames) = side(TX_USECS_SHIFT, TX_FRAMES_SHIFT);
    let (rx_usecs, rx_max_frames) = side(RX_USECS_SHIFT, RX_FRAMES_SHIFT);
    Coalesce { rx_usecs, rx_max_frames, tx_usecs, tx_max_frames }
}

/// Encoded register values for a coalescing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalesceRegs {
    pub intrmit: u16,
    pub intt: u16,
    /// Both frame counts are zero.
    pub frames_disabled: bool,
}

/// Validate and encode `req`.
pub fn encode(ci: &CoalesceScale, req: &Coalesce) -> Result<CoalesceRegs> {
    let mut rx_fr = req.rx_max_frames;
    let mut tx_fr = req.tx_max_frames;
    if rx_fr > COALESCE_FRAME_MAX || tx_fr > COALESCE_FRAME_MAX {
        return Err(R8169Error::OutOfRange);
    }

    let (intt, scale) = choose_scale(ci, req.rx_usecs.max(req.tx_usecs))?;

    // One frame is what decode reports for "no frame limit".
    if rx_fr == 1 {
        rx_fr = 0;
    }
    if tx_fr == 1 {
        tx_fr = 0;
    }

    // A frame limit needs a time limit.
    if (tx_fr != 0 && req.tx_usecs == 0) || (rx_fr != 0 && req.rx_usecs == 0) {
        return Err(R8169Error::InvalidArgument);
    }

    let units = |usecs: u32| ((usecs * 1000).div_ceil(scale) as u16) & FIELD_MASK;
    let frames = |fr: u32| (fr.div_ceil(4) as u16) & FIELD_MASK;

    let intrmit = frames(tx_fr) << TX_FRAMES_SHIFT
        | frames(rx_fr) << RX_FRAMES_SHIFT
        | units(req.tx_usecs) << TX_USECS_SHIFT
        | units(req.rx_usecs) << RX_USECS_SHIFT;

    Ok(CoalesceRegs {
        intrmit,
        intt,
        frames_disabled: rx_fr == 0 && tx_fr == 0,
    })
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    /// Read back the programmed coalescing parameters.
    pub fn get_coalesce(&self, caps: &Capabilities, cp_cmd: u16, speed: Option<u32>) -> Result<Coalesce> {
        let ci = scale_for(caps, speed)?;
        let scale = ci.scale_ns[(cp_cmd & regs::CP_INTT_MASK) as usize];
        Ok(decode(self.r16(regs::INTR_MITIGATE), scale))
    }

    /// Program new coalescing parameters.
    ///
    /// # Arguments
    /// - `cp_cmd`: shadow of CPlusCmd, updated in place
    pub fn set_coalesce(
        &self,
        caps: &Capabilities,
        cp_cmd: &mut u16,
        speed: Option<u32>,
        req: &Coalesce,
    ) -> Result<()> {
        let ci = scale_for(caps, speed)?;
        let enc = encode(ci, req)?;

        self.w16(regs::INTR_MITIGATE, enc.intrmit);

        // PktCntrDisable changed meaning with the 8168evl.
        if self.revision().is_8168evl_up() {
            if enc.frames_disabled {
                *cp_cmd |= regs::CP_PKT_CNTR_DISABLE;
            } else {
                *cp_cmd &= !regs::CP_PKT_CNTR_DISABLE;
            }
        }
        *cp_cmd = (*cp_cmd & !regs::CP_INTT_MASK) | enc.intt;
        self.w16(regs::CPLUS_CMD, *cp_cmd);
        self.commit();
        Ok(())
    }
}
