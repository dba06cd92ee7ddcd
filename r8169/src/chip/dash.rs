//! DASH out-of-band management handshake.
//!
//! On the 8168dp and 8168ep/8117 a management controller can share the
//! MAC with the host. The driver announces itself on attach and says
//! goodbye on detach; while DASH is active the MAC must not be powered
//! down and wake-on-LAN stays armed.

use super::ident::ChipRevision::*;
use crate::access::{EriMask, Poll, Protocol, RegisterAccess};
use crate::error::Result;
use crate::hw::{Platform, RegisterIo};

const OOB_CMD_DRIVER_START: u32 = 0x05;
const OOB_CMD_DRIVER_STOP: u32 = 0x06;

const POLL_DASH: Poll = Poll::new(10_000, 10);

/// Which management controller flavour is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashType {
    None,
    /// 8168dp, reached through OCPAR/OCPDR.
    Dp,
    /// 8168ep/8117, reached through ERI OOB.
    Ep,
}

impl DashType {
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

impl<R: RegisterIo, P: Platform> RegisterAccess<R, P> {
    fn dp_status_reg(&self) -> u16 {
        if self.revision() == V31 {
            0xb8
        } else {
            0x10
        }
    }

    /// Probe for an active management controller.
    pub fn check_dash(&self) -> DashType {
        let rev = self.revision();
        if matches!(rev, V28 | V31) {
            match self.dp_ocp_read(self.dp_status_reg()) {
                Ok(v) if v & (1 << 15) != 0 => DashType::Dp,
                _ => DashType::None,
            }
        } else if rev.within(V51, V53) {
            match self.ep_ocp_read(0x128) {
                Ok(v) if v & 1 != 0 => DashType::Ep,
                _ => DashType::None,
            }
        } else {
            DashType::None
        }
    }

    fn dp_oob_notify(&self, cmd: u32) -> Result<()> {
        self.eri_write(0xe8, EriMask::M0001, cmd)?;
        self.dp_ocp_write(0x1, 0x30, 0x0000_0001)
    }

    fn dp_ack(&self, high: bool) -> Result<()> {
        let reg = self.dp_status_reg();
        self.wait_for(Protocol::Dash, POLL_DASH, high, |a| {
            a.dp_ocp_read(reg).map(|v| v & 0x800 != 0).unwrap_or(!high)
        })
    }

    fn ep_notify(&self, cmd: u32, high: bool) -> Result<()> {
        self.ep_ocp_write(0x180, cmd)?;
        let v = self.ep_ocp_read(0x30)?;
        self.ep_ocp_write(0x30, v | 0x01)?;
        self.wait_for(Protocol::Dash, POLL_DASH, high, |a| {
            a.ep_ocp_read(0x124).map(|v| v & 1 != 0).unwrap_or(!high)
        })
    }

    /// Tell the management firmware the host driver took over.
    pub fn dash_driver_start(&self, dash: DashType) -> Result<()> {
        match dash {
            DashType::None => Ok(()),
            DashType::Dp => {
                self.dp_oob_notify(OOB_CMD_DRIVER_START)?;
                self.dp_ack(true)
            }
            DashType::Ep => self.ep_notify(OOB_CMD_DRIVER_START, true),
        }
    }

    pub fn dash_driver_stop(&self, dash: DashType) -> Result<()> {
        match dash {
            DashType::None => Ok(()),
            DashType::Dp => {
                self.dp_oob_notify(OOB_CMD_DRIVER_STOP)?;
                self.dp_ack(false)
            }
            DashType::Ep => {
                let _ = self.stop_cmac();
                self.ep_notify(OOB_CMD_DRIVER_STOP, false)
            }
        }
    }
}
